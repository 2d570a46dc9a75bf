use crate::ObserverOptions;

///
/// Selectors, class names and tuning constants shared by the effects.
///
/// The defaults match the markup of the portfolio page.
///
#[derive(Clone, Debug)]
pub struct Config {
    /// Links that scroll smoothly to their in-page target.
    pub anchor_selector: String,

    /// Elements revealed the first time they scroll into view.
    pub reveal_selector: String,
    pub reveal_class: String,
    pub reveal_threshold: f64,
    pub reveal_root_margin: String,

    /// The hero decoration moved by the parallax effect.
    pub decoration_selector: String,

    /// Fraction of the scroll offset applied as vertical translation.
    pub parallax_factor: f64,

    /// Class set on `<body>` once the page is scrolled past `scrolled_offset`.
    pub scrolled_class: String,
    pub scrolled_offset: f64,
}

impl Config {
    pub fn observer_options(&self) -> ObserverOptions {
        ObserverOptions {
            threshold: self.reveal_threshold,
            root_margin: self.reveal_root_margin.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anchor_selector: "a[href^=\"#\"]".to_string(),
            reveal_selector: ".about-card, .project-card, .skill-tag, .section-header"
                .to_string(),
            reveal_class: "animate-in".to_string(),
            reveal_threshold: 0.1,
            reveal_root_margin: "0px 0px -50px 0px".to_string(),
            decoration_selector: ".hero-decoration".to_string(),
            parallax_factor: 0.5,
            scrolled_class: "scrolled".to_string(),
            scrolled_offset: 100.0,
        }
    }
}
