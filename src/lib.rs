#![cfg_attr(not(feature = "web"), forbid(unsafe_code))]

//!
//! The scrollfx crate adds cosmetic scroll interactivity to a static page.
//!
//! The effects are written once against the [Page] abstraction, and run either
//! inside a browser ([web], behind the `web` feature) or on the in-memory
//! [server] page, which is what the tests drive.
//!

pub mod anchor;
pub mod config;
pub mod error;
pub mod parallax;
pub mod reveal;
pub mod scrolled;
pub mod server;

#[cfg(feature = "web")]
pub mod web;

pub use config::Config;
pub use error::Error;

/// How a scroll-into-view request moves the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

/// Where the target element ends up along the block axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollBlock {
    Start,
    Center,
    End,
    Nearest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollIntoView {
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

/// Options used to create an intersection observer.
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverOptions {
    /// Visible fraction of the target at which a report is triggered.
    pub threshold: f64,

    /// CSS margin shorthand applied to the viewport, e.g. `"0px 0px -50px 0px"`.
    pub root_margin: String,
}

/// One report delivered to an intersection observer callback.
#[derive(Clone, Debug)]
pub struct Intersection<E> {
    pub target: E,
    pub is_intersecting: bool,
    pub ratio: f64,
}

///
/// A DOM event handed to a listener.
///
pub trait Event {
    fn prevent_default(&self);
}

///
/// Handle to an intersection observer created by a [Page].
///
pub trait Observer<P: Page> {
    fn observe(&self, element: &P::Element);

    fn unobserve(&self, element: &P::Element);
}

pub type ClickHandler = Box<dyn FnMut(&dyn Event)>;
pub type ScrollHandler = Box<dyn FnMut()>;
pub type OnceHandler = Box<dyn FnOnce()>;
pub type IntersectionHandler<P> = Box<
    dyn FnMut(&[Intersection<<P as Page>::Element>], &<P as Page>::Observer),
>;

///
/// Main abstraction for scrollfx.
///
/// We abstract over the page we are decorating. A page is a cheap handle:
/// clones refer to the same document, so listeners can capture one.
///
pub trait Page: Clone + Sized + 'static {
    type Element: Clone + 'static;
    type Observer: Observer<Self> + Clone + 'static;

    /// First element matching the selector, in document order.
    fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>, Error>;

    /// Every element matching the selector, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Element>, Error>;

    fn body(&self) -> Result<Self::Element, Error>;

    fn attribute(element: &Self::Element, name: &str) -> Option<String>;

    fn add_class(element: &Self::Element, class: &str) -> Result<(), Error>;

    /// Force the class on or off. Returns whether the class is now present.
    fn toggle_class(element: &Self::Element, class: &str, force: bool) -> Result<bool, Error>;

    /// Set one inline style property.
    fn set_style(element: &Self::Element, property: &str, value: &str) -> Result<(), Error>;

    fn scroll_into_view(element: &Self::Element, options: ScrollIntoView);

    /// Vertical scroll offset of the page, in CSS pixels.
    fn scroll_top(&self) -> f64;

    /// Height of the viewport, in CSS pixels.
    fn viewport_height(&self) -> f64;

    fn on_click(&self, element: &Self::Element, handler: ClickHandler) -> Result<(), Error>;

    /// Listen for scroll events on the window.
    /// A passive listener promises never to cancel the scroll.
    fn on_scroll(&self, passive: bool, handler: ScrollHandler) -> Result<(), Error>;

    /// Run the handler once the document has been parsed,
    /// or right away if that has already happened.
    fn on_ready(&self, handler: OnceHandler) -> Result<(), Error>;

    /// Run the handler before the next repaint.
    fn request_animation_frame(&self, handler: OnceHandler) -> Result<(), Error>;

    fn intersection_observer(
        &self,
        options: &ObserverOptions,
        handler: IntersectionHandler<Self>,
    ) -> Result<Self::Observer, Error>;
}

///
/// Everything [install] wired up.
///
pub struct Installed<P: Page> {
    /// Number of in-page anchor links that got a click listener.
    pub anchors: usize,
    pub reveal: P::Observer,
    pub parallax: parallax::ParallaxState,
    pub scrolled: scrolled::FrameGate,
}

///
/// Install all four effects on the page.
///
pub fn install<P: Page>(page: &P, config: &Config) -> Result<Installed<P>, Error> {
    let anchors = anchor::install(page, config)?;
    let reveal = reveal::install(page, config)?;
    let parallax = parallax::install(page, config)?;
    let scrolled = scrolled::install(page, config)?;

    tracing::info!("🚀 Portfolio loaded");

    Ok(Installed {
        anchors,
        reveal,
        parallax,
        scrolled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use server::ServerPage;

    #[test]
    fn install_wires_every_effect() {
        let page = ServerPage::new();
        page.append("a").with_attribute("href", "#about");
        page.append("a").with_attribute("href", "https://example.com");
        page.append("section").with_attribute("id", "about");
        page.append("div").with_class("hero-decoration");

        let installed = install(&page, &Config::default()).unwrap();

        assert_eq!(installed.anchors, 1);
        assert_eq!(page.scroll_listener_count(), 2);
        assert_eq!(page.passive_scroll_listener_count(), 1);
        assert!(!installed.scrolled.is_armed());
    }
}
