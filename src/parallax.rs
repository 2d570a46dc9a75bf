//!
//! Parallax for the hero decoration.
//!
//! While the page is scrolled less than one viewport height, the decoration
//! drifts down at a fraction of the scroll speed and fades out.
//!

use std::cell::Cell;
use std::rc::Rc;

use crate::error::Error;
use crate::{Config, Page};

/// Style computed for one scroll position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParallaxFrame {
    /// Vertical translation in pixels.
    pub offset: f64,
    pub opacity: f64,
}

impl ParallaxFrame {
    pub fn transform(&self) -> String {
        format!("translateY({}px)", self.offset)
    }

    pub fn opacity_value(&self) -> String {
        self.opacity.to_string()
    }
}

///
/// Compute the decoration style, or `None` once the hero is scrolled out.
///
pub fn frame(scroll_top: f64, viewport_height: f64, factor: f64) -> Option<ParallaxFrame> {
    if scroll_top < viewport_height {
        Some(ParallaxFrame {
            offset: scroll_top * factor,
            opacity: 1.0 - scroll_top / viewport_height,
        })
    } else {
        None
    }
}

/// Scroll offset last seen by the parallax listener.
#[derive(Clone, Default, Debug)]
pub struct ParallaxState {
    last_scroll_top: Rc<Cell<f64>>,
}

impl ParallaxState {
    pub fn last_scroll_top(&self) -> f64 {
        self.last_scroll_top.get()
    }
}

///
/// Look up the decoration once and follow every scroll event with a passive listener.
///
pub fn install<P: Page>(page: &P, config: &Config) -> Result<ParallaxState, Error> {
    let decoration = page.query_selector(&config.decoration_selector)?;
    if decoration.is_none() {
        tracing::debug!(selector = %config.decoration_selector, "no parallax decoration");
    }

    let state = ParallaxState::default();
    let factor = config.parallax_factor;

    let listener_page = page.clone();
    let listener_state = state.clone();

    page.on_scroll(
        true,
        Box::new(move || {
            let scroll_top = listener_page.scroll_top();

            if let Some(decoration) = &decoration {
                let viewport_height = listener_page.viewport_height();

                if let Some(frame) = frame(scroll_top, viewport_height, factor) {
                    apply::<P>(decoration, &frame);
                }
            }

            listener_state.last_scroll_top.set(scroll_top);
        }),
    )?;

    Ok(state)
}

pub fn apply<P: Page>(decoration: &P::Element, frame: &ParallaxFrame) {
    let result = P::set_style(decoration, "transform", &frame.transform())
        .and_then(|_| P::set_style(decoration, "opacity", &frame.opacity_value()));

    if let Err(err) = result {
        tracing::warn!(?err, "failed to style parallax decoration");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_way_down() {
        let frame = frame(150.0, 800.0, 0.5).unwrap();

        assert_eq!(frame.opacity, 0.8125);
        assert_eq!(frame.transform(), "translateY(75px)");
        assert_eq!(frame.opacity_value(), "0.8125");
    }

    #[test]
    fn top_of_page() {
        let frame = frame(0.0, 800.0, 0.5).unwrap();

        assert_eq!(frame.transform(), "translateY(0px)");
        assert_eq!(frame.opacity_value(), "1");
    }

    #[test]
    fn fractional_offsets_keep_their_digits() {
        let frame = frame(75.0, 600.0, 0.5).unwrap();

        assert_eq!(frame.transform(), "translateY(37.5px)");
        assert_eq!(frame.opacity_value(), "0.875");
    }

    #[test]
    fn nothing_past_one_viewport() {
        assert_eq!(frame(800.0, 800.0, 0.5), None);
        assert_eq!(frame(1200.0, 800.0, 0.5), None);
    }

    #[test]
    fn zero_height_viewport() {
        assert_eq!(frame(0.0, 0.0, 0.5), None);
    }
}
