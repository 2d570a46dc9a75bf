//!
//! Body class toggled once the page is scrolled past a threshold.
//!
//! Scroll events are coalesced so the class is updated at most once per
//! animation frame.
//!

use std::cell::Cell;
use std::rc::Rc;

use crate::error::Error;
use crate::{Config, Page};

///
/// Keeps at most one animation frame request outstanding.
///
#[derive(Clone, Default, Debug)]
pub struct FrameGate {
    armed: Rc<Cell<bool>>,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the gate. Returns false if a frame was already pending.
    pub fn try_arm(&self) -> bool {
        !self.armed.replace(true)
    }

    pub fn release(&self) {
        self.armed.set(false);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }
}

pub fn is_scrolled(scroll_top: f64, offset: f64) -> bool {
    scroll_top > offset
}

pub fn install<P: Page>(page: &P, config: &Config) -> Result<FrameGate, Error> {
    let gate = FrameGate::new();

    let listener_page = page.clone();
    let listener_gate = gate.clone();
    let class = config.scrolled_class.clone();
    let offset = config.scrolled_offset;

    page.on_scroll(
        false,
        Box::new(move || {
            if !listener_gate.try_arm() {
                return;
            }

            let frame_page = listener_page.clone();
            let frame_gate = listener_gate.clone();
            let class = class.clone();

            let requested = listener_page.request_animation_frame(Box::new(move || {
                update_body_class(&frame_page, &class, offset);
                frame_gate.release();
            }));

            if let Err(err) = requested {
                tracing::warn!(?err, "failed to request animation frame");
                listener_gate.release();
            }
        }),
    )?;

    Ok(gate)
}

/// Set or clear the class on `<body>` from the current scroll offset.
pub fn update_body_class<P: Page>(page: &P, class: &str, offset: f64) {
    let scrolled = is_scrolled(page.scroll_top(), offset);

    let result = page
        .body()
        .and_then(|body| P::toggle_class(&body, class, scrolled));

    if let Err(err) = result {
        tracing::warn!(?err, "failed to toggle body class");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_arms_once() {
        let gate = FrameGate::new();

        assert!(gate.try_arm());
        assert!(!gate.try_arm());
        assert!(gate.clone().is_armed());

        gate.release();
        assert!(!gate.is_armed());
        assert!(gate.try_arm());
    }

    #[test]
    fn threshold_is_exclusive() {
        assert!(!is_scrolled(99.0, 100.0));
        assert!(!is_scrolled(100.0, 100.0));
        assert!(is_scrolled(100.5, 100.0));
    }
}
