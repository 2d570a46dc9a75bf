//!
//! Smooth scrolling for in-page anchor links.
//!

use crate::error::Error;
use crate::{Config, Event, Page, ScrollBehavior, ScrollBlock, ScrollIntoView};

pub const SMOOTH_TO_START: ScrollIntoView = ScrollIntoView {
    behavior: ScrollBehavior::Smooth,
    block: ScrollBlock::Start,
};

///
/// Add a click listener to every anchor matching `config.anchor_selector`.
///
/// Returns the number of anchors wired.
///
pub fn install<P: Page>(page: &P, config: &Config) -> Result<usize, Error> {
    let anchors = page.query_selector_all(&config.anchor_selector)?;

    for anchor in &anchors {
        let handler_page = page.clone();
        let handler_anchor = anchor.clone();

        page.on_click(
            anchor,
            Box::new(move |event: &dyn Event| {
                handle_click(&handler_page, &handler_anchor, event);
            }),
        )?;
    }

    tracing::debug!(count = anchors.len(), "wired anchor links");

    Ok(anchors.len())
}

///
/// Cancel the navigation and scroll the anchor's target into view.
///
/// The `href` is read at click time and used as a selector.
/// Returns the target, if there was one to scroll to.
///
pub fn handle_click<P: Page>(
    page: &P,
    anchor: &P::Element,
    event: &dyn Event,
) -> Option<P::Element> {
    event.prevent_default();

    let href = P::attribute(anchor, "href")?;

    match page.query_selector(&href) {
        Ok(Some(target)) => {
            P::scroll_into_view(&target, SMOOTH_TO_START);
            Some(target)
        }
        Ok(None) => {
            tracing::debug!(%href, "anchor target not found");
            None
        }
        Err(err) => {
            // A bare "#" is not a valid selector
            tracing::debug!(%href, ?err, "anchor href does not select anything");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{ServerEvent, ServerPage};

    #[test]
    fn click_without_href_only_prevents_default() {
        let page = ServerPage::new();
        let anchor = page.append("a");
        let event = ServerEvent::default();

        assert!(handle_click(&page, &anchor, &event).is_none());
        assert!(event.default_prevented());
    }

    #[test]
    fn bare_hash_is_a_no_op() {
        let page = ServerPage::new();
        let anchor = page.append("a").with_attribute("href", "#");
        let event = ServerEvent::default();

        assert!(handle_click(&page, &anchor, &event).is_none());
        assert!(event.default_prevented());
    }

    #[test]
    fn scrolls_to_start_smoothly() {
        let page = ServerPage::new();
        let anchor = page.append("a").with_attribute("href", "#contact");
        let contact = page.append("section").with_attribute("id", "contact");
        let event = ServerEvent::default();

        let target = handle_click(&page, &anchor, &event).unwrap();

        assert!(target.is(&contact));
        assert_eq!(contact.scroll_requests(), vec![SMOOTH_TO_START]);
    }
}
