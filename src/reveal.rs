//!
//! One-shot reveal animations.
//!
//! Matching elements get the reveal class the first time they are reported
//! as intersecting the viewport, and are never observed again after that.
//!

use crate::error::Error;
use crate::{Config, Intersection, Observer, Page};

pub fn install<P: Page>(page: &P, config: &Config) -> Result<P::Observer, Error> {
    let class = config.reveal_class.clone();

    let observer = page.intersection_observer(
        &config.observer_options(),
        Box::new(move |entries: &[Intersection<P::Element>], observer: &P::Observer| {
            handle_intersections::<P>(entries, observer, &class);
        }),
    )?;

    let ready_page = page.clone();
    let ready_observer = observer.clone();
    let selector = config.reveal_selector.clone();

    page.on_ready(Box::new(move || {
        match observe_all(&ready_page, &ready_observer, &selector) {
            Ok(count) => tracing::debug!(count, "observing elements for reveal"),
            Err(err) => tracing::warn!(?err, %selector, "could not observe reveal elements"),
        }
    }))?;

    Ok(observer)
}

/// Start observing every element matching the selector.
pub fn observe_all<P: Page>(
    page: &P,
    observer: &P::Observer,
    selector: &str,
) -> Result<usize, Error> {
    let elements = page.query_selector_all(selector)?;

    for element in &elements {
        observer.observe(element);
    }

    Ok(elements.len())
}

///
/// Reveal every intersecting target and stop observing it.
///
/// Returns the number of elements revealed.
///
pub fn handle_intersections<P: Page>(
    entries: &[Intersection<P::Element>],
    observer: &P::Observer,
    class: &str,
) -> usize {
    let mut revealed = 0;

    for entry in entries.iter().filter(|entry| entry.is_intersecting) {
        if let Err(err) = P::add_class(&entry.target, class) {
            tracing::warn!(?err, "failed to add reveal class");
        }
        observer.unobserve(&entry.target);
        revealed += 1;
    }

    revealed
}
