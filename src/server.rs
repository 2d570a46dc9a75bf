//!
//! An in-memory page.
//!
//! The server page keeps a flat list of elements under `<body>`, each with a
//! vertical layout box. Scrolling, animation frames and intersection
//! observation are driven explicitly, which makes every DOM mutation the
//! effects perform observable and deterministic.
//!

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::Error;
use crate::{
    ClickHandler, Event, Intersection, IntersectionHandler, ObserverOptions, OnceHandler, Page,
    ScrollHandler, ScrollIntoView,
};

pub mod selector;

use selector::SelectorList;

pub type Node = Rc<ServerElement>;

type SharedClickHandler = Rc<RefCell<ClickHandler>>;

pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 800.0;

#[derive(Clone)]
pub struct ServerPage {
    inner: Rc<Inner>,
}

struct Inner {
    body: Node,
    elements: RefCell<Vec<Node>>,
    scroll_top: Cell<f64>,
    viewport_height: Cell<f64>,
    loading: Cell<bool>,
    scroll_listeners: RefCell<Vec<ScrollListener>>,
    ready_queue: RefCell<Vec<OnceHandler>>,
    frame_queue: RefCell<Vec<OnceHandler>>,
    observers: RefCell<Vec<Rc<ObserverState>>>,
}

struct ScrollListener {
    passive: bool,
    handler: Rc<RefCell<ScrollHandler>>,
}

impl ServerPage {
    /// A loaded page with the default viewport height.
    pub fn new() -> Self {
        let page = Self::loading();
        page.inner.loading.set(false);
        page
    }

    /// A page that is still being parsed, see [ServerPage::finish_loading].
    pub fn loading() -> Self {
        Self {
            inner: Rc::new(Inner {
                body: ServerElement::create("body"),
                elements: RefCell::new(vec![]),
                scroll_top: Cell::new(0.0),
                viewport_height: Cell::new(DEFAULT_VIEWPORT_HEIGHT),
                loading: Cell::new(true),
                scroll_listeners: RefCell::new(vec![]),
                ready_queue: RefCell::new(vec![]),
                frame_queue: RefCell::new(vec![]),
                observers: RefCell::new(vec![]),
            }),
        }
    }

    pub fn with_viewport_height(self, height: f64) -> Self {
        self.inner.viewport_height.set(height);
        self
    }

    pub fn body_element(&self) -> &Node {
        &self.inner.body
    }

    /// Append a new element at the end of `<body>`.
    pub fn append(&self, tag_name: &str) -> Node {
        let element = ServerElement::create(tag_name);
        self.inner.elements.borrow_mut().push(element.clone());
        element
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.get()
    }

    /// Mark the document as parsed and run the pending ready handlers.
    pub fn finish_loading(&self) {
        self.inner.loading.set(false);

        let handlers = std::mem::take(&mut *self.inner.ready_queue.borrow_mut());
        for handler in handlers {
            handler();
        }
    }

    /// Move the viewport and dispatch a scroll event.
    pub fn scroll_to(&self, scroll_top: f64) {
        self.inner.scroll_top.set(scroll_top);

        let handlers: Vec<_> = self
            .inner
            .scroll_listeners
            .borrow()
            .iter()
            .map(|listener| listener.handler.clone())
            .collect();

        for handler in handlers {
            (*handler.borrow_mut())();
        }
    }

    /// Dispatch a click on the element and return the event for inspection.
    pub fn click(&self, element: &Node) -> ServerEvent {
        let event = ServerEvent::default();

        let handlers: Vec<_> = element.click_listeners.borrow().clone();
        for handler in handlers {
            (*handler.borrow_mut())(&event as &dyn Event);
        }

        event
    }

    ///
    /// Run one rendering step: the queued animation frame callbacks,
    /// then intersection delivery for every observer.
    ///
    /// Returns the number of animation frame callbacks run.
    ///
    pub fn run_frame(&self) -> usize {
        let callbacks = std::mem::take(&mut *self.inner.frame_queue.borrow_mut());
        let count = callbacks.len();

        for callback in callbacks {
            callback();
        }

        let observers = self.inner.observers.borrow().clone();
        for state in observers {
            state.deliver(self.root_box());
        }

        count
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.frame_queue.borrow().len()
    }

    pub fn scroll_listener_count(&self) -> usize {
        self.inner.scroll_listeners.borrow().len()
    }

    pub fn passive_scroll_listener_count(&self) -> usize {
        self.inner
            .scroll_listeners
            .borrow()
            .iter()
            .filter(|listener| listener.passive)
            .count()
    }

    /// The viewport in document coordinates.
    fn root_box(&self) -> (f64, f64) {
        let top = self.inner.scroll_top.get();
        (top, top + self.inner.viewport_height.get())
    }

    fn all_elements(&self) -> Vec<Node> {
        let mut all = vec![self.inner.body.clone()];
        all.extend(self.inner.elements.borrow().iter().cloned());
        all
    }
}

impl Default for ServerPage {
    fn default() -> Self {
        Self::new()
    }
}

impl Page for ServerPage {
    type Element = Node;
    type Observer = ServerObserver;

    fn query_selector(&self, selector: &str) -> Result<Option<Node>, Error> {
        let selector = SelectorList::parse(selector)?;

        Ok(self
            .all_elements()
            .into_iter()
            .find(|element| selector.matches(element)))
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, Error> {
        let selector = SelectorList::parse(selector)?;

        Ok(self
            .all_elements()
            .into_iter()
            .filter(|element| selector.matches(element))
            .collect())
    }

    fn body(&self) -> Result<Node, Error> {
        Ok(self.inner.body.clone())
    }

    fn attribute(element: &Node, name: &str) -> Option<String> {
        element.attribute(name)
    }

    fn add_class(element: &Node, class: &str) -> Result<(), Error> {
        element.add_class(class);
        Ok(())
    }

    fn toggle_class(element: &Node, class: &str, force: bool) -> Result<bool, Error> {
        if force {
            element.add_class(class);
        } else {
            element.classes.borrow_mut().retain(|existing| existing != class);
        }
        Ok(force)
    }

    fn set_style(element: &Node, property: &str, value: &str) -> Result<(), Error> {
        element
            .style
            .borrow_mut()
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn scroll_into_view(element: &Node, options: ScrollIntoView) {
        element.scroll_requests.borrow_mut().push(options);
    }

    fn scroll_top(&self) -> f64 {
        self.inner.scroll_top.get()
    }

    fn viewport_height(&self) -> f64 {
        self.inner.viewport_height.get()
    }

    fn on_click(&self, element: &Node, handler: ClickHandler) -> Result<(), Error> {
        element
            .click_listeners
            .borrow_mut()
            .push(Rc::new(RefCell::new(handler)));
        Ok(())
    }

    fn on_scroll(&self, passive: bool, handler: ScrollHandler) -> Result<(), Error> {
        self.inner.scroll_listeners.borrow_mut().push(ScrollListener {
            passive,
            handler: Rc::new(RefCell::new(handler)),
        });
        Ok(())
    }

    fn on_ready(&self, handler: OnceHandler) -> Result<(), Error> {
        if self.is_loading() {
            self.inner.ready_queue.borrow_mut().push(handler);
        } else {
            handler();
        }
        Ok(())
    }

    fn request_animation_frame(&self, handler: OnceHandler) -> Result<(), Error> {
        self.inner.frame_queue.borrow_mut().push(handler);
        Ok(())
    }

    fn intersection_observer(
        &self,
        options: &ObserverOptions,
        handler: IntersectionHandler<Self>,
    ) -> Result<ServerObserver, Error> {
        let state = Rc::new(ObserverState {
            margin: RootMargin::parse(&options.root_margin)?,
            threshold: options.threshold,
            handler: RefCell::new(handler),
            targets: RefCell::new(vec![]),
        });

        self.inner.observers.borrow_mut().push(state.clone());

        Ok(ServerObserver { state })
    }
}

pub struct ServerElement {
    tag_name: String,
    attributes: RefCell<BTreeMap<String, String>>,
    classes: RefCell<Vec<String>>,
    style: RefCell<BTreeMap<String, String>>,
    layout: Cell<(f64, f64)>,
    scroll_requests: RefCell<Vec<ScrollIntoView>>,
    click_listeners: RefCell<Vec<SharedClickHandler>>,
}

impl ServerElement {
    fn create(tag_name: &str) -> Node {
        Rc::new(ServerElement {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: RefCell::new(BTreeMap::new()),
            classes: RefCell::new(vec![]),
            style: RefCell::new(BTreeMap::new()),
            layout: Cell::new((0.0, 0.0)),
            scroll_requests: RefCell::new(vec![]),
            click_listeners: RefCell::new(vec![]),
        })
    }

    pub fn is(&self, other: &ServerElement) -> bool {
        self as *const _ == other as *const _
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn with_attribute(self: &Rc<Self>, name: &str, value: &str) -> Node {
        if name == "class" {
            *self.classes.borrow_mut() = value.split_whitespace().map(str::to_string).collect();
        } else {
            self.attributes
                .borrow_mut()
                .insert(name.to_ascii_lowercase(), value.to_string());
        }
        self.clone()
    }

    pub fn with_class(self: &Rc<Self>, class: &str) -> Node {
        self.add_class(class);
        self.clone()
    }

    /// Place the element `height` pixels tall, `top` pixels from the top of the document.
    pub fn with_layout(self: &Rc<Self>, top: f64, height: f64) -> Node {
        self.layout.set((top, height));
        self.clone()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        if name == "class" {
            let classes = self.classes.borrow();
            if classes.is_empty() {
                None
            } else {
                Some(classes.join(" "))
            }
        } else {
            self.attributes.borrow().get(name).cloned()
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.borrow().iter().any(|existing| existing == class)
    }

    pub fn classes(&self) -> Vec<String> {
        self.classes.borrow().clone()
    }

    pub fn style(&self, property: &str) -> Option<String> {
        self.style.borrow().get(property).cloned()
    }

    pub fn scroll_requests(&self) -> Vec<ScrollIntoView> {
        self.scroll_requests.borrow().clone()
    }

    fn add_class(&self, class: &str) {
        if !self.has_class(class) {
            self.classes.borrow_mut().push(class.to_string());
        }
    }
}

impl std::fmt::Debug for ServerElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerElement")
            .field("tag_name", &self.tag_name)
            .field("attributes", &self.attributes.borrow())
            .field("classes", &self.classes.borrow())
            .finish()
    }
}

#[derive(Default)]
pub struct ServerEvent {
    default_prevented: Cell<bool>,
}

impl ServerEvent {
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

impl Event for ServerEvent {
    fn prevent_default(&self) {
        self.default_prevented.set(true);
    }
}

///
/// Root margin in pixels, in CSS shorthand order.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootMargin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl RootMargin {
    pub fn parse(margin: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidRootMargin(margin.to_string());

        let values = margin
            .split_whitespace()
            .map(|value| {
                let number = match value.strip_suffix("px") {
                    Some(number) => number,
                    None if value == "0" => value,
                    None => return Err(invalid()),
                };
                number.parse::<f64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (top, right, bottom, left) = match values.as_slice() {
            [] => (0.0, 0.0, 0.0, 0.0),
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => return Err(invalid()),
        };

        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

struct ObserverState {
    margin: RootMargin,
    threshold: f64,
    handler: RefCell<IntersectionHandler<ServerPage>>,
    targets: RefCell<Vec<Target>>,
}

struct Target {
    element: Node,
    /// Threshold index and intersecting flag of the last report.
    /// `None` until the first report after `observe`.
    previous: Option<(usize, bool)>,
}

impl ObserverState {
    ///
    /// Queue a report for every target whose threshold index or intersecting
    /// state changed, then hand them to the callback in one batch.
    ///
    /// Layout is vertical only; every element spans the full viewport width.
    ///
    fn deliver(self: &Rc<Self>, (viewport_top, viewport_bottom): (f64, f64)) {
        let root_top = viewport_top - self.margin.top;
        let root_bottom = viewport_bottom + self.margin.bottom;

        let mut entries = vec![];

        for target in self.targets.borrow_mut().iter_mut() {
            let (top, height) = target.element.layout.get();
            let bottom = top + height;

            let overlap = bottom.min(root_bottom) - top.max(root_top);
            let is_intersecting = overlap >= 0.0 && root_bottom > root_top;
            let ratio = match (is_intersecting, height > 0.0) {
                (false, _) => 0.0,
                (true, true) => (overlap / height).min(1.0),
                (true, false) => 1.0,
            };
            let threshold_index = if is_intersecting && ratio >= self.threshold {
                1
            } else {
                0
            };

            if target.previous != Some((threshold_index, is_intersecting)) {
                target.previous = Some((threshold_index, is_intersecting));
                entries.push(Intersection {
                    target: target.element.clone(),
                    is_intersecting,
                    ratio,
                });
            }
        }

        if !entries.is_empty() {
            let observer = ServerObserver { state: self.clone() };
            (*self.handler.borrow_mut())(entries.as_slice(), &observer);
        }
    }
}

#[derive(Clone)]
pub struct ServerObserver {
    state: Rc<ObserverState>,
}

impl ServerObserver {
    pub fn is_observing(&self, element: &Node) -> bool {
        self.state
            .targets
            .borrow()
            .iter()
            .any(|target| target.element.is(element))
    }

    pub fn observed_count(&self) -> usize {
        self.state.targets.borrow().len()
    }
}

impl crate::Observer<ServerPage> for ServerObserver {
    fn observe(&self, element: &Node) {
        if !self.is_observing(element) {
            self.state.targets.borrow_mut().push(Target {
                element: element.clone(),
                previous: None,
            });
        }
    }

    fn unobserve(&self, element: &Node) {
        self.state
            .targets
            .borrow_mut()
            .retain(|target| !target.element.is(element));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Observer;

    #[test]
    fn root_margin_shorthand() {
        assert_eq!(
            RootMargin::parse("0px 0px -50px 0px").unwrap(),
            RootMargin {
                top: 0.0,
                right: 0.0,
                bottom: -50.0,
                left: 0.0
            }
        );
        assert_eq!(RootMargin::parse("10px").unwrap().left, 10.0);
        assert_eq!(RootMargin::parse("0 5px").unwrap().right, 5.0);
        assert!(matches!(
            RootMargin::parse("10%"),
            Err(Error::InvalidRootMargin(_))
        ));
    }

    #[test]
    fn query_in_document_order() {
        let page = ServerPage::new();
        let first = page.append("div").with_class("card");
        page.append("p");
        let second = page.append("div").with_attribute("class", "card wide");

        let cards = page.query_selector_all(".card").unwrap();

        assert_eq!(cards.len(), 2);
        assert!(cards[0].is(&first));
        assert!(cards[1].is(&second));
        assert!(page
            .query_selector("body")
            .unwrap()
            .unwrap()
            .is(page.body_element()));
    }

    #[test]
    fn toggle_class_with_force() {
        let page = ServerPage::new();
        let body = page.body().unwrap();

        assert!(ServerPage::toggle_class(&body, "scrolled", true).unwrap());
        assert!(ServerPage::toggle_class(&body, "scrolled", true).unwrap());
        assert_eq!(body.classes(), vec!["scrolled"]);

        assert!(!ServerPage::toggle_class(&body, "scrolled", false).unwrap());
        assert!(body.classes().is_empty());
    }

    #[test]
    fn ready_handlers_wait_for_loading() {
        let page = ServerPage::loading();
        let ran = Rc::new(Cell::new(false));

        {
            let ran = ran.clone();
            page.on_ready(Box::new(move || ran.set(true))).unwrap();
        }
        assert!(!ran.get());

        page.finish_loading();
        assert!(ran.get());
    }

    #[test]
    fn frames_run_in_order_and_once() {
        let page = ServerPage::new();
        let log = Rc::new(RefCell::new(vec![]));

        for n in 0..3 {
            let log = log.clone();
            page.request_animation_frame(Box::new(move || log.borrow_mut().push(n)))
                .unwrap();
        }

        assert_eq!(page.pending_frames(), 3);
        assert_eq!(page.run_frame(), 3);
        assert_eq!(page.run_frame(), 0);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn observer_reports_crossings() {
        let page = ServerPage::new();
        let card = page.append("div").with_layout(1000.0, 200.0);
        let reports = Rc::new(RefCell::new(vec![]));

        let observer = {
            let reports = reports.clone();
            page.intersection_observer(
                &ObserverOptions {
                    threshold: 0.5,
                    root_margin: "0px".into(),
                },
                Box::new(move |entries: &[Intersection<Node>], _: &ServerObserver| {
                    for entry in entries {
                        reports.borrow_mut().push((entry.is_intersecting, entry.ratio));
                    }
                }),
            )
            .unwrap()
        };
        observer.observe(&card);

        // Initial report, even when out of view
        page.run_frame();
        assert_eq!(*reports.borrow(), vec![(false, 0.0)]);

        // No change, no report
        page.run_frame();
        assert_eq!(reports.borrow().len(), 1);

        // Partly visible: 50 of 200 pixels
        page.scroll_to(250.0);
        page.run_frame();
        assert_eq!(reports.borrow()[1], (true, 0.25));

        // Crossing the threshold
        page.scroll_to(400.0);
        page.run_frame();
        assert_eq!(reports.borrow()[2], (true, 1.0));

        observer.unobserve(&card);
        page.scroll_to(0.0);
        page.run_frame();
        assert_eq!(reports.borrow().len(), 3);
    }

    #[test]
    fn negative_bottom_margin_shrinks_the_viewport() {
        let page = ServerPage::new();
        let card = page.append("div").with_layout(780.0, 100.0);
        let reports = Rc::new(RefCell::new(vec![]));

        let observer = {
            let reports = reports.clone();
            page.intersection_observer(
                &ObserverOptions {
                    threshold: 0.1,
                    root_margin: "0px 0px -50px 0px".into(),
                },
                Box::new(move |entries: &[Intersection<Node>], _: &ServerObserver| {
                    reports
                        .borrow_mut()
                        .extend(entries.iter().map(|entry| entry.is_intersecting));
                }),
            )
            .unwrap()
        };
        observer.observe(&card);
        page.run_frame();

        assert_eq!(*reports.borrow(), vec![false]);
    }
}
