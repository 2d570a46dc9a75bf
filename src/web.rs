use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::Error;
use crate::{
    ClickHandler, Intersection, IntersectionHandler, ObserverOptions, OnceHandler, Page,
    ScrollBehavior, ScrollBlock, ScrollHandler, ScrollIntoView,
};

///
/// The page the wasm module runs in.
///
/// Closures handed to the browser are retained here, so the page
/// must outlive the listeners; see [WebPage::store_global].
///
#[wasm_bindgen]
#[derive(Clone)]
pub struct WebPage {
    window: web_sys::Window,
    document: web_sys::Document,
    retained: Rc<RefCell<Vec<Box<dyn Any>>>>,
}

impl Drop for WebPage {
    fn drop(&mut self) {
        if Rc::strong_count(&self.retained) == 1 {
            tracing::warn!("WebPage dropped, listeners released!");
        }
    }
}

#[wasm_bindgen(inline_js = "export function store_global_page(page) { window.scrollfx = page; }")]
extern "C" {
    fn store_global_page(page: JsValue);
}

impl WebPage {
    pub fn new() -> Result<Self, Error> {
        let window = web_sys::window().ok_or(Error::NoWindow)?;
        let document = window.document().ok_or(Error::NoDocument)?;

        Ok(Self {
            window,
            document,
            retained: Rc::new(RefCell::new(vec![])),
        })
    }

    /// Hand the page to JavaScript, keeping its listeners alive for good.
    pub fn store_global(self) {
        let js_value: JsValue = self.into();

        store_global_page(js_value);
    }

    pub fn document(&self) -> &web_sys::Document {
        &self.document
    }

    fn retain<T: 'static>(&self, value: T) {
        self.retained.borrow_mut().push(Box::new(value));
    }
}

#[derive(Clone)]
pub struct WebObserver(web_sys::IntersectionObserver);

impl crate::Observer<WebPage> for WebObserver {
    fn observe(&self, element: &web_sys::Element) {
        self.0.observe(element);
    }

    fn unobserve(&self, element: &web_sys::Element) {
        self.0.unobserve(element);
    }
}

impl crate::Event for web_sys::Event {
    fn prevent_default(&self) {
        web_sys::Event::prevent_default(self);
    }
}

impl Page for WebPage {
    type Element = web_sys::Element;
    type Observer = WebObserver;

    fn query_selector(&self, selector: &str) -> Result<Option<web_sys::Element>, Error> {
        Ok(self.document.query_selector(selector)?)
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<web_sys::Element>, Error> {
        let node_list = self.document.query_selector_all(selector)?;

        Ok((0..node_list.length())
            .filter_map(|index| node_list.get(index))
            .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
            .collect())
    }

    fn body(&self) -> Result<web_sys::Element, Error> {
        match self.document.body() {
            Some(body) => Ok(body.into()),
            None => Err(Error::NoBody),
        }
    }

    fn attribute(element: &web_sys::Element, name: &str) -> Option<String> {
        element.get_attribute(name)
    }

    fn add_class(element: &web_sys::Element, class: &str) -> Result<(), Error> {
        element.class_list().add_1(class)?;
        Ok(())
    }

    fn toggle_class(element: &web_sys::Element, class: &str, force: bool) -> Result<bool, Error> {
        Ok(element.class_list().toggle_with_force(class, force)?)
    }

    fn set_style(element: &web_sys::Element, property: &str, value: &str) -> Result<(), Error> {
        element
            .dyn_ref::<web_sys::HtmlElement>()
            .ok_or(Error::NotAnHtmlElement)?
            .style()
            .set_property(property, value)?;

        Ok(())
    }

    fn scroll_into_view(element: &web_sys::Element, options: ScrollIntoView) {
        let web_options = web_sys::ScrollIntoViewOptions::new();
        web_options.set_behavior(match options.behavior {
            ScrollBehavior::Auto => web_sys::ScrollBehavior::Auto,
            ScrollBehavior::Smooth => web_sys::ScrollBehavior::Smooth,
        });
        web_options.set_block(match options.block {
            ScrollBlock::Start => web_sys::ScrollLogicalPosition::Start,
            ScrollBlock::Center => web_sys::ScrollLogicalPosition::Center,
            ScrollBlock::End => web_sys::ScrollLogicalPosition::End,
            ScrollBlock::Nearest => web_sys::ScrollLogicalPosition::Nearest,
        });

        element.scroll_into_view_with_scroll_into_view_options(&web_options);
    }

    fn scroll_top(&self) -> f64 {
        match self.window.page_y_offset() {
            Ok(offset) if offset != 0.0 => offset,
            _ => self
                .document
                .document_element()
                .map(|root| root.scroll_top() as f64)
                .unwrap_or(0.0),
        }
    }

    fn viewport_height(&self) -> f64 {
        self.window
            .inner_height()
            .ok()
            .and_then(|height| height.as_f64())
            .unwrap_or(0.0)
    }

    fn on_click(&self, element: &web_sys::Element, handler: ClickHandler) -> Result<(), Error> {
        let mut handler = handler;
        let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
            handler(&event as &dyn crate::Event);
        }) as Box<dyn FnMut(web_sys::Event)>);

        element
            .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
            .map_err(|_| Error::Listener)?;
        self.retain(closure);

        Ok(())
    }

    fn on_scroll(&self, passive: bool, handler: ScrollHandler) -> Result<(), Error> {
        let closure = Closure::wrap(handler);

        let options = web_sys::AddEventListenerOptions::new();
        options.set_passive(passive);

        self.window
            .add_event_listener_with_callback_and_add_event_listener_options(
                "scroll",
                closure.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(|_| Error::Listener)?;
        self.retain(closure);

        Ok(())
    }

    fn on_ready(&self, handler: OnceHandler) -> Result<(), Error> {
        if self.document.ready_state() != "loading" {
            handler();
            return Ok(());
        }

        let callback = Closure::once_into_js(move || handler());

        self.document
            .add_event_listener_with_callback("DOMContentLoaded", callback.unchecked_ref())
            .map_err(|_| Error::Listener)?;

        Ok(())
    }

    fn request_animation_frame(&self, handler: OnceHandler) -> Result<(), Error> {
        let callback = Closure::once_into_js(move || handler());

        self.window
            .request_animation_frame(callback.unchecked_ref())?;

        Ok(())
    }

    fn intersection_observer(
        &self,
        options: &ObserverOptions,
        handler: IntersectionHandler<Self>,
    ) -> Result<WebObserver, Error> {
        let mut handler = handler;
        let closure = Closure::wrap(Box::new(
            move |entries: js_sys::Array, observer: web_sys::IntersectionObserver| {
                let entries: Vec<_> = entries
                    .iter()
                    .filter_map(|entry| entry.dyn_into::<web_sys::IntersectionObserverEntry>().ok())
                    .map(|entry| Intersection {
                        target: entry.target(),
                        is_intersecting: entry.is_intersecting(),
                        ratio: entry.intersection_ratio(),
                    })
                    .collect();

                handler(entries.as_slice(), &WebObserver(observer));
            },
        )
            as Box<dyn FnMut(js_sys::Array, web_sys::IntersectionObserver)>);

        let init = web_sys::IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(options.threshold));
        init.set_root_margin(&options.root_margin);

        let observer = web_sys::IntersectionObserver::new_with_options(
            closure.as_ref().unchecked_ref(),
            &init,
        )?;
        self.retain(closure);

        Ok(WebObserver(observer))
    }
}

impl From<wasm_bindgen::JsValue> for Error {
    fn from(_js_error: wasm_bindgen::JsValue) -> Self {
        Error::JsError
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use crate::{anchor, parallax, Config};

    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn append(page: &WebPage, tag_name: &str) -> web_sys::Element {
        let element = page.document().create_element(tag_name).unwrap();
        page.body().unwrap().append_child(&element).unwrap();
        element
    }

    #[wasm_bindgen_test]
    fn toggle_body_class() {
        let page = WebPage::new().unwrap();
        let body = page.body().unwrap();

        assert!(WebPage::toggle_class(&body, "scrolled", true).unwrap());
        assert!(body.class_list().contains("scrolled"));

        assert!(!WebPage::toggle_class(&body, "scrolled", false).unwrap());
        assert!(!body.class_list().contains("scrolled"));
    }

    #[wasm_bindgen_test]
    fn style_decoration() {
        let page = WebPage::new().unwrap();
        let decoration = append(&page, "div");
        let frame = parallax::frame(150.0, 800.0, 0.5).unwrap();

        parallax::apply::<WebPage>(&decoration, &frame);

        let style = decoration
            .dyn_ref::<web_sys::HtmlElement>()
            .unwrap()
            .style();
        assert_eq!(style.get_property_value("opacity").unwrap(), "0.8125");
        assert_eq!(
            style.get_property_value("transform").unwrap(),
            "translateY(75px)"
        );
    }

    #[wasm_bindgen_test]
    fn wire_anchors_and_find_targets() {
        let page = WebPage::new().unwrap();
        let anchor_element = append(&page, "a");
        anchor_element.set_attribute("href", "#web-target").unwrap();
        append(&page, "section").set_id("web-target");

        assert!(anchor::install(&page, &Config::default()).unwrap() >= 1);

        let event = web_sys::Event::new("click").unwrap();
        let target = anchor::handle_click(&page, &anchor_element, &event).unwrap();
        assert_eq!(target.id(), "web-target");
    }

    #[wasm_bindgen_test]
    fn bare_hash_selects_nothing() {
        let page = WebPage::new().unwrap();

        assert!(page.query_selector("#").is_err());
    }
}
