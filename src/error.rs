#[derive(Debug)]
pub enum Error {
    NoWindow,
    NoDocument,
    NoBody,
    NotAnHtmlElement,
    InvalidSelector(String),
    InvalidRootMargin(String),
    Listener,
    JsError,
}
