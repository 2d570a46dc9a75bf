use wasm_bindgen::prelude::*;

use scrollfx::web::WebPage;
use scrollfx::Config;

fn to_js(err: scrollfx::Error) -> JsValue {
    JsValue::from_str(&format!("{:?}", err))
}

// Called when the wasm module is instantiated
#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    tracing_wasm::set_as_global_default();

    let page = WebPage::new().map_err(to_js)?;
    let installed = scrollfx::install(&page, &Config::default()).map_err(to_js)?;

    tracing::debug!(anchors = installed.anchors, "effects installed");

    page.store_global();

    Ok(())
}
