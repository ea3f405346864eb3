#![cfg(target_arch = "wasm32")]

use cambium_dom::{web::WebDocument, Handler, Node, Reconciler};
use std::{cell::Cell, rc::Rc};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::HtmlElement;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn click() {
	tracing_wasm::set_as_global_default();

	let document = WebDocument::from_window().unwrap();
	let body = document.body().unwrap();
	let mut reconciler = Reconciler::new(document, body);

	let click_count = Rc::new(Cell::new(0));
	let button = || {
		let click_count = Rc::clone(&click_count);
		Node::<WebDocument>::new("button").id("test-button").on(
			"onclick",
			Handler::new("count", move |event: web_sys::Event| {
				assert_eq!(event.type_(), "click");
				click_count.set(click_count.get() + 1);
			}),
		)
	};

	assert_eq!(click_count.get(), 0);
	reconciler.render(vec![button()]);
	assert_eq!(click_count.get(), 0);

	let element: HtmlElement = reconciler.document().inner().get_element_by_id("test-button").unwrap().dyn_into().unwrap();
	element.click();
	assert_eq!(click_count.get(), 1);

	reconciler.render(vec![button()]);
	element.click();
	assert_eq!(click_count.get(), 2);

	reconciler.render(Vec::new());
	assert!(reconciler.document().inner().get_element_by_id("test-button").is_none());
}
