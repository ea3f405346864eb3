#![cfg(target_arch = "wasm32")]

use cambium_dom::{web::WebDocument, Node, Reconciler};
use std::sync::Once;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

type N = Node<WebDocument>;

static LOG_INIT: Once = Once::new();

/// A fresh `<div>` in the page's body, so that tests don't see each other's nodes.
fn mount() -> (Reconciler<WebDocument>, web_sys::Element) {
	LOG_INIT.call_once(tracing_wasm::set_as_global_default);

	let document = WebDocument::from_window().unwrap();
	let container = document.inner().create_element("div").unwrap();
	document.body().unwrap().append_child(&container).unwrap();
	let reconciler = Reconciler::new(document, container.clone().into());
	(reconciler, container)
}

fn li(id: &str) -> N {
	N::new("li").id(id).text(id)
}

#[wasm_bindgen_test]
fn create() {
	let (mut reconciler, container) = mount();
	reconciler.render(vec![N::new("p").id("greeting").class("a").style("color", "red").text("Hello cambium-dom!")]);
	assert_eq!(
		container.inner_html(),
		r#"<p id="greeting" class="a" style="color: red;">Hello cambium-dom!</p>"#
	);
}

#[wasm_bindgen_test]
fn reorder_keeps_elements() {
	let (mut reconciler, container) = mount();
	reconciler.render(vec![li("web-a"), li("web-b"), li("web-c")]);
	let document = reconciler.document().inner().clone();
	let a = document.get_element_by_id("web-a").unwrap();

	reconciler.render(vec![li("web-c"), li("web-a"), li("web-b")]);
	assert!(document.get_element_by_id("web-a").unwrap().is_same_node(Some(a.as_ref())));
	assert_eq!(
		container.inner_html(),
		r#"<li id="web-c">web-c</li><li id="web-a">web-a</li><li id="web-b">web-b</li>"#
	);
}

#[wasm_bindgen_test]
fn identical_remove() {
	let (mut reconciler, container) = mount();
	reconciler.render(vec![N::new("ul").children(vec![li("web-x"), li("web-y")])]);
	let html = container.inner_html();

	reconciler.render(vec![N::new("ul").children(vec![li("web-x"), li("web-y")])]);
	assert_eq!(container.inner_html(), html);

	reconciler.render(Vec::new());
	assert_eq!(container.inner_html(), "");
}
