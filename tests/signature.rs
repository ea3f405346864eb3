use cambium_dom::{memory::MemoryDocument, Handler, Key, Node};

type N = Node<MemoryDocument>;

#[test]
fn canonical_form() {
	let node = N::new("a")
		.style("color", "red")
		.id("i")
		.class("b")
		.class("a")
		.attr("href", "/x")
		.on("onclick", Handler::new("go", |_| ()))
		.text("t");
	assert_eq!(
		node.canonical(),
		r#"<a href="/x" className="a b" id="i" style="color=\"red\"" onclick={go}>t</a>"#
	);
}

#[test]
fn order_of_declaration_is_irrelevant() {
	let a = N::new("div").attr("x", "1").attr("y", "2").class("p").class("q");
	let b = N::new("div").class("q").attr("y", "2").class("p").attr("x", "1");
	assert_eq!(a.signature(), b.signature());
	assert_eq!(a.key(), b.key());
}

#[test]
fn children_are_excluded() {
	let parent = N::new("ul").child(N::new("li").text("1"));
	assert_eq!(parent.signature(), N::new("ul").signature());
}

#[test]
fn every_field_counts() {
	let base = N::new("p").text("x");
	let variants = vec![
		N::new("div").text("x"),
		N::new("p").text("y"),
		N::new("p").text("x").attr("title", "t"),
		N::new("p").text("x").class("c"),
		N::new("p").text("x").id("i"),
		N::new("p").text("x").style("color", "red"),
		N::new("p").text("x").on("onclick", Handler::new("f", |_| ())),
		N::new("p"),
	];
	for variant in variants {
		assert_ne!(base.signature(), variant.signature(), "{}", variant.canonical());
	}
}

#[test]
fn special_characters_are_escaped() {
	let attribute = N::new("p").attr("title", r#"a" id="b"#);
	let id = N::new("p").id("b").attr("title", "a");
	assert_ne!(attribute.canonical(), id.canonical());
	assert_eq!(N::new("p").text("{<x>}").canonical(), r"<p>\{\<x>\}</p>");
}

#[test]
fn handlers_are_identified_by_source() {
	let a = N::new("button").on("onclick", Handler::new("count", |_| ()));
	let b = N::new("button").on("onclick", Handler::new("count", |_| println!("different")));
	let c = N::new("button").on("onclick", Handler::new("other", |_| ()));
	assert_eq!(a.signature(), b.signature());
	assert_ne!(a.signature(), c.signature());
}

#[test]
fn keys() {
	assert_eq!(N::new("li").id("a").text("1").key(), Key::Id("a".to_owned()));
	assert_eq!(N::new("li").id("a").text("1").key(), N::new("li").id("a").text("2").key());

	let unkeyed = N::new("li").text("1");
	assert_eq!(unkeyed.key(), Key::Signature(unkeyed.signature()));
}

#[test]
fn clones_are_unbound() {
	let document = MemoryDocument::new();
	let body = document.body();
	let mut reconciler = cambium_dom::Reconciler::new(document, body);
	reconciler.render(vec![N::new("p").text("x")]);

	let bound = &reconciler.tree().child_nodes()[0];
	assert!(bound.is_bound());
	let clone = bound.clone();
	assert!(!clone.is_bound());
	assert_eq!(clone.signature(), bound.signature());
}
