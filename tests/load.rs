use preview_dom::{load_markup, LoadError, Node, Tag, REUSE_FROM_ATTRIBUTE, TID_ATTRIBUTE};

#[test]
fn lifts_identity_attributes() {
	let root = load_markup(
		r#"<svg xmlns="http://www.w3.org/2000/svg" width="10">
			<g class="typst-page" data-tid="p0" data-reuse-from="p" data-page-height="5" transform="translate(0, 0)">
				<path d="M0 0"/>
			</g>
		</svg>"#,
	)
	.unwrap();

	assert_eq!(root.name, "svg");
	assert_eq!(root.attributes.get("width"), Some("10"));
	assert_eq!(root.children.len(), 1);

	let page = &root.children[0];
	assert_eq!(page.tag(), Tag::Page);
	assert!(page.is_group());
	assert_eq!(page.identity.as_deref(), Some("p0"));
	assert_eq!(page.reuse_from.as_deref(), Some("p"));
	assert_eq!(page.attributes.get(TID_ATTRIBUTE), None);
	assert_eq!(page.attributes.get(REUSE_FROM_ATTRIBUTE), None);
	assert_eq!(page.children[0].tag(), Tag::Shape);
	assert_eq!(page.text, "");
}

#[test]
fn keeps_character_data() {
	let root = load_markup(r#"<svg><style><![CDATA[.a { fill: red; }]]></style><text title="&lt;x&gt;">a &amp; b</text></svg>"#).unwrap();
	assert_eq!(root.children[0].text, ".a { fill: red; }");
	assert_eq!(root.children[1].text, "a & b");
	assert_eq!(root.children[1].attributes.get("title"), Some("<x>"));
}

#[test]
fn mixed_content_is_hoisted_in_front_of_children() {
	let root = load_markup("<svg><text>a<tspan>b</tspan>c</text></svg>").unwrap();
	let text = &root.children[0];
	assert_eq!(text.text, "ac");
	assert_eq!(text.to_string(), "<text>ac<tspan>b</tspan></text>");
}

#[test]
fn display_writes_markup_back() {
	let root = Node::new("svg")
		.with_child(Node::group("a").with_reuse_from("b").with_attribute("fill", "\"red\""))
		.with_child(Node::new("style").with_text(".a > b {}"));
	let markup = root.to_string();
	assert_eq!(load_markup(&markup).unwrap(), root);
}

#[test]
fn rejects_malformed_markup() {
	assert!(matches!(load_markup(""), Err(LoadError::NoRoot)));
	assert!(matches!(load_markup("<!-- nothing -->"), Err(LoadError::NoRoot)));
	assert!(matches!(load_markup("<a/><b/>"), Err(LoadError::TrailingRoot(name)) if name == "b"));
	assert!(load_markup("<svg><g></svg>").is_err());
	assert!(load_markup("<svg><g>").is_err());
}

#[test]
fn classifies_tags() {
	assert_eq!(Tag::classify("g", Some("typst-page other")), Tag::Page);
	assert_eq!(Tag::classify("g", None), Tag::Group);
	assert_eq!(Tag::classify("use", None), Tag::Text);
	assert_eq!(Tag::classify("image", None), Tag::Image);
	assert_eq!(Tag::classify("polygon", None), Tag::Shape);
	assert_eq!(Tag::classify("foreignObject", None), Tag::Opaque);
	assert!(!Tag::Shape.is_group());
}
