#![allow(dead_code)]

use preview_dom::{view::ViewItem, Node};

/// A reused group: `identity` continues from `reuse_from`.
pub fn reuse(identity: &str, reuse_from: &str) -> Node {
	Node::group(identity).with_reuse_from(reuse_from)
}

/// A clean reuse, usually hollow.
pub fn clean(identity: &str) -> Node {
	reuse(identity, identity)
}

pub fn page(identity: &str) -> Node {
	Node::group(identity).with_attribute("class", "typst-page")
}

pub fn rect(marker: &str) -> Node {
	Node::new("rect").with_attribute("data-marker", marker)
}

pub fn glyphs(ids: &[&str]) -> Node {
	Node::new("defs")
		.with_attribute("class", "glyph")
		.with_children(ids.iter().map(|id| Node::new("path").with_attribute("id", *id)))
}

pub fn clip_paths(ids: &[&str]) -> Node {
	Node::new("defs")
		.with_attribute("class", "clip-path")
		.with_children(ids.iter().map(|id| Node::new("clipPath").with_attribute("id", *id)))
}

pub fn style(css: &str) -> Node {
	Node::new("style").with_text(css)
}

/// An `<svg>` root with the three header resources followed by `body`.
pub fn document(header: [Node; 3], body: impl IntoIterator<Item = Node>) -> Node {
	Node::new("svg").with_children(header).with_children(body)
}

pub fn empty_header() -> [Node; 3] {
	[glyphs(&[]), clip_paths(&[]), style("")]
}

pub fn identities(children: &[Node]) -> Vec<Option<&str>> {
	children.iter().map(|child| child.identity.as_deref()).collect()
}

/// Minimal reconcilable item with a serial number that tells origin items apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
	pub serial: usize,
	pub group: bool,
	pub identity: Option<String>,
	pub reuse_from: Option<String>,
}

impl Item {
	pub fn group(serial: usize, identity: &str) -> Self {
		Self {
			serial,
			group: true,
			identity: Some(identity.to_owned()),
			reuse_from: None,
		}
	}

	pub fn anchor(serial: usize) -> Self {
		Self {
			serial,
			group: false,
			identity: None,
			reuse_from: None,
		}
	}

	pub fn reusing(mut self, reuse_from: &str) -> Self {
		self.reuse_from = Some(reuse_from.to_owned());
		self
	}
}

impl ViewItem for Item {
	fn is_group(&self) -> bool {
		self.group
	}

	fn identity(&self) -> Option<&str> {
		self.identity.as_deref()
	}

	fn reuse_from(&self) -> Option<&str> {
		self.reuse_from.as_deref()
	}
}

pub fn serials(items: &[Item]) -> Vec<usize> {
	items.iter().map(|item| item.serial).collect()
}
