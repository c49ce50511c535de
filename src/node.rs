use core::fmt::{self, Display, Formatter};
use quick_xml::escape::escape;

/// Attribute carrying a node's [identity token](`Node::identity`).
pub const TID_ATTRIBUTE: &str = "data-tid";
/// Attribute carrying a node's [reuse-from hint](`Node::reuse_from`).
pub const REUSE_FROM_ATTRIBUTE: &str = "data-reuse-from";

/// Closed classification of rendered SVG elements.
///
/// Only group-like tags ([`Tag::Group`] and [`Tag::Page`], both `<g>` elements) take part in identity-based reconciliation.
/// Everything else is positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
	Group,
	Page,
	Text,
	Image,
	Shape,
	Opaque,
}

impl Tag {
	#[must_use]
	pub fn classify(name: &str, class: Option<&str>) -> Self {
		match name {
			"g" if class.map_or(false, |class| class.split_ascii_whitespace().any(|class| class == "typst-page")) => Self::Page,
			"g" => Self::Group,
			"text" | "use" => Self::Text,
			"image" => Self::Image,
			"path" | "rect" | "circle" | "ellipse" | "line" | "polyline" | "polygon" => Self::Shape,
			_ => Self::Opaque,
		}
	}

	#[must_use]
	pub fn is_group(self) -> bool {
		match self {
			Self::Group | Self::Page => true,
			Self::Text | Self::Image | Self::Shape | Self::Opaque => false,
		}
	}
}

/// Ordered attribute map with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.iter().find(|(n, _)| n == name).map(|(_, value)| value.as_str())
	}

	/// Sets `name` to `value`, keeping the attribute's position if it already exists.
	pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();
		let value = value.into();
		match self.0.iter_mut().find(|(n, _)| *n == name) {
			Some((_, slot)) => *slot = value,
			None => self.0.push((name, value)),
		}
	}

	pub fn remove(&mut self, name: &str) -> Option<String> {
		let index = self.0.iter().position(|(n, _)| n == name)?;
		Some(self.0.remove(index).1)
	}

	pub fn clear(&mut self) {
		self.0.clear()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
	}

	/// Order-insensitive comparison: same count, and every name maps to the same value on both sides.
	#[must_use]
	pub fn same_as(&self, other: &Self) -> bool {
		self.len() == other.len() && self.iter().all(|(name, value)| other.get(name) == Some(value))
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut attributes = Self::new();
		for (name, value) in iter {
			attributes.set(name, value)
		}
		attributes
	}
}

/// An element of a retained SVG tree.
///
/// The same type is used for the mounted *origin* tree and for detached *target* trees fresh from the kernel.
/// [`TID_ATTRIBUTE`] and [`REUSE_FROM_ATTRIBUTE`] are never stored in [`Node::attributes`];
/// they are lifted into [`Node::identity`] and [`Node::reuse_from`] while [loading](`crate::load::load_markup`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
	/// Qualified element name, e.g. `g` or `xlink:use`.
	pub name: String,
	pub attributes: Attributes,
	pub children: Vec<Node>,
	/// Character data directly inside this element (stylesheet text, mostly).
	///
	/// All of it is concatenated and written back before the children,
	/// so mixed content like `<text>a<tspan>b</tspan>c</text>` comes back as `<text>ac<tspan>b</tspan></text>`.
	pub text: String,
	/// Content-derived, collision-disambiguated identity token.
	pub identity: Option<String>,
	/// Identity token of the origin node this (target) node continues from.
	pub reuse_from: Option<String>,
}

impl Node {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			attributes: Attributes::new(),
			children: Vec::new(),
			text: String::new(),
			identity: None,
			reuse_from: None,
		}
	}

	/// Shorthand for a `<g>` carrying an identity token.
	#[must_use]
	pub fn group(identity: impl Into<String>) -> Self {
		Self::new("g").with_identity(identity)
	}

	#[must_use]
	pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
		self.identity = Some(identity.into());
		self
	}

	#[must_use]
	pub fn with_reuse_from(mut self, reuse_from: impl Into<String>) -> Self {
		self.reuse_from = Some(reuse_from.into());
		self
	}

	/// Sets an attribute, routing [`TID_ATTRIBUTE`] and [`REUSE_FROM_ATTRIBUTE`] into their dedicated fields.
	#[must_use]
	pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.set_attribute(name, value);
		self
	}

	#[must_use]
	pub fn with_child(mut self, child: Node) -> Self {
		self.children.push(child);
		self
	}

	#[must_use]
	pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
		self.children.extend(children);
		self
	}

	#[must_use]
	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.text = text.into();
		self
	}

	pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();
		match name.as_str() {
			TID_ATTRIBUTE => self.identity = Some(value.into()),
			REUSE_FROM_ATTRIBUTE => self.reuse_from = Some(value.into()),
			_ => self.attributes.set(name, value),
		}
	}

	#[must_use]
	pub fn tag(&self) -> Tag {
		Tag::classify(&self.name, self.attributes.get("class"))
	}

	#[must_use]
	pub fn is_group(&self) -> bool {
		self.tag().is_group()
	}

	#[must_use]
	pub fn has_class(&self, class: &str) -> bool {
		self.attributes.get("class").map_or(false, |classes| classes.split_ascii_whitespace().any(|c| c == class))
	}

	/// Drops reuse-from hints in this whole subtree. Mounted nodes never carry them.
	pub fn forget_reuse_hints(&mut self) {
		self.reuse_from = None;
		for child in &mut self.children {
			child.forget_reuse_hints()
		}
	}

	/// Total number of nodes in this subtree, including `self`.
	#[must_use]
	pub fn subtree_len(&self) -> usize {
		1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
	}
}

impl Display for Node {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "<{}", self.name)?;
		for (name, value) in self.attributes.iter() {
			write!(f, " {}=\"{}\"", name, escape(value))?;
		}
		if let Some(identity) = &self.identity {
			write!(f, " {}=\"{}\"", TID_ATTRIBUTE, escape(identity))?;
		}
		if let Some(reuse_from) = &self.reuse_from {
			write!(f, " {}=\"{}\"", REUSE_FROM_ATTRIBUTE, escape(reuse_from))?;
		}
		if self.children.is_empty() && self.text.is_empty() {
			return f.write_str("/>");
		}
		f.write_str(">")?;
		f.write_str(&escape(&self.text))?;
		for child in &self.children {
			Display::fmt(child, f)?;
		}
		write!(f, "</{}>", self.name)
	}
}
