//! Construction of detached [`Node`] trees from kernel markup.

use crate::{LoadError, Node};
use core::str;
use quick_xml::{
	events::{BytesStart, Event},
	Reader,
};
use tracing::{instrument, trace};

/// Parses `markup` into a detached tree rooted at its single top-level element.
///
/// [`TID_ATTRIBUTE`](`crate::TID_ATTRIBUTE`) and [`REUSE_FROM_ATTRIBUTE`](`crate::REUSE_FROM_ATTRIBUTE`)
/// are lifted into [`Node::identity`] and [`Node::reuse_from`].
/// Whitespace-only character data is dropped, everything else is accumulated into [`Node::text`].
///
/// # Errors
///
/// Iff `markup` isn't well-formed XML with exactly one root element.
#[instrument(skip(markup), fields(markup.len = markup.len()))]
pub fn load_markup(markup: &str) -> Result<Node, LoadError> {
	let mut reader = Reader::from_str(markup);
	reader.config_mut().trim_text(false);

	let mut stack: Vec<Node> = Vec::new();
	let mut root: Option<Node> = None;

	loop {
		match reader.read_event()? {
			Event::Start(start) => stack.push(load_element(&start)?),
			Event::Empty(start) => {
				let node = load_element(&start)?;
				attach(&mut stack, &mut root, node)?;
			}
			Event::End(_) => {
				// `quick-xml` checks that end names match, so this is never `None` for well-formed input.
				if let Some(node) = stack.pop() {
					attach(&mut stack, &mut root, node)?;
				}
			}
			Event::Text(text) => {
				let text = text.unescape()?;
				if let Some(parent) = stack.last_mut() {
					if !text.trim().is_empty() {
						parent.text.push_str(&text);
					}
				}
			}
			Event::CData(cdata) => {
				if let Some(parent) = stack.last_mut() {
					parent.text.push_str(str::from_utf8(&cdata)?);
				}
			}
			Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => (),
			Event::Eof => break,
		}
	}

	if let Some(unclosed) = stack.pop() {
		return Err(LoadError::Unclosed(unclosed.name));
	}
	let root = root.ok_or(LoadError::NoRoot)?;
	trace!("Loaded {} node(s).", root.subtree_len());
	Ok(root)
}

fn attach(stack: &mut Vec<Node>, root: &mut Option<Node>, node: Node) -> Result<(), LoadError> {
	match stack.last_mut() {
		Some(parent) => parent.children.push(node),
		None if root.is_some() => return Err(LoadError::TrailingRoot(node.name)),
		None => *root = Some(node),
	}
	Ok(())
}

fn load_element(start: &BytesStart<'_>) -> Result<Node, LoadError> {
	let mut node = Node::new(str::from_utf8(start.name().as_ref())?);
	for attribute in start.attributes() {
		let attribute = attribute?;
		let name = str::from_utf8(attribute.key.as_ref())?;
		let value = attribute.unescape_value()?;
		node.set_attribute(name, value);
	}
	Ok(node)
}
