//! Global resources at the head of a rendered document.
//!
//! Definitions and stylesheet rules are shared by the whole document and only ever grow:
//! a windowed render must not invalidate what content outside the window still references.

use crate::Node;
use hashbrown::HashSet;
use tracing::{trace, trace_span};

/// Number of leading root children that are header resources.
pub const HEADER_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderKind {
	Glyphs,
	ClipPaths,
	Style,
	Other,
}

impl HeaderKind {
	pub(crate) fn of(node: &Node) -> Self {
		match node.name.as_str() {
			"defs" if node.has_class("glyph") => Self::Glyphs,
			"defs" if node.has_class("clip-path") => Self::ClipPaths,
			"style" => Self::Style,
			_ => Self::Other,
		}
	}
}

/// Whether the live `origin` header holds the same kinds of resources, in the same order, as `target`.
pub(crate) fn same_kinds(origin: &[Node], target: &[Node]) -> bool {
	origin.len() == target.len() && origin.iter().map(HeaderKind::of).eq(target.iter().map(HeaderKind::of))
}

/// Grows the live header `origin` with the resources of the freshly rendered header `target`.
///
/// Both must hold the [same kinds](`same_kinds`) of resources.
pub(crate) fn patch_header(origin: &mut [Node], target: Vec<Node>) -> HeaderGrowth {
	let mut growth = HeaderGrowth::default();
	for (origin, target) in origin.iter_mut().zip(target) {
		let kind = HeaderKind::of(origin);
		let span = trace_span!("Patching header resource", ?kind);
		let _enter = span.enter();

		match kind {
			HeaderKind::Glyphs | HeaderKind::ClipPaths => growth.definitions += append_definitions(origin, target),
			HeaderKind::Style if target.attributes.get("data-reuse") != Some("1") => growth.rules += insert_rules(origin, &target.text),
			HeaderKind::Style | HeaderKind::Other => trace!("Nothing to grow."),
		}
	}
	growth
}

/// How much [`patch_header`] added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderGrowth {
	pub definitions: usize,
	pub rules: usize,
}

/// Appends definitions from `target`, skipping ids the live block already defines.
fn append_definitions(origin: &mut Node, target: Node) -> usize {
	let known: HashSet<String> = origin.children.iter().filter_map(|definition| definition.attributes.get("id")).map(str::to_owned).collect();
	let before = origin.children.len();
	origin
		.children
		.extend(target.children.into_iter().filter(|definition| definition.attributes.get("id").map_or(true, |id| !known.contains(id))));
	origin.children.len() - before
}

/// Appends each rule of `css` that the live stylesheet doesn't contain yet.
///
/// Existing rules are never rewritten, so their positions in the live rule list stay stable.
fn insert_rules(style: &mut Node, css: &str) -> usize {
	let mut known: HashSet<String> = split_rules(&style.text).into_iter().map(str::to_owned).collect();
	let mut inserted = 0;
	for rule in split_rules(css) {
		if known.insert(rule.to_owned()) {
			if !style.text.is_empty() && !style.text.ends_with('\n') {
				style.text.push('\n');
			}
			style.text.push_str(rule);
			inserted += 1;
		}
	}
	trace!("Inserted {} stylesheet rule(s).", inserted);
	inserted
}

/// Splits a stylesheet into its top-level rules, trimmed.
///
/// Nested blocks (`@media` and the like) stay part of their rule. Comments between rules are dropped.
/// Braces inside strings and comments don't count.
pub(crate) fn split_rules(css: &str) -> Vec<&str> {
	let bytes = css.as_bytes();
	let mut rules = Vec::new();
	let mut depth = 0_usize;
	let mut start = 0;
	let mut i = 0;
	while i < bytes.len() {
		match bytes[i] {
			b'/' if bytes.get(i + 1) == Some(&b'*') => {
				let end = css[i + 2..].find("*/").map_or(bytes.len(), |end| i + 2 + end + 2);
				if depth == 0 && css[start..i].trim().is_empty() {
					start = end;
				}
				i = end;
				continue;
			}
			quote @ (b'"' | b'\'') => {
				i += 1;
				while i < bytes.len() && bytes[i] != quote {
					if bytes[i] == b'\\' {
						i += 1;
					}
					i += 1;
				}
			}
			b'{' => depth += 1,
			b'}' => {
				depth = depth.saturating_sub(1);
				if depth == 0 {
					push_rule(&mut rules, &css[start..=i]);
					start = i + 1;
				}
			}
			b';' if depth == 0 => {
				// Block-less at-rule such as `@import`.
				push_rule(&mut rules, &css[start..=i]);
				start = i + 1;
			}
			_ => (),
		}
		i += 1;
	}
	rules
}

fn push_rule<'a>(rules: &mut Vec<&'a str>, rule: &'a str) {
	let rule = rule.trim();
	if !rule.is_empty() {
		rules.push(rule)
	}
}

#[cfg(test)]
mod tests {
	use super::split_rules;

	#[test]
	fn splits_top_level_rules() {
		assert_eq!(
			split_rules(".a { fill: red; }\n.b{stroke:blue}"),
			vec![".a { fill: red; }", ".b{stroke:blue}"]
		);
	}

	#[test]
	fn keeps_nested_blocks_together() {
		assert_eq!(
			split_rules("@media print { .a { fill: red } } .b { }"),
			vec!["@media print { .a { fill: red } }", ".b { }"]
		);
	}

	#[test]
	fn ignores_braces_in_strings_and_comments() {
		assert_eq!(
			split_rules("/* { */ .a::after { content: \"}\" } @import 'x;y';"),
			vec![".a::after { content: \"}\" }", "@import 'x;y';"]
		);
	}
}
