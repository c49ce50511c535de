use crate::{view::ViewItem, ReconcileError};
use hashbrown::HashMap;
use std::collections::VecDeque;

/// Per-pass arena of origin positions, keyed by identity token.
///
/// Each origin index is handed out at most once, oldest first.
#[derive(Debug)]
pub(crate) struct ResourcePool<'a> {
	entries: Vec<PoolEntry<'a>>,
	by_token: HashMap<&'a str, usize>,
	/// Group children without an identity token. They can never be reused.
	unowned: Vec<usize>,
}

#[derive(Debug)]
struct PoolEntry<'a> {
	token: &'a str,
	/// First origin index that held `token`. Stays valid after the queue drains.
	first: usize,
	available: VecDeque<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acquired {
	Index(usize),
	Exhausted { first: usize },
}

impl<'a> ResourcePool<'a> {
	/// Indexes `origin` left to right. Non-group items are skipped.
	pub(crate) fn scan<T: ViewItem>(origin: &'a [T]) -> Self {
		let mut pool = Self {
			entries: Vec::new(),
			by_token: HashMap::new(),
			unowned: Vec::new(),
		};
		for (i, item) in origin.iter().enumerate() {
			if !item.is_group() {
				continue;
			}
			let token = match item.identity() {
				Some(token) => token,
				None => {
					pool.unowned.push(i);
					continue;
				}
			};
			let entries = &mut pool.entries;
			let entry = *pool.by_token.entry(token).or_insert_with(|| {
				entries.push(PoolEntry {
					token,
					first: i,
					available: VecDeque::new(),
				});
				entries.len() - 1
			});
			pool.entries[entry].available.push_back(i);
		}
		pool
	}

	/// Takes the oldest available origin index holding `token`.
	///
	/// # Errors
	///
	/// [`ReconcileError::UnknownReuseToken`] iff no origin item ever held `token`.
	pub(crate) fn acquire(&mut self, token: &str) -> Result<Acquired, ReconcileError> {
		let entry = self
			.by_token
			.get(token)
			.map(|&entry| &mut self.entries[entry])
			.ok_or_else(|| ReconcileError::UnknownReuseToken { token: token.to_owned() })?;
		Ok(match entry.available.pop_front() {
			Some(i) => Acquired::Index(i),
			None => Acquired::Exhausted { first: entry.first },
		})
	}

	/// Every origin index that was not handed out, ascending.
	pub(crate) fn into_leftovers(self) -> Vec<usize> {
		let mut leftovers = self.unowned;
		for entry in self.entries {
			if !entry.available.is_empty() {
				tracing::trace!(token = entry.token, count = entry.available.len(), "Unused origin resources.");
			}
			leftovers.extend(entry.available);
		}
		leftovers.sort_unstable();
		leftovers
	}
}
