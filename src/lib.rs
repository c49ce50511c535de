#![doc(html_root_url = "https://docs.rs/preview-dom/0.1.0")]
#![warn(clippy::pedantic)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod canvas;
pub mod diff;
mod error;
mod header;
pub mod load;
pub mod message;
mod node;
pub mod plan;
mod pool;
pub mod pump;
pub mod transpile;
pub mod view;
pub mod viewport;

pub use diff::{ElementPatcher, PatchReport};
pub use error::{ErrorKind, KernelError, LoadError, MessageError, PumpError, ReconcileError};
pub use header::{HeaderGrowth, HEADER_LEN};
pub use load::load_markup;
pub use node::{Attributes, Node, Tag, REUSE_FROM_ATTRIBUTE, TID_ATTRIBUTE};
pub use plan::ExhaustedReuse;
