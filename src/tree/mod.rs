//! In-memory element tree.
//!
//! The tree is an arena of element slots:
//!
//! - [`Document`] - Owns every retained element and tracks the root
//! - [`ElementNode`] - One element with its attributes and ordered content
//! - [`NodeId`] - Copyable handle into the arena, used for parent links
//! - [`Content`] - An item of element content (child element, text, ...)
//!
//! Parent links are plain handles, so there is no ownership cycle between
//! an element and its children. Evicted subtrees free their slots, which
//! keeps memory proportional to what is currently retained.

mod document;
mod node;

pub use document::Document;
pub use node::{Content, ElementNode, NodeId, XML_NAMESPACE};
