//! Arena-backed XML document tree.
//!
//! This crate provides the tree primitives the template engine works on:
//! a [`Document`] owning every node in a flat arena, addressed by [`NodeId`].
//! Nodes can be detached and re-attached freely; a detached subtree stays in
//! the arena and can be cloned, inspected, or inserted elsewhere later.
//!
//! # Example
//!
//! ```
//! use docstamp_xml::{Document, parse, serialize};
//!
//! let mut doc = parse("<w:p><w:r><w:t>Hello</w:t></w:r></w:p>").unwrap();
//! let run = doc.children(doc.root())[0];
//! let copy = doc.deep_clone(run);
//! doc.insert_after(run, copy);
//!
//! assert_eq!(
//!     serialize(&doc),
//!     "<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t>Hello</w:t></w:r></w:p>"
//! );
//! ```

mod error;
mod reader;
mod split;
mod tree;
mod writer;

pub use error::XmlError;
pub use reader::parse;
pub use tree::{Ancestors, Document, Element, NodeData, NodeId, is_property_element, local_name};
pub use writer::{serialize, serialize_node};
