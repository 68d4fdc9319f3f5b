//! Binding of template directives to model data.
//!
//! The engine only knows the document structure. Everything that depends on
//! the model (variable values, collection sizes, condition results) is asked
//! from a [`BindingDriver`].

mod formatter;
mod json;

pub use formatter::{CaseFormatter, Formatter, JoinFormatter};
pub use json::JsonBinding;

use docstamp_xml::{Document, NodeId};

use crate::error::BindingError;
use crate::pattern::PatternMatch;

/// How a block is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Expand the content section once per item. Zero items selects the else
    /// section, if the block has one.
    Repeat(usize),
    /// Expand the child section at the given index once, or nothing.
    Branch(Option<usize>),
}

/// What to do when the model cannot satisfy a directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindingErrorHandling {
    /// Fail processing with the binding error.
    #[default]
    ThrowException,
    /// Render missing values as empty and drop blocks that cannot be bound.
    SkipBindingAndRemoveContent,
}

/// Source of values for a template.
pub trait BindingDriver {
    /// Fill in every variable directive under `root`.
    ///
    /// Variable nodes can be found with [`crate::variable_nodes`] and written
    /// with [`crate::write_value`].
    fn substitute(&mut self, doc: &mut Document, root: NodeId) -> Result<(), BindingError>;

    /// Decide how the block opened by `directive` expands.
    fn plan(&mut self, directive: &PatternMatch) -> Result<Expansion, BindingError>;

    /// Make item `index` of the collection opened by `directive` the current
    /// scope. Paired with [`BindingDriver::leave_item`].
    fn enter_item(&mut self, directive: &PatternMatch, index: usize) -> Result<(), BindingError>;

    /// Restore the scope active before the matching [`BindingDriver::enter_item`].
    fn leave_item(&mut self);
}
