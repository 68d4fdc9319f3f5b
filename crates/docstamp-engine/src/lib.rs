//! Template block engine for WordprocessingML documents.
//!
//! Templates are ordinary Word documents containing directives such as
//! `{{Name}}`, `{{#Items}}...{{/Items}}` or `{{?Paid}}...{{:}}...{{/}}`.
//! [`TemplateProcessor`] finds the directives (even when Word has split them
//! across runs), builds the block structure they describe and expands each
//! block against a [`BindingDriver`], cloning content once per collection
//! item and keeping only the selected branch of conditions.
//!
//! Blocks may span paragraphs, sit inside a single run, or cover whole table
//! rows; the engine picks the enclosing structure automatically.

mod binding;
mod block;
mod char_map;
mod cleanup;
mod error;
mod insertion_point;
mod pattern;
mod preprocess;
mod processor;
mod settings;
mod wml;

pub use binding::{
    BindingDriver, BindingErrorHandling, CaseFormatter, Expansion, Formatter, JoinFormatter,
    JsonBinding,
};
pub use block::{Block, BlockId, BlockTree, Bounds, Marker};
pub use char_map::{CharEntry, CharacterMap};
pub use error::{BindingError, TemplateError};
pub use insertion_point::InsertionPoint;
pub use pattern::{PatternMatch, PatternType, find_patterns, parse_directive};
pub use processor::{TemplateProcessor, build_and_expand};
pub use settings::ProcessSettings;
pub use wml::{variable_nodes, write_value};
