//! Template blocks and the tree they form.
//!
//! Every block directive (`{{#...}}`, `{{?...}}`, `{{--}}`, `{{:keyword}}`)
//! opens a block. Blocks with an end directive hold sections: a synthetic
//! [`PatternType::None`] section for the main content, followed by an else
//! or separator section when the template has one. Sections in turn contain
//! nested blocks.
//!
//! Processing runs in phases, each in its own module:
//!
//! 1. [`builder`] turns the directive sequence into a [`BlockTree`].
//! 2. [`anchor`] splits the document at block boundaries and places anchors.
//! 3. [`extract`] moves each block's content out of the document.
//! 4. [`expand`] clones content back in for every value the model yields.

pub(crate) mod anchor;
pub(crate) mod builder;
pub(crate) mod expand;
pub(crate) mod extract;

use docstamp_xml::NodeId;

use crate::insertion_point::InsertionPoint;
use crate::pattern::{PatternMatch, PatternType};

/// Handle of a block inside a [`BlockTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A directive together with the isolated `w:t` holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub node: NodeId,
    pub pattern: PatternMatch,
}

/// Sibling nodes delimiting a block's content, exclusive on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub parent: NodeId,
    pub first: NodeId,
    pub last: NodeId,
}

#[derive(Debug, Clone)]
pub struct Block {
    kind: PatternType,
    start: Marker,
    end: Option<Marker>,
    parent: Option<BlockId>,
    children: Vec<BlockId>,
    content: Vec<NodeId>,
    insertion_point: Option<InsertionPoint>,
    end_marker: Option<InsertionPoint>,
    bounds: Option<Bounds>,
}

impl Block {
    fn new(kind: PatternType, start: Marker, parent: Option<BlockId>) -> Self {
        Self {
            kind,
            start,
            end: None,
            parent,
            children: Vec::new(),
            content: Vec::new(),
            insertion_point: None,
            end_marker: None,
            bounds: None,
        }
    }

    pub fn kind(&self) -> PatternType {
        self.kind
    }

    /// Directive that opened the block. Sections share it with their parent
    /// or start at the else/separator directive.
    pub fn start(&self) -> &Marker {
        &self.start
    }

    /// Directive that closed the block.
    pub fn end(&self) -> Option<&Marker> {
        self.end.as_ref()
    }

    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    /// Detached top-level nodes of the block's content, in order.
    pub fn content(&self) -> &[NodeId] {
        &self.content
    }

    pub fn insertion_point(&self) -> Option<&InsertionPoint> {
        self.insertion_point.as_ref()
    }

    pub fn end_marker(&self) -> Option<&InsertionPoint> {
        self.end_marker.as_ref()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// The directive to report in errors and logs.
    pub(crate) fn directive(&self) -> &str {
        &self.start.pattern.text
    }
}

/// Arena of blocks with their nesting.
#[derive(Debug, Clone, Default)]
pub struct BlockTree {
    blocks: Vec<Block>,
    roots: Vec<BlockId>,
}

impl BlockTree {
    /// Top-level blocks in document order.
    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    pub fn get(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Add a block and link it under `parent`.
    fn push(&mut self, kind: PatternType, start: Marker, parent: Option<BlockId>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block::new(kind, start, parent));
        match parent {
            Some(parent) => self.blocks[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// All blocks, parents before children.
    pub fn pre_order(&self) -> Vec<BlockId> {
        let mut out = Vec::with_capacity(self.blocks.len());
        let mut stack: Vec<BlockId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.get(id).children.iter().rev().copied());
        }
        out
    }

    /// All blocks, children before parents.
    pub fn post_order(&self) -> Vec<BlockId> {
        let mut out = Vec::with_capacity(self.blocks.len());
        for &root in &self.roots {
            self.collect_post_order(root, &mut out);
        }
        out
    }

    fn collect_post_order(&self, id: BlockId, out: &mut Vec<BlockId>) {
        for &child in &self.get(id).children {
            self.collect_post_order(child, out);
        }
        out.push(id);
    }
}
