//! Splitting elements along the path to a descendant.
//!
//! A split never moves the descendant itself: the original element keeps the
//! part holding it and a freshly created sibling receives the rest. Property
//! children are copied into the new part so both halves keep their formatting.

use crate::tree::{Document, NodeId, is_property_element};

impl Document {
    /// Split `container` right after its descendant `at`.
    ///
    /// Everything following `at` (at every level between `at` and `container`)
    /// moves into a new element inserted after `container`. Returns
    /// `[container, tail]`, or just `[container]` when nothing follows `at`.
    pub fn split_after(&mut self, container: NodeId, at: NodeId) -> Vec<NodeId> {
        let Some(path) = self.path_to(container, at) else {
            return vec![container];
        };

        let mut tail: Option<NodeId> = None;
        for pair in path.windows(2) {
            let (child, parent) = (pair[0], pair[1]);
            let following: Vec<NodeId> = self
                .index_in_parent(child)
                .map(|index| self.children(parent)[index + 1..].to_vec())
                .unwrap_or_default();

            let shell = self.shell_clone(parent);
            if let Some(lower) = tail.take().filter(|&lower| self.has_content(lower)) {
                self.append_child(shell, lower);
            }
            for node in following {
                self.append_child(shell, node);
            }
            tail = Some(shell);
        }

        match tail {
            Some(tail) if self.has_content(tail) => {
                self.insert_after(container, tail);
                vec![container, tail]
            }
            _ => vec![container],
        }
    }

    /// Split `container` right before its descendant `at`.
    ///
    /// Everything preceding `at` moves into a new element inserted before
    /// `container`. Returns `[head, container]`, or just `[container]` when
    /// nothing precedes `at`.
    pub fn split_before(&mut self, container: NodeId, at: NodeId) -> Vec<NodeId> {
        let Some(path) = self.path_to(container, at) else {
            return vec![container];
        };

        let mut head: Option<NodeId> = None;
        for pair in path.windows(2) {
            let (child, parent) = (pair[0], pair[1]);
            let preceding: Vec<NodeId> = self
                .index_in_parent(child)
                .map(|index| {
                    self.children(parent)[..index]
                        .iter()
                        .copied()
                        .filter(|&c| !self.name(c).is_some_and(is_property_element))
                        .collect()
                })
                .unwrap_or_default();

            let shell = self.shell_clone(parent);
            for node in preceding {
                self.append_child(shell, node);
            }
            if let Some(lower) = head.take().filter(|&lower| self.has_content(lower)) {
                self.append_child(shell, lower);
            }
            head = Some(shell);
        }

        match head {
            Some(head) if self.has_content(head) => {
                self.insert_before(container, head);
                vec![head, container]
            }
            _ => vec![container],
        }
    }

    /// Nodes from `at` up to and including `container`, or `None` when `at`
    /// is `container` itself or not inside it.
    fn path_to(&self, container: NodeId, at: NodeId) -> Option<Vec<NodeId>> {
        if container == at || !self.is_ancestor_of(container, at) {
            return None;
        }
        let mut path = vec![at];
        path.extend(self.ancestors(at).take_while(|&a| a != container));
        path.push(container);
        Some(path)
    }
}
