//! The intermediate submission graph.
//!
//! Flat key/value pairs arrive in no particular order, with bracketed
//! indices possibly out of sequence (`Projects[2]` before `Projects[0]`).
//! Before anything touches the destination, every routed pair is folded
//! into this tree; the deposit pass then walks it depth-first, which is the
//! order [`facet_reflect::Partial`] wants its frames in.
//!
//! Node kinds mirror the closed set of destination kinds: a `Branch` feeds
//! a struct or a map, an `Items` list feeds a sequence (growing
//! monotonically, gaps kept as `Empty`), a `Leaf` carries the raw payloads
//! for one terminal node, and `Empty` materializes as the zero value.

use std::collections::BTreeMap;

use crate::error::{BindError, BindErrorKind};
use crate::form::FilePart;
use crate::path::PathSegment;

/// One raw payload, borrowed from the [`FormData`](crate::FormData).
#[derive(Debug, Clone, Copy)]
pub(crate) enum RawValue<'form> {
    /// A text value from the scalar mapping.
    Text(&'form str),
    /// A file part from the file mapping.
    File(&'form FilePart),
}

/// One node of the submission graph.
#[derive(Debug, Default)]
pub(crate) enum Node<'form> {
    /// Not addressed by any key; becomes the zero value. Sequence gaps and
    /// freshly created children start out like this.
    #[default]
    Empty,
    /// A terminal node, with its payloads in submission order.
    Leaf(Vec<RawValue<'form>>),
    /// Named children: struct fields or map entries.
    Branch(BTreeMap<String, Node<'form>>),
    /// Indexed children. Growth is monotonic; inserting at index `i` never
    /// drops elements and fills the gap below `i` with `Empty`.
    Items(Vec<Node<'form>>),
}

impl<'form> Node<'form> {
    /// Descend into the named child, creating it (and this branch) on demand.
    fn branch_entry(&mut self, name: &str) -> Result<&mut Node<'form>, BindError> {
        if matches!(self, Node::Empty) {
            *self = Node::Branch(BTreeMap::new());
        }
        match self {
            Node::Branch(children) => Ok(children.entry(name.to_string()).or_default()),
            _ => Err(conflict(name)),
        }
    }

    /// Descend into the indexed child, growing the list on demand.
    fn item_at(&mut self, name: &str, index: usize) -> Result<&mut Node<'form>, BindError> {
        if matches!(self, Node::Empty) {
            *self = Node::Items(Vec::new());
        }
        match self {
            Node::Items(items) => {
                if items.len() < index + 1 {
                    items.resize_with(index + 1, Node::default);
                }
                Ok(&mut items[index])
            }
            _ => Err(conflict(name)),
        }
    }

    /// Record a payload at this node, making it a leaf.
    fn push_value(&mut self, value: RawValue<'form>) -> Result<(), BindError> {
        if matches!(self, Node::Empty) {
            *self = Node::Leaf(Vec::new());
        }
        match self {
            Node::Leaf(values) => {
                values.push(value);
                Ok(())
            }
            _ => Err(conflict("<leaf>")),
        }
    }
}

fn conflict(segment: &str) -> BindError {
    BindError::new(BindErrorKind::KeyConflict {
        segment: segment.to_string(),
    })
}

/// Fold one routed, parsed key/value pair into the graph.
///
/// Fails only when this pair disagrees with an earlier one about the kind
/// of some node; the graph is left as it was and the pair is dropped.
pub(crate) fn insert<'form>(
    root: &mut Node<'form>,
    segments: &[PathSegment<'_>],
    value: RawValue<'form>,
) -> Result<(), BindError> {
    let mut node = root;
    for segment in segments {
        node = node.branch_entry(segment.name)?;
        if let Some(index) = segment.index {
            node = node.item_at(segment.name, index)?;
        }
    }
    node.push_value(value)
}
