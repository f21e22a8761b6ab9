//! Copy-on-write mutation engine.
//!
//! Every structural operation is expressed as a target (a node, or a
//! parent plus child) and a tagged edit description. Applying an edit
//! never alters an existing node: the engine resolves the path from the
//! target to the root, clones exactly the nodes on that path, applies
//! the edit at the lowest clone, and rebuilds each ancestor clone up to
//! a new root. Off-path subtrees are shared by reference between the
//! old and new trees, so mutation cost is bounded by tree depth.
//!
//! A reader holding the old root keeps observing a fully consistent old
//! tree; no partially-edited tree is ever reachable.

use crate::events::DocumentEvent;
use crate::formatting::{Formatter, IndentCache};
use crate::model::{ModelConfig, Status};
use crate::namespaces::consolidate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use xylem_common::path_to;
use xylem_diff::NodeInfo;
use xylem_parser::ast::{Attribute, NodeId, QName, XmlNode};
use xylem_parser::{parse_fragment, IdGenerator};

/// Structural edit descriptions.
///
/// Targets are node ids; inserted content is a detached node (or a raw
/// fragment for content replacement). Mutations are plain values and
/// serialize, so they can be logged or shipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Swap a child for a detached replacement node.
    Replace { target: NodeId, node: Arc<XmlNode> },

    /// Insert a detached node before an existing child.
    InsertBefore {
        parent: NodeId,
        reference: NodeId,
        node: Arc<XmlNode>,
    },

    /// Insert a detached node at an index of a parent's child list.
    InsertAt {
        parent: NodeId,
        index: usize,
        node: Arc<XmlNode>,
    },

    /// Insert a detached node after a parent's last child.
    AppendChild { parent: NodeId, node: Arc<XmlNode> },

    /// Detach a node from its parent.
    Delete { target: NodeId },

    /// Detach a named child of a known parent.
    RemoveChild { parent: NodeId, child: NodeId },

    /// Move one child to a new index among its siblings.
    ReorderChild {
        parent: NodeId,
        child: NodeId,
        index: usize,
    },

    /// Reorder the whole child list: `order[i]` is the old index of the
    /// child that ends up at position `i`.
    ReorderChildren { parent: NodeId, order: Vec<usize> },

    /// Detach a batch of children in one step.
    RemoveChildren { parent: NodeId, children: Vec<NodeId> },

    /// Set (add or overwrite) one attribute of an element.
    SetAttribute { element: NodeId, attribute: Attribute },

    /// Remove one attribute of an element.
    RemoveAttribute { element: NodeId, name: QName },

    /// Parse a raw XML fragment and make it the element's new content.
    ReplaceContent { element: NodeId, fragment: String },

    /// Replace a text node's raw value.
    SetTextValue { target: NodeId, value: String },
}

/// Clone depth selected per edit kind: attribute edits clone attribute
/// lists, child edits clone child lists, and edits that may also hoist
/// namespace declarations onto the root clone both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attribute,
    Children,
    Both,
}

impl Mutation {
    pub fn mutation_type(&self) -> MutationType {
        match self {
            Mutation::SetAttribute { .. }
            | Mutation::RemoveAttribute { .. }
            | Mutation::SetTextValue { .. } => MutationType::Attribute,

            Mutation::Delete { .. }
            | Mutation::RemoveChild { .. }
            | Mutation::ReorderChild { .. }
            | Mutation::ReorderChildren { .. }
            | Mutation::RemoveChildren { .. } => MutationType::Children,

            Mutation::Replace { .. }
            | Mutation::InsertBefore { .. }
            | Mutation::InsertAt { .. }
            | Mutation::AppendChild { .. }
            | Mutation::ReplaceContent { .. } => MutationType::Both,
        }
    }

    /// The detached node this mutation attaches, if any.
    pub fn inserted_node(&self) -> Option<&Arc<XmlNode>> {
        match self {
            Mutation::Replace { node, .. }
            | Mutation::InsertBefore { node, .. }
            | Mutation::InsertAt { node, .. }
            | Mutation::AppendChild { node, .. } => Some(node),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("node {0} is not part of the current tree")]
    NodeNotFound(NodeId),

    #[error("node {0} is already part of the current tree")]
    NodeInTree(NodeId),

    #[error("index {index} out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("node {0} cannot carry children")]
    NotAContainer(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0} is not a text node")]
    NotText(NodeId),

    #[error("cannot detach the document root")]
    CannotDetachRoot,

    #[error("order is not a permutation of {len} children")]
    InvalidPermutation { len: usize },

    #[error("attribute {name} not found on element {element}")]
    AttributeNotFound { element: NodeId, name: QName },

    #[error("invalid fragment: {0}")]
    Fragment(#[from] xylem_parser::ParseError),
}

/// A computed edit: the new root plus the event describing it.
pub(crate) struct Applied {
    pub root: Arc<XmlNode>,
    pub event: DocumentEvent,
}

/// Apply one mutation against `root`, producing a new root.
///
/// Formatting preservation and namespace consolidation run only for the
/// edits they apply to, and never while the model is replaying an
/// external re-parse (`Status::Parsing`).
pub(crate) fn apply_mutation(
    root: &Arc<XmlNode>,
    mutation: &Mutation,
    ids: &mut IdGenerator,
    indent: &mut IndentCache,
    config: &ModelConfig,
    status: Status,
) -> Result<Applied, MutationError> {
    if let Some(node) = mutation.inserted_node() {
        if root.contains(node.id()) {
            return Err(MutationError::NodeInTree(node.id()));
        }
    }

    match mutation {
        Mutation::InsertAt { parent, index, node } => insert(
            root,
            *parent,
            Anchor::Index(*index),
            node,
            ids,
            indent,
            config,
            status,
        ),
        Mutation::InsertBefore {
            parent,
            reference,
            node,
        } => insert(
            root,
            *parent,
            Anchor::Before(*reference),
            node,
            ids,
            indent,
            config,
            status,
        ),
        Mutation::AppendChild { parent, node } => {
            insert(root, *parent, Anchor::End, node, ids, indent, config, status)
        }

        Mutation::Delete { target } => {
            let path = resolve(root, *target)?;
            if path.len() < 2 {
                return Err(MutationError::CannotDetachRoot);
            }
            let format = status != Status::Parsing && config.pretty_print;
            remove_child(root, &path[..path.len() - 1], *target, ids, indent, format)
        }
        Mutation::RemoveChild { parent, child } => {
            let path = resolve(root, *parent)?;
            let format = status != Status::Parsing && config.pretty_print;
            remove_child(root, &path, *child, ids, indent, format)
        }

        Mutation::Replace { target, node } => {
            let path = resolve(root, *target)?;
            if path.len() < 2 {
                return Err(MutationError::CannotDetachRoot);
            }
            let parent_path = &path[..path.len() - 1];
            let parent = &parent_path[parent_path.len() - 1];
            let old_child = path[path.len() - 1].clone();
            let pos = child_position(parent, *target)?;

            let mut node = node.clone();
            let mut hoisted = Vec::new();
            if node.is_element() && status != Status::Parsing {
                let outcome = consolidate(parent_path, &node, &config.qname_valued, ids);
                node = outcome.node;
                hoisted = outcome.hoisted;
            }

            let mut children = parent.children().to_vec();
            children[pos] = node.clone();
            let new_root = rebuild(parent_path, with_children(parent, children));
            let new_root = hoist_declarations(&new_root, hoisted);

            let parents_after = repath(&new_root, parent.id());
            Ok(Applied {
                event: DocumentEvent::Modified {
                    old: NodeInfo {
                        node: old_child,
                        parents_before: parent_path.to_vec(),
                        parents_after: parents_after.clone(),
                    },
                    new: NodeInfo {
                        node,
                        parents_before: parent_path.to_vec(),
                        parents_after,
                    },
                },
                root: new_root,
            })
        }

        Mutation::ReorderChild {
            parent,
            child,
            index,
        } => {
            let path = resolve(root, *parent)?;
            let parent_node = &path[path.len() - 1];
            let pos = child_position(parent_node, *child)?;
            let mut children = parent_node.children().to_vec();
            if *index >= children.len() {
                return Err(MutationError::IndexOutOfRange {
                    index: *index,
                    len: children.len(),
                });
            }
            let moved = children.remove(pos);
            children.insert(*index, moved);
            modified(root, &path, with_children(parent_node, children))
        }

        Mutation::ReorderChildren { parent, order } => {
            let path = resolve(root, *parent)?;
            let parent_node = &path[path.len() - 1];
            let children = parent_node.children();
            let mut seen = vec![false; children.len()];
            if order.len() != children.len()
                || !order.iter().all(|&i| {
                    i < children.len() && !std::mem::replace(&mut seen[i], true)
                })
            {
                return Err(MutationError::InvalidPermutation {
                    len: children.len(),
                });
            }
            let new_children: Vec<_> = order.iter().map(|&i| children[i].clone()).collect();
            modified(root, &path, with_children(parent_node, new_children))
        }

        Mutation::RemoveChildren { parent, children } => {
            let path = resolve(root, *parent)?;
            let parent_node = &path[path.len() - 1];
            if let Some(element) = root.root_element() {
                if children.contains(&element.id()) {
                    return Err(MutationError::CannotDetachRoot);
                }
            }
            for id in children {
                child_position(parent_node, *id)?;
            }
            let new_children: Vec<_> = parent_node
                .children()
                .iter()
                .filter(|c| !children.contains(&c.id()))
                .cloned()
                .collect();
            modified(root, &path, with_children(parent_node, new_children))
        }

        Mutation::SetAttribute { element, attribute } => {
            let path = resolve(root, *element)?;
            let target = &path[path.len() - 1];
            if !target.is_element() {
                return Err(MutationError::NotAnElement(*element));
            }
            let mut attributes = target.attributes().to_vec();
            match attributes.iter_mut().find(|a| a.name == attribute.name) {
                Some(existing) => *existing = attribute.clone(),
                None => attributes.push(attribute.clone()),
            }
            modified(root, &path, with_attributes(target, attributes))
        }

        Mutation::RemoveAttribute { element, name } => {
            let path = resolve(root, *element)?;
            let target = &path[path.len() - 1];
            if !target.is_element() {
                return Err(MutationError::NotAnElement(*element));
            }
            if target.attribute(name).is_none() {
                return Err(MutationError::AttributeNotFound {
                    element: *element,
                    name: name.clone(),
                });
            }
            let attributes: Vec<_> = target
                .attributes()
                .iter()
                .filter(|a| &a.name != name)
                .cloned()
                .collect();
            modified(root, &path, with_attributes(target, attributes))
        }

        Mutation::ReplaceContent { element, fragment } => {
            let path = resolve(root, *element)?;
            let target = &path[path.len() - 1];
            if !target.is_element() {
                return Err(MutationError::NotAnElement(*element));
            }
            let nodes = parse_fragment(fragment, ids)?;

            let mut hoisted = Vec::new();
            let mut children = Vec::with_capacity(nodes.len());
            for node in nodes {
                if node.is_element() && status != Status::Parsing {
                    let outcome = consolidate(&path, &node, &config.qname_valued, ids);
                    children.push(outcome.node);
                    hoisted.extend(outcome.hoisted);
                } else {
                    children.push(node);
                }
            }

            let applied = modified(root, &path, with_children(target, children))?;
            Ok(Applied {
                root: hoist_declarations(&applied.root, hoisted),
                event: applied.event,
            })
        }

        Mutation::SetTextValue { target, value } => {
            let path = resolve(root, *target)?;
            let node = &path[path.len() - 1];
            let XmlNode::Text { id, cdata, .. } = &**node else {
                return Err(MutationError::NotText(*target));
            };
            let new_node = Arc::new(XmlNode::Text {
                id: *id,
                raw: value.clone(),
                cdata: *cdata,
            });
            modified(root, &path, new_node)
        }
    }
}

enum Anchor {
    Index(usize),
    Before(NodeId),
    End,
}

#[allow(clippy::too_many_arguments)]
fn insert(
    root: &Arc<XmlNode>,
    parent: NodeId,
    anchor: Anchor,
    node: &Arc<XmlNode>,
    ids: &mut IdGenerator,
    indent: &mut IndentCache,
    config: &ModelConfig,
    status: Status,
) -> Result<Applied, MutationError> {
    let path = resolve(root, parent)?;
    let parent_node = &path[path.len() - 1];
    if !parent_node.is_container() {
        return Err(MutationError::NotAContainer(parent));
    }

    let mut children = parent_node.children().to_vec();
    let pos = match anchor {
        Anchor::Index(index) => {
            if index > children.len() {
                return Err(MutationError::IndexOutOfRange {
                    index,
                    len: children.len(),
                });
            }
            index
        }
        Anchor::Before(reference) => child_position(parent_node, reference)?,
        Anchor::End => children.len(),
    };

    let mut node = node.clone();
    let mut hoisted = Vec::new();
    if node.is_element() && status != Status::Parsing {
        let outcome = consolidate(&path, &node, &config.qname_valued, ids);
        node = outcome.node;
        hoisted = outcome.hoisted;
    }

    children.insert(pos, node.clone());

    // Indentation for pure structural inserts under an element parent.
    if status != Status::Parsing && config.pretty_print && !node.is_text() && parent_node.is_element()
    {
        let depth = path.len() - 1;
        let mut formatter = Formatter {
            unit: indent.unit_for(root),
            ids,
        };
        formatter.pad_insertion(&mut children, pos, depth);
    }

    let new_root = rebuild(&path, with_children(parent_node, children));
    let new_root = hoist_declarations(&new_root, hoisted);

    let parents_after = repath(&new_root, parent);
    Ok(Applied {
        event: DocumentEvent::Added(NodeInfo {
            node,
            parents_before: path.clone(),
            parents_after,
        }),
        root: new_root,
    })
}

fn remove_child(
    root: &Arc<XmlNode>,
    parent_path: &[Arc<XmlNode>],
    child: NodeId,
    ids: &mut IdGenerator,
    indent: &mut IndentCache,
    format: bool,
) -> Result<Applied, MutationError> {
    if root.root_element().map(|e| e.id()) == Some(child) {
        return Err(MutationError::CannotDetachRoot);
    }
    let parent_node = &parent_path[parent_path.len() - 1];
    let pos = child_position(parent_node, child)?;
    let mut children = parent_node.children().to_vec();
    let removed = children.remove(pos);

    if format && !removed.is_text() && parent_node.is_element() {
        let depth = parent_path.len() - 1;
        let mut formatter = Formatter {
            unit: indent.unit_for(root),
            ids,
        };
        formatter.strip_removal(&mut children, pos, depth);
    }

    let new_root = rebuild(parent_path, with_children(parent_node, children));
    let parents_after = repath(&new_root, parent_node.id());
    Ok(Applied {
        event: DocumentEvent::Deleted(NodeInfo {
            node: removed,
            parents_before: parent_path.to_vec(),
            parents_after,
        }),
        root: new_root,
    })
}

/// Finish a target-node edit: rebuild ancestors and emit a Modified
/// event pairing the old and new node.
fn modified(
    root: &Arc<XmlNode>,
    path: &[Arc<XmlNode>],
    new_node: Arc<XmlNode>,
) -> Result<Applied, MutationError> {
    let old_node = path[path.len() - 1].clone();
    let parents_before = path[..path.len() - 1].to_vec();
    let new_root = rebuild(path, new_node.clone());
    let parents_after = repath(&new_root, new_node.id())
        .split_last()
        .map(|(_, parents)| parents.to_vec())
        .unwrap_or_default();

    Ok(Applied {
        event: DocumentEvent::Modified {
            old: NodeInfo {
                node: old_node,
                parents_before: parents_before.clone(),
                parents_after: parents_after.clone(),
            },
            new: NodeInfo {
                node: new_node,
                parents_before,
                parents_after,
            },
        },
        root: new_root,
    })
}

fn resolve(root: &Arc<XmlNode>, id: NodeId) -> Result<Vec<Arc<XmlNode>>, MutationError> {
    path_to(root, id).ok_or(MutationError::NodeNotFound(id))
}

fn child_position(parent: &Arc<XmlNode>, child: NodeId) -> Result<usize, MutationError> {
    parent
        .children()
        .iter()
        .position(|c| c.id() == child)
        .ok_or(MutationError::NodeNotFound(child))
}

/// Shallow clone with a fresh child list; everything else, id included,
/// carries over.
fn with_children(node: &Arc<XmlNode>, children: Vec<Arc<XmlNode>>) -> Arc<XmlNode> {
    match &**node {
        XmlNode::Document { id, .. } => Arc::new(XmlNode::Document { id: *id, children }),
        XmlNode::Element {
            id,
            name,
            attributes,
            self_closing,
            ..
        } => Arc::new(XmlNode::Element {
            id: *id,
            name: name.clone(),
            attributes: attributes.clone(),
            children,
            self_closing: *self_closing,
        }),
        _ => node.clone(),
    }
}

/// Shallow clone with a fresh attribute list.
fn with_attributes(node: &Arc<XmlNode>, attributes: Vec<Attribute>) -> Arc<XmlNode> {
    match &**node {
        XmlNode::Element {
            id,
            name,
            children,
            self_closing,
            ..
        } => Arc::new(XmlNode::Element {
            id: *id,
            name: name.clone(),
            attributes,
            children: children.clone(),
            self_closing: *self_closing,
        }),
        _ => node.clone(),
    }
}

/// Rebuild the clones along `path` bottom-up: each cloned parent points
/// at the freshly cloned child instead of the original. Returns the new
/// root. Off-path children are moved by reference, never copied.
fn rebuild(path: &[Arc<XmlNode>], new_leaf: Arc<XmlNode>) -> Arc<XmlNode> {
    let mut current = new_leaf;
    for (depth, parent) in path.iter().enumerate().rev().skip(1) {
        let old_child_id = path[depth + 1].id();
        let children = parent
            .children()
            .iter()
            .map(|c| {
                if c.id() == old_child_id {
                    current.clone()
                } else {
                    c.clone()
                }
            })
            .collect();
        current = with_children(parent, children);
    }
    current
}

/// Attach hoisted namespace declarations to the document's root element,
/// skipping prefixes it already declares.
fn hoist_declarations(root: &Arc<XmlNode>, hoisted: Vec<Attribute>) -> Arc<XmlNode> {
    if hoisted.is_empty() {
        return root.clone();
    }
    let Some(element) = root.root_element() else {
        return root.clone();
    };

    let mut attributes = element.attributes().to_vec();
    for decl in hoisted {
        if !attributes.iter().any(|a| a.name == decl.name) {
            tracing::debug!(name = %decl.name, uri = %decl.value, "hoisting namespace declaration");
            attributes.push(decl);
        }
    }
    let new_element = with_attributes(element, attributes);
    let path = [root.clone(), element.clone()];
    rebuild(&path, new_element)
}

/// Ancestor chain of `id` in the rebuilt tree, node itself excluded.
fn repath(root: &Arc<XmlNode>, id: NodeId) -> Vec<Arc<XmlNode>> {
    path_to(root, id).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;
    use xylem_parser::{parse, serialize};

    struct Rig {
        ids: IdGenerator,
        indent: IndentCache,
        config: ModelConfig,
        root: Arc<XmlNode>,
    }

    impl Rig {
        fn new(source: &str) -> Self {
            let mut ids = IdGenerator::new();
            let root = parse(source, &mut ids).unwrap();
            Self {
                ids,
                indent: IndentCache::default(),
                config: ModelConfig::default(),
                root,
            }
        }

        fn apply(&mut self, mutation: Mutation) -> Result<DocumentEvent, MutationError> {
            let applied = apply_mutation(
                &self.root,
                &mutation,
                &mut self.ids,
                &mut self.indent,
                &self.config,
                Status::Stable,
            )?;
            self.root = applied.root;
            Ok(applied.event)
        }

        fn element(&mut self, name: &str) -> Arc<XmlNode> {
            Arc::new(XmlNode::Element {
                id: self.ids.next_id(),
                name: QName::parse(name),
                attributes: Vec::new(),
                children: Vec::new(),
                self_closing: true,
            })
        }

        fn find(&self, local: &str) -> Arc<XmlNode> {
            fn search(node: &Arc<XmlNode>, local: &str) -> Option<Arc<XmlNode>> {
                if node.name().map(|n| n.local.as_str()) == Some(local) {
                    return Some(node.clone());
                }
                node.children().iter().find_map(|c| search(c, local))
            }
            search(&self.root, local).unwrap()
        }
    }

    #[test]
    fn append_pretty_prints_with_default_indent() {
        let mut rig = Rig::new("<a/>");
        let a = rig.find("a");
        let b = rig.element("b");
        rig.apply(Mutation::AppendChild {
            parent: a.id(),
            node: b,
        })
        .unwrap();
        assert_eq!(serialize(&rig.root), "<a>\n    <b/>\n</a>");
    }

    #[test]
    fn delete_restores_the_compact_form() {
        let mut rig = Rig::new("<a/>");
        let a = rig.find("a");
        let b = rig.element("b");
        rig.apply(Mutation::AppendChild {
            parent: a.id(),
            node: b,
        })
        .unwrap();

        let b = rig.find("b");
        rig.apply(Mutation::Delete { target: b.id() }).unwrap();
        assert_eq!(serialize(&rig.root), "<a/>");
    }

    #[test]
    fn off_path_subtrees_are_shared() {
        let mut rig = Rig::new("<a>\n    <b><x/></b>\n    <c><y/></c>\n</a>");
        let before = rig.root.clone();
        let c = rig.find("c");
        let attr_id = rig.ids.next_id();
        rig.apply(Mutation::SetAttribute {
            element: c.id(),
            attribute: Attribute::new(attr_id, QName::new("k"), "v"),
        })
        .unwrap();

        let old_b = before.root_element().unwrap().children()[1].clone();
        let new_b = rig.root.root_element().unwrap().children()[1].clone();
        assert!(Arc::ptr_eq(&old_b, &new_b));

        // The old snapshot still reads consistently.
        assert_eq!(
            serialize(&before),
            "<a>\n    <b><x/></b>\n    <c><y/></c>\n</a>"
        );
    }

    #[test]
    fn edited_nodes_keep_their_ids() {
        let mut rig = Rig::new("<a><b k=\"1\"/></a>");
        let b = rig.find("b");
        let b_id = b.id();
        let attr_id = rig.ids.next_id();
        rig.apply(Mutation::SetAttribute {
            element: b_id,
            attribute: Attribute::new(attr_id, QName::new("k"), "2"),
        })
        .unwrap();
        assert_eq!(rig.find("b").id(), b_id);
    }

    #[test]
    fn attached_node_must_be_detached() {
        let mut rig = Rig::new("<a><b/></a>");
        let a = rig.find("a");
        let b = rig.find("b");
        let err = rig
            .apply(Mutation::AppendChild {
                parent: a.id(),
                node: b.clone(),
            })
            .unwrap_err();
        assert_eq!(err, MutationError::NodeInTree(b.id()));
    }

    #[test]
    fn unknown_target_is_a_precondition_error() {
        let mut rig = Rig::new("<a/>");
        let before = rig.root.clone();
        let err = rig.apply(Mutation::Delete { target: 999 }).unwrap_err();
        assert_eq!(err, MutationError::NodeNotFound(999));
        assert!(Arc::ptr_eq(&before, &rig.root));
    }

    #[test]
    fn index_out_of_range_is_rejected() {
        let mut rig = Rig::new("<a><b/></a>");
        let a = rig.find("a");
        let c = rig.element("c");
        let err = rig
            .apply(Mutation::InsertAt {
                parent: a.id(),
                index: 5,
                node: c,
            })
            .unwrap_err();
        assert!(matches!(err, MutationError::IndexOutOfRange { .. }));
    }

    #[test]
    fn reorder_children_validates_the_permutation() {
        let mut rig = Rig::new("<a><b/><c/></a>");
        let a = rig.find("a");
        let err = rig
            .apply(Mutation::ReorderChildren {
                parent: a.id(),
                order: vec![0, 0],
            })
            .unwrap_err();
        assert!(matches!(err, MutationError::InvalidPermutation { .. }));

        rig.apply(Mutation::ReorderChildren {
            parent: a.id(),
            order: vec![1, 0],
        })
        .unwrap();
        assert_eq!(serialize(&rig.root), "<a><c/><b/></a>");
    }

    #[test]
    fn remove_children_detaches_a_batch() {
        let mut rig = Rig::new("<a><b/><c/><d/></a>");
        let a = rig.find("a");
        let (b, d) = (rig.find("b"), rig.find("d"));
        rig.apply(Mutation::RemoveChildren {
            parent: a.id(),
            children: vec![b.id(), d.id()],
        })
        .unwrap();
        assert_eq!(serialize(&rig.root), "<a><c/></a>");
    }

    #[test]
    fn set_text_value_replaces_the_raw_run() {
        let mut rig = Rig::new("<a>old</a>");
        let text = rig.root.root_element().unwrap().children()[0].clone();
        rig.apply(Mutation::SetTextValue {
            target: text.id(),
            value: "new".to_string(),
        })
        .unwrap();
        assert_eq!(serialize(&rig.root), "<a>new</a>");
        // Same node identity across the edit.
        assert_eq!(
            rig.root.root_element().unwrap().children()[0].id(),
            text.id()
        );
    }

    #[test]
    fn replace_content_parses_a_fragment() {
        let mut rig = Rig::new("<a><old/></a>");
        let a = rig.find("a");
        rig.apply(Mutation::ReplaceContent {
            element: a.id(),
            fragment: "<x/><y/>".to_string(),
        })
        .unwrap();
        assert_eq!(serialize(&rig.root), "<a><x/><y/></a>");
    }

    #[test]
    fn remove_attribute_requires_presence() {
        let mut rig = Rig::new("<a/>");
        let a = rig.find("a");
        let err = rig
            .apply(Mutation::RemoveAttribute {
                element: a.id(),
                name: QName::new("missing"),
            })
            .unwrap_err();
        assert!(matches!(err, MutationError::AttributeNotFound { .. }));
    }

    #[test]
    fn inserting_an_element_consolidates_namespaces() {
        let mut rig = Rig::new(r#"<root xmlns:p="urn:x"><hook/></root>"#);
        let hook = rig.find("hook");

        let mut ids = rig.ids.clone();
        let fragment = parse(r#"<q:item xmlns:q="urn:x"><q:sub/></q:item>"#, &mut ids).unwrap();
        rig.ids = ids;
        let item = fragment.root_element().unwrap().clone();

        rig.config.pretty_print = false;
        rig.apply(Mutation::AppendChild {
            parent: hook.id(),
            node: item,
        })
        .unwrap();

        assert_eq!(
            serialize(&rig.root),
            r#"<root xmlns:p="urn:x"><hook><p:item><p:sub/></p:item></hook></root>"#
        );
    }

    #[test]
    fn unbound_declarations_hoist_to_the_root() {
        let mut rig = Rig::new("<root><hook/></root>");
        let hook = rig.find("hook");

        let mut ids = rig.ids.clone();
        let fragment = parse(r#"<q:item xmlns:q="urn:y"/>"#, &mut ids).unwrap();
        rig.ids = ids;
        let item = fragment.root_element().unwrap().clone();

        rig.config.pretty_print = false;
        rig.apply(Mutation::AppendChild {
            parent: hook.id(),
            node: item,
        })
        .unwrap();

        assert_eq!(
            serialize(&rig.root),
            r#"<root xmlns:q="urn:y"><hook><q:item/></hook></root>"#
        );
    }
}
