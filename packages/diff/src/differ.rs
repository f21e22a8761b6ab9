//! Tree differ.
//!
//! Compares two document trees and produces an ordered list of
//! differences. Elements that represent the same logical node in both
//! trees are matched by a configurable identity heuristic: equal
//! qualified name plus equal values of the identifying attributes
//! (`id`, `name`, `ref` by default), with a positional fallback for
//! nodes the heuristic cannot distinguish. Matched pairs are recursed
//! into; unmatched subtrees surface as whole-subtree adds or deletes.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use xylem_parser::ast::{Attribute, QName, XmlNode};

/// Identifying attribute names used to match elements across trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub attributes: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            attributes: vec!["id".to_string(), "name".to_string(), "ref".to_string()],
        }
    }
}

/// A node plus its ancestor chains, root first, node excluded.
///
/// `parents_before` is the chain in the old tree (for an added node: the
/// chain of the parent it will be inserted under); `parents_after` is the
/// chain in the new tree. Listeners can resolve tree position from these
/// without re-walking either tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node: Arc<XmlNode>,
    pub parents_before: Vec<Arc<XmlNode>>,
    pub parents_after: Vec<Arc<XmlNode>>,
}

impl NodeInfo {
    pub fn parent_before(&self) -> Option<&Arc<XmlNode>> {
        self.parents_before.last()
    }

    pub fn parent_after(&self) -> Option<&Arc<XmlNode>> {
        self.parents_after.last()
    }
}

/// One attribute-level change on a matched element pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDiff {
    pub name: QName,
    pub old: Option<Attribute>,
    pub new: Option<Attribute>,
}

/// A single structural difference between two trees, in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Difference {
    /// A subtree present only in the new tree. `index` is its position in
    /// the new parent's child list.
    Add { info: NodeInfo, index: usize },

    /// A subtree present only in the old tree. `index` is its position in
    /// the old parent's child list.
    Delete { info: NodeInfo, index: usize },

    /// A matched pair that differs in attributes, text value, or sibling
    /// position.
    Change {
        old: NodeInfo,
        new: NodeInfo,
        position_changed: bool,
        new_index: usize,
        attributes: Vec<AttributeDiff>,
    },
}

/// Compare two trees and return the ordered difference list. Identical
/// trees produce an empty list.
pub fn diff(old: &Arc<XmlNode>, new: &Arc<XmlNode>, config: &IdentityConfig) -> Vec<Difference> {
    let mut out = Vec::new();
    let mut chain_old = vec![old.clone()];
    let mut chain_new = vec![new.clone()];
    diff_children(&mut chain_old, &mut chain_new, config, &mut out);
    tracing::debug!(differences = out.len(), "tree comparison finished");
    out
}

fn diff_children(
    chain_old: &mut Vec<Arc<XmlNode>>,
    chain_new: &mut Vec<Arc<XmlNode>>,
    config: &IdentityConfig,
    out: &mut Vec<Difference>,
) {
    let old_parent = chain_old[chain_old.len() - 1].clone();
    let new_parent = chain_new[chain_new.len() - 1].clone();
    let old_children = old_parent.children();
    let new_children = new_parent.children();

    let mut matched_new = vec![false; new_children.len()];
    let mut pairs: Vec<Option<usize>> = vec![None; old_children.len()];

    // Pass 1: identity matches.
    for (i, old_child) in old_children.iter().enumerate() {
        for (j, new_child) in new_children.iter().enumerate() {
            if !matched_new[j] && identity_match(old_child, new_child, config) {
                pairs[i] = Some(j);
                matched_new[j] = true;
                break;
            }
        }
    }

    // Pass 2: positional fallback among leftovers of the same kind.
    for (i, old_child) in old_children.iter().enumerate() {
        if pairs[i].is_some() {
            continue;
        }
        for (j, new_child) in new_children.iter().enumerate() {
            if !matched_new[j] && weak_match(old_child, new_child, config) {
                pairs[i] = Some(j);
                matched_new[j] = true;
                break;
            }
        }
    }

    // Deletes, deepest index first so earlier indices stay valid while
    // the sync coordinator applies them.
    for (i, old_child) in old_children.iter().enumerate().rev() {
        if pairs[i].is_none() {
            out.push(Difference::Delete {
                info: NodeInfo {
                    node: old_child.clone(),
                    parents_before: chain_old.clone(),
                    parents_after: chain_new.clone(),
                },
                index: i,
            });
        }
    }

    // Changes on matched pairs, then recursion, in new-tree order.
    let mut matched: Vec<(usize, usize)> = pairs
        .iter()
        .enumerate()
        .filter_map(|(i, j)| j.map(|j| (i, j)))
        .collect();
    matched.sort_by_key(|&(_, j)| j);

    // A pair's position changed when its rank among matched siblings
    // differs between the trees; this ignores shifts caused purely by
    // adds and deletes around it.
    let mut by_old: Vec<usize> = (0..matched.len()).collect();
    by_old.sort_by_key(|&k| matched[k].0);

    for (rank_new, &(i, j)) in matched.iter().enumerate() {
        let old_child = &old_children[i];
        let new_child = &new_children[j];
        let rank_old = by_old
            .iter()
            .position(|&k| matched[k] == (i, j))
            .unwrap_or(rank_new);
        let position_changed = rank_old != rank_new;

        let attributes = attribute_diffs(old_child, new_child);
        let text_changed = old_child.is_text() && old_child.text_raw() != new_child.text_raw();

        if position_changed || text_changed || !attributes.is_empty() {
            out.push(Difference::Change {
                old: NodeInfo {
                    node: old_child.clone(),
                    parents_before: chain_old.clone(),
                    parents_after: chain_new.clone(),
                },
                new: NodeInfo {
                    node: new_child.clone(),
                    parents_before: chain_old.clone(),
                    parents_after: chain_new.clone(),
                },
                position_changed,
                new_index: j,
                attributes,
            });
        }

        if old_child.is_element() {
            chain_old.push(old_child.clone());
            chain_new.push(new_child.clone());
            diff_children(chain_old, chain_new, config, out);
            chain_old.pop();
            chain_new.pop();
        }
    }

    // Adds, ascending new index.
    for (j, new_child) in new_children.iter().enumerate() {
        if !matched_new[j] {
            out.push(Difference::Add {
                info: NodeInfo {
                    node: new_child.clone(),
                    parents_before: chain_old.clone(),
                    parents_after: chain_new.clone(),
                },
                index: j,
            });
        }
    }
}

/// Strong match: same kind, and for elements same name plus identical
/// identifying attribute values; for text nodes an identical raw run.
fn identity_match(old: &Arc<XmlNode>, new: &Arc<XmlNode>, config: &IdentityConfig) -> bool {
    match (&**old, &**new) {
        (
            XmlNode::Element { name: on, .. },
            XmlNode::Element { name: nn, .. },
        ) => {
            if on != nn {
                return false;
            }
            config.attributes.iter().all(|attr| {
                let key = QName::parse(attr);
                let ov = old.attribute(&key).map(|a| &a.value);
                let nv = new.attribute(&key).map(|a| &a.value);
                ov == nv
            })
        }
        (XmlNode::Text { raw: or, cdata: oc, .. }, XmlNode::Text { raw: nr, cdata: nc, .. }) => {
            or == nr && oc == nc
        }
        (XmlNode::Comment { text: ot, .. }, XmlNode::Comment { text: nt, .. }) => ot == nt,
        (
            XmlNode::ProcessingInstruction { target: ot, data: od, .. },
            XmlNode::ProcessingInstruction { target: nt, data: nd, .. },
        ) => ot == nt && od == nd,
        _ => false,
    }
}

/// Fallback match: same kind and, for elements, the same name without a
/// conflicting identifying attribute (both trees carrying the attribute
/// with different values marks two distinct logical nodes). Content may
/// differ — that is what produces a Change instead of a delete/add pair.
fn weak_match(old: &Arc<XmlNode>, new: &Arc<XmlNode>, config: &IdentityConfig) -> bool {
    match (&**old, &**new) {
        (XmlNode::Element { name: on, .. }, XmlNode::Element { name: nn, .. }) => {
            on == nn
                && config.attributes.iter().all(|attr| {
                    let key = QName::parse(attr);
                    match (old.attribute(&key), new.attribute(&key)) {
                        (Some(a), Some(b)) => a.value == b.value,
                        _ => true,
                    }
                })
        }
        (XmlNode::Text { cdata: oc, .. }, XmlNode::Text { cdata: nc, .. }) => oc == nc,
        (XmlNode::Comment { .. }, XmlNode::Comment { .. }) => true,
        (
            XmlNode::ProcessingInstruction { target: ot, .. },
            XmlNode::ProcessingInstruction { target: nt, .. },
        ) => ot == nt,
        _ => false,
    }
}

fn attribute_diffs(old: &Arc<XmlNode>, new: &Arc<XmlNode>) -> Vec<AttributeDiff> {
    if !old.is_element() || !new.is_element() {
        return Vec::new();
    }

    let mut diffs = Vec::new();
    for old_attr in old.attributes() {
        match new.attribute(&old_attr.name) {
            None => diffs.push(AttributeDiff {
                name: old_attr.name.clone(),
                old: Some(old_attr.clone()),
                new: None,
            }),
            Some(new_attr) if new_attr.value != old_attr.value => diffs.push(AttributeDiff {
                name: old_attr.name.clone(),
                old: Some(old_attr.clone()),
                new: Some(new_attr.clone()),
            }),
            Some(_) => {}
        }
    }
    for new_attr in new.attributes() {
        if old.attribute(&new_attr.name).is_none() {
            diffs.push(AttributeDiff {
                name: new_attr.name.clone(),
                old: None,
                new: Some(new_attr.clone()),
            });
        }
    }
    diffs
}
