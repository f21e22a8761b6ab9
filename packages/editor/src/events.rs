//! Fine-grained change notifications.
//!
//! Every committed edit fires one event per structural difference it
//! introduced. Events carry `NodeInfo`s with before/after ancestor
//! chains so listeners can resolve positions without walking the tree.

use std::sync::Arc;
use xylem_diff::{Difference, NodeInfo};
use xylem_parser::ast::XmlNode;

#[derive(Debug, Clone)]
pub enum DocumentEvent {
    Added(NodeInfo),
    Deleted(NodeInfo),
    Modified { old: NodeInfo, new: NodeInfo },
}

impl DocumentEvent {
    /// The primary node the event is about (the new node for adds and
    /// modifications, the removed node for deletes).
    pub fn node(&self) -> &Arc<XmlNode> {
        match self {
            DocumentEvent::Added(info) | DocumentEvent::Deleted(info) => &info.node,
            DocumentEvent::Modified { new, .. } => &new.node,
        }
    }
}

/// Receiver for document change events.
///
/// Listeners run synchronously under the model lock; they must not call
/// back into the model.
pub trait ChangeListener: Send {
    fn on_change(&self, event: &DocumentEvent);
}

/// Map a structural difference onto the event a listener sees for it.
pub fn event_for(difference: &Difference) -> DocumentEvent {
    match difference {
        Difference::Add { info, .. } => DocumentEvent::Added(info.clone()),
        Difference::Delete { info, .. } => DocumentEvent::Deleted(info.clone()),
        Difference::Change { old, new, .. } => DocumentEvent::Modified {
            old: old.clone(),
            new: new.clone(),
        },
    }
}
