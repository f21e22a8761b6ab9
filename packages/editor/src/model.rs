//! # Document model handle
//!
//! `XmlModel` owns the current document reference and everything that
//! changes it: the mutation API, the two-phase sync entry points, and
//! the undo/redo history.
//!
//! ## Lifecycle
//!
//! ```text
//! Buffer → prepare → commit → mutate* → flush
//!    ↓        ↓         ↓        ↓        ↓
//!  text    parse+diff  swap    new root  text
//! ```
//!
//! Access is single-writer: one per-instance lock guards every read and
//! mutation for its duration. The only optimism is at install time —
//! commit, undo, and redo verify the live root is still the snapshot
//! they expect and abort with a stale error otherwise.

use crate::buffer::Buffer;
use crate::errors::EditorError;
use crate::events::{event_for, ChangeListener, DocumentEvent};
use crate::formatting::IndentCache;
use crate::mutations::{apply_mutation, Mutation};
use crate::namespaces::QNameValuedAttrs;
use crate::undo_stack::UndoStack;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use xylem_diff::{diff, IdentityConfig};
use xylem_parser::ast::{Attribute, QName, XmlNode};
use xylem_parser::{serialize, IdGenerator};

/// Model state machine.
///
/// The document is readable only while `Stable` or `Parsing`. A failure
/// during tree construction or merge moves to `Broken`, keeping the
/// prior stable root installed until the next successful sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Unparsed,
    Parsing,
    Stable,
    Broken,
}

/// Caller-facing configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Identifying attribute names for the diff engine's node matching.
    pub identity: IdentityConfig,

    /// Element name → attribute names whose values are QName-valued;
    /// consulted by namespace prefix rewrites.
    pub qname_valued: QNameValuedAttrs,

    /// Synthesize indentation around structural edits.
    pub pretty_print: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            qname_valued: QNameValuedAttrs::default(),
            pretty_print: true,
        }
    }
}

pub(crate) struct ModelState {
    pub status: Status,
    pub current: Option<Arc<XmlNode>>,
    pub ids: IdGenerator,
    pub indent: IndentCache,
    pub undo: UndoStack,
    pub listeners: Vec<Box<dyn ChangeListener>>,
}

impl ModelState {
    pub fn fire(&self, event: &DocumentEvent) {
        for listener in &self.listeners {
            listener.on_change(event);
        }
    }
}

/// The document model. Cheap to share behind an `Arc`; all methods take
/// `&self` and serialize through the internal lock.
pub struct XmlModel {
    pub(crate) config: ModelConfig,
    pub(crate) state: Mutex<ModelState>,
}

impl XmlModel {
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ModelState {
                status: Status::Unparsed,
                current: None,
                ids: IdGenerator::new(),
                indent: IndentCache::default(),
                undo: UndoStack::new(),
                listeners: Vec::new(),
            }),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ModelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> Status {
        self.lock().status
    }

    /// The current document. Readable only while `Stable` or `Parsing`.
    pub fn document(&self) -> Result<Arc<XmlNode>, EditorError> {
        let st = self.lock();
        match st.status {
            Status::Stable | Status::Parsing => {
                st.current.clone().ok_or(EditorError::State(st.status))
            }
            other => Err(EditorError::State(other)),
        }
    }

    /// Serialize the current document on demand.
    pub fn text(&self) -> Result<String, EditorError> {
        Ok(serialize(&*self.document()?))
    }

    /// Serialize the current document into the buffer.
    pub fn flush(&self, buffer: &mut dyn Buffer) -> Result<(), EditorError> {
        let text = self.text()?;
        buffer.replace(&text)?;
        Ok(())
    }

    pub fn add_listener(&self, listener: Box<dyn ChangeListener>) {
        self.lock().listeners.push(listener);
    }

    /// Build a detached element with a fresh id from this model's space.
    pub fn create_element(&self, name: &str) -> Arc<XmlNode> {
        Arc::new(XmlNode::Element {
            id: self.lock().ids.next_id(),
            name: QName::parse(name),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
        })
    }

    pub fn create_text(&self, raw: &str) -> Arc<XmlNode> {
        Arc::new(XmlNode::Text {
            id: self.lock().ids.next_id(),
            raw: raw.to_string(),
            cdata: false,
        })
    }

    pub fn create_attribute(&self, name: &str, value: &str) -> Attribute {
        Attribute::new(self.lock().ids.next_id(), QName::parse(name), value)
    }

    /// Apply one structural mutation, firing its event and recording one
    /// undo transition.
    pub fn apply(&self, mutation: Mutation) -> Result<(), EditorError> {
        let mut st = self.lock();
        if !matches!(st.status, Status::Stable | Status::Parsing) {
            return Err(EditorError::State(st.status));
        }
        let status = st.status;
        let old = st.current.clone().ok_or(EditorError::State(status))?;

        tracing::debug!(kind = ?mutation.mutation_type(), "applying mutation");
        let applied = {
            let ModelState { ids, indent, .. } = &mut *st;
            apply_mutation(&old, &mutation, ids, indent, &self.config, status)?
        };

        st.current = Some(applied.root.clone());
        st.undo.record(old, applied.root);
        st.fire(&applied.event);
        Ok(())
    }

    /// Bracket the following commits into one undo record.
    pub fn begin_compound(&self) {
        self.lock().undo.begin_compound();
    }

    pub fn end_compound(&self) {
        self.lock().undo.end_compound();
    }

    pub fn can_undo(&self) -> bool {
        self.lock().undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock().undo.can_redo()
    }

    /// Swap the document back to the previous snapshot. Returns `false`
    /// when there is nothing to undo. Fails with `CannotUndo` when the
    /// live document no longer matches the recorded transition.
    pub fn undo(&self) -> Result<bool, EditorError> {
        let mut st = self.lock();
        let Some(record) = st.undo.pop_undo() else {
            return Ok(false);
        };
        if st.status != Status::Stable
            || !st
                .current
                .as_ref()
                .is_some_and(|c| Arc::ptr_eq(c, &record.new))
        {
            st.undo.push_undo(record);
            return Err(EditorError::CannotUndo);
        }

        st.current = Some(record.old.clone());
        // Events are re-derived from the snapshots; the history never
        // stores fine-grained differences.
        let events: Vec<DocumentEvent> = diff(&record.new, &record.old, &self.config.identity)
            .iter()
            .map(event_for)
            .collect();
        st.undo.push_redo(record);
        for event in &events {
            st.fire(event);
        }
        Ok(true)
    }

    /// Re-apply the most recently undone transition.
    pub fn redo(&self) -> Result<bool, EditorError> {
        let mut st = self.lock();
        let Some(record) = st.undo.pop_redo() else {
            return Ok(false);
        };
        if st.status != Status::Stable
            || !st
                .current
                .as_ref()
                .is_some_and(|c| Arc::ptr_eq(c, &record.old))
        {
            st.undo.push_redo(record);
            return Err(EditorError::CannotRedo);
        }

        st.current = Some(record.new.clone());
        let events: Vec<DocumentEvent> = diff(&record.old, &record.new, &self.config.identity)
            .iter()
            .map(event_for)
            .collect();
        st.undo.push_undo(record);
        for event in &events {
            st.fire(event);
        }
        Ok(true)
    }
}

impl Default for XmlModel {
    fn default() -> Self {
        Self::new()
    }
}
