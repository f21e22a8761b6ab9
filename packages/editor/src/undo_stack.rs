//! Undo/redo history.
//!
//! Each record pairs whole-document references — not a diff. Undo and
//! redo are O(1) reference swaps; the fine-grained events listeners see
//! are re-derived by running the differ between the two snapshots, so
//! the history never has to remember the original difference list.
//!
//! Compound brackets coalesce every record pushed between `begin` and
//! `end` into a single larger-span record: the records chain (each
//! record's new document is the next one's old), so the bracket keeps
//! only the endpoints.

use std::sync::Arc;
use xylem_parser::ast::XmlNode;

/// One undoable transition between document snapshots.
#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub old: Arc<XmlNode>,
    pub new: Arc<XmlNode>,
}

#[derive(Debug, Default)]
struct Compound {
    start: Option<Arc<XmlNode>>,
    end: Option<Arc<XmlNode>>,
}

#[derive(Debug)]
pub struct UndoStack {
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    max_levels: usize,
    compound: Option<Compound>,
}

impl UndoStack {
    /// Default bound of 100 levels.
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            compound: None,
        }
    }

    /// Record one committed transition. Inside a compound bracket the
    /// transition is folded into the bracket instead of pushed.
    pub fn record(&mut self, old: Arc<XmlNode>, new: Arc<XmlNode>) {
        if let Some(compound) = &mut self.compound {
            if compound.start.is_none() {
                compound.start = Some(old);
            }
            compound.end = Some(new);
        } else {
            self.push(UndoRecord { old, new });
        }
    }

    pub fn begin_compound(&mut self) {
        self.compound = Some(Compound::default());
    }

    pub fn end_compound(&mut self) {
        if let Some(compound) = self.compound.take() {
            if let (Some(old), Some(new)) = (compound.start, compound.end) {
                self.push(UndoRecord { old, new });
            }
        }
    }

    fn push(&mut self, record: UndoRecord) {
        self.undo_stack.push(record);
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
        // A new edit invalidates the redo future.
        self.redo_stack.clear();
    }

    pub fn pop_undo(&mut self) -> Option<UndoRecord> {
        self.undo_stack.pop()
    }

    pub fn pop_redo(&mut self) -> Option<UndoRecord> {
        self.redo_stack.pop()
    }

    /// Push straight onto the redo side: an undone record, or one put
    /// back after failed validation.
    pub fn push_redo(&mut self, record: UndoRecord) {
        self.redo_stack.push(record);
    }

    /// Push straight onto the undo side without touching redo: a redone
    /// record, or one put back after failed validation.
    pub fn push_undo(&mut self, record: UndoRecord) {
        self.undo_stack.push(record);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.compound = None;
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
