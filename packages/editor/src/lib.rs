//! # Xylem editor
//!
//! Document model core for Xylem: keeps an immutable XML tree
//! synchronized with an externally-edited text buffer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: buffer text → node tree             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: model lifecycle + mutations         │
//! │  - prepare/commit two-phase sync            │
//! │  - copy-on-write structural edits           │
//! │  - indentation + namespace post-passes      │
//! │  - snapshot-pair undo/redo                  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ diff: tree × tree → ordered differences     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core principles
//!
//! 1. **The tree is immutable**: an edit clones only the path from the
//!    edited node to the root; everything else is shared by reference.
//! 2. **Readers are never torn**: a reader holding a root sees that
//!    whole tree forever; installs are atomic reference swaps.
//! 3. **Sync is two-phase**: parse+diff is speculative and read-only;
//!    commit validates against races before swapping.
//! 4. **History is snapshots**: undo records pair whole-document
//!    references and re-derive events through the differ.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xylem_editor::{MemoryBuffer, Mutation, XmlModel};
//!
//! let mut buffer = MemoryBuffer::new("<config>\n    <item/>\n</config>");
//! let model = XmlModel::new();
//!
//! // Sync the buffer into the model.
//! let prep = model.prepare(&buffer);
//! model.commit(prep)?;
//!
//! // Structural edit through the mutation engine.
//! let root = model.document()?.root_element().unwrap().clone();
//! let entry = model.create_element("entry");
//! model.apply(Mutation::AppendChild { parent: root.id(), node: entry })?;
//!
//! // Write the result back.
//! model.flush(&mut buffer)?;
//! ```

mod buffer;
mod errors;
mod events;
mod formatting;
mod model;
mod mutations;
mod namespaces;
mod sync;
mod undo_stack;

pub use buffer::{Buffer, BufferListener, ListenerId, MemoryBuffer, TextDelta};
pub use errors::EditorError;
pub use events::{event_for, ChangeListener, DocumentEvent};
pub use formatting::{IndentCache, DEFAULT_INDENT};
pub use model::{ModelConfig, Status, XmlModel};
pub use mutations::{Mutation, MutationError, MutationType};
pub use namespaces::QNameValuedAttrs;
pub use sync::SyncPreparation;
pub use undo_stack::{UndoRecord, UndoStack};

// Re-export collaborator types for convenience
pub use xylem_diff::{diff, AttributeDiff, Difference, IdentityConfig, NodeInfo};
pub use xylem_parser::ast::{Attribute, NodeId, QName, XmlNode};
