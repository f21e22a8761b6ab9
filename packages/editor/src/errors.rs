//! Error types for the editor

use crate::model::Status;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("parse error: {0}")]
    Parse(#[from] xylem_parser::ParseError),

    #[error("mutation error: {0}")]
    Mutation(#[from] crate::mutations::MutationError),

    #[error("buffer error: {0}")]
    Buffer(#[from] xylem_common::CommonError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is not accessible while {0:?}")]
    State(Status),

    #[error("stale precondition: the document changed between prepare and commit")]
    Stale,

    #[error("cannot undo: the document changed since the edit was recorded")]
    CannotUndo,

    #[error("cannot redo: the document changed since the edit was undone")]
    CannotRedo,
}
