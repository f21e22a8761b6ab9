//! Undo/redo sequences over committed mutations.
//!
//! History records pair whole-document snapshots; undo and redo are
//! reference swaps validated against the live document, with events
//! re-derived through the differ.

use std::sync::{Arc, Mutex};
use xylem_editor::{
    Buffer, ChangeListener, DocumentEvent, EditorError, MemoryBuffer, Mutation, XmlModel,
};
use xylem_parser::ast::XmlNode;

fn synced_model(text: &str) -> (XmlModel, MemoryBuffer) {
    let buffer = MemoryBuffer::new(text);
    let model = XmlModel::new();
    let prep = model.prepare(&buffer);
    model.commit(prep).unwrap();
    (model, buffer)
}

fn append_named(model: &XmlModel, parent: &Arc<XmlNode>, name: &str) -> Arc<XmlNode> {
    let node = model.create_element(name);
    model
        .apply(Mutation::AppendChild {
            parent: parent.id(),
            node: node.clone(),
        })
        .unwrap();
    node
}

#[test]
fn undo_n_then_redo_n_restores_reference_equal_documents() {
    let (model, _) = synced_model("<a/>");
    let root = model.document().unwrap().root_element().unwrap().clone();
    let doc0 = model.document().unwrap();

    let b = append_named(&model, &root, "b");
    append_named(&model, &b, "c");
    let attr = model.create_attribute("k", "v");
    model
        .apply(Mutation::SetAttribute {
            element: b.id(),
            attribute: attr,
        })
        .unwrap();
    let doc3 = model.document().unwrap();

    for _ in 0..3 {
        assert!(model.undo().unwrap());
    }
    assert!(Arc::ptr_eq(&model.document().unwrap(), &doc0));

    // Nothing left to undo.
    assert!(!model.undo().unwrap());

    for _ in 0..3 {
        assert!(model.redo().unwrap());
    }
    assert!(Arc::ptr_eq(&model.document().unwrap(), &doc3));
    assert!(!model.redo().unwrap());
}

#[test]
fn undo_past_mutations_restores_the_pre_sync_document() {
    let (model, mut buffer) = synced_model("<a/>");
    let doc0 = model.document().unwrap();

    // One incremental sync, then one direct mutation on top.
    buffer.replace("<a><b id=\"1\"/></a>").unwrap();
    let prep = model.prepare(&buffer);
    model.commit(prep).unwrap();
    let doc1 = model.document().unwrap();

    let b = doc1.root_element().unwrap().children()[0].clone();
    let attr = model.create_attribute("k", "v");
    model
        .apply(Mutation::SetAttribute {
            element: b.id(),
            attribute: attr,
        })
        .unwrap();

    assert!(model.undo().unwrap());
    assert!(Arc::ptr_eq(&model.document().unwrap(), &doc1));

    assert!(model.undo().unwrap());
    assert!(Arc::ptr_eq(&model.document().unwrap(), &doc0));
}

#[test]
fn undo_rederives_events_from_the_snapshots() {
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl ChangeListener for Recorder {
        fn on_change(&self, event: &DocumentEvent) {
            let kind = match event {
                DocumentEvent::Added(_) => "added",
                DocumentEvent::Deleted(_) => "deleted",
                DocumentEvent::Modified { .. } => "modified",
            };
            self.0.lock().unwrap().push(kind.to_string());
        }
    }

    let (model, _) = synced_model("<a/>");
    let root = model.document().unwrap().root_element().unwrap().clone();
    append_named(&model, &root, "b");

    let recorder = Recorder::default();
    model.add_listener(Box::new(recorder.clone()));

    // Undoing the append reads back as deletions of the element and its
    // indentation.
    model.undo().unwrap();
    let kinds = recorder.0.lock().unwrap().clone();
    assert!(!kinds.is_empty());
    assert!(kinds.iter().all(|k| k == "deleted"));

    model.redo().unwrap();
    let kinds = recorder.0.lock().unwrap().clone();
    assert!(kinds.iter().skip(kinds.len() - 1).all(|k| k == "added"));
}

#[test]
fn compound_brackets_collapse_into_one_undo_step() {
    let (model, _) = synced_model("<list/>");
    let root = model.document().unwrap().root_element().unwrap().clone();
    let doc0 = model.document().unwrap();

    model.begin_compound();
    append_named(&model, &root, "one");
    append_named(&model, &root, "two");
    model.end_compound();

    assert!(model.undo().unwrap());
    assert!(Arc::ptr_eq(&model.document().unwrap(), &doc0));
    assert!(!model.can_undo());

    assert!(model.redo().unwrap());
    assert_eq!(
        model.text().unwrap(),
        "<list>\n    <one/>\n    <two/>\n</list>"
    );
}

#[test]
fn undo_fails_when_the_live_document_moved_on() {
    let (model, _) = synced_model("<a/>");
    let root = model.document().unwrap().root_element().unwrap().clone();
    append_named(&model, &root, "b");

    // An open compound swallows the next transition, so the last pushed
    // record no longer ends at the live document.
    model.begin_compound();
    append_named(&model, &root, "c");

    let err = model.undo().unwrap_err();
    assert!(matches!(err, EditorError::CannotUndo));

    // The record is still there once the bracket closes.
    model.end_compound();
    assert!(model.undo().unwrap());
    assert!(model.undo().unwrap());
}

#[test]
fn new_edits_clear_the_redo_stack() {
    let (model, _) = synced_model("<a/>");
    let root = model.document().unwrap().root_element().unwrap().clone();

    append_named(&model, &root, "b");
    model.undo().unwrap();
    assert!(model.can_redo());

    append_named(&model, &root, "c");
    assert!(!model.can_redo());
}
