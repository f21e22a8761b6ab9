//! Model-level mutation coverage: one test per operation family, plus
//! the precondition failures that must leave the model untouched.

use std::sync::Arc;
use xylem_editor::{
    EditorError, MemoryBuffer, Mutation, MutationError, QName, XmlModel,
};
use xylem_parser::ast::XmlNode;

fn synced_model(text: &str) -> XmlModel {
    let buffer = MemoryBuffer::new(text);
    let model = XmlModel::new();
    let prep = model.prepare(&buffer);
    model.commit(prep).unwrap();
    model
}

fn find(model: &XmlModel, local: &str) -> Arc<XmlNode> {
    fn search(node: &Arc<XmlNode>, local: &str) -> Option<Arc<XmlNode>> {
        if node.name().map(|n| n.local.as_str()) == Some(local) {
            return Some(node.clone());
        }
        node.children().iter().find_map(|c| search(c, local))
    }
    search(&model.document().unwrap(), local).unwrap()
}

#[test]
fn insert_before_places_the_node_at_the_reference() {
    let model = synced_model("<a><b/><c/></a>");
    let (a, c) = (find(&model, "a"), find(&model, "c"));
    let x = model.create_element("x");
    model
        .apply(Mutation::InsertBefore {
            parent: a.id(),
            reference: c.id(),
            node: x,
        })
        .unwrap();

    // Simple-content check does not apply; siblings are elements, and
    // the compact source has no indentation to mimic, so the formatter
    // synthesizes it.
    let names: Vec<_> = model
        .document()
        .unwrap()
        .root_element()
        .unwrap()
        .children()
        .iter()
        .filter_map(|n| n.name().map(|q| q.local.clone()))
        .collect();
    assert_eq!(names, vec!["b", "x", "c"]);
}

#[test]
fn replace_swaps_a_child_in_place() {
    let model = synced_model("<a><b/><c/></a>");
    let b = find(&model, "b");
    let x = model.create_element("x");
    model
        .apply(Mutation::Replace {
            target: b.id(),
            node: x,
        })
        .unwrap();
    assert_eq!(model.text().unwrap(), "<a><x/><c/></a>");
}

#[test]
fn remove_child_targets_a_named_child() {
    let model = synced_model("<a><b/><c/></a>");
    let (a, b) = (find(&model, "a"), find(&model, "b"));
    model
        .apply(Mutation::RemoveChild {
            parent: a.id(),
            child: b.id(),
        })
        .unwrap();
    assert_eq!(model.text().unwrap(), "<a><c/></a>");
}

#[test]
fn reorder_child_moves_within_siblings() {
    let model = synced_model("<a><b/><c/><d/></a>");
    let (a, d) = (find(&model, "a"), find(&model, "d"));
    model
        .apply(Mutation::ReorderChild {
            parent: a.id(),
            child: d.id(),
            index: 0,
        })
        .unwrap();
    assert_eq!(model.text().unwrap(), "<a><d/><b/><c/></a>");
}

#[test]
fn reorder_children_applies_a_permutation() {
    let model = synced_model("<a><b/><c/><d/></a>");
    let a = find(&model, "a");
    model
        .apply(Mutation::ReorderChildren {
            parent: a.id(),
            order: vec![2, 0, 1],
        })
        .unwrap();
    assert_eq!(model.text().unwrap(), "<a><d/><b/><c/></a>");
}

#[test]
fn remove_children_batch() {
    let model = synced_model("<a><b/><c/><d/></a>");
    let a = find(&model, "a");
    let (b, d) = (find(&model, "b"), find(&model, "d"));
    model
        .apply(Mutation::RemoveChildren {
            parent: a.id(),
            children: vec![b.id(), d.id()],
        })
        .unwrap();
    assert_eq!(model.text().unwrap(), "<a><c/></a>");
}

#[test]
fn set_and_remove_attribute() {
    let model = synced_model("<a><b/></a>");
    let b = find(&model, "b");

    let attr = model.create_attribute("k", "v");
    model
        .apply(Mutation::SetAttribute {
            element: b.id(),
            attribute: attr,
        })
        .unwrap();
    assert_eq!(model.text().unwrap(), "<a><b k=\"v\"/></a>");

    model
        .apply(Mutation::RemoveAttribute {
            element: b.id(),
            name: QName::new("k"),
        })
        .unwrap();
    assert_eq!(model.text().unwrap(), "<a><b/></a>");
}

#[test]
fn set_text_value_on_simple_content() {
    let model = synced_model("<a><b>old</b></a>");
    let b = find(&model, "b");
    let text = b.children()[0].clone();
    model
        .apply(Mutation::SetTextValue {
            target: text.id(),
            value: "new".to_string(),
        })
        .unwrap();
    assert_eq!(model.text().unwrap(), "<a><b>new</b></a>");
}

#[test]
fn replace_content_swaps_the_whole_child_list() {
    let model = synced_model("<a><b>old</b></a>");
    let b = find(&model, "b");
    model
        .apply(Mutation::ReplaceContent {
            element: b.id(),
            fragment: "fresh <em>text</em>".to_string(),
        })
        .unwrap();
    assert_eq!(model.text().unwrap(), "<a><b>fresh <em>text</em></b></a>");
}

#[test]
fn precondition_failures_leave_the_document_untouched() {
    let model = synced_model("<a><b/></a>");
    let before = model.document().unwrap();
    let (a, b) = (find(&model, "a"), find(&model, "b"));

    // Unknown target.
    let err = model.apply(Mutation::Delete { target: 999 }).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Mutation(MutationError::NodeNotFound(999))
    ));

    // Already-attached node offered as an insertion.
    let err = model
        .apply(Mutation::AppendChild {
            parent: a.id(),
            node: b.clone(),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::Mutation(MutationError::NodeInTree(_))
    ));

    // Out-of-range index.
    let x = model.create_element("x");
    let err = model
        .apply(Mutation::InsertAt {
            parent: a.id(),
            index: 9,
            node: x,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::Mutation(MutationError::IndexOutOfRange { .. })
    ));

    assert!(Arc::ptr_eq(&before, &model.document().unwrap()));
    assert!(!model.can_undo());
}

#[test]
fn text_targets_reject_element_operations() {
    let model = synced_model("<a>hello</a>");
    let a = find(&model, "a");
    let text = a.children()[0].clone();

    let err = model
        .apply(Mutation::SetTextValue {
            target: a.id(),
            value: "nope".to_string(),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::Mutation(MutationError::NotText(_))
    ));

    let attr = model.create_attribute("k", "v");
    let err = model
        .apply(Mutation::SetAttribute {
            element: text.id(),
            attribute: attr,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::Mutation(MutationError::NotAnElement(_))
    ));
}

#[test]
fn mutations_are_wire_representable() {
    let mutation = Mutation::SetTextValue {
        target: 7,
        value: "x".to_string(),
    };
    let json = serde_json::to_string(&mutation).unwrap();
    let back: Mutation = serde_json::from_str(&json).unwrap();
    assert_eq!(mutation, back);
}

#[test]
fn the_document_root_cannot_be_detached() {
    let model = synced_model("<a/>");
    let a = find(&model, "a");
    let err = model.apply(Mutation::Delete { target: a.id() }).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Mutation(MutationError::CannotDetachRoot)
    ));
}
