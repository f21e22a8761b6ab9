use std::sync::Arc;
use xylem_parser::ast::{Attribute, NodeId, XmlNode};

/// Visitor pattern for traversing document trees.
///
/// Default implementations walk the entire tree; override specific
/// `visit_*` methods to act on the node kinds you care about. Dispatch is
/// static, by matching on the node variant.
pub trait Visitor: Sized {
    fn visit_document(&mut self, node: &Arc<XmlNode>) {
        walk_children(self, node);
    }

    fn visit_element(&mut self, node: &Arc<XmlNode>) {
        for attribute in node.attributes() {
            self.visit_attribute(attribute);
        }
        walk_children(self, node);
    }

    fn visit_attribute(&mut self, _attribute: &Attribute) {
        // Leaf node, no children to walk
    }

    fn visit_text(&mut self, _node: &Arc<XmlNode>) {
        // Leaf node, no children to walk
    }

    fn visit_comment(&mut self, _node: &Arc<XmlNode>) {
        // Leaf node, no children to walk
    }

    fn visit_processing_instruction(&mut self, _node: &Arc<XmlNode>) {
        // Leaf node, no children to walk
    }
}

/// Dispatch one node to the matching visit method.
pub fn walk_node<V: Visitor>(visitor: &mut V, node: &Arc<XmlNode>) {
    match &**node {
        XmlNode::Document { .. } => visitor.visit_document(node),
        XmlNode::Element { .. } => visitor.visit_element(node),
        XmlNode::Text { .. } => visitor.visit_text(node),
        XmlNode::Comment { .. } => visitor.visit_comment(node),
        XmlNode::ProcessingInstruction { .. } => visitor.visit_processing_instruction(node),
    }
}

pub fn walk_children<V: Visitor>(visitor: &mut V, node: &Arc<XmlNode>) {
    for child in node.children() {
        walk_node(visitor, child);
    }
}

/// Pre-order traversal with a plain closure.
pub fn for_each_node(node: &Arc<XmlNode>, f: &mut impl FnMut(&Arc<XmlNode>)) {
    f(node);
    for child in node.children() {
        for_each_node(child, f);
    }
}

/// Find a node by id anywhere under `root`.
pub fn find_by_id(root: &Arc<XmlNode>, id: NodeId) -> Option<Arc<XmlNode>> {
    if root.id() == id {
        return Some(root.clone());
    }
    root.children().iter().find_map(|c| find_by_id(c, id))
}

/// The chain of nodes from `root` down to the node with the given id,
/// inclusive at both ends. `None` when the id is not reachable.
pub fn path_to(root: &Arc<XmlNode>, id: NodeId) -> Option<Vec<Arc<XmlNode>>> {
    fn descend(node: &Arc<XmlNode>, id: NodeId, path: &mut Vec<Arc<XmlNode>>) -> bool {
        path.push(node.clone());
        if node.id() == id {
            return true;
        }
        for child in node.children() {
            if descend(child, id, path) {
                return true;
            }
        }
        path.pop();
        false
    }

    let mut path = Vec::new();
    descend(root, id, &mut path).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xylem_parser::{parse, IdGenerator};

    struct ElementCounter {
        elements: usize,
        attributes: usize,
    }

    impl Visitor for ElementCounter {
        fn visit_element(&mut self, node: &Arc<XmlNode>) {
            self.elements += 1;
            for attribute in node.attributes() {
                self.visit_attribute(attribute);
            }
            walk_children(self, node);
        }

        fn visit_attribute(&mut self, _attribute: &Attribute) {
            self.attributes += 1;
        }
    }

    #[test]
    fn visitor_walks_the_whole_tree() {
        let doc = parse(
            r#"<a x="1"><b y="2"><c/></b><d/></a>"#,
            &mut IdGenerator::new(),
        )
        .unwrap();
        let mut counter = ElementCounter {
            elements: 0,
            attributes: 0,
        };
        walk_node(&mut counter, &doc);
        assert_eq!(counter.elements, 4);
        assert_eq!(counter.attributes, 2);
    }

    #[test]
    fn path_to_returns_root_first_chain() {
        let doc = parse("<a><b><c/></b></a>", &mut IdGenerator::new()).unwrap();
        let c = find_by_id(&doc, 4).unwrap();
        assert_eq!(c.name().unwrap().local, "c");

        let path = path_to(&doc, 4).unwrap();
        let names: Vec<_> = path
            .iter()
            .map(|n| n.name().map(|q| q.local.clone()))
            .collect();
        assert_eq!(
            names,
            vec![
                None,
                Some("a".to_string()),
                Some("b".to_string()),
                Some("c".to_string())
            ]
        );

        assert!(path_to(&doc, 99).is_none());
    }
}
