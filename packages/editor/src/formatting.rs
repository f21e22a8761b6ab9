//! Indentation preservation.
//!
//! Structural inserts and removes splice whitespace-only text nodes
//! around the edited child instead of reformatting the document. The
//! indent unit is inferred once per model instance from an existing
//! whitespace run and cached; a document with no usable run falls back
//! to four spaces.
//!
//! Everything here is skipped while the model is applying an external
//! re-parse: that content already reflects authored formatting.

use std::sync::Arc;
use xylem_parser::ast::XmlNode;
use xylem_parser::IdGenerator;

pub const DEFAULT_INDENT: &str = "    ";

/// Per-model-instance indent unit cache.
#[derive(Debug, Clone, Default)]
pub struct IndentCache {
    unit: Option<String>,
}

impl IndentCache {
    /// The inferred indent unit, measuring the tree on first use.
    pub fn unit_for(&mut self, root: &Arc<XmlNode>) -> String {
        if let Some(unit) = &self.unit {
            return unit.clone();
        }
        let unit = infer_unit(root).unwrap_or_else(|| DEFAULT_INDENT.to_string());
        tracing::debug!(width = unit.len(), "inferred indent unit");
        self.unit = Some(unit.clone());
        unit
    }
}

/// First whitespace-only run between siblings that follows a newline.
fn infer_unit(node: &Arc<XmlNode>) -> Option<String> {
    for child in node.children() {
        if let XmlNode::Text {
            raw, cdata: false, ..
        } = &**child
        {
            if raw.chars().all(char::is_whitespace) && raw.contains('\n') {
                let run = raw.rsplit('\n').next().unwrap_or("");
                if !run.is_empty() {
                    return Some(run.to_string());
                }
            }
        }
    }
    node.children().iter().find_map(infer_unit)
}

/// Width of a whitespace node's final line.
fn trailing_run_width(node: &XmlNode) -> usize {
    node.text_raw()
        .map(|raw| raw.rsplit('\n').next().unwrap_or("").len())
        .unwrap_or(0)
}

/// Splices indentation around one child-list edit. Borrows the model's
/// id generator so synthesized whitespace nodes get fresh ids.
pub(crate) struct Formatter<'a> {
    pub unit: String,
    pub ids: &'a mut IdGenerator,
}

impl Formatter<'_> {
    fn ws(&mut self, depth: usize) -> Arc<XmlNode> {
        Arc::new(XmlNode::Text {
            id: self.ids.next_id(),
            raw: format!("\n{}", self.unit.repeat(depth)),
            cdata: false,
        })
    }

    /// Pad a pure insertion. `children` already holds the new node at
    /// `pos`; `depth` is the nesting level of the child list. Returns the
    /// node's final position.
    pub fn pad_insertion(
        &mut self,
        children: &mut Vec<Arc<XmlNode>>,
        mut pos: usize,
        depth: usize,
    ) -> usize {
        let mut has_other = false;
        let mut all_text = true;
        for (i, child) in children.iter().enumerate() {
            if i == pos {
                continue;
            }
            has_other = true;
            if !child.is_text() {
                all_text = false;
            }
        }
        // Simple-content elements are never touched.
        if has_other && all_text {
            return pos;
        }

        let reindented = self.reindent(&children[pos], depth);
        children[pos] = reindented;

        if !has_other {
            children.insert(pos, self.ws(depth));
            pos += 1;
            children.insert(pos + 1, self.ws(depth.saturating_sub(1)));
            return pos;
        }

        // Appending lands after the closing indent; slip in before it.
        if pos == children.len() - 1 && children[pos - 1].is_whitespace_text() {
            children.swap(pos - 1, pos);
            pos -= 1;
        }
        if pos == 0 || !children[pos - 1].is_whitespace_text() {
            children.insert(pos, self.ws(depth));
            pos += 1;
        }
        if pos + 1 >= children.len() || !children[pos + 1].is_whitespace_text() {
            let trailing_depth = if pos + 1 >= children.len() {
                depth.saturating_sub(1)
            } else {
                depth
            };
            children.insert(pos + 1, self.ws(trailing_depth));
        }
        pos
    }

    /// Strip the indentation a removed child leaves behind. `pos` is the
    /// index the node occupied before removal.
    ///
    /// The preceding whitespace sibling is removed only when its final
    /// run is at least as wide as the expected indent for this depth; a
    /// narrower run may be authored formatting worth keeping. Heuristic,
    /// not an invariant.
    pub fn strip_removal(&mut self, children: &mut Vec<Arc<XmlNode>>, pos: usize, depth: usize) {
        if !children.is_empty()
            && children
                .iter()
                .all(|c| c.is_text() && !c.is_whitespace_text())
        {
            return;
        }

        if pos > 0 && pos <= children.len() {
            let prev = &children[pos - 1];
            if prev.is_whitespace_text() && trailing_run_width(prev) >= self.unit.len() * depth.max(1)
            {
                children.remove(pos - 1);
            }
        }

        // Nothing structural left: collapse back to an empty element.
        if !children.is_empty() && children.iter().all(|c| c.is_whitespace_text()) {
            children.clear();
        }
    }

    /// Re-indent an inserted subtree onto the destination depth.
    ///
    /// Subtrees that carry their own whitespace are shifted by whole
    /// indent levels, comparing the first run's width against the
    /// destination's; compact subtrees get indentation synthesized.
    fn reindent(&mut self, node: &Arc<XmlNode>, depth: usize) -> Arc<XmlNode> {
        let XmlNode::Element {
            id,
            name,
            attributes,
            children,
            self_closing,
        } = &**node
        else {
            return node.clone();
        };
        if children.is_empty() || children.iter().all(|c| c.is_text()) {
            return node.clone();
        }

        let unit_width = self.unit.len().max(1);
        let mut out = Vec::with_capacity(children.len() + 2);

        if children.iter().any(|c| c.is_whitespace_text()) {
            let observed = children
                .iter()
                .find(|c| c.is_whitespace_text())
                .map(|c| trailing_run_width(c))
                .unwrap_or(0);
            let shift = depth as isize + 1 - (observed / unit_width).max(1) as isize;

            let last = children.len() - 1;
            for (i, child) in children.iter().enumerate() {
                if child.is_whitespace_text() {
                    let levels = if i == last {
                        depth as isize
                    } else {
                        (trailing_run_width(child) / unit_width) as isize + shift
                    };
                    out.push(Arc::new(XmlNode::Text {
                        id: child.id(),
                        raw: format!("\n{}", self.unit.repeat(levels.max(0) as usize)),
                        cdata: false,
                    }));
                } else {
                    out.push(self.reindent(child, depth + 1));
                }
            }
        } else {
            for child in children {
                out.push(self.ws(depth + 1));
                out.push(self.reindent(child, depth + 1));
            }
            out.push(self.ws(depth));
        }

        Arc::new(XmlNode::Element {
            id: *id,
            name: name.clone(),
            attributes: attributes.clone(),
            children: out,
            self_closing: *self_closing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xylem_parser::{parse, serialize, IdGenerator};

    fn element(ids: &mut IdGenerator, name: &str) -> Arc<XmlNode> {
        Arc::new(XmlNode::Element {
            id: ids.next_id(),
            name: xylem_parser::ast::QName::parse(name),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
        })
    }

    #[test]
    fn infers_unit_from_existing_runs() {
        let mut ids = IdGenerator::new();
        let doc = parse("<a>\n  <b/>\n</a>", &mut ids).unwrap();
        let mut cache = IndentCache::default();
        assert_eq!(cache.unit_for(&doc), "  ");
    }

    #[test]
    fn falls_back_to_four_spaces() {
        let mut ids = IdGenerator::new();
        let doc = parse("<a/>", &mut ids).unwrap();
        let mut cache = IndentCache::default();
        assert_eq!(cache.unit_for(&doc), DEFAULT_INDENT);
    }

    #[test]
    fn pads_insertion_into_empty_parent() {
        let mut ids = IdGenerator::new();
        let b = element(&mut ids, "b");
        let mut children = vec![b];
        let mut fmt = Formatter {
            unit: DEFAULT_INDENT.to_string(),
            ids: &mut ids,
        };
        let pos = fmt.pad_insertion(&mut children, 0, 1);
        assert_eq!(pos, 1);
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].text_raw(), Some("\n    "));
        assert_eq!(children[2].text_raw(), Some("\n"));
    }

    #[test]
    fn append_reuses_the_closing_indent() {
        let mut ids = IdGenerator::new();
        let doc = parse("<a>\n    <b/>\n</a>", &mut ids).unwrap();
        let root = doc.root_element().unwrap();
        let mut children = root.children().to_vec();
        let c = element(&mut ids, "c");
        children.push(c);
        let pos = children.len() - 1;

        let mut fmt = Formatter {
            unit: DEFAULT_INDENT.to_string(),
            ids: &mut ids,
        };
        fmt.pad_insertion(&mut children, pos, 1);

        let texts: Vec<_> = children
            .iter()
            .filter_map(|c| c.text_raw().map(str::to_string))
            .collect();
        assert_eq!(texts, vec!["\n    ", "\n    ", "\n"]);
    }

    #[test]
    fn simple_content_is_untouched() {
        let mut ids = IdGenerator::new();
        let doc = parse("<a>hello</a>", &mut ids).unwrap();
        let root = doc.root_element().unwrap();
        let mut children = root.children().to_vec();
        children.push(element(&mut ids, "b"));
        let pos = children.len() - 1;

        let mut fmt = Formatter {
            unit: DEFAULT_INDENT.to_string(),
            ids: &mut ids,
        };
        fmt.pad_insertion(&mut children, pos, 1);
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn strip_removal_drops_the_indent_and_collapses() {
        let mut ids = IdGenerator::new();
        let doc = parse("<a>\n    <b/>\n</a>", &mut ids).unwrap();
        let root = doc.root_element().unwrap();
        let mut children = root.children().to_vec();
        children.remove(1); // <b/>

        let mut fmt = Formatter {
            unit: DEFAULT_INDENT.to_string(),
            ids: &mut ids,
        };
        fmt.strip_removal(&mut children, 1, 1);
        assert!(children.is_empty());
    }

    #[test]
    fn strip_removal_keeps_narrow_runs() {
        let mut ids = IdGenerator::new();
        let doc = parse("<a>\n  <b/>\n  <c/>\n</a>", &mut ids).unwrap();
        let root = doc.root_element().unwrap();
        let mut children = root.children().to_vec();
        children.remove(1); // <b/>

        // Expected indent is four wide; the two-space run stays.
        let mut fmt = Formatter {
            unit: DEFAULT_INDENT.to_string(),
            ids: &mut ids,
        };
        fmt.strip_removal(&mut children, 1, 1);
        assert_eq!(children.len(), 4);
    }

    #[test]
    fn compact_subtrees_are_reindented_on_insert() {
        let mut ids = IdGenerator::new();
        let subtree = parse("<x><y/></x>", &mut ids).unwrap();
        let x = subtree.root_element().unwrap().clone();
        let mut children = vec![x];

        let mut fmt = Formatter {
            unit: DEFAULT_INDENT.to_string(),
            ids: &mut ids,
        };
        let pos = fmt.pad_insertion(&mut children, 0, 1);
        assert_eq!(serialize(&children[pos]), "<x>\n        <y/>\n    </x>");
    }
}
