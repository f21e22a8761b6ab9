use crate::ast::XmlNode;

/// Serializer converts a tree back to source text.
///
/// Raw token text is written back verbatim (text runs, attribute values,
/// self-closing form), so a freshly parsed document serializes to the
/// exact input. Structural edits splice whitespace text nodes instead of
/// reformatting, which keeps this writer trivial.
pub struct Serializer;

impl Serializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize(&self, node: &XmlNode) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn write_node(&self, node: &XmlNode, out: &mut String) {
        match node {
            XmlNode::Document { children, .. } => {
                for child in children {
                    self.write_node(child, out);
                }
            }

            XmlNode::Element {
                name,
                attributes,
                children,
                self_closing,
                ..
            } => {
                out.push('<');
                out.push_str(&name.to_string());
                for attr in attributes {
                    out.push(' ');
                    out.push_str(&attr.name.to_string());
                    out.push_str("=\"");
                    out.push_str(&attr.value);
                    out.push('"');
                }
                if children.is_empty() && *self_closing {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for child in children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(&name.to_string());
                    out.push('>');
                }
            }

            XmlNode::Text { raw, cdata, .. } => {
                if *cdata {
                    out.push_str("<![CDATA[");
                    out.push_str(raw);
                    out.push_str("]]>");
                } else {
                    out.push_str(raw);
                }
            }

            XmlNode::Comment { text, .. } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }

            XmlNode::ProcessingInstruction { target, data, .. } => {
                out.push_str("<?");
                out.push_str(target);
                if !data.is_empty() {
                    out.push(' ');
                    out.push_str(data);
                }
                out.push_str("?>");
            }
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a tree to text.
pub fn serialize(node: &XmlNode) -> String {
    Serializer::new().serialize(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id_generator::IdGenerator;
    use crate::parser::parse;

    fn round_trip(source: &str) {
        let doc = parse(source, &mut IdGenerator::new()).unwrap();
        assert_eq!(serialize(&doc), source);
    }

    #[test]
    fn round_trips_plain_documents() {
        round_trip("<a/>");
        round_trip("<a></a>");
        round_trip("<a><b>hi</b><c/></a>");
    }

    #[test]
    fn round_trips_whitespace_and_attributes() {
        round_trip("<a>\n    <b id=\"1\"/>\n    <b id=\"2\">x</b>\n</a>");
    }

    #[test]
    fn round_trips_entities_raw() {
        round_trip("<a t=\"x &amp; y\">1 &lt; 2</a>");
    }

    #[test]
    fn round_trips_prolog_comment_cdata() {
        round_trip("<?xml version=\"1.0\"?>\n<a><!-- note --><![CDATA[<k>]]></a>\n");
    }
}
