use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable node identity. Monotonically increasing per model instance,
/// never recycled; clones made along a mutation path keep their id.
pub type NodeId = u32;

/// Qualified name: optional prefix plus local part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }

    pub fn prefixed(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }

    /// Split a raw `prefix:local` name. No prefix when there is no colon.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self::prefixed(prefix, local),
            None => Self::new(raw),
        }
    }

    pub fn with_prefix(&self, prefix: Option<&str>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            local: self.local.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Attribute node. Lives on an element rather than in the child list;
/// the value is the raw source text, entities undecoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: NodeId,
    pub name: QName,
    pub value: String,
}

impl Attribute {
    pub fn new(id: NodeId, name: QName, value: impl Into<String>) -> Self {
        Self {
            id,
            name,
            value: value.into(),
        }
    }

    /// True for `xmlns` and `xmlns:prefix` declarations.
    pub fn is_xmlns(&self) -> bool {
        match &self.name.prefix {
            Some(prefix) => prefix == "xmlns",
            None => self.name.local == "xmlns",
        }
    }

    /// The prefix a namespace declaration binds: `xmlns:p` binds `Some("p")`,
    /// plain `xmlns` binds the default namespace (`None`).
    pub fn declared_prefix(&self) -> Option<&str> {
        match &self.name.prefix {
            Some(prefix) if prefix == "xmlns" => Some(&self.name.local),
            _ => None,
        }
    }

    pub fn decoded(&self) -> String {
        decode_entities(&self.value)
    }
}

/// Immutable document tree node. Subtrees are shared by `Arc` between
/// tree versions; an edit recreates only the path from the edited node
/// to the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum XmlNode {
    /// Tree root; holds the root element plus surrounding misc nodes
    /// (prolog, comments, whitespace).
    Document {
        id: NodeId,
        children: Vec<Arc<XmlNode>>,
    },

    Element {
        id: NodeId,
        name: QName,
        attributes: Vec<Attribute>,
        children: Vec<Arc<XmlNode>>,
        /// Written `<name/>` in the source. Kept so empty elements
        /// round-trip byte-exactly.
        self_closing: bool,
    },

    /// Character data. `raw` is the source run, entities undecoded;
    /// `cdata` marks a `<![CDATA[..]]>` section.
    Text { id: NodeId, raw: String, cdata: bool },

    Comment { id: NodeId, text: String },

    ProcessingInstruction {
        id: NodeId,
        target: String,
        data: String,
    },
}

impl XmlNode {
    pub fn id(&self) -> NodeId {
        match self {
            XmlNode::Document { id, .. }
            | XmlNode::Element { id, .. }
            | XmlNode::Text { id, .. }
            | XmlNode::Comment { id, .. }
            | XmlNode::ProcessingInstruction { id, .. } => *id,
        }
    }

    pub fn children(&self) -> &[Arc<XmlNode>] {
        match self {
            XmlNode::Document { children, .. } | XmlNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        match self {
            XmlNode::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn name(&self) -> Option<&QName> {
        match self {
            XmlNode::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, XmlNode::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, XmlNode::Text { .. })
    }

    /// A text node consisting solely of whitespace (never CDATA).
    pub fn is_whitespace_text(&self) -> bool {
        match self {
            XmlNode::Text { raw, cdata, .. } => !cdata && raw.chars().all(char::is_whitespace),
            _ => false,
        }
    }

    /// Can this node carry children at all?
    pub fn is_container(&self) -> bool {
        matches!(self, XmlNode::Document { .. } | XmlNode::Element { .. })
    }

    pub fn text_raw(&self) -> Option<&str> {
        match self {
            XmlNode::Text { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn decoded_text(&self) -> Option<String> {
        match self {
            XmlNode::Text { raw, cdata, .. } => {
                if *cdata {
                    Some(raw.clone())
                } else {
                    Some(decode_entities(raw))
                }
            }
            _ => None,
        }
    }

    pub fn attribute(&self, name: &QName) -> Option<&Attribute> {
        self.attributes().iter().find(|a| &a.name == name)
    }

    /// The document's root element.
    pub fn root_element(&self) -> Option<&Arc<XmlNode>> {
        match self {
            XmlNode::Document { children, .. } => children.iter().find(|c| c.is_element()),
            _ => None,
        }
    }

    /// Whether a node with the given id is reachable from this node,
    /// attributes included.
    pub fn contains(&self, id: NodeId) -> bool {
        if self.id() == id {
            return true;
        }
        if self.attributes().iter().any(|a| a.id == id) {
            return true;
        }
        self.children().iter().any(|c| c.contains(id))
    }
}

/// Decode the predefined entities and numeric character references.
/// Unknown references are left as written.
pub fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            out.push_str(rest);
            return out;
        };
        let entity = &rest[1..semi];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let decoded = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32);
                match decoded {
                    Some(c) => out.push(c),
                    None => out.push_str(&rest[..=semi]),
                }
            }
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    out
}
