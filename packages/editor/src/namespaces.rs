//! Namespace consolidation.
//!
//! Runs when an element subtree is inserted into a document. Every
//! `xmlns` declaration found inside the subtree is reconciled against
//! the bindings visible at the insertion point:
//!
//! - prefix free and namespace unbound: the declaration is hoisted to
//!   the document root and removed locally;
//! - identical binding already in scope: the local declaration is
//!   dropped;
//! - namespace already bound to a different prefix: every use of the
//!   subtree's prefix is rewritten to the in-scope one (element names,
//!   attribute names, and attribute values registered as QName-valued),
//!   then the local declaration is dropped;
//! - prefix taken by a different namespace: the local declaration stays,
//!   shadowing intentionally.
//!
//! Attribute-local prefixes are reconciled before the bulk rename so the
//! rename pass does not touch attributes it should leave alone.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use xylem_common::{walk_node, Visitor};
use xylem_parser::ast::{Attribute, NodeId, QName, XmlNode};
use xylem_parser::IdGenerator;

/// Caller-registered map: element qualified name to the attribute names
/// whose string values are QName-valued. Needed so prefix rewrites also
/// patch attribute value text, not just tag and attribute names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QNameValuedAttrs {
    map: HashMap<String, Vec<String>>,
}

impl QNameValuedAttrs {
    pub fn register(
        &mut self,
        element: impl Into<String>,
        attributes: impl IntoIterator<Item = String>,
    ) {
        self.map
            .entry(element.into())
            .or_default()
            .extend(attributes);
    }

    pub fn is_qname_valued(&self, element: &QName, attribute: &QName) -> bool {
        let names = [element.to_string(), element.local.clone()];
        names.iter().any(|key| {
            self.map.get(key).is_some_and(|attrs| {
                attrs
                    .iter()
                    .any(|a| *a == attribute.to_string() || *a == attribute.local)
            })
        })
    }
}

/// Namespace bindings visible at a tree position: prefix (or `None` for
/// the default namespace) to namespace URI, nearest declaration winning.
#[derive(Debug, Default)]
pub(crate) struct ScopeBindings {
    by_prefix: HashMap<Option<String>, String>,
}

impl ScopeBindings {
    /// Collect the bindings along a root-first ancestor chain.
    pub fn at(path: &[Arc<XmlNode>]) -> Self {
        let mut scope = Self::default();
        for node in path {
            for attr in node.attributes() {
                if attr.is_xmlns() {
                    scope.by_prefix.insert(
                        attr.declared_prefix().map(str::to_string),
                        attr.value.clone(),
                    );
                }
            }
        }
        scope
    }

    fn uri_for(&self, prefix: Option<&str>) -> Option<&str> {
        self.by_prefix
            .get(&prefix.map(str::to_string))
            .map(String::as_str)
    }

    /// The prefix a URI is bound to in scope, preferring a named prefix
    /// over the default namespace.
    fn prefix_for(&self, uri: &str) -> Option<Option<&str>> {
        let mut found = None;
        for (prefix, bound) in &self.by_prefix {
            if bound == uri {
                match prefix {
                    Some(p) => return Some(Some(p.as_str())),
                    None => found = Some(None),
                }
            }
        }
        found
    }
}

/// What consolidation decided for one declaration.
#[derive(Debug, Clone, PartialEq)]
enum DeclAction {
    /// Identical binding already in scope: drop the declaration.
    Drop,
    /// Namespace bound to another prefix in scope: drop the declaration
    /// and rewrite uses of its prefix onto the in-scope one.
    Rebind(Option<String>),
    /// Prefix taken by a different namespace: intentional shadowing.
    Keep,
    /// Free prefix, unbound namespace: declare once, at the root.
    Hoist,
}

/// Outcome of consolidating an inserted subtree.
pub(crate) struct Consolidation {
    pub node: Arc<XmlNode>,
    /// Declarations to move onto the document root.
    pub hoisted: Vec<Attribute>,
}

/// Reconcile the declarations inside `node` against the bindings visible
/// along `scope_path` (root-first chain ending at the insertion parent).
pub(crate) fn consolidate(
    scope_path: &[Arc<XmlNode>],
    node: &Arc<XmlNode>,
    config: &QNameValuedAttrs,
    ids: &mut IdGenerator,
) -> Consolidation {
    let scope = ScopeBindings::at(scope_path);

    let mut actions: HashMap<NodeId, DeclAction> = HashMap::new();
    let mut hoisted: Vec<Attribute> = Vec::new();
    let mut hoist_claimed: HashMap<Option<String>, String> = HashMap::new();

    collect_declarations(node, &mut |attr: &Attribute| {
        let prefix = attr.declared_prefix().map(str::to_string);
        let uri = attr.value.as_str();

        let action = if scope.uri_for(prefix.as_deref()) == Some(uri) {
            DeclAction::Drop
        } else if let Some(existing) = scope.prefix_for(uri) {
            tracing::debug!(from = ?prefix, to = ?existing, uri, "rebinding inserted prefix");
            DeclAction::Rebind(existing.map(str::to_string))
        } else if scope.uri_for(prefix.as_deref()).is_some() {
            DeclAction::Keep
        } else {
            match hoist_claimed.get(&prefix) {
                // A sibling declaration already hoisted this binding.
                Some(claimed) if claimed == uri => DeclAction::Drop,
                // The prefix was hoisted for another namespace; shadow.
                Some(_) => DeclAction::Keep,
                None => {
                    hoist_claimed.insert(prefix.clone(), uri.to_string());
                    hoisted.push(Attribute::new(ids.next_id(), attr.name.clone(), uri));
                    DeclAction::Hoist
                }
            }
        };
        actions.insert(attr.id, action);
    });

    if actions.values().all(|a| *a == DeclAction::Keep) {
        return Consolidation {
            node: node.clone(),
            hoisted,
        };
    }

    let rewritten = rewrite(node, &HashMap::new(), &actions, config);
    Consolidation {
        node: rewritten,
        hoisted,
    }
}

struct DeclCollector<F: FnMut(&Attribute)> {
    f: F,
}

impl<F: FnMut(&Attribute)> Visitor for DeclCollector<F> {
    fn visit_attribute(&mut self, attribute: &Attribute) {
        if attribute.is_xmlns() {
            (self.f)(attribute);
        }
    }
}

fn collect_declarations(node: &Arc<XmlNode>, f: impl FnMut(&Attribute)) {
    walk_node(&mut DeclCollector { f }, node);
}

fn rewrite(
    node: &Arc<XmlNode>,
    renames: &HashMap<Option<String>, Option<String>>,
    actions: &HashMap<NodeId, DeclAction>,
    config: &QNameValuedAttrs,
) -> Arc<XmlNode> {
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

    // Any redeclaration on this element rebinds its prefix for the whole
    // subtree: the outer rename stops here, and a rebound declaration
    // installs its own.
    let mut renames = renames.clone();
    for attr in attributes {
        if !attr.is_xmlns() {
            continue;
        }
        let prefix = attr.declared_prefix().map(str::to_string);
        match actions.get(&attr.id) {
            Some(DeclAction::Rebind(to)) => {
                renames.insert(prefix, to.clone());
            }
            _ => {
                renames.remove(&prefix);
            }
        }
    }

    let new_name = renamed(name, &renames, true);
    let original_name = name;

    let mut new_attributes = Vec::with_capacity(attributes.len());
    for attr in attributes {
        if matches!(
            actions.get(&attr.id),
            Some(DeclAction::Drop) | Some(DeclAction::Rebind(_)) | Some(DeclAction::Hoist)
        ) {
            continue;
        }
        // Attribute-local prefix first, then QName-valued value text.
        let attr_name = renamed(&attr.name, &renames, false);
        let mut value = attr.value.clone();
        if config.is_qname_valued(original_name, &attr.name) {
            let value_name = QName::parse(&value);
            let rewritten = renamed(&value_name, &renames, true);
            if rewritten != value_name {
                value = rewritten.to_string();
            }
        }
        new_attributes.push(Attribute::new(attr.id, attr_name, value));
    }

    let new_children = children
        .iter()
        .map(|child| rewrite(child, &renames, actions, config))
        .collect();

    Arc::new(XmlNode::Element {
        id: *id,
        name: new_name,
        attributes: new_attributes,
        children: new_children,
        self_closing: *self_closing,
    })
}

/// Apply a prefix rename to one name. Unprefixed attribute names carry
/// no namespace, so the default-namespace rename only applies to
/// element names (`element` flag).
fn renamed(
    name: &QName,
    renames: &HashMap<Option<String>, Option<String>>,
    element: bool,
) -> QName {
    if name.prefix.as_deref() == Some("xmlns") {
        return name.clone();
    }
    if name.prefix.is_none() && !element {
        return name.clone();
    }
    match renames.get(&name.prefix) {
        Some(new_prefix) => name.with_prefix(new_prefix.as_deref()),
        None => name.clone(),
    }
}
