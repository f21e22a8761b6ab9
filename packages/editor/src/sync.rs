//! Two-phase buffer synchronization.
//!
//! `prepare` is the expensive, read-only half: it parses the buffer and
//! diffs the candidate tree against the stable one, capturing the result
//! in a `SyncPreparation`. `commit` is the cheap half: it validates that
//! the stable document is still the one the preparation was computed
//! against, applies the captured result, fires one event per difference,
//! and records one aggregated undo transition.
//!
//! Separating detection from application lets a caller discard
//! speculative work, and makes a lost commit race an explicit, harmless
//! error instead of silent corruption.

use crate::errors::EditorError;
use crate::events::{event_for, DocumentEvent};
use crate::formatting::IndentCache;
use crate::model::{ModelConfig, ModelState, Status, XmlModel};
use crate::mutations::{apply_mutation, Mutation, MutationError};
use crate::Buffer;
use std::sync::Arc;
use xylem_diff::{diff, Difference};
use xylem_parser::ast::XmlNode;
use xylem_parser::IdGenerator;

/// Captured outcome of one `prepare` call. Holds exactly one of: a fresh
/// tree, a (stable tree, differences) pair, or an error. Consumed by
/// value exactly once, whether the commit succeeds or fails.
pub struct SyncPreparation {
    kind: PrepKind,
}

enum PrepKind {
    Fresh(Arc<XmlNode>),
    Incremental {
        stable: Arc<XmlNode>,
        differences: Vec<Difference>,
    },
    Failed(EditorError),
}

impl SyncPreparation {
    fn new(kind: PrepKind) -> Self {
        Self { kind }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self.kind, PrepKind::Fresh(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.kind, PrepKind::Failed(_))
    }

    /// The captured difference list of an incremental preparation.
    pub fn differences(&self) -> Option<&[Difference]> {
        match &self.kind {
            PrepKind::Incremental { differences, .. } => Some(differences),
            _ => None,
        }
    }
}

impl XmlModel {
    /// Parse the buffer and capture what a commit would apply. Does not
    /// change any visible model state.
    pub fn prepare(&self, buffer: &dyn Buffer) -> SyncPreparation {
        let text = match buffer.text() {
            Ok(text) => text,
            Err(error) => return SyncPreparation::new(PrepKind::Failed(error.into())),
        };

        let mut st = self.lock();
        match xylem_parser::parse(&text, &mut st.ids) {
            Err(error) => {
                tracing::warn!(%error, "prepare: buffer text failed to parse");
                SyncPreparation::new(PrepKind::Failed(error.into()))
            }
            Ok(candidate) => {
                if st.status == Status::Stable {
                    if let Some(stable) = st.current.clone() {
                        let differences = diff(&stable, &candidate, &self.config.identity);
                        // A replaced root element cannot be expressed as a
                        // child edit; fall back to a whole-tree swap.
                        let root_replaced =
                            stable.root_element().map(|e| e.id()).is_some_and(|id| {
                                differences.iter().any(|d| {
                                    matches!(d, Difference::Delete { info, .. }
                                        if info.node.id() == id)
                                })
                            });
                        if !root_replaced {
                            tracing::debug!(
                                differences = differences.len(),
                                "prepare: incremental sync ready"
                            );
                            return SyncPreparation::new(PrepKind::Incremental {
                                stable,
                                differences,
                            });
                        }
                        tracing::debug!("prepare: root element changed, full replace");
                    }
                }
                SyncPreparation::new(PrepKind::Fresh(candidate))
            }
        }
    }

    /// Apply a captured preparation.
    pub fn commit(&self, preparation: SyncPreparation) -> Result<(), EditorError> {
        let mut st = self.lock();
        match preparation.kind {
            PrepKind::Failed(error) => {
                // The prior stable root stays installed as the fallback,
                // but readers see the broken state.
                st.status = Status::Broken;
                Err(error)
            }

            PrepKind::Fresh(document) => {
                st.status = Status::Parsing;
                st.current = Some(document);
                st.status = Status::Stable;
                // Snapshots recorded against a replaced tree can never
                // validate again.
                st.undo.clear();
                Ok(())
            }

            PrepKind::Incremental {
                stable,
                differences,
            } => {
                let live_matches = st
                    .current
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &stable));
                if st.status != Status::Stable || !live_matches {
                    return Err(EditorError::Stale);
                }
                if differences.is_empty() {
                    return Ok(());
                }

                st.status = Status::Parsing;
                let before = stable;
                let result = {
                    let ModelState { ids, indent, .. } = &mut *st;
                    apply_differences(before.clone(), &differences, ids, indent, &self.config)
                };

                match result {
                    Ok((root, events)) => {
                        st.current = Some(root.clone());
                        st.status = Status::Stable;
                        st.undo.record(before, root);
                        for event in &events {
                            st.fire(event);
                        }
                        Ok(())
                    }
                    Err(error) => {
                        tracing::warn!(%error, "commit: merge failed, rolling back");
                        st.current = Some(before);
                        st.status = Status::Broken;
                        Err(error.into())
                    }
                }
            }
        }
    }
}

/// Apply the differences of one commit against the stable tree.
///
/// Targets are node ids, which stay valid while the tree evolves, but
/// child indices do not — so application is staged: removals first
/// (captured deepest-index first), then attribute and text changes, then
/// insertions at their final indices, then position reorders in
/// ascending target order. Staged this way every index is valid at the
/// moment it is used. Events still fire in difference order.
fn apply_differences(
    mut root: Arc<XmlNode>,
    differences: &[Difference],
    ids: &mut IdGenerator,
    indent: &mut IndentCache,
    config: &ModelConfig,
) -> Result<(Arc<XmlNode>, Vec<DocumentEvent>), MutationError> {
    let mut removals = Vec::new();
    let mut rewrites = Vec::new();
    let mut insertions = Vec::new();
    let mut reorders = Vec::new();

    for difference in differences {
        match difference {
            Difference::Delete { info, .. } => {
                removals.push(Mutation::Delete {
                    target: info.node.id(),
                });
            }
            Difference::Add { info, index } => {
                let parent = info
                    .parent_before()
                    .map(|p| p.id())
                    .ok_or(MutationError::NodeNotFound(info.node.id()))?;
                insertions.push(Mutation::InsertAt {
                    parent,
                    index: *index,
                    node: info.node.clone(),
                });
            }
            Difference::Change {
                old,
                new,
                position_changed,
                new_index,
                attributes,
            } => {
                if old.node.is_text() {
                    if let Some(raw) = new.node.text_raw() {
                        rewrites.push(Mutation::SetTextValue {
                            target: old.node.id(),
                            value: raw.to_string(),
                        });
                    }
                }
                for attribute in attributes {
                    match (&attribute.old, &attribute.new) {
                        (_, Some(new_attr)) => rewrites.push(Mutation::SetAttribute {
                            element: old.node.id(),
                            attribute: new_attr.clone(),
                        }),
                        (Some(_), None) => rewrites.push(Mutation::RemoveAttribute {
                            element: old.node.id(),
                            name: attribute.name.clone(),
                        }),
                        (None, None) => {}
                    }
                }
                if *position_changed {
                    let parent = old
                        .parent_before()
                        .map(|p| p.id())
                        .ok_or(MutationError::NodeNotFound(old.node.id()))?;
                    reorders.push(Mutation::ReorderChild {
                        parent,
                        child: old.node.id(),
                        index: *new_index,
                    });
                }
            }
        }
    }

    for mutation in removals
        .into_iter()
        .chain(rewrites)
        .chain(insertions)
        .chain(reorders)
    {
        let applied = apply_mutation(&root, &mutation, ids, indent, config, Status::Parsing)?;
        root = applied.root;
    }

    let events = differences.iter().map(event_for).collect();
    Ok((root, events))
}
