use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::history::{Entity, EntityDraft, EntityPatch, Relationship, RelationshipDraft, SavedLayout};

use super::store::{GraphLink, GraphNode, StoreListener};

/// Backend that owns the canonical records. When a session has hooks, every
/// entity and relationship change goes through them first; `None` or `false`
/// means the backend refused and nothing changes locally.
pub trait PersistenceHooks {
    fn on_node_create(&mut self, draft: &EntityDraft) -> Option<Entity>;
    fn on_node_update(&mut self, id: &str, patch: &EntityPatch) -> Option<Entity>;
    fn on_node_delete(&mut self, id: &str) -> bool;
    fn on_link_create(&mut self, draft: &RelationshipDraft) -> Option<Relationship>;
    fn on_link_delete(&mut self, id: &str) -> bool;
}

/// Backend for browsing a dataset without changing its records. Layout
/// changes such as dragging and locking still apply.
pub struct ReadOnlyRecords;

impl PersistenceHooks for ReadOnlyRecords {
    fn on_node_create(&mut self, draft: &EntityDraft) -> Option<Entity> {
        tracing::debug!(name = %draft.name, "read-only: refusing new entity");
        None
    }

    fn on_node_update(&mut self, id: &str, _patch: &EntityPatch) -> Option<Entity> {
        tracing::debug!(id, "read-only: refusing entity update");
        None
    }

    fn on_node_delete(&mut self, id: &str) -> bool {
        tracing::debug!(id, "read-only: refusing entity delete");
        false
    }

    fn on_link_create(&mut self, draft: &RelationshipDraft) -> Option<Relationship> {
        tracing::debug!(source = %draft.source_id, target = %draft.target_id, "read-only: refusing relationship");
        None
    }

    fn on_link_delete(&mut self, id: &str) -> bool {
        tracing::debug!(id, "read-only: refusing relationship delete");
        false
    }
}

pub fn write_layout(path: &Path, layout: &SavedLayout) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(layout).context("failed to encode layout")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Writes the whole layout to a file after every store mutation.
pub struct LayoutAutosave {
    path: PathBuf,
    pending: Vec<GraphNode>,
}

impl LayoutAutosave {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            pending: Vec::new(),
        }
    }
}

impl StoreListener for LayoutAutosave {
    fn nodes_changed(&mut self, nodes: &[GraphNode]) {
        self.pending = nodes.to_vec();
    }

    fn links_changed(&mut self, links: &[GraphLink]) {
        let layout = SavedLayout {
            nodes: self.pending.iter().map(GraphNode::to_saved).collect(),
            links: links
                .iter()
                .map(|link| link.relationship().clone())
                .collect(),
        };
        match write_layout(&self.path, &layout) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "layout autosaved"),
            Err(error) => tracing::warn!(error = %format!("{error:#}"), "autosave failed"),
        }
    }
}
