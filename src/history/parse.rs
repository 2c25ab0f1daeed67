use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{Dataset, Entity, Relationship};

/// A node of a previously saved, already positioned layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedNode {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fy: Option<f32>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub depth: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedLayout {
    #[serde(default)]
    pub nodes: Vec<SavedNode>,
    #[serde(default)]
    pub links: Vec<Relationship>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Ingest {
    Dataset(Dataset),
    Layout(SavedLayout),
}

impl Ingest {
    pub fn entity_count(&self) -> usize {
        match self {
            Self::Dataset(dataset) => dataset.entities.len(),
            Self::Layout(layout) => layout.nodes.len(),
        }
    }
}

pub fn parse_ingest(raw: &str) -> Result<Ingest> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON in dataset")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("expected a JSON object at the top level"))?;

    if object.contains_key("nodes") {
        let nodes = collect_entries::<SavedNode>(object.get("nodes"), "nodes")?;
        let links = collect_entries::<Relationship>(object.get("links"), "links")?;
        return Ok(Ingest::Layout(SavedLayout { nodes, links }));
    }

    if object.contains_key("entities") {
        let entities = collect_entries::<Entity>(object.get("entities"), "entities")?;
        let relationships =
            collect_entries::<Relationship>(object.get("relationships"), "relationships")?;
        return Ok(Ingest::Dataset(Dataset {
            entities,
            relationships,
        }));
    }

    Err(anyhow!(
        "could not recognise dataset JSON; expected `entities` or `nodes` at the top level"
    ))
}

fn collect_entries<T: DeserializeOwned>(value: Option<&Value>, field: &str) -> Result<Vec<T>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let entries = value
        .as_array()
        .ok_or_else(|| anyhow!("`{field}` must be an array"))?;

    let mut parsed = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match T::deserialize(entry) {
            Ok(item) => parsed.push(item),
            Err(error) => {
                tracing::warn!(field, index, %error, "skipping malformed entry");
            }
        }
    }
    Ok(parsed)
}
