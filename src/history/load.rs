use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use super::model::{Dataset, Entity, EntityKind, RelationKind, Relationship};
use super::parse::{Ingest, parse_ingest};

pub fn load_ingest(path: Option<&Path>) -> Result<Ingest> {
    let Some(path) = path else {
        tracing::info!("no dataset given, using the built-in demo dataset");
        return Ok(Ingest::Dataset(demo_dataset()));
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    let ingest = parse_ingest(&raw)
        .with_context(|| format!("failed to parse dataset {}", path.display()))?;

    if ingest.entity_count() == 0 {
        return Err(anyhow!("dataset {} contains no entities", path.display()));
    }

    tracing::info!(
        path = %path.display(),
        entities = ingest.entity_count(),
        "dataset loaded"
    );
    Ok(ingest)
}

fn entity(id: &str, name: &str, kind: EntityKind, year: Option<i32>, tags: &[&str]) -> Entity {
    Entity {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        description: String::new(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        date: None,
        year,
        image_url: None,
    }
}

fn relationship(id: &str, source: &str, target: &str, kind: RelationKind, text: &str) -> Relationship {
    Relationship {
        id: id.to_string(),
        source_id: source.to_string(),
        target_id: target.to_string(),
        description: text.to_string(),
        kind,
    }
}

/// Offline dataset shown when no file is given.
pub fn demo_dataset() -> Dataset {
    use EntityKind::*;
    use RelationKind::*;

    let mut entities = vec![
        entity("gutenberg", "Johannes Gutenberg", Person, Some(1400), &["printing"]),
        entity("press", "Movable-type printing press", Event, Some(1450), &["printing"]),
        entity("bible", "Gutenberg Bible", Document, Some(1455), &["printing", "scripture"]),
        entity("luther", "Martin Luther", Person, Some(1483), &["reformation"]),
        entity("theses", "Ninety-five Theses", Document, Some(1517), &["reformation"]),
        entity("reformation", "Protestant Reformation", Event, Some(1517), &["reformation"]),
        entity("worms", "Diet of Worms", Event, Some(1521), &["reformation"]),
        entity("erasmus", "Erasmus of Rotterdam", Person, Some(1466), &["humanism"]),
        entity("humanism", "Renaissance humanism", Concept, None, &["humanism"]),
        entity("vernacular", "Vernacular translation", Term, None, &["scripture"]),
        entity("calvin", "John Calvin", Person, Some(1509), &["reformation"]),
        entity("institutes", "Institutes of the Christian Religion", Document, Some(1536), &[]),
    ];
    entities[4].date = Some("1517-10-31".to_string());
    entities[4].year = None;
    entities[0].description = "Goldsmith and inventor from Mainz.".to_string();
    entities[3].description = "German theologian and reformer.".to_string();

    let relationships = vec![
        relationship("r-press", "gutenberg", "press", Created, "developed the press"),
        relationship("r-bible", "press", "bible", Created, "first major printed book"),
        relationship("r-theses", "luther", "theses", Created, "authored"),
        relationship("r-spread", "press", "theses", Influenced, "rapid circulation"),
        relationship("r-start", "theses", "reformation", Influenced, "sparked"),
        relationship("r-worms", "luther", "worms", Participated, "refused to recant"),
        relationship("r-worms-ref", "worms", "reformation", Documented, ""),
        relationship("r-erasmus", "erasmus", "luther", Influenced, "Greek New Testament"),
        relationship("r-humanism", "erasmus", "humanism", Participated, ""),
        relationship("r-vernacular", "luther", "vernacular", Created, "German Bible"),
        relationship("r-calvin", "calvin", "reformation", Participated, ""),
        relationship("r-institutes", "calvin", "institutes", Created, ""),
    ];

    Dataset {
        entities,
        relationships,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn demo_dataset_has_no_dangling_relationships() {
        let dataset = demo_dataset();
        let ids = dataset
            .entities
            .iter()
            .map(|entity| entity.id.as_str())
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), dataset.entities.len());
        for relationship in &dataset.relationships {
            assert!(ids.contains(relationship.source_id.as_str()));
            assert!(ids.contains(relationship.target_id.as_str()));
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let error = load_ingest(Some(Path::new("/definitely/not/here.json")))
            .expect_err("missing file fails");
        assert!(format!("{error:#}").contains("/definitely/not/here.json"));
    }
}
