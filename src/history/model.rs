use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Event,
    Document,
    #[default]
    Concept,
    Term,
}

impl EntityKind {
    pub const ALL: [Self; 5] = [
        Self::Person,
        Self::Event,
        Self::Document,
        Self::Concept,
        Self::Term,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Event => "event",
            Self::Document => "document",
            Self::Concept => "concept",
            Self::Term => "term",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Influenced,
    Created,
    Participated,
    Documented,
    #[default]
    Custom,
}

impl RelationKind {
    pub const ALL: [Self; 5] = [
        Self::Influenced,
        Self::Created,
        Self::Participated,
        Self::Documented,
        Self::Custom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Influenced => "influenced",
            Self::Created => "created",
            Self::Participated => "participated",
            Self::Documented => "documented",
            Self::Custom => "custom",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: EntityKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Entity {
    /// The year used for temporal filtering: the explicit `year`, or the leading
    /// year component of `date`. `None` means the entity is undated.
    pub fn effective_year(&self) -> Option<i32> {
        self.year
            .or_else(|| self.date.as_deref().and_then(leading_year))
    }

    pub(crate) fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.tags = dedup_tags(std::mem::take(&mut self.tags));
        if self.date.as_deref().is_some_and(|date| date.trim().is_empty()) {
            self.date = None;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: RelationKind,
}

impl Relationship {
    pub fn touches(&self, entity_id: &str) -> bool {
        self.source_id == entity_id || self.target_id == entity_id
    }

    pub fn other_end(&self, entity_id: &str) -> Option<&str> {
        if self.source_id == entity_id {
            Some(self.target_id.as_str())
        } else if self.target_id == entity_id {
            Some(self.source_id.as_str())
        } else {
            None
        }
    }
}

/// Fields for an entity that does not have an id yet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityDraft {
    pub name: String,
    pub kind: EntityKind,
    pub description: String,
    pub tags: Vec<String>,
    pub date: Option<String>,
    pub year: Option<i32>,
    pub image_url: Option<String>,
}

#[cfg(test)]
impl EntityDraft {
    pub fn named(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}

impl EntityDraft {
    pub fn into_entity(self, id: String) -> Entity {
        let mut entity = Entity {
            id,
            name: self.name,
            kind: self.kind,
            description: self.description,
            tags: self.tags,
            date: self.date,
            year: self.year,
            image_url: self.image_url,
        };
        entity.normalize();
        entity
    }

    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            name: entity.name.clone(),
            kind: entity.kind,
            description: entity.description.clone(),
            tags: entity.tags.clone(),
            date: entity.date.clone(),
            year: entity.year,
            image_url: entity.image_url.clone(),
        }
    }
}

/// Partial update for an entity; `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityPatch {
    pub name: Option<String>,
    pub kind: Option<EntityKind>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub date: Option<Option<String>>,
    pub year: Option<Option<i32>>,
    pub image_url: Option<Option<String>>,
}

impl EntityPatch {
    pub fn apply(&self, entity: &mut Entity) {
        if let Some(name) = &self.name {
            entity.name = name.clone();
        }
        if let Some(kind) = self.kind {
            entity.kind = kind;
        }
        if let Some(description) = &self.description {
            entity.description = description.clone();
        }
        if let Some(tags) = &self.tags {
            entity.tags = tags.clone();
        }
        if let Some(date) = &self.date {
            entity.date = date.clone();
        }
        if let Some(year) = self.year {
            entity.year = year;
        }
        if let Some(image_url) = &self.image_url {
            entity.image_url = image_url.clone();
        }
        entity.normalize();
    }

    /// The full set of fields of `draft`, as a replacement patch.
    pub fn replace_with(draft: EntityDraft) -> Self {
        Self {
            name: Some(draft.name),
            kind: Some(draft.kind),
            description: Some(draft.description),
            tags: Some(draft.tags),
            date: Some(draft.date),
            year: Some(draft.year),
            image_url: Some(draft.image_url),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelationshipDraft {
    pub source_id: String,
    pub target_id: String,
    pub kind: RelationKind,
    pub description: String,
}

/// An ordered collection of entities and relationships as delivered by a
/// collaborator. Nothing here is validated yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

pub fn leading_year(date: &str) -> Option<i32> {
    let trimmed = date.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed),
    };

    let end = digits
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(index, _)| index)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    digits[..end].parse::<i32>().ok().map(|year| year * sign)
}

pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_comes_from_leading_date_component() {
        assert_eq!(leading_year("1492-10-12"), Some(1492));
        assert_eq!(leading_year("  1517"), Some(1517));
        assert_eq!(leading_year("-44-03-15"), Some(-44));
        assert_eq!(leading_year("c. 1450"), None);
        assert_eq!(leading_year(""), None);
    }

    #[test]
    fn explicit_year_wins_over_date() {
        let entity = EntityDraft {
            date: Some("1450-01-01".to_string()),
            year: Some(1455),
            ..EntityDraft::named("Press", EntityKind::Event)
        }
        .into_entity("e1".to_string());
        assert_eq!(entity.effective_year(), Some(1455));

        let undated = EntityDraft::named("Idea", EntityKind::Concept).into_entity("e2".into());
        assert_eq!(undated.effective_year(), None);
    }

    #[test]
    fn tags_keep_first_occurrence_order() {
        let tags = dedup_tags(vec![
            "print".into(),
            "europe".into(),
            " print ".into(),
            "".into(),
            "renaissance".into(),
        ]);
        assert_eq!(tags, vec!["print", "europe", "renaissance"]);
    }

    #[test]
    fn entity_json_uses_camel_case_and_type_key() {
        let entity: Entity = serde_json::from_str(
            r#"{"id":"a","name":"Luther","type":"person","imageUrl":"x.png","date":"1483"}"#,
        )
        .expect("entity parses");
        assert_eq!(entity.kind, EntityKind::Person);
        assert_eq!(entity.image_url.as_deref(), Some("x.png"));
        assert_eq!(entity.effective_year(), Some(1483));
    }
}
