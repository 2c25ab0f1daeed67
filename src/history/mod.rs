mod load;
mod model;
mod parse;

pub use load::{demo_dataset, load_ingest};
pub use model::{
    Dataset, Entity, EntityDraft, EntityKind, EntityPatch, RelationKind, Relationship,
    RelationshipDraft,
};
pub use parse::{Ingest, SavedLayout, SavedNode, parse_ingest};
