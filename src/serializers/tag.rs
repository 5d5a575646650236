use serde::{Deserialize, Serialize};

use crate::models::Tag;

/// Nested tag object as it appears in `tag_objects` and on the tag endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRepresentation {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<Tag> for TagRepresentation {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
        }
    }
}
