//! Lab roster entries as seen by the rotation engine.
//!
//! People are created and deactivated by administration; the engine only
//! reads them to decide who may be placed in a rotation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::PersonId;

/// A member of the lab who can be assigned to obligations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub display_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Template categories this person may be assigned to.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Person {
    /// Create an active person with no eligibility tags.
    pub fn new(id: PersonId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            is_active: true,
            tags: BTreeSet::new(),
        }
    }

    /// Builder: add an eligibility tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Builder: mark the person inactive.
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_person_is_active_without_tags() {
        let p = Person::new(1, "Alice");
        assert!(p.is_active);
        assert!(p.tags.is_empty());
    }

    #[test]
    fn builder_sets_tags_and_deactivates() {
        let p = Person::new(2, "Bob").with_tag("cleaning").deactivated();
        assert!(p.has_tag("cleaning"));
        assert!(!p.has_tag("meeting"));
        assert!(!p.is_active);
    }

    #[test]
    fn missing_active_flag_deserializes_as_active() {
        let p: Person = serde_json::from_str(r#"{"id": 3, "display_name": "Carol"}"#).unwrap();
        assert!(p.is_active);
    }
}
