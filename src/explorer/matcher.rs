//! Child-relation vocabulary
//!
//! Relation names come from an external system with an open-ended
//! vocabulary, so which edges count as "child" edges is configuration, not
//! traversal logic.

use opengin_types::{Direction, Relation};

use crate::config::ChildRelationsConfig;

/// Exact names plus substring predicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMatcher {
    exact: Vec<String>,
    contains: Vec<String>,
}

impl RelationMatcher {
    pub fn new(
        exact: impl IntoIterator<Item = String>,
        contains: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            exact: exact.into_iter().collect(),
            contains: contains
                .into_iter()
                .filter(|needle| !needle.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ChildRelationsConfig) -> Self {
        Self::new(config.exact.iter().cloned(), config.contains.iter().cloned())
    }

    pub fn matches(&self, relation_name: &str) -> bool {
        self.exact.iter().any(|name| name == relation_name)
            || self
                .contains
                .iter()
                .any(|needle| relation_name.contains(needle.as_str()))
    }

    /// Child edges to follow from a node
    ///
    /// Outgoing matches win; incoming matches are used only when there is
    /// no outgoing one.
    pub fn select_children<'a>(&self, relations: &'a [Relation]) -> Vec<&'a Relation> {
        let matching: Vec<&Relation> = relations
            .iter()
            .filter(|rel| self.matches(&rel.name))
            .collect();

        let outgoing: Vec<&Relation> = matching
            .iter()
            .copied()
            .filter(|rel| rel.direction == Direction::Outgoing)
            .collect();
        if !outgoing.is_empty() {
            return outgoing;
        }

        matching
            .into_iter()
            .filter(|rel| rel.direction == Direction::Incoming)
            .collect()
    }
}

impl Default for RelationMatcher {
    fn default() -> Self {
        Self::from_config(&ChildRelationsConfig::default())
    }
}
