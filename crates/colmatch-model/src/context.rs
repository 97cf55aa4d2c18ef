use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Optional business context describing one side of a matching request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetContext {
    /// Business domain, e.g. "sales" or "crm".
    pub business_domain: Option<String>,
    /// Key entities the dataset describes, e.g. "customer", "order".
    pub key_entities: Vec<String>,
    /// Known mappings from this dataset's columns to the other dataset's columns.
    pub custom_mappings: BTreeMap<String, String>,
    /// Columns of this dataset that never take part in matching.
    pub exclusions: BTreeSet<String>,
}

impl DatasetContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.business_domain = Some(domain.into());
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.key_entities.push(entity.into());
        self
    }

    pub fn with_mapping(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.custom_mappings.insert(left.into(), right.into());
        self
    }

    pub fn with_exclusion(mut self, column: impl Into<String>) -> Self {
        self.exclusions.insert(column.into());
        self
    }

    /// Business domain when set and non-empty.
    pub fn domain(&self) -> Option<&str> {
        self.business_domain
            .as_deref()
            .filter(|domain| !domain.is_empty())
    }

    pub fn is_excluded(&self, column: &str) -> bool {
        self.exclusions.contains(column)
    }

    pub fn custom_mapping(&self, column: &str) -> Option<&str> {
        self.custom_mappings.get(column).map(String::as_str)
    }
}
