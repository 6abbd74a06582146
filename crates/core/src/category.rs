use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A canonical budgeting label. Names are unique within one catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Category {
    pub fn new(id: CategoryId, name: &str, description: &str) -> Self {
        Category {
            id,
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Builds an ad-hoc catalog from names, numbering ids from 1.
pub fn catalog_from_names(names: &[&str]) -> Vec<Category> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Category::new(CategoryId(i as i64 + 1), name, ""))
        .collect()
}
