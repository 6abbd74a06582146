use autocat_core::Category;

use crate::similarity::{IndelRatio, Similarity};

/// Maps the model's free-text category onto the closest catalog entry.
pub struct CategoryResolver<S = IndelRatio> {
    similarity: S,
}

impl Default for CategoryResolver<IndelRatio> {
    fn default() -> Self {
        Self::new(IndelRatio)
    }
}

impl<S: Similarity> CategoryResolver<S> {
    pub fn new(similarity: S) -> Self {
        Self { similarity }
    }

    /// Returns the most similar category; ties go to the earliest entry.
    /// Only an empty catalog yields `None`.
    pub fn resolve<'a>(&self, raw_name: &str, catalog: &'a [Category]) -> Option<&'a Category> {
        let guess = raw_name.trim();
        let mut best: Option<(&Category, f64)> = None;

        for category in catalog {
            let score = self.similarity.similarity(&category.name, guess);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((category, score)),
            }
        }

        best.map(|(category, _)| category)
    }
}
