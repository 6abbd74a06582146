use crate::util::{indel_distance, levenshtein_distance};

/// A normalised string similarity in `[0.0, 1.0]`, where 1.0 means equal.
pub trait Similarity {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// `(|a| + |b| - indel) / (|a| + |b|)`; the classic Levenshtein "ratio".
#[derive(Debug, Clone, Copy, Default)]
pub struct IndelRatio;

impl Similarity for IndelRatio {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let total = a.chars().count() + b.chars().count();
        if total == 0 {
            return 1.0;
        }
        (total - indel_distance(a, b)) as f64 / total as f64
    }
}

/// `1 - levenshtein / max_len`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditRatio;

impl Similarity for EditRatio {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let max_len = a.chars().count().max(b.chars().count());
        if max_len == 0 {
            return 1.0;
        }
        1.0 - (levenshtein_distance(a, b) as f64 / max_len as f64)
    }
}

impl<F> Similarity for F
where
    F: Fn(&str, &str) -> f64,
{
    fn similarity(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}
