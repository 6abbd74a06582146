use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar date packed as the integer `YYYYMMDD`, the encoding budget
/// ledgers store on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompactDate(pub u32);

impl CompactDate {
    pub fn year(self) -> u32 {
        self.0 / 10_000
    }

    pub fn month(self) -> u32 {
        self.0 % 10_000 / 100
    }

    pub fn day(self) -> u32 {
        self.0 % 100
    }
}

impl fmt::Display for CompactDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
    }
}
