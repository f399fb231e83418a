pub mod lru;

use crate::cache::Line;

/// Victim selection for a set whose lines are all valid.
pub trait Replace {
    /// Returns the way in `set` to overwrite.
    fn victim(&mut self, set: &[Line]) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
    MissWithEviction,
}

impl AccessResult {
    pub fn is_hit(self) -> bool {
        self == AccessResult::Hit
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessResult::Hit => "hit",
            AccessResult::Miss => "miss",
            AccessResult::MissWithEviction => "miss eviction",
        }
    }
}
