//! Newtype IDs for ground-truth and detected sources.
//!
//! Keeping them distinct prevents pairing a sky source ID with a detection
//! ID by accident, which is the one mistake a matcher must never make.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a ground-truth source: its row index in the sky catalog.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkySourceId(pub u64);

impl SkySourceId {
    /// Creates a new SkySourceId.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SkySourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SkySourceId({})", self.0)
    }
}

impl fmt::Display for SkySourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SkySourceId {
    fn from(id: u64) -> Self {
        SkySourceId::new(id)
    }
}

/// Identity of a detected source as reported by the source finder.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionId(pub u64);

impl DetectionId {
    /// Creates a new DetectionId.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DetectionId({})", self.0)
    }
}

impl fmt::Display for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DetectionId {
    fn from(id: u64) -> Self {
        DetectionId::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ordering() {
        assert!(SkySourceId(1) < SkySourceId(2));
        assert!(DetectionId(10) > DetectionId(5));
    }

    #[test]
    fn test_id_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(DetectionId(1));
        set.insert(DetectionId(2));
        set.insert(DetectionId(1)); // duplicate
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_id_display_and_debug() {
        assert_eq!(SkySourceId(7).to_string(), "7");
        assert_eq!(format!("{:?}", DetectionId(3)), "DetectionId(3)");
    }
}
