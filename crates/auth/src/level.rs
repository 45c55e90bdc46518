//! Capability levels form an ordered lattice: `show < read_only/download < read_write`.

use serde::{Deserialize, Serialize};

/// One point on the capability lattice.
///
/// `ReadOnly` and `Download` never share a single action's allowed set (an
/// action is either a read/write action or a view/download action), but they
/// rank equal so delegation checks can compare across the two families.
///
/// Deliberately no `Ord` derive: variant order is not rank order. Compare
/// through [`Level::rank`] or [`Level::satisfies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Show,
    ReadOnly,
    Download,
    ReadWrite,
}

impl Level {
    /// Lattice rank. Absent assignments rank 0 and never satisfy anything.
    pub fn rank(self) -> u8 {
        match self {
            Level::Show => 1,
            Level::ReadOnly | Level::Download => 2,
            Level::ReadWrite => 3,
        }
    }

    /// `rank(self) >= rank(required)`.
    pub fn satisfies(self, required: Level) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Show => "show",
            Level::ReadOnly => "read_only",
            Level::Download => "download",
            Level::ReadWrite => "read_write",
        }
    }

    /// Parse a stored level key. Returns `None` for stale or foreign
    /// vocabulary; sanitization decides what to do with those.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "show" => Some(Level::Show),
            "read_only" => Some(Level::ReadOnly),
            "download" => Some(Level::Download),
            "read_write" => Some(Level::ReadWrite),
            _ => None,
        }
    }
}

impl core::fmt::Display for Level {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_the_lattice() {
        assert!(Level::ReadWrite.satisfies(Level::ReadOnly));
        assert!(Level::ReadOnly.satisfies(Level::Show));
        assert!(Level::Download.satisfies(Level::ReadOnly));
        assert!(Level::ReadOnly.satisfies(Level::Download));
        assert!(!Level::Show.satisfies(Level::ReadOnly));
        assert!(!Level::Download.satisfies(Level::ReadWrite));
    }

    #[test]
    fn key_round_trip() {
        for level in [Level::Show, Level::ReadOnly, Level::Download, Level::ReadWrite] {
            assert_eq!(Level::from_key(level.as_str()), Some(level));
        }
        assert_eq!(Level::from_key("admin"), None);
        assert_eq!(Level::from_key(""), None);
    }
}
