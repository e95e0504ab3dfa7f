use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Interner shared by every `DetectionId` in the process.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Opaque identifier of a persisted detection.
///
/// Hosts hand us ids as strings (database keys, UUIDs); interning keeps the
/// id `Copy` so selection sets and hit-test results stay allocation-free.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetectionId(Spur);

impl DetectionId {
    /// Intern a host-supplied id string.
    pub fn new(s: &str) -> Self {
        DetectionId(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DetectionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for DetectionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DetectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DetectionId::new(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_string_same_id() {
        let a = DetectionId::new("det-42");
        let b = DetectionId::new("det-42");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "det-42");
        assert_eq!(a.to_string(), "det-42");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = DetectionId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let back: DetectionId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, id);
    }
}
