//! # Unit identifiers.
//!
//! A [`UnitId`] is an opaque string key of the form `<name>.<extension>`.
//! The extension selects the unit kind (`service`, `socket`, extensible via
//! [`KindSet`](crate::units::KindSet) registration). The id is split on the
//! **first** separator only, so `a.b.service` has name `a` and extension
//! `b.service`. Malformed identifiers (no separator) yield an empty name
//! and extension and resolve to no unit kind.

use std::fmt;

/// Opaque unit identifier of the form `<name>.<extension>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnitId(String);

impl UnitId {
    /// Wraps a raw identifier string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The full identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name part (before the first `.`), or `""` when malformed.
    pub fn name(&self) -> &str {
        self.0.split_once('.').map_or("", |(name, _)| name)
    }

    /// The extension part (after the first `.`), or `""` when malformed.
    pub fn ext(&self) -> &str {
        self.0.split_once('.').map_or("", |(_, ext)| ext)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_first_separator() {
        let id = UnitId::new("web.service");
        assert_eq!(id.name(), "web");
        assert_eq!(id.ext(), "service");

        let id = UnitId::new("a.b.service");
        assert_eq!(id.name(), "a");
        assert_eq!(id.ext(), "b.service");
    }

    #[test]
    fn test_malformed_id_yields_empty_parts() {
        let id = UnitId::new("nodot");
        assert_eq!(id.name(), "");
        assert_eq!(id.ext(), "");
    }
}
