//! Module identifiers as assigned by the bundle loader.

use std::{fmt, sync::Arc};

/// Identifier of a module in the loader's registries.
///
/// Bundlers key modules either by a numeric id or by a string name. Ids are
/// only stable within one build, so callers should locate modules through
/// filters rather than persisting these values.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleId {
    /// Numeric module id.
    Num(u64),
    /// String module id.
    Name(Arc<str>),
}

impl ModuleId {
    /// Parse a well-formed numeric id: a non-empty run of ASCII digits.
    #[must_use]
    pub fn parse_numeric(text: &str) -> Option<Self> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse().ok().map(Self::Num)
    }

    /// Numeric value of this id, if it is numeric.
    #[must_use]
    pub const fn as_num(&self) -> Option<u64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Name(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ModuleId {
    fn from(value: u64) -> Self {
        Self::Num(value)
    }
}

/// String ids made only of digits collapse to [`ModuleId::Num`], matching how
/// loaders use stringified numbers as registry keys.
impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self::parse_numeric(value).unwrap_or_else(|| Self::Name(Arc::from(value)))
    }
}

impl From<String> for ModuleId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_collapse() {
        assert_eq!(ModuleId::from("42"), ModuleId::Num(42));
        assert_eq!(ModuleId::from("abc"), ModuleId::Name(Arc::from("abc")));
        assert_eq!(ModuleId::parse_numeric(""), None);
        assert_eq!(ModuleId::parse_numeric("4a"), None);
        assert_eq!(ModuleId::parse_numeric("-1"), None);
    }
}
