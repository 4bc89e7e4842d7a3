use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CanopyError;

/// Identifier for one high-impact format.
///
/// Built-in variants cover the formats shipped with the wrapper; everything
/// else travels as `Custom` and only becomes activatable once a recipe is
/// registered for it. Canonical wire/attribute spelling is
/// SCREAMING_SNAKE_CASE (`"TOP_SCROLL"`, `"WELCOME_PAGE"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatId {
    TopScroll,
    Midscroll,
    DoubleMidscroll,
    Skins,
    Takeover,
    WelcomePage,
    /// Registry-registered format outside the built-in set.
    Custom(String),
}

impl FormatId {
    /// Canonical wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            FormatId::TopScroll => "TOP_SCROLL",
            FormatId::Midscroll => "MIDSCROLL",
            FormatId::DoubleMidscroll => "DOUBLE_MIDSCROLL",
            FormatId::Skins => "SKINS",
            FormatId::Takeover => "TAKEOVER",
            FormatId::WelcomePage => "WELCOME_PAGE",
            FormatId::Custom(name) => name,
        }
    }

    /// Parses an identifier, case-insensitively.
    ///
    /// Unknown names normalize to `Custom` with the uppercased spelling; an
    /// empty/blank name is invalid.
    pub fn parse(raw: &str) -> Result<Self, CanopyError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(CanopyError::InvalidInput("empty format id"));
        }
        Ok(match normalized.as_str() {
            "TOP_SCROLL" | "TOPSCROLL" => FormatId::TopScroll,
            "MIDSCROLL" => FormatId::Midscroll,
            "DOUBLE_MIDSCROLL" => FormatId::DoubleMidscroll,
            "SKINS" => FormatId::Skins,
            "TAKEOVER" => FormatId::Takeover,
            "WELCOME_PAGE" | "WELCOMEPAGE" => FormatId::WelcomePage,
            _ => FormatId::Custom(normalized),
        })
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FormatId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FormatId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FormatId::parse(&raw).map_err(D::Error::custom)
    }
}
