// Player identity resolution across the two backing identity spaces.
//
// Players either come from the external catalog or were entered manually by
// scouts. The server exposes both through a single composite string of the
// form `external_<id>` / `internal_<id>`; this module is the only place that
// string is taken apart.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const INTERNAL_TAG: &str = "internal";
const EXTERNAL_TAG: &str = "external";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityParseError {
    #[error("player identity `{0}` is missing the `<space>_<id>` separator")]
    MissingSeparator(String),

    #[error("unknown identity space `{0}`")]
    UnknownSpace(String),

    #[error("invalid numeric id in player identity `{0}`")]
    InvalidId(String),
}

/// A player reference tagged with the identity space it belongs to.
///
/// Ids from the two spaces may collide numerically, so code must always
/// match on the variant rather than use the raw id on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlayerIdentity {
    /// Manually entered player.
    Internal(i64),
    /// Player sourced from the external catalog.
    External(i64),
}

impl PlayerIdentity {
    /// The identity-space tag used in the composite encoding.
    pub fn space(&self) -> &'static str {
        match self {
            PlayerIdentity::Internal(_) => INTERNAL_TAG,
            PlayerIdentity::External(_) => EXTERNAL_TAG,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, PlayerIdentity::Internal(_))
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerIdentity::Internal(id) => write!(f, "{INTERNAL_TAG}_{id}"),
            PlayerIdentity::External(id) => write!(f, "{EXTERNAL_TAG}_{id}"),
        }
    }
}

impl FromStr for PlayerIdentity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (space, raw_id) = s
            .trim()
            .split_once('_')
            .ok_or_else(|| IdentityParseError::MissingSeparator(s.to_string()))?;

        let id: i64 = raw_id
            .parse()
            .map_err(|_| IdentityParseError::InvalidId(s.to_string()))?;

        match space.to_ascii_lowercase().as_str() {
            INTERNAL_TAG => Ok(PlayerIdentity::Internal(id)),
            EXTERNAL_TAG => Ok(PlayerIdentity::External(id)),
            other => Err(IdentityParseError::UnknownSpace(other.to_string())),
        }
    }
}

impl TryFrom<String> for PlayerIdentity {
    type Error = IdentityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlayerIdentity> for String {
    fn from(identity: PlayerIdentity) -> Self {
        identity.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_space_prefix() {
        assert_eq!(PlayerIdentity::Internal(7).to_string(), "internal_7");
        assert_eq!(PlayerIdentity::External(1001).to_string(), "external_1001");
    }

    #[test]
    fn parse_both_spaces() {
        assert_eq!(
            "internal_7".parse::<PlayerIdentity>().unwrap(),
            PlayerIdentity::Internal(7)
        );
        assert_eq!(
            "EXTERNAL_1001".parse::<PlayerIdentity>().unwrap(),
            PlayerIdentity::External(1001)
        );
    }

    #[test]
    fn same_numeric_id_in_different_spaces_is_distinct() {
        assert_ne!(PlayerIdentity::Internal(5), PlayerIdentity::External(5));
    }

    #[test]
    fn rejects_malformed_identities() {
        assert_eq!(
            "12345".parse::<PlayerIdentity>(),
            Err(IdentityParseError::MissingSeparator("12345".into()))
        );
        assert_eq!(
            "manual_3".parse::<PlayerIdentity>(),
            Err(IdentityParseError::UnknownSpace("manual".into()))
        );
        assert_eq!(
            "internal_abc".parse::<PlayerIdentity>(),
            Err(IdentityParseError::InvalidId("internal_abc".into()))
        );
    }

    #[test]
    fn serde_uses_composite_string() {
        let json = serde_json::to_string(&PlayerIdentity::External(42)).unwrap();
        assert_eq!(json, "\"external_42\"");

        let back: PlayerIdentity = serde_json::from_str("\"internal_9\"").unwrap();
        assert_eq!(back, PlayerIdentity::Internal(9));

        assert!(serde_json::from_str::<PlayerIdentity>("\"bogus\"").is_err());
    }
}
