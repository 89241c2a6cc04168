use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RelayError;

/// Audience a snapshot is published for. Each tier owns exactly one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::Free, Tier::Pro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
        }
    }

    /// Slot file name under the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Tier::Free => "free_data.json",
            Tier::Pro => "pro_data.json",
        }
    }

    /// Reverse of [`Tier::file_name`]. Only exact slot names resolve.
    pub fn from_file_name(name: &str) -> Option<Tier> {
        Self::ALL.into_iter().find(|t| t.file_name() == name)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            other => Err(RelayError::invalid(format!(
                "unknown tier `{other}` (expected `free` or `pro`)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tiers_only() {
        assert_eq!("free".parse::<Tier>().ok(), Some(Tier::Free));
        assert_eq!("pro".parse::<Tier>().ok(), Some(Tier::Pro));
        assert!(matches!("bogus".parse::<Tier>(), Err(RelayError::InvalidPayload(_))));
        assert!("FREE".parse::<Tier>().is_err());
        assert!("".parse::<Tier>().is_err());
    }

    #[test]
    fn file_names_resolve_back_to_tiers() {
        for tier in Tier::ALL {
            assert_eq!(Tier::from_file_name(tier.file_name()), Some(tier));
        }
        assert_eq!(Tier::from_file_name("../free_data.json"), None);
        assert_eq!(Tier::from_file_name("secrets.json"), None);
    }

    #[test]
    fn serializes_lowercase() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&Tier::Pro)?, "\"pro\"");
        Ok(())
    }
}
