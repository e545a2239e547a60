//! Design selection kinds.

use std::str::FromStr;

use ado_types::{invalid_argument, AdoError};
use serde::{Deserialize, Serialize};

/// Which design [`Engine::get_design`](crate::Engine::get_design) returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesignKind {
    /// The design with the highest mutual information.
    #[default]
    Optimal,
    /// A uniformly random design.
    Random,
}

impl FromStr for DesignKind {
    type Err = AdoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "optimal" => Ok(Self::Optimal),
            "random" => Ok(Self::Random),
            other => Err(invalid_argument!(
                "kind should be \"optimal\" or \"random\", got \"{other}\""
            )),
        }
    }
}

impl std::fmt::Display for DesignKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::Random => write!(f, "random"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kinds() {
        assert_eq!("optimal".parse::<DesignKind>().unwrap(), DesignKind::Optimal);
        assert_eq!("random".parse::<DesignKind>().unwrap(), DesignKind::Random);
        assert_eq!(DesignKind::Random.to_string(), "random");
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(matches!("best".parse::<DesignKind>(), Err(AdoError::InvalidArgument(_))));
    }
}
