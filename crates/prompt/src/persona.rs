//! Answering personas.

use nexus_core::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Perspective the generator answers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Engineering,
    Ops,
    Product,
}

impl Persona {
    /// Every persona, in display order.
    pub fn all() -> &'static [Persona] {
        &[Persona::Engineering, Persona::Ops, Persona::Product]
    }

    /// Lowercase identifier used in file names and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Engineering => "engineering",
            Persona::Ops => "ops",
            Persona::Product => "product",
        }
    }

    /// Built-in role description.
    pub fn default_role(&self) -> &'static str {
        match self {
            Persona::Engineering => {
                "You are a Senior Backend Engineer. Focus on API specs, implementation details, and architecture."
            }
            Persona::Ops => {
                "You are a Senior Site Reliability Engineer (SRE). Focus on stability, mitigation steps, and command-line solutions."
            }
            Persona::Product => {
                "You are a Product Manager. Focus on features, user requirements, and business logic."
            }
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "engineering" => Ok(Persona::Engineering),
            "ops" => Ok(Persona::Ops),
            "product" => Ok(Persona::Product),
            other => Err(AppError::Config(format!(
                "Unknown persona '{}'. Expected one of: engineering, ops, product",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Ops".parse::<Persona>().unwrap(), Persona::Ops);
        assert_eq!("PRODUCT".parse::<Persona>().unwrap(), Persona::Product);
        assert_eq!(" engineering ".parse::<Persona>().unwrap(), Persona::Engineering);
    }

    #[test]
    fn test_unknown_persona_is_rejected() {
        let err = "marketing".parse::<Persona>().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("marketing"));
    }

    #[test]
    fn test_roles_are_distinct() {
        let roles: Vec<_> = Persona::all().iter().map(|p| p.default_role()).collect();
        assert_eq!(roles.len(), 3);
        assert_ne!(roles[0], roles[1]);
        assert_ne!(roles[1], roles[2]);
        assert!(Persona::Ops.default_role().contains("(SRE)"));
    }

    #[test]
    fn test_round_trips_through_as_str() {
        for persona in Persona::all() {
            assert_eq!(persona.as_str().parse::<Persona>().unwrap(), *persona);
        }
    }
}
