//! Game variants and the option that selects them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::options::{EngineOption, UCI_CHESS960, UCI_VARIANT};
use crate::platform::PlatformPolicy;

/// Variant identifier, serialized with the host's camelCase keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Variant {
    #[default]
    Standard,
    FromPosition,
    Chess960,
    Antichess,
    Atomic,
    Crazyhouse,
    Horde,
    KingOfTheHill,
    RacingKings,
    ThreeCheck,
}

impl Variant {
    pub const ALL: [Variant; 10] = [
        Variant::Standard,
        Variant::FromPosition,
        Variant::Chess960,
        Variant::Antichess,
        Variant::Atomic,
        Variant::Crazyhouse,
        Variant::Horde,
        Variant::KingOfTheHill,
        Variant::RacingKings,
        Variant::ThreeCheck,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Variant::Standard => "standard",
            Variant::FromPosition => "fromPosition",
            Variant::Chess960 => "chess960",
            Variant::Antichess => "antichess",
            Variant::Atomic => "atomic",
            Variant::Crazyhouse => "crazyhouse",
            Variant::Horde => "horde",
            Variant::KingOfTheHill => "kingOfTheHill",
            Variant::RacingKings => "racingKings",
            Variant::ThreeCheck => "threeCheck",
        }
    }

    /// True variants need the engine's variant selector; the others play on
    /// the standard rules with the chess960 toggle.
    pub fn is_true_variant(self) -> bool {
        !matches!(
            self,
            Variant::Standard | Variant::FromPosition | Variant::Chess960
        )
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Variant {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.key() == s)
            .ok_or_else(|| EngineError::UnknownVariant(s.to_string()))
    }
}

/// The option that puts the engine into `variant`.
pub fn variant_option(variant: Variant, policy: &dyn PlatformPolicy) -> EngineOption {
    if variant.is_true_variant() {
        EngineOption::new(UCI_VARIANT, policy.variant_token(variant))
    } else {
        EngineOption::new(UCI_CHESS960, variant == Variant::Chess960)
    }
}
