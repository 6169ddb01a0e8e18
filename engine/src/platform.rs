//! Platform-dependent choices, kept behind [`PlatformPolicy`] so the option
//! mapping itself never branches on the platform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::variant::Variant;

/// What the host platform's engine build supports.
pub trait PlatformPolicy: fmt::Debug + Send + Sync {
    /// Whether the engine can limit itself to a target rating (`UCI_Elo`).
    fn elo_capable(&self) -> bool;

    /// `UCI_Variant` value for a true variant.
    fn variant_token(&self, variant: Variant) -> String;

    /// Whether the `Hash` option is set from the host memory budget.
    fn applies_memory_option(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Web,
    Android,
    Ios,
    #[default]
    Desktop,
}

/// Which engine build to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFlavor {
    /// Plain Stockfish, standard rules and chess960 only.
    Standard,
    /// A variants-capable build.
    Variants,
}

impl Platform {
    pub fn is_web(self) -> bool {
        self == Platform::Web
    }

    /// Android ships a plain build next to the variants build; every other
    /// platform uses the variants build for everything.
    pub fn engine_flavor(self, variant: Variant) -> EngineFlavor {
        if self == Platform::Android && !variant.is_true_variant() {
            EngineFlavor::Standard
        } else {
            EngineFlavor::Variants
        }
    }
}

impl PlatformPolicy for Platform {
    fn elo_capable(&self) -> bool {
        matches!(self, Platform::Android | Platform::Ios)
    }

    fn variant_token(&self, variant: Variant) -> String {
        match variant {
            Variant::ThreeCheck if !self.is_web() => "3check".to_string(),
            Variant::Antichess if self.is_web() => "giveaway".to_string(),
            other => other.key().to_lowercase(),
        }
    }

    fn applies_memory_option(&self) -> bool {
        !self.is_web()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Web => "web",
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Desktop => "desktop",
        };
        f.write_str(name)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "web" => Ok(Platform::Web),
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "desktop" => Ok(Platform::Desktop),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elo_capability() {
        assert!(Platform::Android.elo_capable());
        assert!(Platform::Ios.elo_capable());
        assert!(!Platform::Web.elo_capable());
        assert!(!Platform::Desktop.elo_capable());
    }

    #[test]
    fn test_memory_option_skipped_on_web() {
        assert!(!Platform::Web.applies_memory_option());
        assert!(Platform::Desktop.applies_memory_option());
    }

    #[test]
    fn test_engine_flavor() {
        assert_eq!(
            Platform::Android.engine_flavor(Variant::Chess960),
            EngineFlavor::Standard
        );
        assert_eq!(
            Platform::Android.engine_flavor(Variant::Atomic),
            EngineFlavor::Variants
        );
        assert_eq!(
            Platform::Ios.engine_flavor(Variant::Standard),
            EngineFlavor::Variants
        );
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!("iOS".parse::<Platform>(), Ok(Platform::Ios));
        assert!("symbian".parse::<Platform>().is_err());
    }
}
