//! Difficulty levels and the engine strength they translate to.
//!
//! A [`Level`] runs from 1 (weakest) to 8 (strongest) and fixes the search
//! budget of each `go` command plus a strength option. Engines that can limit
//! themselves to a rating get `UCI_Elo`; the rest get `Skill Level` on the
//! 0..=20 scale.

use std::fmt;

use crate::error::{EngineError, EngineResult};
use crate::options::{EngineOption, SKILL_LEVEL, UCI_ELO};
use crate::platform::PlatformPolicy;

const MAX_MOVE_TIME_MS: u32 = 5000;
const MAX_SKILL: u32 = 20;

const DEPTH_TABLE: [u8; 8] = [5, 5, 5, 5, 5, 8, 13, 22];
const ELO_TABLE: [u16; 8] = [1350, 1500, 1600, 1700, 2000, 2300, 2700, 2850];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u8);

impl Level {
    pub const MIN: Level = Level(1);
    pub const MAX: Level = Level(8);

    pub fn new(level: u8) -> EngineResult<Self> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(Level(level))
        } else {
            Err(EngineError::InvalidLevel(level))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All levels, weakest first.
    pub fn all() -> impl Iterator<Item = Level> {
        (Self::MIN.0..=Self::MAX.0).map(Level)
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Time budget for one search, linear from 625 ms to 5000 ms.
    pub fn movetime_ms(self) -> u32 {
        u32::from(self.0) * MAX_MOVE_TIME_MS / 8
    }

    pub fn search_depth(self) -> u8 {
        DEPTH_TABLE[self.index()]
    }

    /// `round((level - 1) * 20 / 7)`, so 1..=8 spans the full 0..=20 scale.
    pub fn skill_value(self) -> u8 {
        let scaled = u32::from(self.0 - 1) * MAX_SKILL;
        // Round half up in integers: (2x + d) / 2d.
        ((2 * scaled + 7) / 14) as u8
    }

    pub fn elo_value(self) -> u16 {
        ELO_TABLE[self.index()]
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u8> for Level {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Level::new(value)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The strength option for `level`: `UCI_Elo` where the platform supports
/// rating limits, `Skill Level` elsewhere.
pub fn strength_option(level: Level, policy: &dyn PlatformPolicy) -> EngineOption {
    if policy.elo_capable() {
        EngineOption::new(UCI_ELO, i64::from(level.elo_value()))
    } else {
        EngineOption::new(SKILL_LEVEL, i64::from(level.skill_value()))
    }
}
