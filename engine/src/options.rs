//! Engine option names and values.

use std::fmt;

use crate::uci::setoption_command;

pub const SKILL_LEVEL: &str = "Skill Level";
pub const UCI_ELO: &str = "UCI_Elo";
pub const UCI_LIMIT_STRENGTH: &str = "UCI_LimitStrength";
pub const UCI_ANALYSE_MODE: &str = "UCI_AnalyseMode";
pub const UCI_VARIANT: &str = "UCI_Variant";
pub const UCI_CHESS960: &str = "UCI_Chess960";
pub const THREADS: &str = "Threads";
pub const HASH: &str = "Hash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(n) => write!(f, "{}", n),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Int(i64::from(value))
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

/// A `setoption` the adapter wants applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOption {
    pub name: &'static str,
    pub value: OptionValue,
}

impl EngineOption {
    pub fn new(name: &'static str, value: impl Into<OptionValue>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    pub fn command(&self) -> String {
        setoption_command(self.name, &self.value)
    }
}

impl fmt::Display for EngineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}
