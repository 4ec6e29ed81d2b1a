//! # Mission Telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default location of the wall configuration written by the wall generator.
pub const DEFAULT_WALL_CONFIG_PATH: &str = "worlds/paint_wall/paint_wall_config.json";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Start a wall spray mission.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt)]
#[structopt(name = "spray_exec", about = "Autonomous wall spray painting mission")]
pub struct MissionCmd {
    /// The coverage pattern to fly, either `vertical` or `horizontal`.
    #[structopt(short, long, default_value = "vertical")]
    pub pattern: PatternType,

    /// Path to the wall configuration JSON file.
    #[structopt(
        short,
        long,
        parse(from_os_str),
        default_value = DEFAULT_WALL_CONFIG_PATH
    )]
    pub wall_config: PathBuf,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The coverage pattern to use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    /// Paint up and down the full wall height, stepping sideways between stripes.
    Vertical,

    /// Paint left and right across the full wall width, stepping up between stripes.
    Horizontal,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown pattern type \"{0}\", expected \"vertical\" or \"horizontal\"")]
pub struct ParsePatternError(String);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FromStr for PatternType {
    type Err = ParsePatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vertical" | "v" | "1" => Ok(PatternType::Vertical),
            "horizontal" | "h" | "2" => Ok(PatternType::Horizontal),
            _ => Err(ParsePatternError(s.to_string())),
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternType::Vertical => write!(f, "VERTICAL"),
            PatternType::Horizontal => write!(f, "HORIZONTAL"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pattern_from_str() {
        assert_eq!("vertical".parse::<PatternType>().unwrap(), PatternType::Vertical);
        assert_eq!(" Horizontal ".parse::<PatternType>().unwrap(), PatternType::Horizontal);
        assert_eq!("1".parse::<PatternType>().unwrap(), PatternType::Vertical);
        assert!("diagonal".parse::<PatternType>().is_err());
    }

    #[test]
    fn test_mission_cmd_args() {
        let cmd = MissionCmd::from_iter(vec!["spray_exec", "--pattern", "horizontal"]);
        assert_eq!(cmd.pattern, PatternType::Horizontal);
        assert_eq!(cmd.wall_config, PathBuf::from(DEFAULT_WALL_CONFIG_PATH));

        let cmd = MissionCmd::from_iter(vec!["spray_exec", "-w", "wall.json"]);
        assert_eq!(cmd.pattern, PatternType::Vertical);
        assert_eq!(cmd.wall_config, PathBuf::from("wall.json"));
    }

    #[test]
    fn test_pattern_serde() {
        let p: PatternType = serde_json::from_str("\"horizontal\"").unwrap();
        assert_eq!(p, PatternType::Horizontal);
        assert_eq!(serde_json::to_string(&PatternType::Vertical).unwrap(), "\"vertical\"");
    }
}
