//! # Wall geometry
//!
//! The wall to be painted is described by a JSON configuration file written by the wall
//! generator. Only the main wall is used, everything else in the file (colour, world name,
//! additional walls) is ignored.
//!
//! ```json
//! {
//!     "main_wall": {
//!         "dimensions": { "width": 15.0, "height": 5.0, "thickness": 0.2 },
//!         "position": { "x": 7.0, "y": 0.0 }
//!     }
//! }
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Validated geometry of the wall to cover.
///
/// Dimensions are in metres and always strictly positive once loaded through
/// [`WallGeometry::new`] or [`WallConfig::load`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallGeometry {
    /// Position of the wall origin in the horizontal plane of the world
    pub position_m: WallPosition,

    pub width_m: f64,
    pub height_m: f64,
    pub thickness_m: f64,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WallPosition {
    pub x: f64,
    pub y: f64,
}

/// Top level of the wall configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct WallConfig {
    pub main_wall: WallEntry,
}

/// One wall in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct WallEntry {
    pub dimensions: WallDimensions,
    pub position: WallPosition,
}

#[derive(Debug, Copy, Clone, Deserialize)]
pub struct WallDimensions {
    pub width: f64,
    pub height: f64,
    pub thickness: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WallConfigError {
    #[error("Cannot read the wall config file {0:?}, has the wall generator been run? ({1})")]
    FileLoadError(std::path::PathBuf, std::io::Error),

    #[error("Invalid wall config format: {0}")]
    DeserialiseError(serde_json::Error),

    #[error("Wall {name} must be positive and finite, found {value}")]
    InvalidDimension { name: &'static str, value: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl WallGeometry {
    /// Build a new geometry, rejecting non-positive dimensions.
    pub fn new(
        position_m: WallPosition,
        width_m: f64,
        height_m: f64,
        thickness_m: f64,
    ) -> Result<Self, WallConfigError> {
        check_dimension("width", width_m)?;
        check_dimension("height", height_m)?;
        check_dimension("thickness", thickness_m)?;

        Ok(Self {
            position_m,
            width_m,
            height_m,
            thickness_m,
        })
    }
}

impl WallConfig {
    /// Load the wall config from the given path and return the main wall's geometry.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<WallGeometry, WallConfigError> {
        let path = path.as_ref();

        let wall_str = fs::read_to_string(path)
            .map_err(|e| WallConfigError::FileLoadError(path.to_path_buf(), e))?;

        let geometry = Self::from_str(&wall_str)?;

        info!(
            "Wall loaded: {:.2} m x {:.2} m at ({:.2}, {:.2})",
            geometry.width_m, geometry.height_m, geometry.position_m.x, geometry.position_m.y
        );

        Ok(geometry)
    }

    /// Parse the wall config from a JSON string and return the main wall's geometry.
    pub fn from_str(wall_str: &str) -> Result<WallGeometry, WallConfigError> {
        let config: WallConfig =
            serde_json::from_str(wall_str).map_err(WallConfigError::DeserialiseError)?;

        config.main_wall.geometry()
    }
}

impl WallEntry {
    pub fn geometry(&self) -> Result<WallGeometry, WallConfigError> {
        WallGeometry::new(
            self.position,
            self.dimensions.width,
            self.dimensions.height,
            self.dimensions.thickness,
        )
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn check_dimension(name: &'static str, value: f64) -> Result<(), WallConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(WallConfigError::InvalidDimension { name, value })
    }
}
