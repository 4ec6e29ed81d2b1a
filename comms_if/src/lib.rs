//! # Communications interface crate.
//!
//! Provides the interface between the mission software and the vehicle it flies: telemetry and
//! command types, the link traits the core is written against, and the mission telecommand.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Mission telecommands
pub mod tc;

/// Command, telemetry and link definitions for equipment (the vehicle)
pub mod eqpt;
