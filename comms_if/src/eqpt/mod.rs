//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with the vehicle link.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod vehicle;
