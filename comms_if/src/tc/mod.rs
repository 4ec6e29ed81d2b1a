//! # Telecommand module
//!
//! Telecommands are the instructions given to the spray exec by the operator.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod mission;
