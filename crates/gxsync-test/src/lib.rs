//! gxsync Test Harness - Exchange simulation and content generation
//!
//! This crate provides:
//! - Seeded sim content generation
//! - A block channel that corrupts and duplicates blocks
//! - A two-peer sim/client exchange simulator

pub mod chaos;
pub mod generator;
pub mod simulator;

pub use chaos::*;
pub use generator::*;
pub use simulator::*;
