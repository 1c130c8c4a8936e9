//! gxsync Core - Fundamental types and primitives
//!
//! This crate defines the pieces shared by every other gxsync crate:
//! - Variable registry (names, types, slots inside a block)
//! - Typed value converters (UTF-8 strings, LE integers)
//! - Fletcher checksums
//! - Synchronization status and trigger enums
//! - Error types

pub mod checksum;
pub mod convert;
pub mod error;
pub mod registry;
pub mod status;

pub use checksum::*;
pub use convert::*;
pub use error::*;
pub use registry::*;
pub use status::*;
