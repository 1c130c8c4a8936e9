//! gxsync State - Variable lifecycle and the shared data store
//!
//! This crate implements everything between a raw value and the wire:
//! - The per-variable status state machine
//! - Variables fitted to their registry slot
//! - Write arbitration between sim and client
//! - The thread-safe data store with its retry queue
//! - Value ingest from formatted text

pub mod exchange;
pub mod machine;
pub mod source;
pub mod store;
pub mod variable;

pub use exchange::*;
pub use machine::*;
pub use source::*;
pub use store::*;
pub use variable::*;
