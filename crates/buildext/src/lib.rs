//! buildext library - the host application and its commands
//!
//! Exposed as a library so the commands can be driven from tests.

pub mod commands;
pub mod common;
pub mod errors;
pub mod registry;

pub use common::GlobalOpts;
pub use errors::BuildExtError;
