//! # Types
//!
//! Architecture-agnostic types shared by the register, disassembly and
//! symbol modules.
//!
//! These types let the stepping and unwinding layers talk about threads,
//! architectures and source locations without knowing which CPU family
//! produced them.

pub mod location;
pub mod process;

// Re-export all public types
pub use location::{Function, Location};
pub use process::{Architecture, ThreadId};
