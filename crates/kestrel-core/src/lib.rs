//! # kestrel-core
//!
//! Architecture backend of the Kestrel debugger.
//!
//! This crate turns raw machine state into architecture-neutral
//! abstractions the rest of a debugger consumes:
//! - DWARF register numbering ([`regnum`])
//! - Register blocks returned by `ptrace`, with lazily loaded vector
//!   registers ([`registers`], [`thread`])
//! - Instruction decoding, control-flow classification and call target
//!   resolution ([`disasm`], [`arch`])
//! - Stack-split prologue recognition ([`prologue`])
//!
//! ## Architecture Support
//!
//! - **ppc64le**: complete for registers and disassembly; hardware
//!   breakpoints, watchpoints and register snapshots report
//!   [`DebuggerError::Unimplemented`]
//!
//! ## Why unsafe code is needed
//!
//! Only the Linux adapter ([`platform`]) calls `ptrace` and
//! `process_vm_readv`. Everything else is safe and host-independent.

#![allow(unsafe_code)] // Required for ptrace / process_vm_readv

pub mod arch;
pub mod disasm;
pub mod error;
pub mod platform;
pub mod prelude;
pub mod prologue;
pub mod registers;
pub mod regnum;
pub mod symbols;
pub mod target;
pub mod thread;
pub mod types;

pub use arch::{for_architecture, Arch};
pub use error::{DebuggerError, DecodeError, Result};
pub use registers::MachineState;
pub use types::{Architecture, ThreadId};
