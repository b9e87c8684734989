//! # Error Types
//!
//! General error handling for the architecture backends.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Not every failure is an error here. Lookups that hit an unknown register
//! number or a branch target without symbols degrade to placeholder values
//! instead. What remains falls into three groups:
//!
//! 1. **I/O failures**: `ReadRegistersFailed`, `WriteRegistersFailed`, `ReadMemoryFailed`, `Io`
//! 2. **Decode failures**: `Decode`
//! 3. **Unimplemented capabilities**: `Unimplemented`

use thiserror::Error;

use crate::types::{Architecture, ThreadId};

/// Main error type for backend operations
#[derive(Error, Debug)]
pub enum DebuggerError
{
    /// The operation exists in the debugger but has no implementation for
    /// this architecture yet.
    ///
    /// Callers must not treat this as an empty success. It is surfaced to
    /// the user as-is so machine state is never silently misreported.
    #[error("{capability} is not implemented on {arch}")]
    Unimplemented
    {
        /// Name of the missing operation (e.g. "register snapshot")
        capability: &'static str,
        /// Architecture the operation was requested on
        arch: Architecture,
    },

    /// Instruction bytes could not be decoded
    #[error("Failed to decode instruction: {0}")]
    Decode(#[from] DecodeError),

    /// No backend is available for the requested architecture
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    /// Invalid argument passed to a backend function
    ///
    /// Examples:
    /// - A raw register block with the wrong size
    /// - An unparsable architecture name
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failed to read registers from the target thread
    ///
    /// This can happen if:
    /// - The thread has exited
    /// - The register set is not available on this kernel
    /// - The returned block is shorter than expected
    #[error("Failed to read registers: {operation}")]
    ReadRegistersFailed
    {
        /// Description of the operation that failed
        operation: String,
        /// Thread ID if the operation was thread-specific
        thread_id: Option<ThreadId>,
        /// Additional error details
        details: String,
    },

    /// Failed to write registers back to the target thread
    #[error("Failed to write registers: {operation}")]
    WriteRegistersFailed
    {
        /// Description of the operation that failed
        operation: String,
        /// Thread ID if the operation was thread-specific
        thread_id: Option<ThreadId>,
        /// Additional error details
        details: String,
    },

    /// Failed to read target memory
    #[error("Failed to read memory at 0x{address:016x}: {details}")]
    ReadMemoryFailed
    {
        /// First address of the failed read
        address: u64,
        /// Additional error details
        details: String,
    },

    /// Debug metadata or symbol table could not be loaded
    #[error("Symbol error: {0}")]
    Symbols(String),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DebuggerError
{
    /// Build an [`DebuggerError::Unimplemented`] and log the request.
    pub fn unimplemented(capability: &'static str, arch: Architecture) -> Self
    {
        tracing::warn!(capability, %arch, "unimplemented capability requested");
        Self::Unimplemented { capability, arch }
    }

    /// Whether this error reports a missing capability rather than a failure.
    pub fn is_unimplemented(&self) -> bool
    {
        matches!(self, Self::Unimplemented { .. })
    }
}

/// Reasons a 4-byte instruction word could not be decoded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError
{
    /// Fewer bytes than one instruction were supplied
    #[error("need {needed} bytes, got {available}")]
    Truncated
    {
        /// Bytes required for one instruction
        needed: usize,
        /// Bytes actually available
        available: usize,
    },

    /// The word does not match any known encoding
    #[error("unknown instruction word 0x{word:08x}")]
    Unknown
    {
        /// The undecodable instruction word
        word: u32,
    },

    /// The disassembler engine could not be initialised
    #[error("disassembler unavailable")]
    Unavailable,
}

/// Convenience type alias for `Result<T, DebuggerError>`
///
/// ```rust
/// use kestrel_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DebuggerError>;
