//! # Process-Control Collaborators
//!
//! Traits for the pieces of process control this crate consumes but does not
//! own: reading target memory and transferring register blocks to and from
//! the kernel.
//!
//! The Linux implementation lives in [`crate::platform`]; tests and the CLI
//! use [`BufferMemory`] and their own mocks.

use crate::error::{DebuggerError, Result};
use crate::types::ThreadId;

/// Read access to the target's address space.
///
/// Implementations should handle:
/// - Invalid memory addresses (return errors, don't panic)
/// - Partial reads (report the whole read as failed)
pub trait MemoryAccess
{
    /// Fill `buf` with the bytes starting at `address`.
    ///
    /// # Errors
    ///
    /// [`DebuggerError::ReadMemoryFailed`] if any byte is unreadable.
    fn read_memory(&self, address: u64, buf: &mut [u8]) -> Result<()>;

    /// Read a little-endian 64-bit value.
    ///
    /// # Errors
    ///
    /// Same as [`MemoryAccess::read_memory`].
    fn read_u64(&self, address: u64) -> Result<u64>
    {
        let mut raw = [0u8; 8];
        self.read_memory(address, &mut raw)?;
        Ok(u64::from_le_bytes(raw))
    }
}

/// Register transfer primitives for one traced process.
///
/// Blocks are exchanged as raw bytes in the kernel's layout; the
/// architecture adapters parse them.
pub trait PtraceBackend: Send + Sync
{
    /// Read the general purpose register block of `tid`.
    ///
    /// # Errors
    ///
    /// Backend specific; typically [`DebuggerError::ReadRegistersFailed`].
    fn read_gp_regs(&self, tid: ThreadId) -> Result<Vec<u8>>;

    /// Read the floating point / vector register block of `tid`.
    ///
    /// # Errors
    ///
    /// Backend specific; typically [`DebuggerError::ReadRegistersFailed`].
    fn read_fp_regset(&self, tid: ThreadId) -> Result<Vec<u8>>;

    /// Write a general purpose register block back to `tid`.
    ///
    /// # Errors
    ///
    /// Backend specific; typically [`DebuggerError::WriteRegistersFailed`].
    fn write_gp_regs(&self, tid: ThreadId, regs: &[u8]) -> Result<()>;
}

/// A snapshot of target memory held in a buffer.
///
/// Useful for decoding instruction bytes that were captured earlier (or
/// typed on the command line) without a live process.
#[derive(Debug, Clone, Default)]
pub struct BufferMemory
{
    base: u64,
    bytes: Vec<u8>,
}

impl BufferMemory
{
    /// Memory whose first byte lives at `base`.
    pub fn new(base: u64, bytes: Vec<u8>) -> Self
    {
        Self { base, bytes }
    }

    /// Address of the first byte.
    pub fn base(&self) -> u64
    {
        self.base
    }

    /// One past the last byte.
    pub fn end(&self) -> u64
    {
        self.base.saturating_add(self.bytes.len() as u64)
    }
}

impl MemoryAccess for BufferMemory
{
    fn read_memory(&self, address: u64, buf: &mut [u8]) -> Result<()>
    {
        let out_of_range = || DebuggerError::ReadMemoryFailed {
            address,
            details: format!("outside buffer 0x{:x}..0x{:x}", self.base, self.end()),
        };
        let start = address
            .checked_sub(self.base)
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or_else(out_of_range)?;
        let end = start.checked_add(buf.len()).ok_or_else(out_of_range)?;
        let source = self.bytes.get(start..end).ok_or_else(out_of_range)?;
        buf.copy_from_slice(source);
        Ok(())
    }
}
