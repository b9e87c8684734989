//! # Thread Context
//!
//! Per-thread operations built on a [`PtraceBackend`]: capturing registers,
//! writing them back, and the hardware breakpoint / watchpoint hooks.
//!
//! ppc64le implements register capture only. Every other operation returns
//! [`DebuggerError::Unimplemented`] so the caller sees that the capability is
//! missing instead of a silent no-op.

use std::sync::Arc;

use tracing::debug;

use crate::error::{DebuggerError, Result};
use crate::registers::{MachineState, Ppc64leRegisters, PtraceRegs};
use crate::target::PtraceBackend;
use crate::types::{Architecture, ThreadId};

/// Access type for hardware watchpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchType
{
    /// Trap on reads
    Read,
    /// Trap on writes
    Write,
    /// Trap on reads and writes
    ReadWrite,
}

/// A hardware breakpoint or watchpoint slot that triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareBreakpoint
{
    /// Watched address
    pub address: u64,
    /// Access type
    pub kind: WatchType,
    /// Debug register slot
    pub index: u8,
}

/// Raw debug register state of a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchpointState
{
    /// Number of usable slots
    pub num: u8,
    /// Debug architecture version reported by the kernel
    pub debug_version: u8,
    /// Raw register words
    pub words: Vec<u64>,
}

/// Operations on one stopped thread.
pub trait ThreadContext
{
    /// Thread this context operates on
    fn id(&self) -> ThreadId;

    /// Capture the thread's registers.
    ///
    /// # Errors
    ///
    /// [`DebuggerError::ReadRegistersFailed`] if the transfer fails.
    fn registers(&self) -> Result<Box<dyn MachineState>>;

    /// Write previously captured registers back to the thread.
    ///
    /// # Errors
    ///
    /// Transfer failures, or [`DebuggerError::Unimplemented`].
    fn restore_registers(&self, saved: &dyn MachineState) -> Result<()>;

    /// The hardware breakpoint that caused the current stop, if any.
    ///
    /// # Errors
    ///
    /// Transfer failures, or [`DebuggerError::Unimplemented`].
    fn find_hardware_breakpoint(&self) -> Result<Option<HardwareBreakpoint>>;

    /// Program debug register slot `index`.
    ///
    /// # Errors
    ///
    /// Transfer failures, or [`DebuggerError::Unimplemented`].
    fn write_hardware_breakpoint(&self, address: u64, kind: WatchType, index: u8) -> Result<()>;

    /// Clear debug register slot `index`.
    ///
    /// # Errors
    ///
    /// Transfer failures, or [`DebuggerError::Unimplemented`].
    fn clear_hardware_breakpoint(&self, address: u64, kind: WatchType, index: u8) -> Result<()>;

    /// Read the raw watchpoint registers.
    ///
    /// # Errors
    ///
    /// Transfer failures, or [`DebuggerError::Unimplemented`].
    fn watchpoints(&self) -> Result<WatchpointState>;

    /// Write the raw watchpoint registers.
    ///
    /// # Errors
    ///
    /// Transfer failures, or [`DebuggerError::Unimplemented`].
    fn set_watchpoints(&self, state: &WatchpointState) -> Result<()>;
}

/// A traced ppc64le thread.
pub struct Ppc64leThread<B>
{
    id: ThreadId,
    backend: Arc<B>,
}

impl<B: PtraceBackend + 'static> Ppc64leThread<B>
{
    /// Bind thread `id` to a register transfer backend.
    pub fn new(id: ThreadId, backend: Arc<B>) -> Self
    {
        Self { id, backend }
    }

    /// Capture registers as the concrete ppc64le adapter.
    ///
    /// Only the general purpose block is transferred here; the floating
    /// point block is fetched by the adapter on first request.
    ///
    /// # Errors
    ///
    /// [`DebuggerError::ReadRegistersFailed`] if the transfer fails or the
    /// block is too short.
    pub fn ppc64le_registers(&self) -> Result<Ppc64leRegisters>
    {
        let id = self.id;
        let bytes = self.backend.read_gp_regs(id)?;
        let regs = PtraceRegs::from_bytes(&bytes).map_err(|err| DebuggerError::ReadRegistersFailed {
            operation: "parse ppc64le register block".to_string(),
            thread_id: Some(id),
            details: err.to_string(),
        })?;
        debug!(thread = %id, pc = format_args!("0x{:x}", regs.nip), "captured registers");

        let backend = Arc::clone(&self.backend);
        let loader = Box::new(move || {
            backend.read_fp_regset(id).map_err(|err| DebuggerError::ReadRegistersFailed {
                operation: "could not get floating point registers".to_string(),
                thread_id: Some(id),
                details: err.to_string(),
            })
        });
        Ok(Ppc64leRegisters::new(regs, loader))
    }
}

impl<B: PtraceBackend + 'static> ThreadContext for Ppc64leThread<B>
{
    fn id(&self) -> ThreadId
    {
        self.id
    }

    fn registers(&self) -> Result<Box<dyn MachineState>>
    {
        Ok(Box::new(self.ppc64le_registers()?))
    }

    fn restore_registers(&self, _saved: &dyn MachineState) -> Result<()>
    {
        Err(DebuggerError::unimplemented("register restore", Architecture::PowerPc64Le))
    }

    fn find_hardware_breakpoint(&self) -> Result<Option<HardwareBreakpoint>>
    {
        Err(DebuggerError::unimplemented("hardware breakpoint lookup", Architecture::PowerPc64Le))
    }

    fn write_hardware_breakpoint(&self, _address: u64, _kind: WatchType, _index: u8) -> Result<()>
    {
        Err(DebuggerError::unimplemented("hardware breakpoints", Architecture::PowerPc64Le))
    }

    fn clear_hardware_breakpoint(&self, _address: u64, _kind: WatchType, _index: u8) -> Result<()>
    {
        Err(DebuggerError::unimplemented("hardware breakpoint removal", Architecture::PowerPc64Le))
    }

    fn watchpoints(&self) -> Result<WatchpointState>
    {
        Err(DebuggerError::unimplemented("watchpoint read", Architecture::PowerPc64Le))
    }

    fn set_watchpoints(&self, _state: &WatchpointState) -> Result<()>
    {
        Err(DebuggerError::unimplemented("watchpoint write", Architecture::PowerPc64Le))
    }
}
