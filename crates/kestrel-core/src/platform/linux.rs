//! Linux ptrace adapter for ppc64le.
//!
//! The caller is expected to already be the tracer of the thread (attach,
//! stop and resume are handled elsewhere).

use std::io;

use libc::{c_void, iovec, pid_t};
use tracing::debug;

use crate::error::{DebuggerError, Result};
use crate::registers::PtraceRegs;
use crate::target::{MemoryAccess, PtraceBackend};
use crate::types::ThreadId;

/// General purpose register set (`struct pt_regs`)
const NT_PRSTATUS: libc::c_ulong = 1;
/// Altivec/VMX register set: `vr0..vr31`, `vscr`, `vrsave`
const NT_PPC_VMX: libc::c_ulong = 0x100;
/// Size of the VMX register set in bytes
const VMX_REGSET_SIZE: usize = 34 * 16;

/// Register access through `ptrace(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxPtrace;

impl LinuxPtrace
{
    pub fn new() -> Self
    {
        Self
    }

    fn get_regset(tid: ThreadId, note: libc::c_ulong, size: usize) -> io::Result<Vec<u8>>
    {
        let mut buf = vec![0u8; size];
        let mut iov = iovec {
            iov_base: buf.as_mut_ptr().cast::<c_void>(),
            iov_len: buf.len(),
        };
        // SAFETY: iov describes `buf`, which outlives the call; the kernel
        // writes at most `iov_len` bytes and updates `iov_len`.
        let ret = unsafe {
            libc::ptrace(
                libc::PTRACE_GETREGSET,
                tid.raw() as pid_t,
                note as *mut c_void,
                &mut iov as *mut iovec as *mut c_void,
            )
        };
        if ret == -1 {
            return Err(io::Error::last_os_error());
        }
        buf.truncate(iov.iov_len);
        Ok(buf)
    }

    fn set_regset(tid: ThreadId, note: libc::c_ulong, data: &[u8]) -> io::Result<()>
    {
        let mut iov = iovec {
            iov_base: data.as_ptr() as *mut c_void,
            iov_len: data.len(),
        };
        // SAFETY: the kernel only reads `iov_len` bytes from `data`.
        let ret = unsafe {
            libc::ptrace(
                libc::PTRACE_SETREGSET,
                tid.raw() as pid_t,
                note as *mut c_void,
                &mut iov as *mut iovec as *mut c_void,
            )
        };
        if ret == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl PtraceBackend for LinuxPtrace
{
    fn read_gp_regs(&self, tid: ThreadId) -> Result<Vec<u8>>
    {
        Self::get_regset(tid, NT_PRSTATUS, PtraceRegs::SIZE).map_err(|err| DebuggerError::ReadRegistersFailed {
            operation: "PTRACE_GETREGSET NT_PRSTATUS".to_string(),
            thread_id: Some(tid),
            details: err.to_string(),
        })
    }

    fn read_fp_regset(&self, tid: ThreadId) -> Result<Vec<u8>>
    {
        debug!(%tid, "reading vector registers");
        Self::get_regset(tid, NT_PPC_VMX, VMX_REGSET_SIZE).map_err(|err| DebuggerError::ReadRegistersFailed {
            operation: "PTRACE_GETREGSET NT_PPC_VMX".to_string(),
            thread_id: Some(tid),
            details: err.to_string(),
        })
    }

    fn write_gp_regs(&self, tid: ThreadId, regs: &[u8]) -> Result<()>
    {
        Self::set_regset(tid, NT_PRSTATUS, regs).map_err(|err| DebuggerError::WriteRegistersFailed {
            operation: "PTRACE_SETREGSET NT_PRSTATUS".to_string(),
            thread_id: Some(tid),
            details: err.to_string(),
        })
    }
}

/// Memory of a traced process, read with `process_vm_readv(2)`.
#[derive(Debug, Clone, Copy)]
pub struct ProcessMemory
{
    pid: pid_t,
}

impl ProcessMemory
{
    pub fn new(pid: u32) -> Self
    {
        Self { pid: pid as pid_t }
    }
}

impl MemoryAccess for ProcessMemory
{
    fn read_memory(&self, address: u64, buf: &mut [u8]) -> Result<()>
    {
        if buf.is_empty() {
            return Ok(());
        }
        let local = iovec {
            iov_base: buf.as_mut_ptr().cast::<c_void>(),
            iov_len: buf.len(),
        };
        let remote = iovec {
            iov_base: address as *mut c_void,
            iov_len: buf.len(),
        };
        // SAFETY: `local` describes `buf`; `remote` is only dereferenced by
        // the kernel inside the target's address space.
        let read = unsafe { libc::process_vm_readv(self.pid, &local, 1, &remote, 1, 0) };
        if read < 0 {
            return Err(DebuggerError::ReadMemoryFailed {
                address,
                details: io::Error::last_os_error().to_string(),
            });
        }
        if read as usize != buf.len() {
            return Err(DebuggerError::ReadMemoryFailed {
                address,
                details: format!("short read: {read} of {} bytes", buf.len()),
            });
        }
        Ok(())
    }
}
