//! # Platform-Specific Implementations
//!
//! OS adapters implementing the process-control traits in
//! [`target`](crate::target):
//!
//! - **Linux on ppc64le**: `ptrace(PTRACE_GETREGSET)` for registers and
//!   `process_vm_readv` for memory
//!   - See: [ptrace(2) man page](https://man7.org/linux/man-pages/man2/ptrace.2.html)
//!
//! Everything else in the crate is pure and compiles on any host, so
//! register blocks and instruction bytes captured elsewhere can still be
//! decoded.

#[cfg(all(target_os = "linux", target_arch = "powerpc64"))]
pub mod linux;
