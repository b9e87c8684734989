//! Thread and architecture types.

use std::fmt;
use std::str::FromStr;

use crate::error::DebuggerError;

/// Thread identifier
///
/// On Linux this is the kernel thread ID (TID) that `ptrace` requests are
/// addressed to. It is stored as a `u64` so other platforms can map their
/// native handles onto it.
///
/// ## Example
///
/// ```rust
/// use kestrel_core::types::ThreadId;
///
/// let thread = ThreadId::from(4242);
/// assert_eq!(thread.raw(), 4242);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u64);

impl ThreadId
{
    /// Get the raw `u64` representation of the thread identifier
    pub fn raw(&self) -> u64
    {
        self.0
    }
}

impl From<u64> for ThreadId
{
    fn from(value: u64) -> Self
    {
        Self(value)
    }
}

impl fmt::Display for ThreadId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// CPU architecture of a target
///
/// Used to pick the architecture backend (see [`crate::arch::for_architecture`]).
/// Only `PowerPc64Le` has a backend today; the other variants are detected so
/// callers get a clear "unsupported" error instead of a wrong decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 64-bit PowerPC, little-endian (POWER8 and later, ELFv2 ABI)
    ///
    /// See: [64-Bit ELF V2 ABI Specification](https://openpowerfoundation.org/specifications/64bitelfabi/)
    PowerPc64Le,
    /// 64-bit ARM
    Arm64,
    /// 64-bit x86 (Intel/AMD)
    X86_64,
    /// Any other architecture (or unknown)
    ///
    /// The `&'static str` contains the architecture name (e.g., "riscv64").
    Unknown(&'static str),
}

impl Architecture
{
    /// Get the architecture of the currently running debugger binary
    ///
    /// This uses Rust's `#[cfg(target_arch = "...")]` to determine the architecture
    /// at compile time. The traced process normally shares it.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use kestrel_core::types::Architecture;
    ///
    /// let arch = Architecture::current();
    /// // On a POWER9 Linux host: Architecture::PowerPc64Le
    /// ```
    pub const fn current() -> Self
    {
        #[cfg(all(target_arch = "powerpc64", target_endian = "little"))]
        {
            Architecture::PowerPc64Le
        }

        #[cfg(target_arch = "aarch64")]
        {
            Architecture::Arm64
        }

        #[cfg(target_arch = "x86_64")]
        {
            Architecture::X86_64
        }

        #[cfg(not(any(
            all(target_arch = "powerpc64", target_endian = "little"),
            target_arch = "aarch64",
            target_arch = "x86_64"
        )))]
        {
            Architecture::Unknown(std::env::consts::ARCH)
        }
    }

    /// Detect the architecture an object file was built for.
    ///
    /// Big-endian PowerPC binaries are reported as unknown: the decoder only
    /// understands little-endian instruction words.
    pub fn from_object(arch: object::Architecture, little_endian: bool) -> Self
    {
        match arch {
            object::Architecture::PowerPc64 if little_endian => Architecture::PowerPc64Le,
            object::Architecture::PowerPc64 => Architecture::Unknown("ppc64"),
            object::Architecture::Aarch64 => Architecture::Arm64,
            object::Architecture::X86_64 => Architecture::X86_64,
            _ => Architecture::Unknown("unknown"),
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::PowerPc64Le => write!(f, "ppc64le"),
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::Unknown(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for Architecture
{
    type Err = DebuggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "ppc64le" | "powerpc64le" | "ppc64el" => Ok(Architecture::PowerPc64Le),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            "x86_64" | "amd64" => Ok(Architecture::X86_64),
            _ => Err(DebuggerError::InvalidArgument(format!(
                "Unknown architecture: {s}. Use 'ppc64le', 'arm64', or 'x86_64'"
            ))),
        }
    }
}
