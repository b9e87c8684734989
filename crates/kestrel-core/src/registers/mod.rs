//! # Machine State
//!
//! Architecture-neutral view of a stopped thread's registers.
//!
//! The process-control layer hands over the raw register block the kernel
//! returned; an architecture adapter (see [`ppc64le`]) wraps it and exposes:
//!
//! - the registers every stepping/unwinding decision needs (`pc`, `sp`, `lr`,
//!   frame base, TLS base, runtime `g` pointer),
//! - an ordered, printable list of all registers ([`RegisterView`]),
//! - the same values indexed by DWARF number ([`DwarfRegisters`]).
//!
//! General purpose registers are always cheap to provide. Floating point and
//! vector registers need a second kernel transfer, so they are fetched only
//! when a caller asks for them, and at most once per adapter (see [`lazy`]).

pub mod lazy;
pub mod ppc64le;

use std::collections::BTreeMap;
use std::fmt;

pub use lazy::{FpLoader, LazyFpRegisters};
pub use ppc64le::{Ppc64leRegisters, PtraceRegs};

use crate::error::{DebuggerError, Result};
use crate::types::Architecture;

/// Value of a single register as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterValue
{
    /// A 64-bit integer register
    U64(u64),
    /// A wide register kept as raw little-endian bytes (vector registers)
    Bytes(Vec<u8>),
}

impl fmt::Display for RegisterValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            RegisterValue::U64(value) => write!(f, "0x{value:016x}"),
            RegisterValue::Bytes(bytes) => {
                // Most significant byte first, like a wide integer.
                write!(f, "0x")?;
                for byte in bytes.iter().rev() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// A named register value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register
{
    /// Display name (e.g. `R1`, `NIP`, `V0`)
    pub name: String,
    /// Current value
    pub value: RegisterValue,
}

impl Register
{
    /// Build an integer register entry.
    pub fn u64(name: impl Into<String>, value: u64) -> Self
    {
        Self {
            name: name.into(),
            value: RegisterValue::U64(value),
        }
    }

    /// Build a raw-bytes register entry.
    pub fn bytes(name: impl Into<String>, bytes: &[u8]) -> Self
    {
        Self {
            name: name.into(),
            value: RegisterValue::Bytes(bytes.to_vec()),
        }
    }
}

/// Ordered register listing produced by [`MachineState::enumerate`].
///
/// Enumeration is a partial-success operation: if loading the floating point
/// registers fails, the general purpose registers are still here and the
/// failure is kept in [`RegisterView::fp_error`] for the caller to act on.
#[derive(Debug)]
pub struct RegisterView
{
    registers: Vec<Register>,
    fp_error: Option<DebuggerError>,
}

impl RegisterView
{
    pub(crate) fn new(registers: Vec<Register>, fp_error: Option<DebuggerError>) -> Self
    {
        Self { registers, fp_error }
    }

    /// Registers in display order.
    pub fn registers(&self) -> &[Register]
    {
        &self.registers
    }

    /// Find a register by display name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&RegisterValue>
    {
        self.registers
            .iter()
            .find(|reg| reg.name.eq_ignore_ascii_case(name))
            .map(|reg| &reg.value)
    }

    /// The floating point load failure, if one happened during this call.
    pub fn fp_error(&self) -> Option<&DebuggerError>
    {
        self.fp_error.as_ref()
    }

    /// Split into the (possibly partial) registers and the load failure.
    pub fn into_parts(self) -> (Vec<Register>, Option<DebuggerError>)
    {
        (self.registers, self.fp_error)
    }

    /// Convert to a `Result`, discarding the partial view on failure.
    pub fn into_result(self) -> Result<Vec<Register>>
    {
        match self.fp_error {
            Some(err) => Err(err),
            None => Ok(self.registers),
        }
    }
}

/// Register values indexed by DWARF register number.
///
/// This is the form expression evaluation, CFI unwinding and the
/// instruction classifier consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwarfRegisters
{
    values: BTreeMap<u64, u64>,
    pc_regnum: u64,
    sp_regnum: u64,
    lr_regnum: u64,
}

impl DwarfRegisters
{
    /// Create an empty set with the architecture's special register numbers.
    pub fn new(pc_regnum: u64, sp_regnum: u64, lr_regnum: u64) -> Self
    {
        Self {
            values: BTreeMap::new(),
            pc_regnum,
            sp_regnum,
            lr_regnum,
        }
    }

    /// Set a register, replacing any previous value.
    pub fn set(&mut self, regnum: u64, value: u64)
    {
        self.values.insert(regnum, value);
    }

    /// Builder form of [`DwarfRegisters::set`].
    #[must_use]
    pub fn with(mut self, regnum: u64, value: u64) -> Self
    {
        self.set(regnum, value);
        self
    }

    /// Value of a register, if it was captured.
    pub fn uint64(&self, regnum: u64) -> Option<u64>
    {
        self.values.get(&regnum).copied()
    }

    /// Program counter (0 when not captured)
    pub fn pc(&self) -> u64
    {
        self.uint64(self.pc_regnum).unwrap_or(0)
    }

    /// Stack pointer (0 when not captured)
    pub fn sp(&self) -> u64
    {
        self.uint64(self.sp_regnum).unwrap_or(0)
    }

    /// Link register / return address (0 when not captured)
    pub fn lr(&self) -> u64
    {
        self.uint64(self.lr_regnum).unwrap_or(0)
    }

    /// Number of captured registers.
    pub fn len(&self) -> usize
    {
        self.values.len()
    }

    /// Whether no register was captured.
    pub fn is_empty(&self) -> bool
    {
        self.values.is_empty()
    }
}

/// Architecture-neutral access to a captured register block
///
/// One implementation exists per supported architecture; callers only ever
/// see this trait.
///
/// ## Thread Safety
///
/// Implementations are `Send + Sync`. Concurrent calls to
/// [`MachineState::enumerate`] on the same value issue the floating point
/// transfer at most once.
pub trait MachineState: Send + Sync
{
    /// Architecture the registers belong to
    fn arch(&self) -> Architecture;

    /// Program counter (address of the next instruction to execute)
    fn pc(&self) -> u64;

    /// Stack pointer
    fn sp(&self) -> u64;

    /// Frame base register
    fn bp(&self) -> u64;

    /// Link register (return address of the last branch-and-link)
    fn lr(&self) -> u64;

    /// Thread-local storage base
    fn tls(&self) -> u64;

    /// Address of the runtime's current coroutine (`g`), when the
    /// architecture keeps it in a register.
    fn g_addr(&self) -> Option<u64>;

    /// List every register in display order.
    ///
    /// General purpose registers and the program counter are always
    /// present. With `include_fp`, floating point and vector registers are
    /// loaded (once) and appended.
    fn enumerate(&self, include_fp: bool) -> RegisterView;

    /// An independent copy that later changes to this value cannot affect.
    ///
    /// # Errors
    ///
    /// [`DebuggerError::Unimplemented`] on architectures without support.
    fn snapshot(&self) -> Result<Box<dyn MachineState>>;

    /// The registers indexed by DWARF number.
    fn dwarf_registers(&self) -> DwarfRegisters;
}
