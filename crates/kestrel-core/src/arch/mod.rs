//! # Architecture Backends
//!
//! [`Arch`] gathers everything the debugger needs to know about one CPU
//! architecture: register numbering, instruction decoding and the catalog
//! of stack-growth prologues.
//!
//! The rest of the debugger works with `&'static dyn Arch` and never names
//! a concrete architecture. Pick one with [`for_architecture`]:
//!
//! ```rust
//! use kestrel_core::arch;
//! use kestrel_core::types::Architecture;
//!
//! let arch = arch::for_architecture(Architecture::PowerPc64Le).unwrap();
//! assert_eq!(arch.dwarf_to_name(1), "r1");
//! ```

pub mod ppc64le;

pub use ppc64le::{Ppc64le, PPC64LE};

use crate::disasm::{ppc64, AsmInstruction};
use crate::error::{DebuggerError, Result};
use crate::prologue::OpcodeSeq;
use crate::registers::DwarfRegisters;
use crate::symbols::AddressResolver;
use crate::types::Architecture;

/// A register operand as produced by one of the decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsmReg
{
    /// PowerPC 64-bit decoder register
    Ppc64(ppc64::Reg),
}

/// Architecture-specific behaviour behind an architecture-neutral API.
pub trait Arch: Send + Sync
{
    /// Which architecture this is
    fn architecture(&self) -> Architecture;

    /// DWARF number for a register name (case-insensitive); `None` if unknown.
    fn name_to_dwarf(&self, name: &str) -> Option<u64>;

    /// Name for a DWARF register number; never fails.
    fn dwarf_to_name(&self, num: u64) -> String;

    /// Upper bound of the DWARF register numbers in use.
    fn max_reg_num(&self) -> u64;

    /// DWARF number of the program counter
    fn pc_regnum(&self) -> u64;

    /// DWARF number of the stack pointer
    fn sp_regnum(&self) -> u64;

    /// DWARF number of the link register / return address
    fn lr_regnum(&self) -> u64;

    /// Longest instruction, in bytes.
    fn max_instruction_len(&self) -> usize;

    /// Bytes of the instruction used for software breakpoints.
    fn breakpoint_instruction(&self) -> &'static [u8];

    /// Read the value of a decoder register out of `regs`.
    ///
    /// # Errors
    ///
    /// [`DebuggerError::InvalidArgument`] if the register has no DWARF
    /// number or is missing from `regs`.
    fn asm_register(&self, regs: &DwarfRegisters, reg: AsmReg) -> Result<u64>;

    /// Decode the instruction at the start of `mem` into `inst`.
    ///
    /// `inst.loc.pc` and `inst.at_pc` must already be set. On success the
    /// size, bytes, kind, decoded instruction and (for calls) the
    /// destination are filled in. Register branch targets are only resolved
    /// when `inst.at_pc` is set and `regs` is supplied.
    ///
    /// # Errors
    ///
    /// [`DebuggerError::Decode`] when the bytes are not a valid instruction;
    /// `inst` is left with `inst.inst == None` and kind
    /// [`Other`](crate::disasm::InstructionKind::Other).
    fn asm_decode(
        &self,
        inst: &mut AsmInstruction,
        mem: &[u8],
        regs: Option<&DwarfRegisters>,
        resolver: &dyn AddressResolver,
    ) -> Result<()>;

    /// Opcode sequences that mark the end of a function prologue.
    fn prologues(&self) -> &'static [OpcodeSeq];
}

/// The backend for `arch`.
///
/// # Errors
///
/// [`DebuggerError::UnsupportedArchitecture`] for architectures without a
/// backend.
pub fn for_architecture(arch: Architecture) -> Result<&'static dyn Arch>
{
    match arch {
        Architecture::PowerPc64Le => Ok(&PPC64LE),
        other => Err(DebuggerError::UnsupportedArchitecture(other.to_string())),
    }
}
