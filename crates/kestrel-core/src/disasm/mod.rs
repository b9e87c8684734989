//! # Disassembly
//!
//! Architecture-neutral instruction records and the range disassembler.
//!
//! An [`AsmInstruction`] is filled in by an architecture backend
//! ([`Arch::asm_decode`](crate::arch::Arch::asm_decode)): the backend decodes
//! the bytes, classifies the control flow ([`InstructionKind`]) and, for
//! calls, works out where the call goes ([`AsmInstruction::dest_loc`]).
//!
//! Breakpoint placement and single-stepping only look at the classification
//! and destination. The decoded instruction itself is kept behind
//! [`ArchInst`] for text rendering and prologue matching.

pub mod ppc64;

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::arch::Arch;
use crate::error::{DebuggerError, Result};
use crate::registers::DwarfRegisters;
use crate::symbols::AddressResolver;
use crate::target::MemoryAccess;
use crate::types::Location;

/// Maps an address to the symbol containing it: `(name, symbol start)`.
pub type SymLookup<'a> = &'a dyn Fn(u64) -> Option<(String, u64)>;

/// Control-flow class of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstructionKind
{
    /// Transfers control and saves a return address
    Call,
    /// Returns from a call or an interrupt
    Ret,
    /// Transfers control without saving a return address
    Jmp,
    /// Trap instruction used as a hard-coded breakpoint
    HardBreak,
    /// Anything else
    #[default]
    Other,
}

/// Textual dialect for rendering instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AssemblyFlavour
{
    /// GNU binutils (`objdump`) syntax
    #[default]
    Gnu,
    /// Go assembler (Plan 9) syntax
    Go,
}

impl fmt::Display for AssemblyFlavour
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            AssemblyFlavour::Gnu => write!(f, "gnu"),
            AssemblyFlavour::Go => write!(f, "go"),
        }
    }
}

impl FromStr for AssemblyFlavour
{
    type Err = DebuggerError;

    fn from_str(s: &str) -> Result<Self>
    {
        match s.to_ascii_lowercase().as_str() {
            "gnu" | "att" => Ok(AssemblyFlavour::Gnu),
            "go" | "plan9" => Ok(AssemblyFlavour::Go),
            other => Err(DebuggerError::InvalidArgument(format!("unknown assembly flavour '{other}'"))),
        }
    }
}

/// A decoded instruction of some architecture.
pub trait ArchInst: fmt::Debug + Send + Sync
{
    /// Render the instruction located at `pc`.
    fn text(&self, flavour: AssemblyFlavour, pc: u64, sym_lookup: Option<SymLookup<'_>>) -> String;

    /// Whether the opcode equals `op` (an opcode id of the same architecture).
    fn opcode_equals(&self, op: u16) -> bool;
}

impl ArchInst for ppc64::Inst
{
    fn text(&self, flavour: AssemblyFlavour, pc: u64, sym_lookup: Option<SymLookup<'_>>) -> String
    {
        match flavour {
            AssemblyFlavour::Gnu => ppc64::gnu_syntax(self, pc),
            AssemblyFlavour::Go => ppc64::go_syntax(self, pc, sym_lookup),
        }
    }

    fn opcode_equals(&self, op: u16) -> bool
    {
        self.op.id() == op
    }
}

/// One instruction of a disassembly, with control-flow annotations.
#[derive(Debug, Default)]
pub struct AsmInstruction
{
    /// Where the instruction lives
    pub loc: Location,
    /// Destination of a call, when it can be determined
    pub dest_loc: Option<Location>,
    /// Raw instruction bytes
    pub bytes: Vec<u8>,
    /// Instruction length in bytes
    pub size: usize,
    /// Control-flow class
    pub kind: InstructionKind,
    /// Whether this is the instruction the thread is stopped at
    pub at_pc: bool,
    /// Decoded instruction; `None` when the bytes could not be decoded
    pub inst: Option<Box<dyn ArchInst>>,
}

impl AsmInstruction
{
    /// An empty instruction record at `pc`.
    pub fn new(pc: u64) -> Self
    {
        Self {
            loc: Location::from_pc(pc),
            ..Self::default()
        }
    }

    /// Mark this as the instruction the thread is stopped at.
    #[must_use]
    pub fn at_pc(mut self, at_pc: bool) -> Self
    {
        self.at_pc = at_pc;
        self
    }

    pub fn pc(&self) -> u64
    {
        self.loc.pc
    }

    pub fn is_call(&self) -> bool
    {
        self.kind == InstructionKind::Call
    }

    pub fn is_ret(&self) -> bool
    {
        self.kind == InstructionKind::Ret
    }

    pub fn is_jump(&self) -> bool
    {
        self.kind == InstructionKind::Jmp
    }

    pub fn is_hard_break(&self) -> bool
    {
        self.kind == InstructionKind::HardBreak
    }

    /// Render the instruction, or `?` if it could not be decoded.
    pub fn text(&self, flavour: AssemblyFlavour, sym_lookup: Option<SymLookup<'_>>) -> String
    {
        match &self.inst {
            Some(inst) => inst.text(flavour, self.loc.pc, sym_lookup),
            None => "?".to_string(),
        }
    }

    /// Whether the decoded opcode equals `op`; always false when undecoded.
    pub fn opcode_equals(&self, op: u16) -> bool
    {
        self.inst.as_ref().is_some_and(|inst| inst.opcode_equals(op))
    }
}

/// Disassemble `[start, end)`.
///
/// The range is read in one go through `memory`. Every instruction is
/// annotated with its source location from `resolver`; the one at
/// `current_pc` gets `at_pc` set and, if `regs` are supplied, register
/// branch targets resolved.
///
/// Undecodable words are kept as entries with `inst == None` so the listing
/// stays aligned with memory.
///
/// # Errors
///
/// Only the memory read can fail the whole call.
pub fn disassemble(
    memory: &dyn MemoryAccess,
    regs: Option<&DwarfRegisters>,
    resolver: &dyn AddressResolver,
    arch: &dyn Arch,
    start: u64,
    end: u64,
    current_pc: Option<u64>,
) -> Result<Vec<AsmInstruction>>
{
    if end <= start {
        return Ok(Vec::new());
    }

    let len = usize::try_from(end - start)
        .map_err(|_| DebuggerError::InvalidArgument(format!("range 0x{start:x}..0x{end:x} is too large")))?;
    let mut mem = vec![0u8; len];
    memory.read_memory(start, &mut mem)?;

    let step = arch.max_instruction_len();
    let mut insts = Vec::with_capacity(len / step + 1);
    let mut offset = 0usize;
    while offset < mem.len() {
        let pc = start + offset as u64;
        let mut inst = AsmInstruction::new(pc).at_pc(current_pc == Some(pc));
        inst.loc = resolver.location(pc);

        if let Err(err) = arch.asm_decode(&mut inst, &mem[offset..], regs, resolver) {
            debug!(pc = format_args!("0x{pc:x}"), error = %err, "undecodable instruction");
        }

        offset += inst.size.max(step);
        insts.push(inst);
    }

    Ok(insts)
}
