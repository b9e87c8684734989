//! # Function Prologues
//!
//! Go-style functions start with a stack-bound check: load the stack guard,
//! compare it with the stack pointer and branch to the stack-growth path.
//! Breakpoints set "on a function" should land after that check, so the
//! unwinder and breakpoint code need to recognise it.
//!
//! ## ppc64le Catalog
//!
//! ```text
//! tiny:  ldx  cmpd  b
//! small: subf cmpd  b
//! big:   cmpd b     add  subf ldx cmpd b
//! ```
//!
//! Each variant is preceded by one of the prefixes (currently just `ldx`),
//! and the catalog is the cross product `prefix × variant`.

use std::fmt;

use once_cell::sync::Lazy;
use smallvec::SmallVec;
use tracing::trace;

use crate::arch::Arch;
use crate::disasm::ppc64::Op;
use crate::disasm::{disassemble, AsmInstruction};
use crate::error::{DebuggerError, Result};
use crate::symbols::AddressResolver;
use crate::target::MemoryAccess;
use crate::types::Function;

/// A fixed sequence of opcode ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpcodeSeq(SmallVec<[u16; 8]>);

impl OpcodeSeq
{
    pub fn new(ops: impl IntoIterator<Item = u16>) -> Self
    {
        Self(ops.into_iter().collect())
    }

    /// Concatenate two sequences.
    #[must_use]
    pub fn concat(&self, other: &OpcodeSeq) -> Self
    {
        Self(self.0.iter().chain(other.0.iter()).copied().collect())
    }

    pub fn ops(&self) -> &[u16]
    {
        &self.0
    }

    pub fn len(&self) -> usize
    {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.0.is_empty()
    }

    /// Whether the leading instructions of `insts` have exactly these
    /// opcodes, in order. Undecoded instructions never match.
    pub fn matches(&self, insts: &[AsmInstruction]) -> bool
    {
        insts.len() >= self.0.len() && self.0.iter().zip(insts).all(|(op, inst)| inst.opcode_equals(*op))
    }
}

impl fmt::Display for OpcodeSeq
{
    /// Space-separated mnemonics; ids without an opcode print as `#<id>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match Op::from_id(*id) {
                Some(op) => write!(f, "{op}")?,
                None => write!(f, "#{id}")?,
            }
        }
        Ok(())
    }
}

impl From<&[Op]> for OpcodeSeq
{
    fn from(ops: &[Op]) -> Self
    {
        Self::new(ops.iter().map(|op| op.id()))
    }
}

/// ppc64le stack-split prologues, built on first use.
pub static PPC64LE_PROLOGUES: Lazy<Vec<OpcodeSeq>> = Lazy::new(|| {
    let tiny: &[Op] = &[Op::Ldx, Op::Cmpd, Op::B];
    let small: &[Op] = &[Op::Subf, Op::Cmpd, Op::B];
    let big: &[Op] = &[Op::Cmpd, Op::B, Op::Add, Op::Subf, Op::Ldx, Op::Cmpd, Op::B];
    let prefixes: [&[Op]; 1] = [&[Op::Ldx]];

    let mut catalog = Vec::with_capacity(prefixes.len() * 3);
    for prefix in prefixes {
        let prefix = OpcodeSeq::from(prefix);
        for variant in [tiny, small, big] {
            catalog.push(prefix.concat(&OpcodeSeq::from(variant)));
        }
    }
    catalog
});

/// Address right after the first catalog entry `insts` starts with.
pub fn find_prologue_end(insts: &[AsmInstruction], catalog: &[OpcodeSeq]) -> Option<u64>
{
    catalog
        .iter()
        .filter(|seq| !seq.is_empty())
        .find(|seq| seq.matches(insts))
        .map(|seq| {
            let last = &insts[seq.len() - 1];
            last.loc.pc + last.size as u64
        })
}

/// First address of `function` past its stack-split prologue.
///
/// Falls back to the entry address when no catalog entry matches. Without
/// a known function end the window shrinks to what can be read, so a short
/// function at the end of mapped memory still resolves.
///
/// # Errors
///
/// Fails only when not even the first instruction can be read.
pub fn first_pc_after_prologue(
    function: &Function,
    arch: &dyn Arch,
    memory: &dyn MemoryAccess,
    resolver: &dyn AddressResolver,
) -> Result<u64>
{
    let catalog = arch.prologues();
    let step = arch.max_instruction_len();
    let mut count = catalog.iter().map(OpcodeSeq::len).max().unwrap_or(0);
    if let Some(fn_end) = function.end {
        let fits = fn_end.saturating_sub(function.entry) / step as u64;
        count = count.min(usize::try_from(fits).unwrap_or(usize::MAX));
    }

    loop {
        let end = function.entry.saturating_add((count * step) as u64);
        match disassemble(memory, None, resolver, arch, function.entry, end, None) {
            Ok(insts) => return Ok(find_prologue_end(&insts, catalog).unwrap_or(function.entry)),
            Err(DebuggerError::ReadMemoryFailed { address, .. }) if function.end.is_none() && count > 1 => {
                trace!(
                    entry = format_args!("0x{:x}", function.entry),
                    address = format_args!("0x{address:x}"),
                    "prologue window unreadable, shrinking"
                );
                count -= 1;
            }
            Err(err) => return Err(err),
        }
    }
}
