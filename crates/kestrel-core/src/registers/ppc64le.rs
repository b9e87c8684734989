//! # ppc64le Register Block
//!
//! Adapter over the general purpose register block Linux returns for
//! PowerPC 64-bit threads (`struct pt_regs`, read with `PTRACE_GETREGSET`
//! and `NT_PRSTATUS`).
//!
//! ## Register Layout
//!
//! ```text
//! Offset  0..256   gpr[0..32]
//! Offset 256       nip        next instruction pointer
//! Offset 264       msr        machine state register
//! Offset 272       orig_gpr3  r3 before a system call
//! Offset 280       ctr        count register
//! Offset 288       link       link register
//! Offset 296       xer        fixed point exception register
//! Offset 304       ccr        condition register
//! Offset 312       softe      soft interrupt enable
//! Offset 320       trap       trap/exception cause
//! Offset 328       dar        data address register (fault address)
//! Offset 336       dsisr      data storage interrupt status
//! Offset 344       result     system call result
//! Total: 44 u64s = 352 bytes, little-endian
//! ```
//!
//! ## Conventions
//!
//! - `gpr[1]` is the stack pointer
//! - `gpr[2]` is the TOC pointer
//! - `gpr[13]` is the thread pointer
//! - `gpr[30]` holds the Go runtime's `g` and doubles as the frame base
//!
//! ## References
//!
//! - [Power ISA v3.1, Book I, 2.3](https://openpowerfoundation.org/specifications/isa/)
//! - [linux/arch/powerpc/include/uapi/asm/ptrace.h](https://github.com/torvalds/linux/blob/master/arch/powerpc/include/uapi/asm/ptrace.h)

use std::fmt;

use super::{DwarfRegisters, FpLoader, LazyFpRegisters, MachineState, Register, RegisterView};
use crate::error::{DebuggerError, Result};
use crate::regnum::ppc64le as regnum;
use crate::types::Architecture;

/// Size in bytes of a vector register in the floating point block.
const VECTOR_REGISTER_SIZE: usize = 16;

/// The general purpose register block as the kernel lays it out.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PtraceRegs
{
    /// 32 general-purpose registers, each 64 bits wide
    pub gpr: [u64; 32],
    /// Next instruction pointer (program counter)
    pub nip: u64,
    /// Machine state register
    pub msr: u64,
    /// Value of r3 on system call entry
    pub orig_gpr3: u64,
    /// Loop count register
    pub ctr: u64,
    /// Link register
    pub link: u64,
    /// Fixed point exception register
    pub xer: u64,
    /// Condition register
    pub ccr: u64,
    /// Soft interrupt enable state
    pub softe: u64,
    /// Trap/exception cause
    pub trap: u64,
    /// Data address register
    pub dar: u64,
    /// Data storage interrupt status register
    pub dsisr: u64,
    /// System call result
    pub result: u64,
}

impl PtraceRegs
{
    /// Number of 64-bit words in the block.
    pub const WORDS: usize = 44;
    /// Size in bytes of the block.
    pub const SIZE: usize = Self::WORDS * 8;

    /// Parse the block from the bytes the kernel returned.
    ///
    /// Extra trailing bytes (the kernel pads `pt_regs` on some versions) are
    /// ignored.
    ///
    /// # Errors
    ///
    /// [`DebuggerError::InvalidArgument`] if fewer than [`Self::SIZE`] bytes
    /// are supplied.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self>
    {
        if bytes.len() < Self::SIZE {
            return Err(DebuggerError::InvalidArgument(format!(
                "ppc64le register block needs {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }

        let mut words = [0u64; Self::WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *word = u64::from_le_bytes(raw);
        }

        let mut gpr = [0u64; 32];
        gpr.copy_from_slice(&words[..32]);
        Ok(Self {
            gpr,
            nip: words[32],
            msr: words[33],
            orig_gpr3: words[34],
            ctr: words[35],
            link: words[36],
            xer: words[37],
            ccr: words[38],
            softe: words[39],
            trap: words[40],
            dar: words[41],
            dsisr: words[42],
            result: words[43],
        })
    }

    /// Serialize back into the kernel layout.
    pub fn to_bytes(&self) -> Vec<u8>
    {
        self.words().iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    fn words(&self) -> [u64; Self::WORDS]
    {
        let mut words = [0u64; Self::WORDS];
        words[..32].copy_from_slice(&self.gpr);
        words[32..].copy_from_slice(&[
            self.nip,
            self.msr,
            self.orig_gpr3,
            self.ctr,
            self.link,
            self.xer,
            self.ccr,
            self.softe,
            self.trap,
            self.dar,
            self.dsisr,
            self.result,
        ]);
        words
    }
}

impl fmt::Display for PtraceRegs
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        writeln!(f, "Registers:")?;
        writeln!(f, "\t - Gpr:")?;
        for (i, value) in self.gpr.iter().enumerate() {
            writeln!(f, "\t\t - gpr[{i}]: {value}")?;
        }
        let named = [
            ("Nip", self.nip),
            ("Msr", self.msr),
            ("Orig_gpr3", self.orig_gpr3),
            ("Ctr", self.ctr),
            ("Link", self.link),
            ("Xer", self.xer),
            ("Ccr", self.ccr),
            ("Softe", self.softe),
            ("Trap", self.trap),
            ("Dar", self.dar),
            ("Dsisr", self.dsisr),
            ("Result", self.result),
        ];
        for (name, value) in named {
            writeln!(f, "\t - {name}: {value}")?;
        }
        Ok(())
    }
}

/// Decode the vector register block into `V0, V1, ...` entries.
///
/// Each register is 16 bytes; a trailing partial chunk is dropped.
pub fn decode_fp_registers(raw: &[u8]) -> Vec<Register>
{
    raw.chunks_exact(VECTOR_REGISTER_SIZE)
        .enumerate()
        .map(|(i, chunk)| Register::bytes(format!("V{i}"), chunk))
        .collect()
}

/// [`MachineState`] for a ppc64le thread.
#[derive(Debug)]
pub struct Ppc64leRegisters
{
    regs: PtraceRegs,
    fp: LazyFpRegisters,
}

impl Ppc64leRegisters
{
    /// Wrap a register block; `loader` fetches the floating point set on
    /// first request.
    pub fn new(regs: PtraceRegs, loader: FpLoader) -> Self
    {
        Self {
            regs,
            fp: LazyFpRegisters::new(loader, decode_fp_registers),
        }
    }

    /// Wrap a register block whose floating point set is already known.
    pub fn with_fp(regs: PtraceRegs, fp_raw: Vec<u8>) -> Self
    {
        Self {
            regs,
            fp: LazyFpRegisters::loaded(fp_raw, decode_fp_registers),
        }
    }

    /// The underlying kernel block.
    pub fn raw(&self) -> &PtraceRegs
    {
        &self.regs
    }

    /// Raw floating point block, loading it if needed.
    ///
    /// # Errors
    ///
    /// Whatever the loader reported on the call that ran it.
    pub fn fp_raw(&self) -> Result<Vec<u8>>
    {
        self.fp.raw()
    }

    /// Whether the floating point transfer already happened.
    pub fn fp_loaded(&self) -> bool
    {
        self.fp.is_loaded()
    }

    fn general_registers(&self) -> Vec<Register>
    {
        let mut out = Vec::with_capacity(self.regs.gpr.len() + 1);
        for (i, value) in self.regs.gpr.iter().enumerate() {
            out.push(Register::u64(format!("R{i}"), *value));
        }
        out.push(Register::u64("NIP", self.regs.nip));
        out
    }
}

impl MachineState for Ppc64leRegisters
{
    fn arch(&self) -> Architecture
    {
        Architecture::PowerPc64Le
    }

    /// Also called the IAR (Instruction Address Register) or NIP.
    fn pc(&self) -> u64
    {
        self.regs.nip
    }

    fn sp(&self) -> u64
    {
        self.regs.gpr[1]
    }

    fn bp(&self) -> u64
    {
        self.regs.gpr[30]
    }

    /// The link register holds the return address after branches with
    /// LK=1 (Power ISA Book I, 2.3.2).
    fn lr(&self) -> u64
    {
        self.regs.link
    }

    fn tls(&self) -> u64
    {
        self.regs.gpr[13]
    }

    fn g_addr(&self) -> Option<u64>
    {
        Some(self.regs.gpr[30])
    }

    fn enumerate(&self, include_fp: bool) -> RegisterView
    {
        let mut registers = self.general_registers();
        if !include_fp {
            return RegisterView::new(registers, None);
        }

        let (fp_registers, fp_error) = self.fp.registers();
        registers.extend(fp_registers);
        RegisterView::new(registers, fp_error)
    }

    fn snapshot(&self) -> Result<Box<dyn MachineState>>
    {
        Err(DebuggerError::unimplemented("register snapshot", Architecture::PowerPc64Le))
    }

    fn dwarf_registers(&self) -> DwarfRegisters
    {
        let mut dregs = DwarfRegisters::new(regnum::PC, regnum::SP, regnum::LR);
        for (i, value) in (0u64..).zip(self.regs.gpr.iter()) {
            dregs.set(regnum::R0 + i, *value);
        }
        // PC and LR alias r12 and v1; the special values win.
        dregs.set(regnum::PC, self.regs.nip);
        dregs.set(regnum::LR, self.regs.link);
        dregs
    }
}
