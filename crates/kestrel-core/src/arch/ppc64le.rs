//! ppc64le backend: classification and branch target resolution.

use tracing::trace;

use super::{Arch, AsmReg};
use crate::disasm::ppc64::{self, spr, Arg, Inst, Op, Reg, INSTRUCTION_SIZE};
use crate::disasm::{AsmInstruction, InstructionKind};
use crate::error::{DebuggerError, Result};
use crate::prologue::{OpcodeSeq, PPC64LE_PROLOGUES};
use crate::registers::DwarfRegisters;
use crate::regnum::ppc64le as regnum;
use crate::symbols::AddressResolver;
use crate::types::{Architecture, Location};

/// `tw 31,0,0` (unconditional trap), little-endian.
const BREAKPOINT_INSTRUCTION: [u8; 4] = [0x08, 0x00, 0xe0, 0x7f];

/// The PowerPC 64-bit little-endian backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ppc64le;

/// Process-wide ppc64le backend.
pub static PPC64LE: Ppc64le = Ppc64le;

/// Control-flow class of a ppc64 opcode.
pub fn classify(op: Op) -> InstructionKind
{
    match op {
        Op::Bl | Op::Bla | Op::Bcl | Op::Bcla | Op::Bclrl | Op::Bcctrl | Op::Bctarl => InstructionKind::Call,
        Op::Bclr
        | Op::Rfebb
        | Op::Rfid
        | Op::Hrfid
        | Op::Rfi
        | Op::Rfci
        | Op::Rfdi
        | Op::Rfmci
        | Op::Rfgi => InstructionKind::Ret,
        Op::B | Op::Ba | Op::Bc | Op::Bca | Op::Bcctr | Op::Bctar => InstructionKind::Jmp,
        Op::Td | Op::Tdi | Op::Tw | Op::Twi => InstructionKind::HardBreak,
        _ => InstructionKind::Other,
    }
}

impl Ppc64le
{
    /// Destination of a branch whose target the debugger follows.
    ///
    /// Register targets need the live register set, so they are only
    /// resolved for the instruction the thread is stopped at.
    fn resolve_call_arg(
        &self,
        inst: &Inst,
        pc: u64,
        at_pc: bool,
        regs: Option<&DwarfRegisters>,
        resolver: &dyn AddressResolver,
    ) -> Option<Location>
    {
        if !matches!(
            inst.op,
            Op::B | Op::Bl | Op::Bla | Op::Bcl | Op::Bcla | Op::Bclrl | Op::Bcctrl | Op::Bctarl
        ) {
            return None;
        }

        let target = match inst.branch_target()? {
            Arg::Imm(addr) => addr as u64,
            Arg::PcRel(off) => pc.wrapping_add_signed(off),
            Arg::Reg(reg) => {
                if !at_pc {
                    return None;
                }
                self.asm_register(regs?, AsmReg::Ppc64(reg)).ok()?
            }
            _ => return None,
        };

        trace!(
            pc = format_args!("0x{pc:x}"),
            target = format_args!("0x{target:x}"),
            op = %inst.op,
            "resolved branch target"
        );
        Some(resolver.location(target))
    }
}

impl Arch for Ppc64le
{
    fn architecture(&self) -> Architecture
    {
        Architecture::PowerPc64Le
    }

    fn name_to_dwarf(&self, name: &str) -> Option<u64>
    {
        regnum::name_to_dwarf(name)
    }

    fn dwarf_to_name(&self, num: u64) -> String
    {
        regnum::dwarf_to_name(num)
    }

    fn max_reg_num(&self) -> u64
    {
        regnum::max_reg_num()
    }

    fn pc_regnum(&self) -> u64
    {
        regnum::PC
    }

    fn sp_regnum(&self) -> u64
    {
        regnum::SP
    }

    fn lr_regnum(&self) -> u64
    {
        regnum::LR
    }

    fn max_instruction_len(&self) -> usize
    {
        INSTRUCTION_SIZE
    }

    fn breakpoint_instruction(&self) -> &'static [u8]
    {
        &BREAKPOINT_INSTRUCTION
    }

    fn asm_register(&self, regs: &DwarfRegisters, reg: AsmReg) -> Result<u64>
    {
        let AsmReg::Ppc64(reg) = reg;
        let num = match reg {
            Reg::Gpr(n) => regnum::R0 + u64::from(n),
            Reg::Fpr(n) => regnum::F0 + u64::from(n),
            Reg::Vr(n) => regnum::V0 + u64::from(n),
            Reg::Vsr(n) => regnum::VS0 + u64::from(n),
            Reg::Cr(n) => regnum::CR0 + u64::from(n),
            Reg::Spr(spr::LR) => regnum::LR,
            Reg::Spr(n) => {
                return Err(DebuggerError::InvalidArgument(format!(
                    "special purpose register {n} has no DWARF number"
                )));
            }
            Reg::Other(id) => {
                return Err(DebuggerError::InvalidArgument(format!(
                    "register {} has no DWARF number",
                    ppc64::reg_name(id).unwrap_or_else(|| id.to_string())
                )));
            }
        };
        regs.uint64(num).ok_or_else(|| {
            DebuggerError::InvalidArgument(format!("register {} is not in the register set", regnum::dwarf_to_name(num)))
        })
    }

    fn asm_decode(
        &self,
        inst: &mut AsmInstruction,
        mem: &[u8],
        regs: Option<&DwarfRegisters>,
        resolver: &dyn AddressResolver,
    ) -> Result<()>
    {
        inst.size = INSTRUCTION_SIZE;
        inst.bytes = mem.get(..INSTRUCTION_SIZE).unwrap_or(mem).to_vec();
        inst.kind = InstructionKind::Other;
        inst.inst = None;
        inst.dest_loc = None;

        let decoded = ppc64::decode_at(mem, inst.loc.pc)?;
        inst.kind = classify(decoded.op);
        inst.dest_loc = self.resolve_call_arg(&decoded, inst.loc.pc, inst.at_pc, regs, resolver);
        inst.inst = Some(Box::new(decoded));
        Ok(())
    }

    fn prologues(&self) -> &'static [OpcodeSeq]
    {
        PPC64LE_PROLOGUES.as_slice()
    }
}
