//! # PowerPC 64-bit Instruction Decoder
//!
//! Decodes one little-endian, 4-byte instruction word into an [`Inst`].
//!
//! Validity, mnemonics and operands come from Capstone (PPC, 64-bit mode,
//! little-endian, detail on). On top of that the word's own fields give:
//!
//! - [`Op`], the opcode class debugger logic dispatches on (branch forms,
//!   traps, interrupt returns and the instructions stack-split prologues
//!   are built from); everything else is [`Op::Other`]
//! - branch operands (`BO`, `BI`, displacement) read straight from the
//!   encoding, since Capstone folds conditional branches into aliases
//! - a reserved-bit check that rejects words Capstone would accept
//!
//! ## Instruction Formats
//!
//! Bit 0 is the most significant bit of the word (IBM numbering):
//!
//! ```text
//! I-form   | OPCD 0:5 | LI 6:29                    | AA 30 | LK 31 |
//! B-form   | OPCD 0:5 | BO 6:10 | BI 11:15 | BD 16:29 | AA 30 | LK 31 |
//! D-form   | OPCD 0:5 | RT 6:10 | RA 11:15 | D/SI/UI 16:31          |
//! X-form   | OPCD 0:5 | RT 6:10 | RA 11:15 | RB 16:20 | XO 21:30 | Rc 31 |
//! ```
//!
//! ## References
//!
//! - [Power ISA v3.0B](https://openpowerfoundation.org/specifications/isa/)
//! - [Capstone](https://www.capstone-engine.org/)

mod syntax;

use std::fmt;

use capstone::arch::ppc::PpcOperand;
use capstone::arch::{ArchOperand, BuildsCapstoneEndian};
use capstone::prelude::*;
use capstone::Endian;
use smallvec::SmallVec;
use tracing::warn;

pub use syntax::{gnu_syntax, go_syntax};

use crate::error::DecodeError;

/// Size in bytes of every instruction.
pub const INSTRUCTION_SIZE: usize = 4;

macro_rules! ops {
    ($($variant:ident => $mnemonic:literal,)*) => {
        /// Opcode classes the debugger dispatches on.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Op
        {
            $(
                #[doc = concat!("`", $mnemonic, "`")]
                $variant,
            )*
        }

        impl Op
        {
            /// Every opcode, indexed by [`Op::id`].
            pub const ALL: &'static [Op] = &[$(Op::$variant,)*];

            /// Base mnemonic without record/overflow suffixes.
            pub const fn mnemonic(self) -> &'static str
            {
                match self {
                    $(Op::$variant => $mnemonic,)*
                }
            }
        }
    };
}

ops! {
    B => "b",
    Ba => "ba",
    Bl => "bl",
    Bla => "bla",
    Bc => "bc",
    Bca => "bca",
    Bcl => "bcl",
    Bcla => "bcla",
    Bclr => "bclr",
    Bclrl => "bclrl",
    Bcctr => "bcctr",
    Bcctrl => "bcctrl",
    Bctar => "bctar",
    Bctarl => "bctarl",
    Rfid => "rfid",
    Hrfid => "hrfid",
    Rfi => "rfi",
    Rfci => "rfci",
    Rfdi => "rfdi",
    Rfmci => "rfmci",
    Rfgi => "rfgi",
    Rfebb => "rfebb",
    Td => "td",
    Tdi => "tdi",
    Tw => "tw",
    Twi => "twi",
    Cmpd => "cmpd",
    Ldx => "ldx",
    Subf => "subf",
    Add => "add",
    Other => "other",
}

impl Op
{
    /// Architecture-neutral identifier used by prologue sequences.
    pub const fn id(self) -> u16
    {
        self as u16
    }

    /// Inverse of [`Op::id`].
    pub fn from_id(id: u16) -> Option<Op>
    {
        Op::ALL.get(usize::from(id)).copied()
    }
}

impl fmt::Display for Op
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.mnemonic())
    }
}

/// Special purpose register numbers the renderers name.
pub mod spr
{
    /// Fixed point exception register
    pub const XER: u16 = 1;
    /// Link register
    pub const LR: u16 = 8;
    /// Count register
    pub const CTR: u16 = 9;
    /// Target address register
    pub const TAR: u16 = 815;
}

/// A register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg
{
    /// General purpose register `r0`..`r31`
    Gpr(u8),
    /// Floating point register `f0`..`f31`
    Fpr(u8),
    /// Vector register `v0`..`v31`
    Vr(u8),
    /// Vector-scalar register `vs0`..`vs63`
    Vsr(u8),
    /// Condition register field `cr0`..`cr7`
    Cr(u8),
    /// Special purpose register by number (see [`spr`])
    Spr(u16),
    /// Any other register, by Capstone register id (see [`reg_name`])
    Other(u16),
}

/// An instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg
{
    /// Register
    Reg(Reg),
    /// Condition register bit (`BI`, `BT`, ...), 0..32
    CondBit(u8),
    /// Immediate value; also an absolute branch target (AA=1)
    Imm(i64),
    /// Branch displacement relative to the instruction address (AA=0)
    PcRel(i64),
    /// Displacement from a base register, `d(rA)`
    Mem
    {
        /// Signed displacement
        disp: i64,
        /// Base general purpose register
        base: u8,
    },
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inst
{
    /// Opcode class
    pub op: Op,
    /// Raw instruction word
    pub enc: u32,
    /// Mnemonic as printed, simplified forms included (`blr`, `li`, `mr`, ...)
    pub mnemonic: String,
    /// Operand text as printed, with branch targets resolved against the
    /// address the word was decoded at
    pub op_str: String,
    /// Operands in assembler order
    pub args: SmallVec<[Arg; 5]>,
    /// Record form (`.` suffix, updates CR0/CR1)
    pub rc: bool,
    /// Overflow-enable form (`o` suffix)
    pub oe: bool,
}

impl Inst
{
    /// The operand naming where a branch goes.
    ///
    /// - `b`/`bl`/`bc`/...: the displacement or absolute address operand
    /// - `bclr*`: the link register
    /// - `bcctr*`: the count register
    /// - `bctar*`: the target address register
    ///
    /// `None` for non-branch instructions.
    pub fn branch_target(&self) -> Option<Arg>
    {
        match self.op {
            Op::B | Op::Ba | Op::Bl | Op::Bla => self.args.first().copied(),
            Op::Bc | Op::Bca | Op::Bcl | Op::Bcla => self.args.get(2).copied(),
            Op::Bclr | Op::Bclrl => Some(Arg::Reg(Reg::Spr(spr::LR))),
            Op::Bcctr | Op::Bcctrl => Some(Arg::Reg(Reg::Spr(spr::CTR))),
            Op::Bctar | Op::Bctarl => Some(Arg::Reg(Reg::Spr(spr::TAR))),
            _ => None,
        }
    }

    /// Whether the instruction writes memory.
    pub fn is_store(&self) -> bool
    {
        self.mnemonic.starts_with("st") && self.mnemonic != "stop"
    }
}

thread_local! {
    static CAPSTONE: Option<Capstone> = build_capstone();
}

fn build_capstone() -> Option<Capstone>
{
    Capstone::new()
        .ppc()
        .mode(arch::ppc::ArchMode::Mode64)
        .endian(Endian::Little)
        .detail(true)
        .build()
        .map_err(|e| warn!(error = %e, "failed to initialise capstone for ppc64le"))
        .ok()
}

/// Name Capstone gives a [`Reg::Other`] register id.
pub fn reg_name(id: u16) -> Option<String>
{
    CAPSTONE.with(|cs| cs.as_ref().and_then(|cs| cs.reg_name(RegId(id))))
}

/// Decode the first instruction in `bytes` (little-endian).
///
/// Same as [`decode_at`] with the word placed at address 0.
///
/// ```rust
/// use kestrel_core::disasm::ppc64::{decode, Arg, Op};
///
/// // bl .+0x100
/// let inst = decode(&[0x01, 0x01, 0x00, 0x48]).unwrap();
/// assert_eq!(inst.op, Op::Bl);
/// assert_eq!(inst.args[0], Arg::PcRel(0x100));
/// ```
///
/// # Errors
///
/// See [`decode_at`].
pub fn decode(bytes: &[u8]) -> Result<Inst, DecodeError>
{
    decode_at(bytes, 0)
}

/// Decode the first instruction in `bytes`, located at address `pc`.
///
/// # Errors
///
/// - [`DecodeError::Truncated`] with fewer than 4 bytes
/// - [`DecodeError::Unknown`] for invalid encodings, reserved bits included
/// - [`DecodeError::Unavailable`] when Capstone could not be initialised
pub fn decode_at(bytes: &[u8], pc: u64) -> Result<Inst, DecodeError>
{
    let Some(word) = bytes.get(..INSTRUCTION_SIZE) else {
        return Err(DecodeError::Truncated {
            needed: INSTRUCTION_SIZE,
            available: bytes.len(),
        });
    };
    let w = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    if reserved_bits_set(w) {
        return Err(DecodeError::Unknown { word: w });
    }

    let op = opcode_of(w);
    CAPSTONE.with(|cs| {
        let cs = cs.as_ref().ok_or(DecodeError::Unavailable)?;
        let insns = cs.disasm_count(word, pc, 1).ok();
        let Some(insn) = insns.as_ref().and_then(|insns| insns.iter().next()) else {
            // Control-flow forms are fully described by their fields, even
            // the ones missing from Capstone's tables (bctar, embedded rfi*).
            return from_fields(op, w).ok_or(DecodeError::Unknown { word: w });
        };

        let mnemonic = insn.mnemonic().unwrap_or_default().to_string();
        let op_str = insn.op_str().unwrap_or_default().to_string();
        let args = match branch_args(op, w) {
            Some(args) => args,
            None => cs
                .insn_detail(insn)
                .map(|detail| {
                    detail
                        .arch_detail()
                        .operands()
                        .into_iter()
                        .filter_map(|operand| match operand {
                            ArchOperand::PpcOperand(operand) => operand_arg(cs, operand),
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        };

        Ok(Inst {
            op,
            enc: w,
            rc: mnemonic.ends_with('.'),
            oe: overflow_enabled(w),
            mnemonic,
            op_str,
            args,
        })
    })
}

/// An instruction of a known class that Capstone did not decode.
fn from_fields(op: Op, w: u32) -> Option<Inst>
{
    if op == Op::Other {
        return None;
    }
    let rc = matches!(op, Op::Subf | Op::Add) && w & 1 == 1;
    let oe = overflow_enabled(w);
    let mut mnemonic = op.mnemonic().to_string();
    if oe {
        mnemonic.push('o');
    }
    if rc {
        mnemonic.push('.');
    }
    Some(Inst {
        op,
        enc: w,
        mnemonic,
        op_str: String::new(),
        args: branch_args(op, w).unwrap_or_default(),
        rc,
        oe,
    })
}

/// Opcode class from the primary and extended opcode fields.
fn opcode_of(w: u32) -> Op
{
    const I_FORM: [Op; 4] = [Op::B, Op::Bl, Op::Ba, Op::Bla];
    const B_FORM: [Op; 4] = [Op::Bc, Op::Bcl, Op::Bca, Op::Bcla];

    match w >> 26 {
        2 => Op::Tdi,
        3 => Op::Twi,
        16 => B_FORM[(w & 0b11) as usize],
        18 => I_FORM[(w & 0b11) as usize],
        19 => match (xo(w), lk(w)) {
            (16, false) => Op::Bclr,
            (16, true) => Op::Bclrl,
            (528, false) => Op::Bcctr,
            (528, true) => Op::Bcctrl,
            (560, false) => Op::Bctar,
            (560, true) => Op::Bctarl,
            (18, _) => Op::Rfid,
            (274, _) => Op::Hrfid,
            (50, _) => Op::Rfi,
            (51, _) => Op::Rfci,
            (39, _) => Op::Rfdi,
            (38, _) => Op::Rfmci,
            (102, _) => Op::Rfgi,
            (146, _) => Op::Rfebb,
            _ => Op::Other,
        },
        31 => match xo(w) {
            0 if l_bit(w) => Op::Cmpd,
            4 => Op::Tw,
            68 => Op::Td,
            21 => Op::Ldx,
            _ => match (w >> 1) & 0x1ff {
                40 => Op::Subf,
                266 => Op::Add,
                _ => Op::Other,
            },
        },
        _ => Op::Other,
    }
}

/// Branch operands `[BO, BI, target]` (`[target]` for I-form).
fn branch_args(op: Op, w: u32) -> Option<SmallVec<[Arg; 5]>>
{
    let bo = Arg::Imm(i64::from((w >> 21) & 0x1f));
    let bi = Arg::CondBit(((w >> 16) & 0x1f) as u8);
    let args = match op {
        Op::B | Op::Ba | Op::Bl | Op::Bla => {
            // LI is a 24-bit word offset; shift it to the top to sign-extend.
            let li = i64::from(((w & 0x03ff_fffc) as i32) << 6 >> 6);
            SmallVec::from_slice(&[if aa(w) { Arg::Imm(li) } else { Arg::PcRel(li) }])
        }
        Op::Bc | Op::Bca | Op::Bcl | Op::Bcla => {
            let bd = i64::from((w & 0xfffc) as u16 as i16);
            SmallVec::from_slice(&[bo, bi, if aa(w) { Arg::Imm(bd) } else { Arg::PcRel(bd) }])
        }
        Op::Bclr | Op::Bclrl | Op::Bcctr | Op::Bcctrl | Op::Bctar | Op::Bctarl => {
            SmallVec::from_slice(&[bo, bi, Arg::Imm(i64::from((w >> 11) & 0b11))])
        }
        _ => return None,
    };
    Some(args)
}

/// Fields the ISA reserves (must be zero) in the forms debugger logic
/// relies on. Capstone does not check all of them.
fn reserved_bits_set(w: u32) -> bool
{
    const BIT_9: u32 = 1 << 22;
    const BIT_20: u32 = 1 << 11;
    const BIT_31: u32 = 1;

    match w >> 26 {
        0 => true,
        // cmpli, cmpi
        10 | 11 => w & BIT_9 != 0,
        19 => match xo(w) {
            // bits 16:18
            16 | 528 | 560 => w & 0x0000_e000 != 0,
            // rfid and friends carry no operands
            18 | 274 | 50 | 51 | 39 | 38 | 102 => w & 0x03ff_f801 != 0,
            _ => false,
        },
        31 => match xo(w) {
            // cmp, cmpl
            0 | 32 => w & (BIT_9 | BIT_31) != 0,
            4 | 68 | 21 => w & BIT_31 != 0,
            // mfcr (bit 11 clear) has FXM reserved, mfocrf (bit 11 set) uses it
            19 if (w >> 20) & 1 == 0 => w & (0x000f_f000 | BIT_20 | BIT_31) != 0,
            19 | 144 => w & (BIT_20 | BIT_31) != 0,
            _ => false,
        },
        // fcmpu, fcmpo
        63 if matches!(xo(w), 0 | 32) => w & (0x0060_0000 | BIT_31) != 0,
        _ => false,
    }
}

/// XO-form arithmetic with OE set.
fn overflow_enabled(w: u32) -> bool
{
    const XO_ARITH: [u32; 17] = [266, 10, 138, 40, 8, 136, 233, 235, 489, 457, 491, 459, 104, 202, 234, 200, 232];
    w >> 26 == 31 && (w >> 10) & 1 == 1 && XO_ARITH.contains(&((w >> 1) & 0x1ff))
}

fn operand_arg(cs: &Capstone, operand: PpcOperand) -> Option<Arg>
{
    match operand {
        PpcOperand::Reg(id) => Some(register_arg(cs, id)),
        PpcOperand::Imm(imm) => Some(Arg::Imm(i64::from(imm))),
        PpcOperand::Mem(mem) => {
            let base = match register_arg(cs, mem.base()) {
                Arg::Reg(Reg::Gpr(n)) => n,
                _ if cs.reg_name(mem.base()).as_deref() == Some("zero") => 0,
                _ => return None,
            };
            Some(Arg::Mem {
                disp: i64::from(mem.disp()),
                base,
            })
        }
        _ => None,
    }
}

fn register_arg(cs: &Capstone, id: RegId) -> Arg
{
    cs.reg_name(id)
        .and_then(|name| parse_register(&name))
        .unwrap_or(Arg::Reg(Reg::Other(id.0)))
}

/// Map a Capstone register name onto an operand.
fn parse_register(name: &str) -> Option<Arg>
{
    let numbered = |prefix: &str, limit: u8| {
        name.strip_prefix(prefix)
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| *n < limit)
    };

    let arg = match name {
        "lr" => Arg::Reg(Reg::Spr(spr::LR)),
        "ctr" => Arg::Reg(Reg::Spr(spr::CTR)),
        "xer" => Arg::Reg(Reg::Spr(spr::XER)),
        "tar" => Arg::Reg(Reg::Spr(spr::TAR)),
        _ => {
            if let Some(n) = numbered("vs", 64) {
                Arg::Reg(Reg::Vsr(n))
            } else if let Some(n) = numbered("r", 32) {
                Arg::Reg(Reg::Gpr(n))
            } else if let Some(n) = numbered("f", 32) {
                Arg::Reg(Reg::Fpr(n))
            } else if let Some(n) = numbered("v", 32) {
                Arg::Reg(Reg::Vr(n))
            } else if let Some(n) = numbered("cr", 8) {
                Arg::Reg(Reg::Cr(n))
            } else {
                return cond_bit_register(name);
            }
        }
    };
    Some(arg)
}

/// `cr3eq` and friends.
fn cond_bit_register(name: &str) -> Option<Arg>
{
    let rest = name.strip_prefix("cr")?;
    let field = rest.get(..1)?.parse::<u8>().ok().filter(|n| *n < 8)?;
    let bit = match rest.get(1..)? {
        "lt" => 0,
        "gt" => 1,
        "eq" => 2,
        "un" | "so" => 3,
        _ => return None,
    };
    Some(Arg::CondBit(field * 4 + bit))
}

/// Extended opcode, bits 21:30.
fn xo(w: u32) -> u32
{
    (w >> 1) & 0x3ff
}

fn l_bit(w: u32) -> bool
{
    (w >> 21) & 1 == 1
}

fn aa(w: u32) -> bool
{
    (w >> 1) & 1 == 1
}

fn lk(w: u32) -> bool
{
    w & 1 == 1
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_register_names()
    {
        assert_eq!(parse_register("r31"), Some(Arg::Reg(Reg::Gpr(31))));
        assert_eq!(parse_register("vs63"), Some(Arg::Reg(Reg::Vsr(63))));
        assert_eq!(parse_register("v2"), Some(Arg::Reg(Reg::Vr(2))));
        assert_eq!(parse_register("f1"), Some(Arg::Reg(Reg::Fpr(1))));
        assert_eq!(parse_register("cr7"), Some(Arg::Reg(Reg::Cr(7))));
        assert_eq!(parse_register("cr1eq"), Some(Arg::CondBit(6)));
        assert_eq!(parse_register("lr"), Some(Arg::Reg(Reg::Spr(spr::LR))));
        assert_eq!(parse_register("r32"), None);
        assert_eq!(parse_register("vrsave"), None);
    }

    #[test]
    fn test_opcode_classes()
    {
        assert_eq!(opcode_of(0x4800_0101), Op::Bl);
        assert_eq!(opcode_of(0x4e80_0020), Op::Bclr);
        assert_eq!(opcode_of(0x4e80_0421), Op::Bcctrl);
        assert_eq!(opcode_of(0x7c23_2000), Op::Cmpd);
        // cmpw shares the extended opcode but has L clear
        assert_eq!(opcode_of(0x7c03_2000), Op::Other);
        assert_eq!(opcode_of(0x7c64_2e15), Op::Add);
        assert_eq!(opcode_of(0x6000_0000), Op::Other);
    }

    #[test]
    fn test_reserved_bits()
    {
        assert!(reserved_bits_set(0));
        assert!(reserved_bits_set(0x2c69_e970));
        assert!(reserved_bits_set(0x7c63_2000));
        assert!(reserved_bits_set(0x4e80_e020));
        assert!(!reserved_bits_set(0x2c23_0000));
        assert!(!reserved_bits_set(0x7c23_2000));
        assert!(!reserved_bits_set(0x4e80_0020));
        // mfocrf uses the field mfcr reserves
        assert!(!reserved_bits_set(0x7fd2_0026));
        assert!(reserved_bits_set(0x7fc2_0026));
    }

    #[test]
    fn test_overflow_forms()
    {
        assert!(overflow_enabled(0x7c64_2e15));
        assert!(!overflow_enabled(0x7c64_2a14));
        assert!(!overflow_enabled(0x6000_0400));
    }
}
