//! Text rendering for decoded PowerPC instructions.
//!
//! Two dialects are supported:
//!
//! - **GNU**: Capstone's text, lowercase, with the usual simplified
//!   mnemonics (`blr`, `nop`, `li`, `mr`, `mflr`, `beq`, ...)
//! - **Go**: the Plan 9 dialect used by the Go toolchain, uppercase, with the
//!   destination operand last and branch targets named by symbol

use super::{reg_name, spr, Arg, Inst, Op, Reg};
use crate::disasm::SymLookup;

/// Condition names for a branch taken when the CR bit is set.
const GNU_TRUE: [&str; 4] = ["lt", "gt", "eq", "so"];
/// Condition names for a branch taken when the CR bit is clear.
const GNU_FALSE: [&str; 4] = ["ge", "le", "ne", "ns"];
const GO_TRUE: [&str; 4] = ["LT", "GT", "EQ", "VS"];
const GO_FALSE: [&str; 4] = ["GE", "LE", "NE", "VC"];
/// Names of the four bits in a CR field, as operands.
const GO_CR_BITS: [&str; 4] = ["LT", "GT", "EQ", "SO"];

/// What a BO/BI pair tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cond
{
    Always,
    /// CR bit set; holds BI
    True(u32),
    /// CR bit clear; holds BI
    False(u32),
    /// Decrement CTR, branch if non-zero
    Dnz,
    /// Decrement CTR, branch if zero
    Dz,
    /// Anything the simplified mnemonics don't cover
    Raw,
}

fn condition(bo: u32, bi: u32) -> Cond
{
    if bo & 0b10100 == 0b10100 {
        Cond::Always
    } else if bo >> 2 == 0b011 {
        Cond::True(bi)
    } else if bo >> 2 == 0b001 {
        Cond::False(bi)
    } else if bo & 0b10110 == 0b10000 {
        Cond::Dnz
    } else if bo & 0b10110 == 0b10010 {
        Cond::Dz
    } else {
        Cond::Raw
    }
}

fn bo(inst: &Inst) -> u32
{
    (inst.enc >> 21) & 0x1f
}

fn bi(inst: &Inst) -> u32
{
    (inst.enc >> 16) & 0x1f
}

fn link(inst: &Inst) -> bool
{
    inst.enc & 1 == 1
}

/// Absolute address named by a branch target operand.
fn target_address(arg: Arg, pc: u64) -> Option<u64>
{
    match arg {
        Arg::PcRel(off) => Some(pc.wrapping_add_signed(off)),
        Arg::Imm(addr) => Some(addr as u64),
        _ => None,
    }
}

/// Render `inst` in GNU syntax. `pc` is the address of the instruction.
pub fn gnu_syntax(inst: &Inst, pc: u64) -> String
{
    if let Some(text) = gnu_branch(inst, pc) {
        return text;
    }
    if inst.op_str.is_empty() {
        inst.mnemonic.clone()
    } else {
        format!("{} {}", inst.mnemonic, inst.op_str)
    }
}

fn gnu_branch(inst: &Inst, pc: u64) -> Option<String>
{
    let cr_prefix = |bi: u32| if bi / 4 == 0 { String::new() } else { format!("cr{},", bi / 4) };

    match inst.op {
        Op::B | Op::Ba | Op::Bl | Op::Bla => {
            let target = inst.branch_target().and_then(|arg| target_address(arg, pc))?;
            Some(format!("{} 0x{target:x}", inst.op.mnemonic()))
        }
        Op::Bc | Op::Bca | Op::Bcl | Op::Bcla => {
            let target = inst.branch_target().and_then(|arg| target_address(arg, pc))?;
            let suffix = match inst.op {
                Op::Bcl => "l",
                Op::Bca => "a",
                Op::Bcla => "la",
                _ => "",
            };
            let text = match condition(bo(inst), bi(inst)) {
                Cond::Always => format!("b{suffix} 0x{target:x}"),
                Cond::True(bi) => format!("b{}{suffix} {}0x{target:x}", GNU_TRUE[(bi % 4) as usize], cr_prefix(bi)),
                Cond::False(bi) => format!("b{}{suffix} {}0x{target:x}", GNU_FALSE[(bi % 4) as usize], cr_prefix(bi)),
                Cond::Dnz => format!("bdnz{suffix} 0x{target:x}"),
                Cond::Dz => format!("bdz{suffix} 0x{target:x}"),
                Cond::Raw => format!("{} {},{},0x{target:x}", inst.op.mnemonic(), bo(inst), bi(inst)),
            };
            Some(text)
        }
        Op::Bclr | Op::Bclrl | Op::Bcctr | Op::Bcctrl | Op::Bctar | Op::Bctarl => {
            let reg = match inst.op {
                Op::Bclr | Op::Bclrl => "lr",
                Op::Bcctr | Op::Bcctrl => "ctr",
                _ => "tar",
            };
            let l = if link(inst) { "l" } else { "" };
            let cr_suffix = |bi: u32| if bi / 4 == 0 { String::new() } else { format!(" cr{}", bi / 4) };
            let text = match condition(bo(inst), bi(inst)) {
                Cond::Always => format!("b{reg}{l}"),
                Cond::True(bi) => format!("b{}{reg}{l}{}", GNU_TRUE[(bi % 4) as usize], cr_suffix(bi)),
                Cond::False(bi) => format!("b{}{reg}{l}{}", GNU_FALSE[(bi % 4) as usize], cr_suffix(bi)),
                Cond::Dnz if reg == "lr" => format!("bdnzlr{l}"),
                Cond::Dz if reg == "lr" => format!("bdzlr{l}"),
                _ => format!(
                    "{} {},{},{}",
                    inst.op.mnemonic(),
                    bo(inst),
                    bi(inst),
                    (inst.enc >> 11) & 0b11
                ),
            };
            Some(text)
        }
        _ => None,
    }
}

/// Render `inst` in Go (Plan 9) syntax.
///
/// Branch targets are passed through `sym_lookup` and printed as
/// `symbol+0xoff(SB)` when it returns a containing symbol.
pub fn go_syntax(inst: &Inst, pc: u64, sym_lookup: Option<SymLookup<'_>>) -> String
{
    if let Some(text) = go_branch(inst, pc, sym_lookup).or_else(|| go_simplified(inst)) {
        return text;
    }

    let base = inst.mnemonic.trim_end_matches('.');
    let base = if inst.oe { base.strip_suffix('o').unwrap_or(base) } else { base };
    let mnemonic = go_mnemonic(&inst.mnemonic, base, inst);

    let indexed = |mnemonic: &str| mnemonic.ends_with('x') && inst.args.len() == 3;
    let args: Vec<String> = match inst.args.as_slice() {
        [rt, ra, rb] if indexed(base) && base.starts_with('l') => {
            vec![format!("({})({})", go_arg(*ra), go_arg(*rb)), go_arg(*rt)]
        }
        [rs, ra, rb] if indexed(base) && inst.is_store() => {
            vec![go_arg(*rs), format!("({})({})", go_arg(*ra), go_arg(*rb))]
        }
        [rt, ra, rb] if matches!(base, "subf" | "subfc" | "subfe") => vec![go_arg(*ra), go_arg(*rb), go_arg(*rt)],
        [Arg::Reg(Reg::Cr(field)), a, b] if is_compare(base) => {
            let mut args = vec![go_arg(*a), go_arg(*b)];
            if *field != 0 {
                args.push(go_arg(Arg::Reg(Reg::Cr(*field))));
            }
            args
        }
        args if is_compare(base) || is_trap(base) || inst.is_store() => args.iter().map(|a| go_arg(*a)).collect(),
        args => args.iter().rev().map(|a| go_arg(*a)).collect(),
    };

    if args.is_empty() {
        mnemonic
    } else {
        format!("{mnemonic} {}", args.join(", "))
    }
}

fn is_compare(base: &str) -> bool
{
    base.starts_with("cmp") || base.starts_with("fcmp")
}

fn is_trap(base: &str) -> bool
{
    matches!(base.get(..2), Some("tw" | "td")) || base == "trap"
}

fn go_branch(inst: &Inst, pc: u64, sym_lookup: Option<SymLookup<'_>>) -> Option<String>
{
    let cr_prefix = |bi: u32| if bi / 4 == 0 { String::new() } else { format!("CR{}, ", bi / 4) };
    let target = || {
        inst.branch_target()
            .and_then(|arg| target_address(arg, pc))
            .map(|addr| go_target(addr, sym_lookup))
            .unwrap_or_else(|| "?".to_string())
    };

    let text = match inst.op {
        Op::B | Op::Ba => format!("BR {}", target()),
        Op::Bl | Op::Bla => format!("CALL {}", target()),
        Op::Bc | Op::Bca | Op::Bcl | Op::Bcla => match condition(bo(inst), bi(inst)) {
            Cond::Always if link(inst) => format!("CALL {}", target()),
            Cond::Always => format!("BR {}", target()),
            Cond::True(bi) if !link(inst) => format!("B{} {}{}", GO_TRUE[(bi % 4) as usize], cr_prefix(bi), target()),
            Cond::False(bi) if !link(inst) => {
                format!("B{} {}{}", GO_FALSE[(bi % 4) as usize], cr_prefix(bi), target())
            }
            Cond::Dnz if !link(inst) => format!("BDNZ {}", target()),
            Cond::Dz if !link(inst) => format!("BDZ {}", target()),
            _ => format!(
                "{} ${}, ${}, {}",
                if link(inst) { "BCL" } else { "BC" },
                bo(inst),
                bi(inst),
                target()
            ),
        },
        Op::Bclr | Op::Bclrl | Op::Bcctr | Op::Bcctrl | Op::Bctar | Op::Bctarl => {
            let reg = match inst.op {
                Op::Bclr | Op::Bclrl => "LR",
                Op::Bcctr | Op::Bcctrl => "CTR",
                _ => "TAR",
            };
            match condition(bo(inst), bi(inst)) {
                Cond::Always if link(inst) => format!("CALL ({reg})"),
                Cond::Always if reg == "LR" => "RET".to_string(),
                Cond::Always => format!("JMP ({reg})"),
                Cond::True(bi) if !link(inst) => format!("B{} {}({reg})", GO_TRUE[(bi % 4) as usize], cr_prefix(bi)),
                Cond::False(bi) if !link(inst) => format!("B{} {}({reg})", GO_FALSE[(bi % 4) as usize], cr_prefix(bi)),
                _ => format!(
                    "{} ${}, ${}, ({reg})",
                    if link(inst) { "BCL" } else { "BC" },
                    bo(inst),
                    bi(inst)
                ),
            }
        }
        _ => return None,
    };
    Some(text)
}

fn go_target(addr: u64, sym_lookup: Option<SymLookup<'_>>) -> String
{
    match sym_lookup.and_then(|lookup| lookup(addr)) {
        Some((name, base)) if addr == base => format!("{name}(SB)"),
        Some((name, base)) => format!("{name}+0x{:x}(SB)", addr.wrapping_sub(base)),
        None => format!("0x{addr:x}"),
    }
}

fn go_simplified(inst: &Inst) -> Option<String>
{
    let args = inst.args.as_slice();
    let text = match (inst.mnemonic.as_str(), args) {
        ("nop", _) => "NOP".to_string(),
        ("trap", _) => "TW $31, R0, R0".to_string(),
        ("li", [rt, Arg::Imm(si)]) => format!("MOVD ${si}, {}", go_arg(*rt)),
        ("lis", [rt, Arg::Imm(si)]) => format!("MOVD ${}, {}", si << 16, go_arg(*rt)),
        ("mr", [ra, rs]) => format!("MOVD {}, {}", go_arg(*rs), go_arg(*ra)),
        ("mflr", [rt]) => format!("MOVD LR, {}", go_arg(*rt)),
        ("mfctr", [rt]) => format!("MOVD CTR, {}", go_arg(*rt)),
        ("mfxer", [rt]) => format!("MOVD XER, {}", go_arg(*rt)),
        ("mtlr", [rs]) => format!("MOVD {}, LR", go_arg(*rs)),
        ("mtctr", [rs]) => format!("MOVD {}, CTR", go_arg(*rs)),
        ("mtxer", [rs]) => format!("MOVD {}, XER", go_arg(*rs)),
        ("mfspr", [rt, Arg::Imm(n)]) => format!("MOVD SPR({n}), {}", go_arg(*rt)),
        ("mtspr", [Arg::Imm(n), rs]) => format!("MOVD {}, SPR({n})", go_arg(*rs)),
        ("lwsync", _) => "LWSYNC".to_string(),
        ("sc", _) => "SYSCALL".to_string(),
        _ => return None,
    };
    Some(text)
}

/// Go opcode for `mnemonic`, with `V` (overflow) and `CC` (record) suffixes.
fn go_mnemonic(mnemonic: &str, base: &str, inst: &Inst) -> String
{
    // Forms that always record keep their `.` in the lookup.
    let always_records = match mnemonic {
        "andi." => Some("ANDCC"),
        "andis." => Some("ANDISCC"),
        "addic." => Some("ADDCCC"),
        _ => None,
    };
    if let Some(name) = always_records {
        return name.to_string();
    }

    let name = match base {
        "ld" | "ldx" | "std" | "stdx" => "MOVD",
        "fmr" => "FMOVD",
        "ldu" | "stdu" => "MOVDU",
        "lwz" | "lwzx" => "MOVWZ",
        "lwzu" => "MOVWZU",
        "lwa" | "stw" | "stwx" | "extsw" => "MOVW",
        "stwu" => "MOVWU",
        "lbz" | "lbzx" => "MOVBZ",
        "lbzu" => "MOVBZU",
        "stb" | "stbx" | "extsb" => "MOVB",
        "stbu" => "MOVBU",
        "lhz" | "lhzx" => "MOVHZ",
        "lhzu" => "MOVHZU",
        "lha" | "sth" | "extsh" => "MOVH",
        "lfd" | "stfd" => "FMOVD",
        "lfs" | "stfs" => "FMOVS",
        "addi" | "add" => "ADD",
        "addic" => "ADDC",
        "subf" => "SUB",
        "subfc" | "subfic" => "SUBC",
        "subfe" => "SUBE",
        "mulli" => "MULLD",
        "andc" => "ANDN",
        "ori" => "OR",
        "xori" => "XOR",
        "sradi" => "SRAD",
        "cmpd" | "cmpdi" => "CMP",
        "cmpld" | "cmpldi" => "CMPU",
        "cmpw" | "cmpwi" => "CMPW",
        "cmplw" | "cmplwi" => "CMPWU",
        "twi" => "TW",
        "tdi" => "TD",
        "mfcr" => "MOVW",
        "mtcrf" => "MOVFL",
        _ => "",
    };
    let mut name = if name.is_empty() { base.to_uppercase() } else { name.to_string() };
    if inst.oe {
        name.push('V');
    }
    if inst.rc {
        name.push_str("CC");
    }
    name
}

fn go_arg(arg: Arg) -> String
{
    match arg {
        Arg::Reg(Reg::Gpr(n)) => format!("R{n}"),
        Arg::Reg(Reg::Fpr(n)) => format!("F{n}"),
        Arg::Reg(Reg::Vr(n)) => format!("V{n}"),
        Arg::Reg(Reg::Vsr(n)) => format!("VS{n}"),
        Arg::Reg(Reg::Cr(n)) => format!("CR{n}"),
        Arg::Reg(Reg::Spr(spr::LR)) => "LR".to_string(),
        Arg::Reg(Reg::Spr(spr::CTR)) => "CTR".to_string(),
        Arg::Reg(Reg::Spr(spr::XER)) => "XER".to_string(),
        Arg::Reg(Reg::Spr(n)) => format!("SPR({n})"),
        Arg::Reg(Reg::Other(id)) => reg_name(id).map_or_else(|| "?".to_string(), |name| name.to_uppercase()),
        Arg::CondBit(n) => format!("CR{}{}", n / 4, GO_CR_BITS[(n % 4) as usize]),
        Arg::Imm(v) => format!("${v}"),
        Arg::PcRel(off) => format!("{off:+}(PC)"),
        Arg::Mem { disp, base } => format!("{disp}(R{base})"),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_cond_bit_operand_names()
    {
        assert_eq!(go_arg(Arg::CondBit(3)), "CR0SO");
        assert_eq!(go_arg(Arg::CondBit(30)), "CR7EQ");
        assert_eq!(GO_TRUE[3], "VS");
    }
}
