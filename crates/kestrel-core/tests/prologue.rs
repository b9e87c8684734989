//! Tests for stack-split prologue recognition

use kestrel_core::arch::{Arch, PPC64LE};
use kestrel_core::disasm::ppc64::Op;
use kestrel_core::disasm::{disassemble, AsmInstruction};
use kestrel_core::prologue::{find_prologue_end, first_pc_after_prologue, OpcodeSeq, PPC64LE_PROLOGUES};
use kestrel_core::symbols::NoSymbols;
use kestrel_core::target::BufferMemory;
use kestrel_core::types::Function;

const NOP: u32 = 0x6000_0000;
const LDX: u32 = 0x7c64_282a; // ldx r3,r4,r5
const CMPD: u32 = 0x7c23_2000; // cmpd r3,r4
const B: u32 = 0x4800_0040; // b .+0x40
const SUBF: u32 = 0x7c64_2850; // subf r3,r4,r5
const ADD: u32 = 0x7c64_2a14; // add r3,r4,r5

const ENTRY: u64 = 0x10000;

fn memory(words: &[u32]) -> BufferMemory
{
    let mut bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    // Pad so the longest catalog entry can always be read.
    bytes.resize(bytes.len().max(64), 0);
    for chunk in bytes.chunks_exact_mut(4).skip(words.len()) {
        chunk.copy_from_slice(&NOP.to_le_bytes());
    }
    BufferMemory::new(ENTRY, bytes)
}

fn decode(words: &[u32]) -> Vec<AsmInstruction>
{
    let mem = memory(words);
    disassemble(&mem, None, &NoSymbols, &PPC64LE, ENTRY, ENTRY + 4 * words.len() as u64, None).unwrap()
}

fn function(end: Option<u64>) -> Function
{
    Function {
        name: "main.work".to_string(),
        entry: ENTRY,
        end,
    }
}

#[test]
fn test_catalog_shape()
{
    let catalog = PPC64LE.prologues();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog[0], OpcodeSeq::from(&[Op::Ldx, Op::Ldx, Op::Cmpd, Op::B][..]));
    assert_eq!(catalog[1], OpcodeSeq::from(&[Op::Ldx, Op::Subf, Op::Cmpd, Op::B][..]));
    assert_eq!(
        catalog[2],
        OpcodeSeq::from(&[Op::Ldx, Op::Cmpd, Op::B, Op::Add, Op::Subf, Op::Ldx, Op::Cmpd, Op::B][..])
    );
    assert!(std::ptr::eq(catalog, PPC64LE_PROLOGUES.as_slice()));
}

#[test]
fn test_tiny_prologue()
{
    let insts = decode(&[LDX, LDX, CMPD, B, NOP]);
    assert_eq!(find_prologue_end(&insts, PPC64LE.prologues()), Some(ENTRY + 16));
}

#[test]
fn test_small_prologue()
{
    let insts = decode(&[LDX, SUBF, CMPD, B]);
    assert_eq!(find_prologue_end(&insts, PPC64LE.prologues()), Some(ENTRY + 16));
}

#[test]
fn test_big_prologue()
{
    let insts = decode(&[LDX, CMPD, B, ADD, SUBF, LDX, CMPD, B, NOP]);
    assert_eq!(find_prologue_end(&insts, PPC64LE.prologues()), Some(ENTRY + 32));
}

#[test]
fn test_no_prologue()
{
    // Missing the prefix load
    let insts = decode(&[LDX, CMPD, B, NOP]);
    assert_eq!(find_prologue_end(&insts, PPC64LE.prologues()), None);

    // Too short
    let insts = decode(&[LDX, LDX, CMPD]);
    assert_eq!(find_prologue_end(&insts, PPC64LE.prologues()), None);
}

#[test]
fn test_undecodable_word_breaks_match()
{
    let insts = decode(&[LDX, 0, CMPD, B]);
    assert!(insts[1].inst.is_none());
    assert_eq!(find_prologue_end(&insts, PPC64LE.prologues()), None);
}

fn word_for(op: Op) -> u32
{
    match op {
        Op::Ldx => LDX,
        Op::Cmpd => CMPD,
        Op::B => B,
        Op::Subf => SUBF,
        Op::Add => ADD,
        other => panic!("no sample word for {other}"),
    }
}

#[test]
fn test_every_position_of_every_entry_matters()
{
    for seq in PPC64LE.prologues() {
        let words: Vec<u32> = seq.ops().iter().map(|id| word_for(Op::from_id(*id).unwrap())).collect();
        let expected = ENTRY + 4 * words.len() as u64;
        assert_eq!(find_prologue_end(&decode(&words), PPC64LE.prologues()), Some(expected), "{seq}");

        for i in 0..words.len() {
            for replacement in [NOP, 0] {
                let mut mutated = words.clone();
                mutated[i] = replacement;
                assert_eq!(
                    find_prologue_end(&decode(&mutated), PPC64LE.prologues()),
                    None,
                    "{seq} with position {i} replaced by 0x{replacement:08x}"
                );
            }
        }
    }
}

#[test]
fn test_matches_is_positional()
{
    let seq = OpcodeSeq::from(&[Op::Cmpd, Op::B][..]);
    assert!(seq.matches(&decode(&[CMPD, B, NOP])));
    assert!(!seq.matches(&decode(&[NOP, CMPD, B])));
    assert!(!seq.matches(&decode(&[B, CMPD])));
}

#[test]
fn test_first_pc_after_prologue()
{
    let mem = memory(&[LDX, SUBF, CMPD, B, NOP, NOP]);
    let pc = first_pc_after_prologue(&function(Some(ENTRY + 24)), &PPC64LE, &mem, &NoSymbols).unwrap();
    assert_eq!(pc, ENTRY + 16);
}

#[test]
fn test_first_pc_after_prologue_falls_back_to_entry()
{
    let mem = memory(&[NOP, NOP, NOP, NOP]);
    let pc = first_pc_after_prologue(&function(None), &PPC64LE, &mem, &NoSymbols).unwrap();
    assert_eq!(pc, ENTRY);
}

#[test]
fn test_first_pc_after_prologue_respects_function_end()
{
    // The prologue would match, but the function is only two instructions.
    let mem = memory(&[LDX, LDX, CMPD, B]);
    let pc = first_pc_after_prologue(&function(Some(ENTRY + 8)), &PPC64LE, &mem, &NoSymbols).unwrap();
    assert_eq!(pc, ENTRY);
}

#[test]
fn test_short_function_at_end_of_memory()
{
    // No known end, and only the prologue itself is mapped.
    let bytes: Vec<u8> = [LDX, SUBF, CMPD, B].iter().flat_map(|w| w.to_le_bytes()).collect();
    let mem = BufferMemory::new(ENTRY, bytes);
    let pc = first_pc_after_prologue(&function(None), &PPC64LE, &mem, &NoSymbols).unwrap();
    assert_eq!(pc, ENTRY + 16);

    let bytes: Vec<u8> = [NOP, NOP].iter().flat_map(|w| w.to_le_bytes()).collect();
    let mem = BufferMemory::new(ENTRY, bytes);
    let pc = first_pc_after_prologue(&function(None), &PPC64LE, &mem, &NoSymbols).unwrap();
    assert_eq!(pc, ENTRY);
}

#[test]
fn test_first_pc_after_prologue_unreadable()
{
    let mem = BufferMemory::new(0x9000, vec![0; 4]);
    assert!(first_pc_after_prologue(&function(None), &PPC64LE, &mem, &NoSymbols).is_err());
}

#[test]
fn test_opcode_seq_display()
{
    assert_eq!(PPC64LE.prologues()[1].to_string(), "ldx subf cmpd b");
    assert_eq!(OpcodeSeq::new([Op::Cmpd.id(), u16::MAX]).to_string(), "cmpd #65535");
    assert_eq!(Op::from_id(Op::Bl.id()), Some(Op::Bl));
}
