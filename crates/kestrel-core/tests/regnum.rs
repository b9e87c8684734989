//! Tests for the ppc64le DWARF register numbering

use kestrel_core::arch::{self, Arch, AsmReg, PPC64LE};
use kestrel_core::disasm::ppc64::{spr, Reg};
use kestrel_core::registers::DwarfRegisters;
use kestrel_core::regnum::{self, ppc64le};
use kestrel_core::types::Architecture;

#[test]
fn test_block_names_round_trip()
{
    for num in 0..ppc64le::max_reg_num() {
        let name = ppc64le::dwarf_to_name(num);
        assert_eq!(ppc64le::name_to_dwarf(&name), Some(num), "round trip of {name}");
    }
}

#[test]
fn test_block_boundaries()
{
    assert_eq!(ppc64le::dwarf_to_name(0), "r0");
    assert_eq!(ppc64le::dwarf_to_name(31), "r31");
    assert_eq!(ppc64le::dwarf_to_name(32), "f0");
    assert_eq!(ppc64le::dwarf_to_name(63), "f31");
    assert_eq!(ppc64le::dwarf_to_name(64), "v0");
    assert_eq!(ppc64le::dwarf_to_name(95), "v31");
    assert_eq!(ppc64le::dwarf_to_name(96), "vs0");
    assert_eq!(ppc64le::dwarf_to_name(159), "vs63");
}

#[test]
fn test_special_numbers_use_block_names()
{
    assert_eq!(ppc64le::dwarf_to_name(ppc64le::SP), "r1");
    assert_eq!(ppc64le::dwarf_to_name(ppc64le::PC), "r12");
    assert_eq!(ppc64le::dwarf_to_name(ppc64le::LR), "v1");
}

#[test]
fn test_aliases()
{
    assert_eq!(ppc64le::name_to_dwarf("nip"), Some(12));
    assert_eq!(ppc64le::name_to_dwarf("sp"), Some(1));
    assert_eq!(ppc64le::name_to_dwarf("bp"), Some(1));
    assert_eq!(ppc64le::name_to_dwarf("link"), Some(65));
    assert_eq!(ppc64le::name_to_dwarf("cr0"), Some(0));
    assert_eq!(ppc64le::name_to_dwarf("cr7"), Some(7));
}

#[test]
fn test_lookup_is_case_insensitive()
{
    assert_eq!(ppc64le::name_to_dwarf("R3"), Some(3));
    assert_eq!(ppc64le::name_to_dwarf("VS10"), Some(106));
    assert_eq!(ppc64le::name_to_dwarf("Link"), Some(65));
}

#[test]
fn test_unknown_names_and_numbers()
{
    assert_eq!(ppc64le::name_to_dwarf("rax"), None);
    assert_eq!(ppc64le::name_to_dwarf("r32"), None);
    assert_eq!(ppc64le::name_to_dwarf(""), None);
    assert_eq!(ppc64le::dwarf_to_name(160), "unknown160");
    assert_eq!(ppc64le::dwarf_to_name(u64::MAX), format!("unknown{}", u64::MAX));
}

#[test]
fn test_max_reg_num()
{
    assert_eq!(ppc64le::max_reg_num(), 160);
    assert_eq!(PPC64LE.max_reg_num(), 160);
}

#[test]
fn test_table_is_complete()
{
    // 32 gpr + 32 fpr + 32 vr + 64 vsr + 8 cr + 4 aliases
    assert_eq!(ppc64le::NAME_TO_DWARF.len(), 172);
}

#[test]
fn test_to_gimli()
{
    assert_eq!(regnum::to_gimli(65), Some(gimli::Register(65)));
}

#[test]
fn test_arch_trait_delegates()
{
    let arch = arch::for_architecture(Architecture::PowerPc64Le).unwrap();
    assert_eq!(arch.architecture(), Architecture::PowerPc64Le);
    assert_eq!(arch.name_to_dwarf("r30"), Some(30));
    assert_eq!(arch.dwarf_to_name(40), "f8");
    assert_eq!(arch.pc_regnum(), 12);
    assert_eq!(arch.sp_regnum(), 1);
    assert_eq!(arch.lr_regnum(), 65);
    assert_eq!(arch.breakpoint_instruction(), &[0x08, 0x00, 0xe0, 0x7f]);
}

#[test]
fn test_unsupported_architecture()
{
    let err = arch::for_architecture(Architecture::X86_64).err().unwrap();
    assert!(err.to_string().contains("x86_64"));
}

#[test]
fn test_asm_register()
{
    let regs = DwarfRegisters::new(ppc64le::PC, ppc64le::SP, ppc64le::LR)
        .with(3, 0x1234)
        .with(ppc64le::F0 + 2, 0x4000)
        .with(ppc64le::LR, 0xdead_beef);

    assert_eq!(PPC64LE.asm_register(&regs, AsmReg::Ppc64(Reg::Gpr(3))).unwrap(), 0x1234);
    assert_eq!(PPC64LE.asm_register(&regs, AsmReg::Ppc64(Reg::Fpr(2))).unwrap(), 0x4000);
    assert_eq!(
        PPC64LE
            .asm_register(&regs, AsmReg::Ppc64(Reg::Spr(spr::LR)))
            .unwrap(),
        0xdead_beef
    );
    assert!(PPC64LE.asm_register(&regs, AsmReg::Ppc64(Reg::Gpr(4))).is_err());
    assert!(PPC64LE.asm_register(&regs, AsmReg::Ppc64(Reg::Spr(spr::CTR))).is_err());
}
