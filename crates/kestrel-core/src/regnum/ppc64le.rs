//! ppc64le DWARF register numbers.
//!
//! The mapping between hardware registers and DWARF registers follows the
//! 64-Bit ELF V2 ABI Specification of the Power Architecture, section 2.4
//! "DWARF Definition".
//!
//! ```text
//! 0   ..= 31   r0  - r31   general purpose
//! 32  ..= 63   f0  - f31   floating point
//! 64  ..= 95   v0  - v31   vector (Altivec/VMX)
//! 96  ..= 159  vs0 - vs63  vector scalar (VSX)
//! ```
//!
//! The stack pointer, program counter and link register have fixed numbers
//! that alias into those blocks, so number → name always reports the block
//! name (`r1`, `r12`, `v1`). The aliases only exist in the name → number
//! direction.
//!
//! See: [ELFv2 ABI](https://openpowerfoundation.org/specifications/64bitelfabi/)

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// General purpose registers: from R0 to R31
pub const R0: u64 = 0;
/// Floating point registers: from F0 to F31
pub const F0: u64 = 32;
/// Vector (Altivec/VMX) registers: from V0 to V31
pub const V0: u64 = 64;
/// Vector scalar (VSX) registers: from VS0 to VS63
pub const VS0: u64 = 96;
/// Condition register fields: from CR0 to CR7
pub const CR0: u64 = 0;
/// Stack frame pointer, `gpr[1]`
pub const SP: u64 = 1;
/// Current instruction address
pub const PC: u64 = 12;
/// Link register
pub const LR: u64 = 65;

const GPR_COUNT: u64 = 32;
const FPR_COUNT: u64 = 32;
const VR_COUNT: u64 = 32;
const VSR_COUNT: u64 = 64;
const CR_COUNT: u64 = 8;

/// Every name the debugger accepts for a ppc64le register.
///
/// Keys are lowercase; use [`name_to_dwarf`] for case-insensitive lookups.
pub static NAME_TO_DWARF: Lazy<HashMap<String, u64>> = Lazy::new(|| {
    let mut names = HashMap::new();

    names.insert("nip".to_string(), PC);
    names.insert("sp".to_string(), SP);
    names.insert("bp".to_string(), SP);
    names.insert("link".to_string(), LR);

    for i in 0..GPR_COUNT {
        names.insert(format!("r{i}"), R0 + i);
    }
    for i in 0..FPR_COUNT {
        names.insert(format!("f{i}"), F0 + i);
    }
    for i in 0..VR_COUNT {
        names.insert(format!("v{i}"), V0 + i);
    }
    for i in 0..VSR_COUNT {
        names.insert(format!("vs{i}"), VS0 + i);
    }
    for i in 0..CR_COUNT {
        names.insert(format!("cr{i}"), CR0 + i);
    }

    names
});

/// Look up the DWARF number of a register by name.
///
/// ```rust
/// use kestrel_core::regnum::ppc64le;
///
/// assert_eq!(ppc64le::name_to_dwarf("r3"), Some(3));
/// assert_eq!(ppc64le::name_to_dwarf("SP"), Some(ppc64le::SP));
/// assert_eq!(ppc64le::name_to_dwarf("xmm0"), None);
/// ```
pub fn name_to_dwarf(name: &str) -> Option<u64>
{
    NAME_TO_DWARF.get(name.to_lowercase().as_str()).copied()
}

/// Display name for a DWARF register number.
///
/// Never fails: numbers outside every block render as `unknown<N>` because
/// debug metadata may reference registers the backend does not model.
///
/// ```rust
/// use kestrel_core::regnum::ppc64le;
///
/// assert_eq!(ppc64le::dwarf_to_name(33), "f1");
/// assert_eq!(ppc64le::dwarf_to_name(500), "unknown500");
/// ```
pub fn dwarf_to_name(num: u64) -> String
{
    match num {
        n if (R0..F0).contains(&n) => format!("r{}", n - R0),
        n if (F0..V0).contains(&n) => format!("f{}", n - F0),
        n if (V0..VS0).contains(&n) => format!("v{}", n - V0),
        n if (VS0..VS0 + VSR_COUNT).contains(&n) => format!("vs{}", n - VS0),
        n => format!("unknown{n}"),
    }
}

/// Upper bound used by callers to size DWARF register arrays.
///
/// One past the last VSX register, so `0..max_reg_num()` covers every block.
pub const fn max_reg_num() -> u64
{
    VS0 + VSR_COUNT
}
