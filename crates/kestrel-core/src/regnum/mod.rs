//! # DWARF Register Numbering
//!
//! Mappings between native register names and the register numbers debug
//! metadata uses (`DW_OP_reg*`, CFI register rules, location lists).
//!
//! Each architecture gets its own submodule with three queries:
//!
//! - name → number (`name_to_dwarf`)
//! - number → display name (`dwarf_to_name`)
//! - largest valid number (`max_reg_num`)
//!
//! The tables are built once on first use and are read-only afterwards.

pub mod ppc64le;

/// Convert a DWARF register number to `gimli`'s register type.
///
/// Returns `None` for numbers that do not fit DWARF's 16-bit register space.
pub fn to_gimli(num: u64) -> Option<gimli::Register>
{
    u16::try_from(num).ok().map(gimli::Register)
}
