//! Common module for library exports

pub use crate::arch::{for_architecture, Arch, AsmReg, PPC64LE};
pub use crate::disasm::{disassemble, AsmInstruction, AssemblyFlavour, InstructionKind};
pub use crate::error::{DebuggerError, DecodeError, Result};
#[cfg(all(target_os = "linux", target_arch = "powerpc64"))]
pub use crate::platform::linux::{LinuxPtrace, ProcessMemory};
pub use crate::prologue::{find_prologue_end, first_pc_after_prologue, OpcodeSeq};
pub use crate::registers::{DwarfRegisters, MachineState, Ppc64leRegisters, PtraceRegs, RegisterView};
pub use crate::symbols::{AddressResolver, BinaryResolver, NoSymbols, SymbolTable};
pub use crate::target::{BufferMemory, MemoryAccess, PtraceBackend};
pub use crate::thread::{Ppc64leThread, ThreadContext};
pub use crate::types::{Architecture, Function, Location, ThreadId};
