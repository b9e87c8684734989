//! Source location types attached to decoded instructions.

use std::fmt;

/// A function known to the symbol resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function
{
    /// Preferred display name (demangled when possible)
    pub name: String,
    /// Address of the first instruction
    pub entry: u64,
    /// One past the last instruction, when the symbol carries a size
    pub end: Option<u64>,
}

impl Function
{
    /// Whether `pc` falls inside this function.
    pub fn contains(&self, pc: u64) -> bool
    {
        match self.end {
            Some(end) => self.entry <= pc && pc < end,
            None => self.entry == pc,
        }
    }
}

/// A program-counter address, optionally enriched with source information.
///
/// Branch targets that resolve to no known function still produce a
/// `Location`; only `pc` is guaranteed to be meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location
{
    /// Instruction address
    pub pc: u64,
    /// Source file, if known
    pub file: Option<String>,
    /// Source line, if known
    pub line: Option<u32>,
    /// Enclosing function, if known
    pub function: Option<Function>,
}

impl Location
{
    /// A location that only knows its address.
    pub const fn from_pc(pc: u64) -> Self
    {
        Self {
            pc,
            file: None,
            line: None,
            function: None,
        }
    }

    /// Whether any symbolic information is attached.
    pub fn is_symbolized(&self) -> bool
    {
        self.function.is_some()
    }
}

impl fmt::Display for Location
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.pc)?;
        if let Some(function) = &self.function {
            write!(f, " in {}", function.name)?;
        }
        if let Some(file) = &self.file {
            write!(f, " at {file}")?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
        }
        Ok(())
    }
}
