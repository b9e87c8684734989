//! # Symbol Resolution
//!
//! The disassembler only needs one thing from debug metadata: "what is at
//! this address?" That question is the [`AddressResolver`] trait.
//!
//! Implementations:
//!
//! - [`NoSymbols`]: knows nothing, every location carries only its address
//! - [`SymbolTable`]: an in-memory, sorted function table
//! - [`BinaryResolver`]: an ELF file; functions come from the symbol table,
//!   file and line from DWARF via `addr2line`

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};
use rustc_demangle::try_demangle;
use tracing::{debug, info};

use crate::error::{DebuggerError, Result};
use crate::types::{Architecture, Function, Location};

type OwnedReader = EndianArcSlice<RunTimeEndian>;

/// Maps instruction addresses to source information.
pub trait AddressResolver
{
    /// Source file, line and enclosing function of `pc`.
    fn pc_to_line(&self, pc: u64) -> (Option<String>, Option<u32>, Option<Function>);

    /// `pc` as a [`Location`].
    ///
    /// Without an enclosing function the location carries only the address,
    /// even if a file or line was found.
    fn location(&self, pc: u64) -> Location
    {
        let (file, line, function) = self.pc_to_line(pc);
        match function {
            Some(function) => Location {
                pc,
                file,
                line,
                function: Some(function),
            },
            None => Location::from_pc(pc),
        }
    }
}

/// A resolver with no symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl AddressResolver for NoSymbols
{
    fn pc_to_line(&self, _pc: u64) -> (Option<String>, Option<u32>, Option<Function>)
    {
        (None, None, None)
    }
}

/// Functions sorted by entry address.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable
{
    functions: Vec<Function>,
}

impl SymbolTable
{
    pub fn new(mut functions: Vec<Function>) -> Self
    {
        functions.sort_by_key(|function| function.entry);
        Self { functions }
    }

    pub fn functions(&self) -> &[Function]
    {
        &self.functions
    }

    pub fn len(&self) -> usize
    {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.functions.is_empty()
    }

    /// The function containing `pc`.
    pub fn function_at(&self, pc: u64) -> Option<&Function>
    {
        let idx = self.functions.partition_point(|function| function.entry <= pc);
        let candidate = self.functions.get(idx.checked_sub(1)?)?;
        candidate.contains(pc).then_some(candidate)
    }

    /// Look up a function by (demangled) name.
    pub fn by_name(&self, name: &str) -> Option<&Function>
    {
        self.functions.iter().find(|function| function.name == name)
    }

    /// `(name, entry)` of the function containing `pc`, the shape the Go
    /// instruction renderer expects.
    pub fn symbol_at(&self, pc: u64) -> Option<(String, u64)>
    {
        self.function_at(pc)
            .map(|function| (function.name.clone(), function.entry))
    }
}

impl AddressResolver for SymbolTable
{
    fn pc_to_line(&self, pc: u64) -> (Option<String>, Option<u32>, Option<Function>)
    {
        (None, None, self.function_at(pc).cloned())
    }
}

/// Symbols and line tables of an ELF binary.
pub struct BinaryResolver
{
    path: PathBuf,
    architecture: Architecture,
    table: SymbolTable,
    context: Option<Context<OwnedReader>>,
}

impl std::fmt::Debug for BinaryResolver
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("BinaryResolver")
            .field("path", &self.path)
            .field("architecture", &self.architecture)
            .field("functions", &self.table.len())
            .field("has_line_info", &self.context.is_some())
            .finish()
    }
}

impl BinaryResolver
{
    /// Load `path`.
    ///
    /// Missing DWARF is not an error: the resolver then reports functions
    /// but no file/line.
    ///
    /// # Errors
    ///
    /// - [`DebuggerError::Io`] if the file cannot be read
    /// - [`DebuggerError::Symbols`] if it is not a parsable object file
    pub fn load(path: impl AsRef<Path>) -> Result<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let file = object::File::parse(&*bytes)
            .map_err(|err| DebuggerError::Symbols(format!("failed to parse {}: {err}", path.display())))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };
        let architecture = Architecture::from_object(file.architecture(), file.is_little_endian());

        let table = SymbolTable::new(function_symbols(&file));

        let mut sections = HashMap::new();
        for name in DWARF_SECTIONS {
            if let Some(data) = load_section_bytes(&file, name)? {
                sections.insert(*name, data);
            }
        }
        let context = if sections.contains_key(".debug_info") {
            match build_context(&sections, endian) {
                Ok(context) => Some(context),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "line tables unavailable");
                    None
                }
            }
        } else {
            None
        };

        info!(
            path = %path.display(),
            %architecture,
            functions = table.len(),
            line_info = context.is_some(),
            "loaded binary symbols"
        );

        Ok(Self {
            path: path.to_path_buf(),
            architecture,
            table,
            context,
        })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Architecture recorded in the ELF header.
    pub fn architecture(&self) -> Architecture
    {
        self.architecture
    }

    pub fn symbols(&self) -> &SymbolTable
    {
        &self.table
    }

    fn file_line(&self, pc: u64) -> (Option<String>, Option<u32>)
    {
        let Some(context) = &self.context else {
            return (None, None);
        };
        match context.find_location(pc) {
            Ok(Some(location)) => (location.file.map(str::to_string), location.line),
            Ok(None) => (None, None),
            Err(err) => {
                debug!(pc = format_args!("0x{pc:x}"), error = %err, "line lookup failed");
                (None, None)
            }
        }
    }
}

impl AddressResolver for BinaryResolver
{
    fn pc_to_line(&self, pc: u64) -> (Option<String>, Option<u32>, Option<Function>)
    {
        let (file, line) = self.file_line(pc);
        (file, line, self.table.function_at(pc).cloned())
    }
}

const DWARF_SECTIONS: &[&str] = &[
    ".debug_abbrev",
    ".debug_addr",
    ".debug_info",
    ".debug_line",
    ".debug_line_str",
    ".debug_ranges",
    ".debug_rnglists",
    ".debug_str",
    ".debug_str_offsets",
];

fn section_name(id: SectionId) -> &'static str
{
    match id {
        SectionId::DebugAbbrev => ".debug_abbrev",
        SectionId::DebugAddr => ".debug_addr",
        SectionId::DebugInfo => ".debug_info",
        SectionId::DebugLine => ".debug_line",
        SectionId::DebugLineStr => ".debug_line_str",
        SectionId::DebugRanges => ".debug_ranges",
        SectionId::DebugRngLists => ".debug_rnglists",
        SectionId::DebugStr => ".debug_str",
        SectionId::DebugStrOffsets => ".debug_str_offsets",
        _ => "",
    }
}

fn build_context(sections: &HashMap<&'static str, Arc<[u8]>>, endian: RunTimeEndian) -> Result<Context<OwnedReader>>
{
    let dwarf = Dwarf::load(|id| {
        let data = sections
            .get(section_name(id))
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        Ok::<_, gimli::Error>(EndianArcSlice::new(data, endian))
    })
    .map_err(|err| DebuggerError::Symbols(format!("failed to load DWARF: {err}")))?;

    Context::from_dwarf(dwarf).map_err(|err| DebuggerError::Symbols(format!("failed to build line context: {err}")))
}

fn load_section_bytes(file: &object::File<'_>, name: &str) -> Result<Option<Arc<[u8]>>>
{
    let Some(section) = file.section_by_name(name) else {
        return Ok(None);
    };
    let data = section
        .uncompressed_data()
        .map_err(|err| DebuggerError::Symbols(format!("failed to read {name}: {err}")))?;
    Ok(Some(match data {
        Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
        Cow::Owned(vec) => vec.into(),
    }))
}

fn function_symbols(file: &object::File<'_>) -> Vec<Function>
{
    file.symbols()
        .filter(|symbol| symbol.kind() == SymbolKind::Text && symbol.is_definition())
        .filter_map(|symbol| {
            let raw = symbol.name().ok().filter(|name| !name.is_empty())?;
            let entry = symbol.address();
            let size = symbol.size();
            Some(Function {
                name: demangle(raw),
                entry,
                end: (size > 0).then(|| entry + size),
            })
        })
        .collect()
}

/// Demangle a Rust symbol without its hash suffix; other names pass through.
pub fn demangle(raw: &str) -> String
{
    match try_demangle(raw) {
        Ok(demangled) => format!("{demangled:#}"),
        Err(_) => raw.to_string(),
    }
}
