use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use kestrel_core::arch::{for_architecture, Arch};
use kestrel_core::disasm::{disassemble, AsmInstruction, AssemblyFlavour, InstructionKind, SymLookup};
use kestrel_core::registers::DwarfRegisters;
use kestrel_core::symbols::{BinaryResolver, NoSymbols};
use kestrel_core::target::BufferMemory;
use kestrel_core::types::{Architecture, ThreadId};
use kestrel_core::{DebuggerError, Result as DebuggerResult};
use kestrel_utils::{info, init_logging, LogConfig, LogLevel};

/// Inspect PowerPC machine state and instruction streams.
#[derive(Parser, Debug)]
#[command(name = "kestrel")]
#[command(version)]
#[command(about = "Inspect PowerPC machine state and instruction streams", long_about = None)]
struct Cli
{
    /// Target architecture (default: from --binary, else the host)
    #[arg(long, global = true)]
    arch: Option<Architecture>,

    /// Log level, overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Also write logs to a dated file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Translate a register name to its DWARF number, or a number to its name
    Regnum
    {
        /// Register name (e.g. r3, sp, link) or DWARF number
        register: String,
    },
    /// Decode instruction bytes
    Disasm
    {
        /// Instruction bytes in hex, in memory order (e.g. "03100048" or "03 10 00 48")
        #[arg(num_args = 1.., required = true)]
        bytes: Vec<String>,
        /// Address of the first byte (hex format: 0x1000 or decimal)
        #[arg(long, default_value = "0")]
        pc: String,
        /// Output syntax: gnu or go
        #[arg(long, default_value_t = AssemblyFlavour::Gnu)]
        flavour: AssemblyFlavour,
        /// ELF file used to name branch destinations
        #[arg(long)]
        binary: Option<PathBuf>,
        /// Link register value; treats the first instruction as the current one
        #[arg(long)]
        lr: Option<String>,
    },
    /// List the stack-split prologues recognised on this architecture
    Prologues,
    /// Print the registers of a thread that is already stopped under ptrace
    Registers
    {
        /// Thread ID
        tid: u64,
        /// Include floating point and vector registers
        #[arg(long, default_value_t = false)]
        fp: bool,
    },
}

fn main()
{
    let cli = Cli::parse();

    let config = match cli.log_dir.as_deref() {
        Some(dir) => LogConfig::from_env().with_log_dir(dir),
        None => Ok(LogConfig::from_env()),
    };
    let guard = match config.and_then(|config| init_logging(&config.with_level(cli.log_level))) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    let result = run_command(cli);
    drop(guard);
    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> DebuggerResult<()>
{
    match cli.command {
        Commands::Regnum { register } => {
            let arch = for_architecture(cli.arch.unwrap_or_else(Architecture::current))?;
            print_regnum(arch, &register)
        }
        Commands::Disasm {
            bytes,
            pc,
            flavour,
            binary,
            lr,
        } => {
            let resolver = binary.map(BinaryResolver::load).transpose()?;
            let architecture = cli
                .arch
                .or_else(|| resolver.as_ref().map(BinaryResolver::architecture))
                .unwrap_or_else(Architecture::current);
            let arch = for_architecture(architecture)?;
            let pc = parse_address(&pc)?;
            let bytes = parse_hex_bytes(&bytes.join(""))?;
            let lr = lr.as_deref().map(parse_address).transpose()?;
            info!(%architecture, pc = format_args!("0x{pc:x}"), len = bytes.len(), "decoding");

            let end = pc.saturating_add(bytes.len() as u64);
            let memory = BufferMemory::new(pc, bytes);
            let regs = lr.map(|lr| {
                DwarfRegisters::new(arch.pc_regnum(), arch.sp_regnum(), arch.lr_regnum())
                    .with(arch.pc_regnum(), pc)
                    .with(arch.lr_regnum(), lr)
            });
            let current_pc = regs.as_ref().map(|_| pc);

            match &resolver {
                Some(resolver) => {
                    let insts = disassemble(&memory, regs.as_ref(), resolver, arch, pc, end, current_pc)?;
                    let lookup: SymLookup<'_> = &|addr| resolver.symbols().symbol_at(addr);
                    print_listing(&insts, flavour, Some(lookup));
                }
                None => {
                    let insts = disassemble(&memory, regs.as_ref(), &NoSymbols, arch, pc, end, current_pc)?;
                    print_listing(&insts, flavour, None);
                }
            }
            Ok(())
        }
        Commands::Prologues => {
            let architecture = cli.arch.unwrap_or_else(Architecture::current);
            let arch = for_architecture(architecture)?;
            println!("Stack-split prologues ({architecture}):");
            for (i, seq) in arch.prologues().iter().enumerate() {
                println!("  {i:>2}: {seq}");
            }
            Ok(())
        }
        Commands::Registers { tid, fp } => print_registers(ThreadId::from(tid), fp),
    }
}

fn print_regnum(arch: &dyn Arch, register: &str) -> DebuggerResult<()>
{
    if let Ok(num) = parse_address(register) {
        println!("{num} = {}", arch.dwarf_to_name(num));
        return Ok(());
    }
    match arch.name_to_dwarf(register) {
        Some(num) => {
            println!("{register} = {num}");
            Ok(())
        }
        None => Err(DebuggerError::InvalidArgument(format!(
            "Unknown register name: {register} (max DWARF number: {})",
            arch.max_reg_num()
        ))),
    }
}

fn print_listing(insts: &[AsmInstruction], flavour: AssemblyFlavour, sym_lookup: Option<SymLookup<'_>>)
{
    for inst in insts {
        let bytes: String = inst.bytes.iter().map(|b| format!("{b:02x} ")).collect();
        let marker = if inst.at_pc { "=>" } else { "  " };
        let mut line = format!("{marker} 0x{:016x}  {bytes:<12} {}", inst.pc(), inst.text(flavour, sym_lookup));

        let kind = match inst.kind {
            InstructionKind::Call => Some("call"),
            InstructionKind::Ret => Some("ret"),
            InstructionKind::Jmp => Some("jmp"),
            InstructionKind::HardBreak => Some("breakpoint"),
            InstructionKind::Other => None,
        };
        if let Some(kind) = kind {
            line.push_str(&format!("    ; {kind}"));
        }
        if let Some(dest) = &inst.dest_loc {
            line.push_str(&format!(" -> {dest}"));
        }
        println!("{line}");
    }
}

#[cfg(all(target_os = "linux", target_arch = "powerpc64"))]
fn print_registers(tid: ThreadId, fp: bool) -> DebuggerResult<()>
{
    use std::sync::Arc;

    use kestrel_core::platform::linux::{LinuxPtrace, ProcessMemory};
    use kestrel_core::thread::{Ppc64leThread, ThreadContext};
    use kestrel_core::MachineState;

    let thread = Ppc64leThread::new(tid, Arc::new(LinuxPtrace::new()));
    let state = thread.registers()?;
    let (registers, fp_error) = state.enumerate(fp).into_parts();

    println!("Registers for thread {tid}:");
    for reg in &registers {
        println!("  {:<6} {}", reg.name, reg.value);
    }

    // Linux accepts a thread id wherever process_vm_readv wants a pid.
    let pid = u32::try_from(tid.raw()).map_err(|_| DebuggerError::InvalidArgument(format!("Invalid thread id: {tid}")))?;
    let arch = for_architecture(Architecture::PowerPc64Le)?;
    let pc = state.pc();
    let regs = state.dwarf_registers();
    let insts = disassemble(
        &ProcessMemory::new(pid),
        Some(&regs),
        &NoSymbols,
        arch,
        pc,
        pc + arch.max_instruction_len() as u64,
        Some(pc),
    )?;
    println!();
    print_listing(&insts, AssemblyFlavour::Gnu, None);

    match fp_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(not(all(target_os = "linux", target_arch = "powerpc64")))]
fn print_registers(tid: ThreadId, _fp: bool) -> DebuggerResult<()>
{
    Err(DebuggerError::UnsupportedArchitecture(format!(
        "cannot read registers of thread {tid}: live targets need a Linux ppc64le host, this is {}",
        Architecture::current()
    )))
}

/// Parse `0x`-prefixed hex or decimal.
fn parse_address(s: &str) -> DebuggerResult<u64>
{
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| DebuggerError::InvalidArgument(format!("Invalid address: {s}")))
}

fn parse_hex_bytes(s: &str) -> DebuggerResult<Vec<u8>>
{
    let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(DebuggerError::InvalidArgument(format!("Invalid hex digit '{bad}' in: {s}")));
    }
    if digits.len() % 2 != 0 {
        return Err(DebuggerError::InvalidArgument(format!("Odd number of hex digits: {s}")));
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).unwrap_or_default();
            u8::from_str_radix(pair, 16)
                .map_err(|_| DebuggerError::InvalidArgument(format!("Invalid hex byte: {pair}")))
        })
        .collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_hex_bytes()
    {
        assert_eq!(parse_hex_bytes("03100048").unwrap(), vec![0x03, 0x10, 0x00, 0x48]);
        assert_eq!(parse_hex_bytes("0x03 10\t00 48").unwrap(), vec![0x03, 0x10, 0x00, 0x48]);
        assert!(parse_hex_bytes("031").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn test_parse_hex_bytes_non_ascii()
    {
        // Two-byte characters must be rejected, not sliced through.
        assert!(parse_hex_bytes("é0").is_err());
        assert!(parse_hex_bytes("0é").is_err());
        assert!(parse_hex_bytes("00ñ1").is_err());
    }

    #[test]
    fn test_parse_address()
    {
        assert_eq!(parse_address("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_address("4096").unwrap(), 4096);
        assert!(parse_address("0xzz").is_err());
    }
}
