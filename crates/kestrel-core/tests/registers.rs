//! Tests for the ppc64le machine-state adapter and thread context

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use kestrel_core::error::{DebuggerError, Result};
use kestrel_core::registers::{MachineState, Ppc64leRegisters, PtraceRegs, RegisterValue};
use kestrel_core::regnum::ppc64le as regnum;
use kestrel_core::target::PtraceBackend;
use kestrel_core::thread::{Ppc64leThread, ThreadContext, WatchType, WatchpointState};
use kestrel_core::types::{Architecture, ThreadId};

fn sample_regs() -> PtraceRegs
{
    let mut regs = PtraceRegs::default();
    for (i, gpr) in regs.gpr.iter_mut().enumerate() {
        *gpr = 0x1000 + i as u64;
    }
    regs.nip = 0x10_0000;
    regs.link = 0x20_0000;
    regs.ctr = 0x30_0000;
    regs
}

/// Backend returning fixed blocks and counting transfers.
struct MockBackend
{
    gp: Vec<u8>,
    fp: Option<Vec<u8>>,
    fp_reads: AtomicUsize,
}

impl MockBackend
{
    fn new(fp: Option<Vec<u8>>) -> Self
    {
        Self {
            gp: sample_regs().to_bytes(),
            fp,
            fp_reads: AtomicUsize::new(0),
        }
    }

    fn fp_reads(&self) -> usize
    {
        self.fp_reads.load(Ordering::SeqCst)
    }
}

impl PtraceBackend for MockBackend
{
    fn read_gp_regs(&self, _tid: ThreadId) -> Result<Vec<u8>>
    {
        Ok(self.gp.clone())
    }

    fn read_fp_regset(&self, tid: ThreadId) -> Result<Vec<u8>>
    {
        self.fp_reads.fetch_add(1, Ordering::SeqCst);
        // Widen the race window for the concurrency test.
        thread::sleep(std::time::Duration::from_millis(10));
        self.fp.clone().ok_or(DebuggerError::ReadRegistersFailed {
            operation: "PTRACE_GETREGSET".to_string(),
            thread_id: Some(tid),
            details: "no such device".to_string(),
        })
    }

    fn write_gp_regs(&self, _tid: ThreadId, _regs: &[u8]) -> Result<()>
    {
        Ok(())
    }
}

fn vector_block(count: usize) -> Vec<u8>
{
    (0..count * 16).map(|i| (i % 251) as u8).collect()
}

#[test]
fn test_ptrace_regs_layout()
{
    assert_eq!(PtraceRegs::WORDS, 44);
    assert_eq!(PtraceRegs::SIZE, 352);
    assert_eq!(std::mem::size_of::<PtraceRegs>(), PtraceRegs::SIZE);
}

#[test]
fn test_ptrace_regs_from_bytes()
{
    let regs = sample_regs();
    let parsed = PtraceRegs::from_bytes(&regs.to_bytes()).unwrap();
    assert_eq!(parsed, regs);
    assert_eq!(parsed.gpr[1], 0x1001);
    assert_eq!(parsed.nip, 0x10_0000);
}

#[test]
fn test_ptrace_regs_short_block()
{
    let err = PtraceRegs::from_bytes(&[0u8; 100]).unwrap_err();
    assert!(matches!(err, DebuggerError::InvalidArgument(_)));
}

#[test]
fn test_ptrace_regs_display()
{
    let dump = sample_regs().to_string();
    assert!(dump.contains("gpr[31]"));
    assert!(dump.contains("Nip"));
    assert!(dump.contains("Result"));
}

#[test]
fn test_accessors()
{
    let regs = Ppc64leRegisters::with_fp(sample_regs(), Vec::new());
    assert_eq!(regs.arch(), Architecture::PowerPc64Le);
    assert_eq!(regs.pc(), 0x10_0000);
    assert_eq!(regs.sp(), 0x1001);
    assert_eq!(regs.lr(), 0x20_0000);
    assert_eq!(regs.bp(), 0x1000 + 30);
    assert_eq!(regs.tls(), 0x1000 + 13);
    assert_eq!(regs.g_addr(), Some(0x1000 + 30));
}

#[test]
fn test_enumerate_general_registers()
{
    let backend = Arc::new(MockBackend::new(Some(vector_block(2))));
    let thread = Ppc64leThread::new(ThreadId(7), Arc::clone(&backend));
    let regs = thread.registers().unwrap();

    let view = regs.enumerate(false);
    let names: Vec<&str> = view.registers().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names.len(), 33);
    assert_eq!(names[0], "R0");
    assert_eq!(names[31], "R31");
    assert_eq!(names[32], "NIP");
    assert_eq!(view.get("NIP"), Some(&RegisterValue::U64(0x10_0000)));
    assert!(view.fp_error().is_none());
    assert_eq!(backend.fp_reads(), 0, "GP-only view must not fetch FP registers");
}

#[test]
fn test_repeated_general_views_stay_lazy()
{
    let backend = Arc::new(MockBackend::new(Some(vector_block(2))));
    let thread = Ppc64leThread::new(ThreadId(7), Arc::clone(&backend));
    let regs = thread.registers().unwrap();

    let first = regs.enumerate(false);
    let second = regs.enumerate(false);
    assert_eq!(first.registers(), second.registers());
    assert_eq!(backend.fp_reads(), 0);

    // The first FP view still loads, exactly once.
    assert_eq!(regs.enumerate(true).registers().len(), 33 + 2);
    assert_eq!(backend.fp_reads(), 1);
}

#[test]
fn test_enumerate_with_fp_loads_once()
{
    let backend = Arc::new(MockBackend::new(Some(vector_block(3))));
    let thread = Ppc64leThread::new(ThreadId(7), Arc::clone(&backend));
    let regs = thread.registers().unwrap();

    let first = regs.enumerate(true);
    let second = regs.enumerate(true);
    assert_eq!(backend.fp_reads(), 1);
    assert_eq!(first.registers().len(), 33 + 3);
    assert_eq!(first.registers(), second.registers());

    let v1 = first.get("V1").unwrap();
    match v1 {
        RegisterValue::Bytes(bytes) => assert_eq!(bytes.len(), 16),
        other => panic!("expected vector bytes, got {other:?}"),
    }
}

#[test]
fn test_fp_partial_chunk_ignored()
{
    let mut raw = vector_block(2);
    raw.extend_from_slice(&[0xaa; 5]);
    let regs = Ppc64leRegisters::with_fp(sample_regs(), raw);
    let view = regs.enumerate(true);
    assert_eq!(view.registers().len(), 33 + 2);
    assert!(view.get("V2").is_none());
}

#[test]
fn test_fp_load_failure_reported_once()
{
    let backend = Arc::new(MockBackend::new(None));
    let thread = Ppc64leThread::new(ThreadId(9), Arc::clone(&backend));
    let regs = thread.registers().unwrap();

    let first = regs.enumerate(true);
    assert_eq!(first.registers().len(), 33);
    let err = first.fp_error().unwrap();
    assert!(matches!(err, DebuggerError::ReadRegistersFailed { .. }));
    assert!(err.to_string().contains("could not get floating point registers"));

    let second = regs.enumerate(true);
    assert_eq!(second.registers().len(), 33);
    assert!(second.fp_error().is_none());
    assert_eq!(backend.fp_reads(), 1);
}

#[test]
fn test_concurrent_enumerate_loads_once()
{
    let backend = Arc::new(MockBackend::new(Some(vector_block(4))));
    let thread = Ppc64leThread::new(ThreadId(1), Arc::clone(&backend));
    let regs: Arc<dyn MachineState> = Arc::from(thread.registers().unwrap());

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let regs = Arc::clone(&regs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                regs.enumerate(true).registers().len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 33 + 4);
    }
    assert_eq!(backend.fp_reads(), 1);
}

#[test]
fn test_dwarf_registers()
{
    let regs = Ppc64leRegisters::with_fp(sample_regs(), Vec::new());
    let dregs = regs.dwarf_registers();
    assert_eq!(dregs.pc(), 0x10_0000);
    assert_eq!(dregs.sp(), 0x1001);
    assert_eq!(dregs.lr(), 0x20_0000);
    assert_eq!(dregs.uint64(regnum::R0 + 3), Some(0x1003));
    assert_eq!(dregs.uint64(regnum::PC), Some(0x10_0000));
}

#[test]
fn test_snapshot_unimplemented()
{
    let regs = Ppc64leRegisters::with_fp(sample_regs(), Vec::new());
    let err = regs.snapshot().err().unwrap();
    assert!(err.is_unimplemented());
}

#[test]
fn test_thread_hardware_ops_unimplemented()
{
    let backend = Arc::new(MockBackend::new(None));
    let thread = Ppc64leThread::new(ThreadId(3), backend);
    assert_eq!(thread.id(), ThreadId(3));

    let saved = thread.registers().unwrap();
    assert!(thread.restore_registers(saved.as_ref()).unwrap_err().is_unimplemented());
    assert!(thread.find_hardware_breakpoint().unwrap_err().is_unimplemented());
    assert!(thread
        .write_hardware_breakpoint(0x1000, WatchType::Write, 0)
        .unwrap_err()
        .is_unimplemented());
    assert!(thread
        .clear_hardware_breakpoint(0x1000, WatchType::Write, 0)
        .unwrap_err()
        .is_unimplemented());
    assert!(thread.watchpoints().unwrap_err().is_unimplemented());
    assert!(thread
        .set_watchpoints(&WatchpointState::default())
        .unwrap_err()
        .is_unimplemented());
}

#[test]
fn test_thread_short_gp_block()
{
    struct Short;
    impl PtraceBackend for Short
    {
        fn read_gp_regs(&self, _tid: ThreadId) -> Result<Vec<u8>>
        {
            Ok(vec![0; 16])
        }

        fn read_fp_regset(&self, _tid: ThreadId) -> Result<Vec<u8>>
        {
            Ok(Vec::new())
        }

        fn write_gp_regs(&self, _tid: ThreadId, _regs: &[u8]) -> Result<()>
        {
            Ok(())
        }
    }

    let thread = Ppc64leThread::new(ThreadId(5), Arc::new(Short));
    let err = thread.registers().err().unwrap();
    assert!(matches!(
        err,
        DebuggerError::ReadRegistersFailed {
            thread_id: Some(ThreadId(5)),
            ..
        }
    ));
}
