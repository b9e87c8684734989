//! Tests for error handling and shared types

use std::str::FromStr;

use kestrel_core::error::{DebuggerError, DecodeError, Result};
use kestrel_core::types::{Architecture, Function, Location, ThreadId};

#[test]
fn test_unimplemented_display()
{
    let err = DebuggerError::unimplemented("hardware breakpoints", Architecture::PowerPc64Le);
    assert!(err.is_unimplemented());
    assert_eq!(err.to_string(), "hardware breakpoints is not implemented on ppc64le");
}

#[test]
fn test_decode_error_conversion()
{
    let err: DebuggerError = DecodeError::Unknown { word: 0xdead_beef }.into();
    assert!(!err.is_unimplemented());
    assert!(err.to_string().contains("0xdeadbeef"));

    let err: DebuggerError = DecodeError::Truncated {
        needed: 4,
        available: 1,
    }
    .into();
    assert!(err.to_string().contains("need 4 bytes, got 1"));
}

#[test]
fn test_read_registers_failed_display()
{
    let err = DebuggerError::ReadRegistersFailed {
        operation: "PTRACE_GETREGSET".to_string(),
        thread_id: Some(ThreadId(42)),
        details: "ESRCH".to_string(),
    };
    assert_eq!(err.to_string(), "Failed to read registers: PTRACE_GETREGSET");
}

#[test]
fn test_read_memory_failed_display()
{
    let err = DebuggerError::ReadMemoryFailed {
        address: 0x1000,
        details: "EFAULT".to_string(),
    };
    assert_eq!(err.to_string(), "Failed to read memory at 0x0000000000001000: EFAULT");
}

#[test]
fn test_io_error_conversion()
{
    fn open() -> Result<Vec<u8>>
    {
        Ok(std::fs::read("/nonexistent/kestrel/binary")?)
    }
    assert!(matches!(open(), Err(DebuggerError::Io(_))));
}

#[test]
fn test_architecture_parse_and_display()
{
    assert_eq!(Architecture::from_str("ppc64le").unwrap(), Architecture::PowerPc64Le);
    assert_eq!(Architecture::from_str("PPC64LE").unwrap(), Architecture::PowerPc64Le);
    assert!(Architecture::from_str("vax").is_err());
    assert_eq!(Architecture::PowerPc64Le.to_string(), "ppc64le");
}

#[test]
fn test_architecture_from_object()
{
    assert_eq!(
        Architecture::from_object(object::Architecture::PowerPc64, true),
        Architecture::PowerPc64Le
    );
    assert_ne!(
        Architecture::from_object(object::Architecture::PowerPc64, false),
        Architecture::PowerPc64Le
    );
}

#[test]
fn test_function_contains()
{
    let sized = Function {
        name: "f".to_string(),
        entry: 0x100,
        end: Some(0x120),
    };
    assert!(sized.contains(0x100));
    assert!(sized.contains(0x11c));
    assert!(!sized.contains(0x120));

    let unsized_fn = Function {
        name: "g".to_string(),
        entry: 0x200,
        end: None,
    };
    assert!(unsized_fn.contains(0x200));
    assert!(!unsized_fn.contains(0x204));
}

#[test]
fn test_location_display()
{
    let loc = Location {
        pc: 0x1000,
        file: Some("main.go".to_string()),
        line: Some(12),
        function: Some(Function {
            name: "main.main".to_string(),
            entry: 0x1000,
            end: None,
        }),
    };
    assert_eq!(loc.to_string(), "0x0000000000001000 in main.main at main.go:12");
    assert_eq!(Location::from_pc(0x20).to_string(), "0x0000000000000020");
}
