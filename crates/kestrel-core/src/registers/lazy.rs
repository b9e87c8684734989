//! One-shot loading of the floating point / vector register set.
//!
//! The loader is an explicit three-state machine behind a mutex:
//!
//! ```text
//! NotLoaded(loader) --first request--> Loading --loader returns--> Loaded
//! ```
//!
//! The lock is held while the loader runs, so concurrent callers wait for
//! the first transfer instead of issuing their own. A state stuck in
//! `Loading` can only be observed after a loader panicked; it is treated as
//! "nothing to show".

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::Register;
use crate::error::{DebuggerError, Result};

/// Fetches the raw floating point register block from the OS.
pub type FpLoader = Box<dyn FnOnce() -> Result<Vec<u8>> + Send>;

/// Turns a raw floating point block into display registers.
pub type FpDecoder = fn(&[u8]) -> Vec<Register>;

enum LoadState
{
    NotLoaded(FpLoader),
    Loading,
    Loaded
    {
        registers: Vec<Register>,
        raw: Vec<u8>,
    },
}

/// Floating point registers fetched on first use.
pub struct LazyFpRegisters
{
    state: Mutex<LoadState>,
    decode: FpDecoder,
}

impl LazyFpRegisters
{
    /// Defer loading to `loader`, decoding its bytes with `decode`.
    pub fn new(loader: FpLoader, decode: FpDecoder) -> Self
    {
        Self {
            state: Mutex::new(LoadState::NotLoaded(loader)),
            decode,
        }
    }

    /// Registers that are already known (e.g. read from a core file).
    pub fn loaded(raw: Vec<u8>, decode: FpDecoder) -> Self
    {
        let registers = decode(&raw);
        Self {
            state: Mutex::new(LoadState::Loaded { registers, raw }),
            decode,
        }
    }

    /// Whether the OS transfer has already happened (or was never needed).
    pub fn is_loaded(&self) -> bool
    {
        matches!(*self.lock(), LoadState::Loaded { .. })
    }

    /// Decoded registers, loading them first if needed.
    ///
    /// The error is only returned by the call that ran the loader; later
    /// calls see the (empty) result of the failed load without an error.
    pub fn registers(&self) -> (Vec<Register>, Option<DebuggerError>)
    {
        let mut state = self.lock();
        let error = self.ensure_loaded(&mut state);
        let registers = match &*state {
            LoadState::Loaded { registers, .. } => registers.clone(),
            LoadState::NotLoaded(_) | LoadState::Loading => Vec::new(),
        };
        (registers, error)
    }

    /// Raw floating point block, loading it first if needed.
    pub fn raw(&self) -> Result<Vec<u8>>
    {
        let mut state = self.lock();
        if let Some(err) = self.ensure_loaded(&mut state) {
            return Err(err);
        }
        match &*state {
            LoadState::Loaded { raw, .. } => Ok(raw.clone()),
            LoadState::NotLoaded(_) | LoadState::Loading => Ok(Vec::new()),
        }
    }

    fn ensure_loaded(&self, state: &mut LoadState) -> Option<DebuggerError>
    {
        match std::mem::replace(state, LoadState::Loading) {
            LoadState::NotLoaded(loader) => {
                debug!("loading floating point registers");
                let (raw, error) = match loader() {
                    Ok(raw) => (raw, None),
                    Err(err) => {
                        debug!(error = %err, "floating point register load failed");
                        (Vec::new(), Some(err))
                    }
                };
                let registers = (self.decode)(&raw);
                *state = LoadState::Loaded { registers, raw };
                error
            }
            previous => {
                *state = previous;
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoadState>
    {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for LazyFpRegisters
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let state = match &*self.lock() {
            LoadState::NotLoaded(_) => "not loaded",
            LoadState::Loading => "loading",
            LoadState::Loaded { .. } => "loaded",
        };
        f.debug_struct("LazyFpRegisters").field("state", &state).finish()
    }
}
