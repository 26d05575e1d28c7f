//! Requests from outside the tick: start, abort, acknowledge a fault.
//!
//! The UI, an abort button ISR or a host command posts into a
//! [`RequestQueue`]; the control loop drains it once at the start of each
//! tick.  Nothing outside the tick ever mutates run state directly.
//!
//! ```text
//! ┌──────────────┐ request_*()  ┌──────────────┐  take()  ┌─────────────┐
//! │ UI / button  │─────────────▶│ RequestQueue │─────────▶│ ControlLoop │
//! │ serial cmd   │              │ (one slot    │          │ (tick)      │
//! └──────────────┘              │  per kind)   │          └─────────────┘
//!                               └──────────────┘
//! ```
//!
//! Start and abort are one-slot cells: a newer start replaces an older
//! pending one, an abort keeps the first reason posted.  Fault
//! acknowledgements are one pending flag per channel, so repeats collapse.
//!
//! Every cell is guarded by a critical section; any number of producers
//! (tasks or interrupts) may post concurrently.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::Vec;

use crate::config::MAX_CHANNELS;
use crate::error::{AbortReason, RequestError};
use crate::profile::ProfileDefinition;

/// Everything posted since the previous tick.
#[derive(Debug, Default)]
pub struct PendingRequests {
    pub start: Option<ProfileDefinition>,
    pub abort: Option<AbortReason>,
    pub acknowledge: Vec<usize, MAX_CHANNELS>,
}

/// Pending-request cells shared between producers and the control loop.
///
/// Usable from a `static` (all methods take `&self`) or owned by a test.
pub struct RequestQueue {
    start: Signal<CriticalSectionRawMutex, ProfileDefinition>,
    abort: Mutex<CriticalSectionRawMutex, Cell<Option<AbortReason>>>,
    /// Bit `n` set: channel `n` waits for re-arming.
    acknowledge: Mutex<CriticalSectionRawMutex, Cell<u8>>,
}

const _: () = assert!(MAX_CHANNELS <= u8::BITS as usize);

impl RequestQueue {
    pub const fn new() -> Self {
        Self {
            start: Signal::new(),
            abort: Mutex::new(Cell::new(None)),
            acknowledge: Mutex::new(Cell::new(0)),
        }
    }

    /// Ask for `profile` to start on the next tick.
    pub fn request_start(&self, profile: ProfileDefinition) {
        self.start.signal(profile);
    }

    /// Ask for the current run to be aborted on the next tick.
    pub fn request_abort(&self, reason: AbortReason) {
        self.abort.lock(|cell| {
            if cell.get().is_none() {
                cell.set(Some(reason));
            }
        });
    }

    /// Ask for faulted channel `channel` to be re-armed on the next tick.
    pub fn request_acknowledge_fault(&self, channel: usize) -> Result<(), RequestError> {
        if channel >= MAX_CHANNELS {
            return Err(RequestError::NoSuchChannel(channel));
        }
        self.acknowledge
            .lock(|bits| bits.set(bits.get() | 1 << channel));
        Ok(())
    }

    /// Whether anything is waiting for the next tick.
    pub fn is_pending(&self) -> bool {
        self.start.signaled()
            || self.abort.lock(|cell| cell.get().is_some())
            || self.acknowledge.lock(|bits| bits.get() != 0)
    }

    /// Drain every cell.  Called by the control loop at the tick boundary.
    pub(crate) fn take(&self) -> PendingRequests {
        let mut pending = PendingRequests {
            start: self.start.try_take(),
            abort: self.abort.lock(Cell::take),
            acknowledge: Vec::new(),
        };
        let bits = self.acknowledge.lock(Cell::take);
        for channel in (0..MAX_CHANNELS).filter(|&ch| bits & (1 << ch) != 0) {
            let _ = pending.acknowledge.push(channel);
        }
        pending
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}
