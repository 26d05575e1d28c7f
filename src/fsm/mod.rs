//! Function-pointer finite state machine for the run lifecycle.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌───────────┬───────────┬──────────┬─────────────────┐  │
//! │  │ StateId   │ on_enter  │ on_exit  │ on_update       │  │
//! │  ├───────────┼───────────┼──────────┼─────────────────┤  │
//! │  │ Idle      │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ Running   │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option │  │
//! │  │ Completed │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  │ Aborted   │ fn(ctx)   │ -        │ fn(ctx)->Option │  │
//! │  └───────────┴───────────┴──────────┴─────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the current state.  If it
//! returns `Some(next_id)` the engine runs `on_exit` for the current state,
//! then `on_enter` for the next.  Starting and aborting a run are external
//! events and go through [`Fsm::force_transition`].

pub mod context;
pub mod states;

use context::RunContext;
use log::info;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every state a run can be in.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Aborted = 3,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 4;

    /// Convert an index back to `StateId`.  Out-of-range indices assert in
    /// debug builds and map to `Aborted` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Aborted,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Aborted
            }
        }
    }

    /// `Completed` and `Aborted` only leave via an explicit start or reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut RunContext);

/// Per-tick update handler.  Returns `Some(next)` to transition.
pub type StateUpdateFn = fn(&mut RunContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The state machine engine.  The [`RunContext`] it drives is owned by
/// the caller and threaded through every handler.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table rows out of order"
        );
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut RunContext) {
        info!("run FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance by one tick: `on_update`, then the transition it asks for.
    pub fn tick(&mut self, ctx: &mut RunContext) {
        self.tick_count += 1;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Transition immediately, regardless of what `on_update` would say.
    /// A transition to the current state is a no-op.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut RunContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// How many ticks the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    fn transition(&mut self, next_id: StateId, ctx: &mut RunContext) {
        let next_idx = next_id as usize;

        info!(
            "run FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
