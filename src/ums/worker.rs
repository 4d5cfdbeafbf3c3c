/*
 * Worker Record (§3)
 */

use super::context::Context;
use super::ids::{CompletionListId, SchedulerId, WorkerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Finished,
}

/// A cooperatively scheduled execution whose stack, entry and register
/// image are kernel-resident. Runs only between `execute` and `yield`.
#[derive(Debug, Clone)]
pub struct Worker {
    pub id: WorkerId,
    pub owning_list: CompletionListId,
    pub entry: u64,
    pub arg: u64,
    pub stack_top: u64,
    pub regs: Context,
    pub state: WorkerState,
    /// Scheduler currently driving this worker, if any.
    pub driven_by: Option<SchedulerId>,
    pub switch_count: u64,
    pub total_exec_time_ns: u64,
    pub last_dispatch_time_ns: u64,
}

impl Worker {
    pub fn new(
        id: WorkerId,
        owning_list: CompletionListId,
        entry: u64,
        arg: u64,
        stack_top: u64,
        caller_frame: &Context,
    ) -> Self {
        Self {
            id,
            owning_list,
            entry,
            arg,
            stack_top,
            regs: Context::new_worker_entry(caller_frame, entry, arg, stack_top),
            state: WorkerState::Idle,
            driven_by: None,
            switch_count: 0,
            total_exec_time_ns: 0,
            last_dispatch_time_ns: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, WorkerState::Finished)
    }
}

/// Minimum worker stack size (§6): requests below this are silently
/// promoted by the user-side broker before `create-worker` is issued.
pub const MIN_WORKER_STACK: u64 = 4096;
