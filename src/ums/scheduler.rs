/*
 * Scheduler Record (§3, §4.4, §4.8)
 */

use super::context::Context;
use super::ids::{Caller, CompletionListId, SchedulerId, WorkerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone)]
pub struct SchedulerRecord {
    pub id: SchedulerId,
    pub owning_list: CompletionListId,
    pub incarnating: Caller,
    pub worker: Option<WorkerId>,
    /// Saved scheduler context: register/FPU file, captured at
    /// scheduling-mode entry, restored on `exit-scheduling`.
    pub saved_context: Context,
    /// The instruction/stack/base-pointer triple to resume at after
    /// `exit-scheduling` (the "exit frame" of §4.4).
    pub exit_frame: Context,
    pub state: SchedulerState,
    pub switch_count: u64,
    pub last_switch_time_ns: u64,
    pub total_switch_time_ns: u64,
    pub avg_switch_time_ns: u64,
    pub last_dispatch_time_ns: u64,
}

impl SchedulerRecord {
    pub fn new(
        id: SchedulerId,
        owning_list: CompletionListId,
        incarnating: Caller,
        caller_frame: Context,
        entry: u64,
    ) -> Self {
        let exit_frame = caller_frame;
        let mut saved_context = caller_frame;
        saved_context.regs.frame.rip = entry;
        Self {
            id,
            owning_list,
            incarnating,
            worker: None,
            saved_context,
            exit_frame,
            state: SchedulerState::Idle,
            switch_count: 0,
            last_switch_time_ns: 0,
            total_switch_time_ns: 0,
            avg_switch_time_ns: 0,
            last_dispatch_time_ns: 0,
        }
    }

    pub fn record_switch_duration(&mut self, elapsed_ns: u64) {
        self.last_switch_time_ns = elapsed_ns;
        self.total_switch_time_ns += elapsed_ns;
        self.avg_switch_time_ns = self.total_switch_time_ns / self.switch_count.max(1);
    }
}
