/*
 * Process Record and Global Process Table (§3, §5, §9)
 *
 * "There is process-wide mutable state: the set of managed processes and
 * the single dispatcher lock. Model it as an initialized-once singleton
 * with explicit teardown, not as an ambient construct." The host kernel's
 * own `SCHEDULER: Mutex<Option<Scheduler>>` static is the idiom this
 * follows; here the singleton holds the whole per-process object graph so
 * that a single lock acquisition covers every command, including the
 * context switch (§5).
 */

use alloc::collections::BTreeMap;
use spin::Mutex;

use super::completion_list::{CompletionList, DequeueBuffer};
use super::ids::{Caller, CompletionListId, IdAllocator, OsPid, OsTid, SchedulerId, WorkerId};
use super::scheduler::SchedulerRecord;
use super::worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Finished,
}

pub struct UmsProcess {
    pub state: ProcessState,
    pub lists: BTreeMap<CompletionListId, CompletionList>,
    pub workers: BTreeMap<WorkerId, Worker>,
    pub schedulers: BTreeMap<SchedulerId, SchedulerRecord>,
    pub dequeue_buffers: BTreeMap<SchedulerId, DequeueBuffer>,
    /// Which scheduler record (if any) the given OS thread currently
    /// incarnates. At most one scheduler record per OS thread (§3).
    pub scheduler_by_tid: BTreeMap<OsTid, SchedulerId>,
    list_ids: IdAllocator,
    worker_ids: IdAllocator,
    scheduler_ids: IdAllocator,
}

impl UmsProcess {
    fn new() -> Self {
        Self {
            state: ProcessState::Running,
            lists: BTreeMap::new(),
            workers: BTreeMap::new(),
            schedulers: BTreeMap::new(),
            dequeue_buffers: BTreeMap::new(),
            scheduler_by_tid: BTreeMap::new(),
            list_ids: IdAllocator::new(),
            worker_ids: IdAllocator::new(),
            scheduler_ids: IdAllocator::new(),
        }
    }

    pub fn next_list_id(&mut self) -> CompletionListId {
        CompletionListId(self.list_ids.alloc())
    }

    pub fn next_worker_id(&mut self) -> WorkerId {
        WorkerId(self.worker_ids.alloc())
    }

    pub fn next_scheduler_id(&mut self) -> SchedulerId {
        SchedulerId(self.scheduler_ids.alloc())
    }

    pub fn scheduler_for(&self, tid: OsTid) -> Option<SchedulerId> {
        self.scheduler_by_tid.get(&tid).copied()
    }
}

/// The global process table. One process record per OS process that has
/// called `enter`; freed only at module teardown (§5, §7), never by `exit`.
pub struct UmsTable {
    processes: BTreeMap<OsPid, UmsProcess>,
}

impl UmsTable {
    const fn new() -> Self {
        Self {
            processes: BTreeMap::new(),
        }
    }

    pub fn get(&self, pid: OsPid) -> Option<&UmsProcess> {
        self.processes.get(&pid)
    }

    pub fn get_mut(&mut self, pid: OsPid) -> Option<&mut UmsProcess> {
        self.processes.get_mut(&pid)
    }

    pub fn contains(&self, pid: OsPid) -> bool {
        self.processes.contains_key(&pid)
    }

    pub fn insert(&mut self, pid: OsPid) {
        self.processes.insert(pid, UmsProcess::new());
    }

    /// Module teardown: the only point at which process records (and,
    /// transitively, their completion lists/workers/schedulers) are freed
    /// (§5, §7). `exit` never calls this.
    pub fn teardown(&mut self) {
        self.processes.clear();
    }

    pub fn process_ids(&self) -> impl Iterator<Item = &OsPid> {
        self.processes.keys()
    }
}

/// Single process-global spinlock guarding the entire object graph,
/// acquired before dispatch and released after the operation completes —
/// including the context switch itself (§4.1, §5).
pub static UMS_TABLE: Mutex<UmsTable> = Mutex::new(UmsTable::new());

pub fn current_caller() -> Caller {
    super::current_caller()
}
