/*
 * Control-Message Dispatcher (§4.1 - §4.6)
 *
 * Each function here implements exactly one of the nine command codes.
 * Callers (the `Device` impl in `device.rs`, or `tests.rs` driving the
 * object graph directly) are responsible for holding `process::UMS_TABLE`'s
 * lock for the full duration of the call — including, for `execute`,
 * `yield_`, `enter_scheduling` and `exit_scheduling`, the context switch
 * itself (§4.1: "single process-global spinlock ... acquired before
 * dispatch and released after the operation (including the context
 * switch)").
 */

use super::completion_list::{CompletionList, DequeueBuffer, ListState};
use super::context::{Context, RegisterFile};
use super::error::{UmsError, UmsResult};
use super::ids::{Caller, CompletionListId, SchedulerId, WorkerId};
use super::process::{ProcessState, UmsProcess, UmsTable};
use super::scheduler::{SchedulerRecord, SchedulerState};
use super::wire::YieldKind;
use super::worker::{Worker, WorkerState};

fn now_ns() -> u64 {
    crate::utils::system::timer::uptime_ms() * 1_000_000
}

/// `enter` (§4.2).
pub fn enter(table: &mut UmsTable, caller: Caller) -> UmsResult<i64> {
    if table.contains(caller.pid) {
        return Err(UmsError::ProcessAlreadyExists);
    }
    table.insert(caller.pid);
    Ok(0)
}

/// `exit` (§4.2). Informational only: marks FINISHED, frees nothing.
pub fn exit(table: &mut UmsTable, caller: Caller) -> UmsResult<i64> {
    let process = table.get_mut(caller.pid).ok_or(UmsError::CmdNotMainThread)?;
    process.state = ProcessState::Finished;
    Ok(0)
}

/// `create-list` (§4.3).
pub fn create_list(table: &mut UmsTable, caller: Caller) -> UmsResult<i64> {
    let process = table.get_mut(caller.pid).ok_or(UmsError::ProcessNotFound)?;
    let id = process.next_list_id();
    process.lists.insert(id, CompletionList::new());
    Ok(id.0 as i64)
}

/// `create-worker` (§4.3). `caller_frame` is the creating task's
/// user-return register image, snapshotted by the caller before dispatch.
pub fn create_worker(
    table: &mut UmsTable,
    caller: Caller,
    clid: CompletionListId,
    entry: u64,
    arg: u64,
    stack_top: u64,
    caller_frame: &Context,
) -> UmsResult<i64> {
    let process = table.get_mut(caller.pid).ok_or(UmsError::ProcessNotFound)?;
    let list = process
        .lists
        .get(&clid)
        .ok_or(UmsError::CompletionListNotFound)?;
    if list.is_running() {
        return Err(UmsError::CompletionListLocked);
    }

    let id = process.next_worker_id();
    let worker = Worker::new(id, clid, entry, arg, stack_top, caller_frame);
    process.workers.insert(id, worker);
    process
        .lists
        .get_mut(&clid)
        .expect("validated above")
        .attach_worker(id);
    Ok(id.0 as i64)
}

/// `enter-scheduling` (§4.4). `live` is the calling task's current
/// user-return register image; on success it is overwritten so that on
/// return-to-user the thread resumes at `entry` instead of just after this
/// call.
pub fn enter_scheduling(
    table: &mut UmsTable,
    caller: Caller,
    clid: CompletionListId,
    entry: u64,
    caller_frame: &Context,
    live: &mut RegisterFile,
) -> UmsResult<i64> {
    let process = table.get_mut(caller.pid).ok_or(UmsError::ProcessNotFound)?;
    if !process.lists.contains_key(&clid) {
        return Err(UmsError::CompletionListNotFound);
    }

    let id = process.next_scheduler_id();
    let record = SchedulerRecord::new(id, clid, caller, *caller_frame, entry);
    let entry_regs = record.saved_context.regs;
    process.schedulers.insert(id, record);
    process.scheduler_by_tid.insert(caller.tid, id);

    let list = process.lists.get_mut(&clid).expect("validated above");
    list.on_scheduler_bound();

    let worker_count = list.worker_count;
    process
        .dequeue_buffers
        .insert(id, DequeueBuffer::new(worker_count));

    // Commit the modified frame: on return-to-user the thread begins
    // executing at the scheduler entry point.
    *live = entry_regs;
    Ok(id.0 as i64)
}

/// `exit-scheduling` (§4.4).
pub fn exit_scheduling(table: &mut UmsTable, caller: Caller, live: &mut RegisterFile) -> UmsResult<i64> {
    let process = table.get_mut(caller.pid).ok_or(UmsError::ProcessNotFound)?;
    let sid = process
        .scheduler_for(caller.tid)
        .ok_or(UmsError::SchedulerNotFound)?;
    let sched = process.schedulers.get_mut(&sid).expect("looked up by tid");
    if sched.worker.is_some() {
        return Err(UmsError::CmdNotScheduler);
    }

    sched.state = SchedulerState::Finished;
    *live = sched.exit_frame.regs;
    process.scheduler_by_tid.remove(&caller.tid);
    Ok(0)
}

/// `execute` (scheduler -> worker) (§4.5 step 1-6).
pub fn execute(
    table: &mut UmsTable,
    caller: Caller,
    wid: WorkerId,
    live: &mut RegisterFile,
) -> UmsResult<i64> {
    let process = table.get_mut(caller.pid).ok_or(UmsError::ProcessNotFound)?;
    let sid = process
        .scheduler_for(caller.tid)
        .ok_or(UmsError::SchedulerNotFound)?;

    let clid = process.schedulers.get(&sid).expect("looked up by tid").owning_list;
    {
        let list = process.lists.get(&clid).ok_or(UmsError::CompletionListNotFound)?;
        if !list.idle_contains(wid) {
            return Err(UmsError::WorkerNotFound);
        }
    }
    {
        let worker = process.workers.get(&wid).ok_or(UmsError::WorkerNotFound)?;
        match worker.state {
            WorkerState::Running => return Err(UmsError::WorkerAlreadyRunning),
            WorkerState::Finished => return Err(UmsError::WorkerAlreadyFinished),
            WorkerState::Idle => {}
        }
    }

    let now = now_ns();

    // Bookkeeping (§4.5 step 2).
    {
        let worker = process.workers.get_mut(&wid).expect("validated above");
        worker.state = WorkerState::Running;
        worker.driven_by = Some(sid);
        worker.switch_count += 1;
        worker.last_dispatch_time_ns = now;
    }

    let list = process.lists.get_mut(&clid).expect("validated above");
    list.move_idle_to_busy(wid);

    let sched = process.schedulers.get_mut(&sid).expect("looked up by tid");
    sched.worker = Some(wid);
    sched.state = SchedulerState::Running;
    sched.switch_count += 1;
    sched.last_dispatch_time_ns = now;

    // Save / restore (§4.5 step 4-5).
    let worker = process.workers.get_mut(&wid).expect("validated above");
    unsafe {
        super::context::swap(live as *mut RegisterFile, &mut sched.saved_context, &worker.regs);
    }

    Ok(0)
}

/// `yield(kind)` (worker -> scheduler) (§4.5 step 1-6).
pub fn yield_now(
    table: &mut UmsTable,
    caller: Caller,
    kind: YieldKind,
    live: &mut RegisterFile,
) -> UmsResult<i64> {
    let process = table.get_mut(caller.pid).ok_or(UmsError::ProcessNotFound)?;
    let sid = process
        .scheduler_for(caller.tid)
        .ok_or(UmsError::SchedulerNotFound)?;
    let wid = process
        .schedulers
        .get(&sid)
        .expect("looked up by tid")
        .worker
        .ok_or(UmsError::CmdNotWorker)?;
    let clid = process.schedulers.get(&sid).expect("looked up by tid").owning_list;
    {
        let list = process.lists.get(&clid).ok_or(UmsError::CompletionListNotFound)?;
        if !list.busy_contains(wid) {
            return Err(UmsError::CmdNotWorker);
        }
    }

    let now = now_ns();
    let mut list_finished = false;
    {
        let worker = process.workers.get_mut(&wid).expect("validated above");
        worker.total_exec_time_ns += now.saturating_sub(worker.last_dispatch_time_ns);
        worker.state = match kind {
            YieldKind::Pause => WorkerState::Idle,
            YieldKind::Finish => WorkerState::Finished,
        };
    }

    let sched = process.schedulers.get_mut(&sid).expect("looked up by tid");
    sched.worker = None;
    sched.state = SchedulerState::Idle;
    sched.record_switch_duration(now.saturating_sub(sched.last_dispatch_time_ns));

    let list = process.lists.get_mut(&clid).expect("validated above");
    match kind {
        YieldKind::Pause => list.move_busy_to_idle(wid),
        YieldKind::Finish => {
            list.on_worker_finished();
            list_finished = list.state == ListState::Finished;
        }
    }
    let _ = list_finished;

    let sched = process.schedulers.get_mut(&sid).expect("looked up by tid");
    let worker = process.workers.get_mut(&wid).expect("validated above");
    unsafe {
        super::context::swap(live as *mut RegisterFile, &mut worker.regs, &sched.saved_context);
    }

    Ok(0)
}

/// `dequeue` (§4.6).
pub fn dequeue(table: &mut UmsTable, caller: Caller, buf: &mut DequeueBuffer) -> UmsResult<i64> {
    let process = table.get_mut(caller.pid).ok_or(UmsError::ProcessNotFound)?;
    let sid = process
        .scheduler_for(caller.tid)
        .ok_or(UmsError::SchedulerNotFound)?;
    let clid = process.schedulers.get(&sid).expect("looked up by tid").owning_list;
    let list = process.lists.get(&clid).ok_or(UmsError::CompletionListNotFound)?;

    buf.state = if list.finished_count == list.worker_count && list.bound {
        ListState::Finished
    } else {
        ListState::Idle
    };

    let mut filled = 0u32;
    for (slot, wid) in buf
        .workers
        .iter_mut()
        .zip(list.idle_in_order().take(buf.size as usize))
    {
        *slot = Some(*wid);
        filled += 1;
    }
    for slot in buf.workers.iter_mut().skip(filled as usize) {
        *slot = None;
    }

    // Entries actually filled, not the list's total worker count — the
    // library uses this as the state indicator for whether to dequeue again.
    buf.worker_count = filled;

    Ok(0)
}

/// `next-worker(buf)` (§4.6): user-side selection policy, kept here
/// because it is pure logic over the same `DequeueBuffer` type rather than
/// a kernel call — the library calls it locally between `dequeue`s.
pub fn next_worker(buf: &mut DequeueBuffer) -> UmsResult<WorkerId> {
    if buf.state == ListState::Finished {
        return Err(UmsError::CompletionListAlreadyFinished);
    }
    for slot in buf.workers.iter_mut() {
        if let Some(wid) = *slot {
            *slot = None;
            return Ok(wid);
        }
    }
    Err(UmsError::NoAvailableWorkers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ums::ids::{OsPid, OsTid};

    fn caller(pid: u64, tid: u64) -> Caller {
        Caller {
            pid: OsPid(pid),
            tid: OsTid(tid),
        }
    }

    #[test]
    fn enter_twice_fails() {
        let mut table = UmsTable::new();
        assert_eq!(enter(&mut table, caller(1, 1)), Ok(0));
        assert_eq!(enter(&mut table, caller(1, 1)), Err(UmsError::ProcessAlreadyExists));
    }

    #[test]
    fn create_worker_on_running_list_is_locked() {
        let mut table = UmsTable::new();
        enter(&mut table, caller(1, 1)).unwrap();
        let clid = CompletionListId(create_list(&mut table, caller(1, 1)).unwrap() as u32);

        let frame = Context::zeroed();
        let mut live = RegisterFile::default();
        enter_scheduling(&mut table, caller(1, 1), clid, 0x1000, &frame, &mut live).unwrap();

        let result = create_worker(&mut table, caller(1, 1), clid, 0x2000, 0, 0x3000, &frame);
        assert_eq!(result, Err(UmsError::CompletionListLocked));
    }

    #[test]
    fn execute_then_finish_yield_completes_list() {
        let mut table = UmsTable::new();
        enter(&mut table, caller(1, 1)).unwrap();
        let clid = CompletionListId(create_list(&mut table, caller(1, 1)).unwrap() as u32);
        let frame = Context::zeroed();
        let wid = WorkerId(create_worker(&mut table, caller(1, 1), clid, 0x2000, 0, 0x3000, &frame).unwrap() as u32);

        let mut live = RegisterFile::default();
        enter_scheduling(&mut table, caller(1, 1), clid, 0x1000, &frame, &mut live).unwrap();
        execute(&mut table, caller(1, 1), wid, &mut live).unwrap();
        yield_now(&mut table, caller(1, 1), YieldKind::Finish, &mut live).unwrap();

        let process = table.get(caller(1, 1).pid).unwrap();
        assert_eq!(process.workers.get(&wid).unwrap().state, WorkerState::Finished);
        assert_eq!(process.lists.get(&clid).unwrap().state, ListState::Finished);
    }

    #[test]
    fn exit_scheduling_while_driving_worker_fails() {
        let mut table = UmsTable::new();
        enter(&mut table, caller(1, 1)).unwrap();
        let clid = CompletionListId(create_list(&mut table, caller(1, 1)).unwrap() as u32);
        let frame = Context::zeroed();
        let wid = WorkerId(create_worker(&mut table, caller(1, 1), clid, 0x2000, 0, 0x3000, &frame).unwrap() as u32);

        let mut live = RegisterFile::default();
        enter_scheduling(&mut table, caller(1, 1), clid, 0x1000, &frame, &mut live).unwrap();
        execute(&mut table, caller(1, 1), wid, &mut live).unwrap();

        assert_eq!(
            exit_scheduling(&mut table, caller(1, 1), &mut live),
            Err(UmsError::CmdNotScheduler)
        );
    }
}
