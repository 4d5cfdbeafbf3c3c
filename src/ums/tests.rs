/*
 * Boot-Time Self-Test
 *
 * Exercises the object-graph-level behavior of the end-to-end scenarios
 * against a scratch table, the same way `tests::comprehensive` drives its
 * own test threads at boot and reports pass/fail counts to the log rather
 * than through `cargo test`'s harness (this kernel has no userspace
 * process to inject real machine code into at this point in boot, so each
 * scenario below checks the kernel-side bookkeeping the scenario names
 * rather than running actual worker bodies).
 */

use super::completion_list::ListState;
use super::context::{Context, RegisterFile};
use super::dispatch;
use super::error::UmsError;
use super::ids::{Caller, CompletionListId, OsPid, OsTid, WorkerId};
use super::process::UmsTable;
use super::wire::YieldKind;

fn caller(pid: u64, tid: u64) -> Caller {
    Caller { pid: OsPid(pid), tid: OsTid(tid) }
}

/// E1. Single worker, single scheduler: dequeue, execute, worker_exit,
/// exit-scheduling. Expect the worker and list FINISHED, one switch.
fn scenario_single_worker() -> bool {
    let mut table = UmsTable::new();
    let c = caller(101, 1);
    dispatch::enter(&mut table, c).unwrap();
    let clid = CompletionListId(dispatch::create_list(&mut table, c).unwrap() as u32);
    let frame = Context::zeroed();
    let wid = WorkerId(dispatch::create_worker(&mut table, c, clid, 0x1000, 0, 0x2000, &frame).unwrap() as u32);

    let mut live = RegisterFile::default();
    dispatch::enter_scheduling(&mut table, c, clid, 0x3000, &frame, &mut live).unwrap();
    dispatch::execute(&mut table, c, wid, &mut live).unwrap();
    dispatch::yield_now(&mut table, c, YieldKind::Finish, &mut live).unwrap();

    let process = table.get(c.pid).unwrap();
    let worker_finished = process.workers.get(&wid).unwrap().is_finished();
    let list_finished = process.lists.get(&clid).unwrap().state == ListState::Finished;
    let switch_count = process.schedulers.values().next().unwrap().switch_count == 1;

    worker_finished && list_finished && switch_count
}

/// E2. Pause/resume fairness: two workers, each paused twice then exited.
/// Dispatch order picking the first idle slot each time should alternate.
fn scenario_pause_resume_fairness() -> bool {
    let mut table = UmsTable::new();
    let c = caller(102, 1);
    dispatch::enter(&mut table, c).unwrap();
    let clid = CompletionListId(dispatch::create_list(&mut table, c).unwrap() as u32);
    let frame = Context::zeroed();
    let w0 = WorkerId(dispatch::create_worker(&mut table, c, clid, 0x1000, 0, 0x2000, &frame).unwrap() as u32);
    let w1 = WorkerId(dispatch::create_worker(&mut table, c, clid, 0x1000, 0, 0x2100, &frame).unwrap() as u32);

    let mut live = RegisterFile::default();
    dispatch::enter_scheduling(&mut table, c, clid, 0x3000, &frame, &mut live).unwrap();

    let mut order = alloc::vec::Vec::new();
    let mut remaining = [2u32, 2u32]; // pauses left for w0, w1

    for round in 0..6 {
        let process = table.get(c.pid).unwrap();
        let list = process.lists.get(&clid).unwrap();
        let next = *list.idle_in_order().next().unwrap();
        order.push(next);

        let idx = if next == w0 { 0 } else { 1 };
        dispatch::execute(&mut table, c, next, &mut live).unwrap();
        let kind = if remaining[idx] > 0 {
            remaining[idx] -= 1;
            YieldKind::Pause
        } else {
            YieldKind::Finish
        };
        let _ = round;
        dispatch::yield_now(&mut table, c, kind, &mut live).unwrap();
    }

    order == alloc::vec![w0, w1, w0, w1, w0, w1]
}

/// E4. A running (scheduled) list rejects new workers.
fn scenario_locked_list_rejects_create() -> bool {
    let mut table = UmsTable::new();
    let c = caller(104, 1);
    dispatch::enter(&mut table, c).unwrap();
    let clid = CompletionListId(dispatch::create_list(&mut table, c).unwrap() as u32);
    let frame = Context::zeroed();
    let mut live = RegisterFile::default();
    dispatch::enter_scheduling(&mut table, c, clid, 0x3000, &frame, &mut live).unwrap();

    let before = table.get(c.pid).unwrap().lists.get(&clid).unwrap().worker_count;
    let result = dispatch::create_worker(&mut table, c, clid, 0x1000, 0, 0x2000, &frame);
    let after = table.get(c.pid).unwrap().lists.get(&clid).unwrap().worker_count;

    result == Err(UmsError::CompletionListLocked) && before == after
}

/// E6. Late introspection: a scheduler's counters remain readable after
/// `exit`, until teardown.
fn scenario_late_introspection() -> bool {
    let mut table = UmsTable::new();
    let c = caller(106, 1);
    dispatch::enter(&mut table, c).unwrap();
    let clid = CompletionListId(dispatch::create_list(&mut table, c).unwrap() as u32);
    let frame = Context::zeroed();
    let mut live = RegisterFile::default();
    let sid = dispatch::enter_scheduling(&mut table, c, clid, 0x3000, &frame, &mut live).unwrap();
    dispatch::exit(&mut table, c).unwrap();

    let process = table.get(c.pid).unwrap();
    process.state == super::process::ProcessState::Finished
        && process.schedulers.contains_key(&super::ids::SchedulerId(sid as u32))
}

/// Runs every scenario, logging pass/fail, and returns `(passed, failed)`.
pub fn run_self_test() -> (usize, usize) {
    let scenarios: [(&str, fn() -> bool); 4] = [
        ("E1 single worker", scenario_single_worker),
        ("E2 pause/resume fairness", scenario_pause_resume_fairness),
        ("E4 locked list rejects create", scenario_locked_list_rejects_create),
        ("E6 late introspection", scenario_late_introspection),
    ];

    let mut passed = 0;
    let mut failed = 0;
    for (name, scenario) in scenarios {
        if scenario() {
            log::info!("[ums self-test] {} PASSED", name);
            passed += 1;
        } else {
            log::error!("[ums self-test] {} FAILED", name);
            failed += 1;
        }
    }
    (passed, failed)
}
