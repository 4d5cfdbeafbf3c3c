/*
 * User-Mode Scheduling (UMS) Subsystem
 *
 * A kernel-resident object graph — processes, completion lists, workers and
 * schedulers — plus an in-kernel register/FPU context-switch engine, a
 * nine-command control device, and a read-only introspection namespace.
 * Lets a user-space process run many cooperative "workers" on top of a
 * handful of OS threads ("schedulers"), with the kernel doing nothing more
 * than bookkeeping and the register swap itself (§1, §2).
 *
 * Module layout mirrors the object graph directly: one file per record
 * type (`worker`, `completion_list`, `scheduler`, `process`), the wire
 * contract in its own file (`wire`), the platform-specific switch primitive
 * isolated in `context`, command handling split across `dispatch` (pure
 * logic over the table) and `device`/`entry` (the two ways a command
 * reaches `dispatch`), and `introspection` for the read-only surface.
 */

use core::sync::atomic::{AtomicU64, Ordering};

pub mod completion_list;
pub mod context;
pub mod device;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod ids;
pub mod introspection;
pub mod process;
pub mod scheduler;
#[cfg(feature = "self_test")]
pub mod tests;
pub mod wire;
pub mod worker;

use ids::{Caller, OsPid, OsTid};

/// Stand-ins for "which OS process/thread is making this call". This
/// kernel has no per-CPU current-task pointer wired through to arbitrary
/// call sites yet (the preemptive scheduler tracks it for its own threads,
/// but not in a form this subsystem can read from an interrupt handler), so
/// identity is tracked here as plain globals and set by whatever caller
/// context knows it — the self-test simulates distinct callers this way; a
/// fuller kernel would back `current_caller` with real per-CPU task state.
static CURRENT_PID: AtomicU64 = AtomicU64::new(0);
static CURRENT_TID: AtomicU64 = AtomicU64::new(0);

pub fn current_caller() -> Caller {
    Caller {
        pid: OsPid(CURRENT_PID.load(Ordering::Relaxed)),
        tid: OsTid(CURRENT_TID.load(Ordering::Relaxed)),
    }
}

pub fn set_current_caller(pid: u64, tid: u64) {
    CURRENT_PID.store(pid, Ordering::Relaxed);
    CURRENT_TID.store(tid, Ordering::Relaxed);
}

/// Wire the control device's software-interrupt gate into the IDT. The
/// vector itself (`entry::UMS_INT_VECTOR`) is registered by
/// `arch::x86_64::idt::init` directly, the same way `scheduler`'s voluntary
/// yield vector is — this function only covers anything else the subsystem
/// needs set up before its device is reachable.
pub fn init() {
    log::info!("UMS subsystem initialized (int {:#x})", entry::UMS_INT_VECTOR);

    #[cfg(feature = "self_test")]
    {
        let (passed, failed) = tests::run_self_test();
        log::info!("UMS self-test: {} passed, {} failed", passed, failed);
    }
}

/// Module teardown (§5, §7): frees every process record and, transitively,
/// every completion list/worker/scheduler. The only deallocation point —
/// `exit` never reaches this.
pub fn teardown() {
    process::UMS_TABLE.lock().teardown();
}
