#![no_std]

//! User-side broker for the UMS control device.
//!
//! Every one of the nine commands is issued through the `int 0x82` gate
//! (the kernel registers it ring-3 callable). This library owns only the
//! wire-layout structs and the raw trap; it does not allocate — callers
//! supply their own worker stack memory.

use core::sync::atomic::{AtomicU32, Ordering};

pub const CMD_ENTER: u32 = 1;
pub const CMD_EXIT: u32 = 2;
pub const CMD_CREATE_LIST: u32 = 3;
pub const CMD_CREATE_WORKER: u32 = 4;
pub const CMD_ENTER_SCHEDULING: u32 = 5;
pub const CMD_EXIT_SCHEDULING: u32 = 6;
pub const CMD_EXECUTE: u32 = 7;
pub const CMD_YIELD: u32 = 8;
pub const CMD_DEQUEUE: u32 = 9;

const YIELD_PAUSE: u32 = 0;
const YIELD_FINISH: u32 = 1;

const UMS_INT_VECTOR: u8 = 0x82;

/// Minimum worker stack size (§6). Requests below this are silently
/// promoted here before `create-worker` is issued.
pub const MIN_WORKER_STACK: usize = 4096;

/// Number of cores new schedulers are pinned across, round-robin by
/// creation order (§5). This library has no way to query the actual core
/// count, so it assumes a fixed upper bound; callers on smaller systems
/// will simply never use the higher core ids.
const PINNED_CORE_COUNT: i32 = 4;

static SCHEDULER_INDEX: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompletionListId(pub u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WorkerId(pub u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchedulerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UmsError(pub i64);

type UmsResult<T> = Result<T, UmsError>;

#[repr(C)]
#[derive(Clone, Copy)]
struct WorkerParams {
    entry_point: u64,
    function_args: u64,
    stack_size: u64,
    stack_addr: u64,
    clid: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct SchedulerParams {
    entry_point: u64,
    clid: u32,
    sid: u32,
    core_id: i32,
}

/// Worker slots a single dequeue covers. The kernel's buffer is sized by
/// the library at scheduler-creation time to the list's worker count; this
/// cap keeps the buffer on the stack instead of requiring a heap.
pub const MAX_DEQUEUE_SLOTS: usize = 64;

#[repr(C)]
pub struct DequeueBuffer {
    size: u32,
    worker_count: u32,
    state: u32,
    workers: [i32; MAX_DEQUEUE_SLOTS],
}

impl DequeueBuffer {
    pub fn new(size: u32) -> Self {
        Self {
            size: size.min(MAX_DEQUEUE_SLOTS as u32),
            worker_count: 0,
            state: 0,
            workers: [-1; MAX_DEQUEUE_SLOTS],
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == 2
    }
}

/// Select and remove the first available worker id from a dequeued buffer.
pub fn next_worker(buf: &mut DequeueBuffer) -> UmsResult<WorkerId> {
    if buf.is_finished() {
        return Err(UmsError(-1013));
    }
    for slot in buf.workers.iter_mut().take(buf.size as usize) {
        if *slot >= 0 {
            let wid = *slot as u32;
            *slot = -1;
            return Ok(WorkerId(wid));
        }
    }
    Err(UmsError(-1012))
}

#[cfg(target_arch = "x86_64")]
unsafe fn invoke(cmd: u32, arg: u64) -> i64 {
    let result: i64;
    unsafe {
        core::arch::asm!(
            "int {vec}",
            vec = const UMS_INT_VECTOR,
            in("rdi") cmd,
            in("rsi") arg,
            lateout("rax") result,
            options(nostack),
        );
    }
    result
}

#[cfg(not(target_arch = "x86_64"))]
unsafe fn invoke(_cmd: u32, _arg: u64) -> i64 {
    -1008
}

fn as_result(raw: i64) -> UmsResult<i64> {
    if raw < 0 { Err(UmsError(raw)) } else { Ok(raw) }
}

pub fn enter() -> UmsResult<()> {
    as_result(unsafe { invoke(CMD_ENTER, 0) }).map(|_| ())
}

pub fn exit() -> UmsResult<()> {
    as_result(unsafe { invoke(CMD_EXIT, 0) }).map(|_| ())
}

pub fn create_completion_list() -> UmsResult<CompletionListId> {
    as_result(unsafe { invoke(CMD_CREATE_LIST, 0) }).map(|id| CompletionListId(id as u32))
}

/// Allocate a worker on `clid`. `stack` is the caller-owned memory region
/// for the worker's stack; its top (last byte + 1, rounded down and then
/// backed off by one machine word) is where execution begins. `entry` is
/// called with `args` in its first argument register.
///
/// If `entry` returns instead of calling [`worker_exit`], the word at the
/// top of `stack` — written here before the call — redirects it into the
/// exit trampoline, so an implicit return still reaches FINISHED (§8
/// scenario E5). That word must live inside the buffer, so the raw
/// one-past-the-end address is rounded down for alignment and then backed
/// off by 8 bytes to reserve it before the trampoline address is written.
pub fn create_worker(
    clid: CompletionListId,
    stack: &mut [u8],
    entry: extern "C" fn(u64),
    args: u64,
) -> UmsResult<WorkerId> {
    let stack_size = stack.len().max(MIN_WORKER_STACK);
    let stack_end = unsafe { stack.as_mut_ptr().add(stack.len()) } as u64 & !0xF;
    let stack_top = stack_end - 8;

    unsafe {
        core::ptr::write(stack_top as *mut u64, worker_exit_trampoline as u64);
    }

    let params = WorkerParams {
        entry_point: entry as u64,
        function_args: args,
        stack_size: stack_size as u64,
        stack_addr: stack_top,
        clid: clid.0,
    };

    as_result(unsafe { invoke(CMD_CREATE_WORKER, &params as *const WorkerParams as u64) })
        .map(|id| WorkerId(id as u32))
}

/// Turns the calling OS thread into a scheduler: `entry` runs in its place
/// immediately, on the same stack. From the caller's point of view this
/// behaves like an ordinary blocking call — it returns here, with every
/// register restored, only once `entry` calls [`exit_scheduling`]. Nothing
/// executes between this call and that return; the "return value" exists
/// only for API symmetry with the other commands.
pub fn enter_scheduling(clid: CompletionListId, entry: extern "C" fn() -> !) -> UmsResult<()> {
    let core_id = (SCHEDULER_INDEX.fetch_add(1, Ordering::Relaxed) as i32) % PINNED_CORE_COUNT;
    let params = SchedulerParams {
        entry_point: entry as u64,
        clid: clid.0,
        sid: 0,
        core_id,
    };
    as_result(unsafe { invoke(CMD_ENTER_SCHEDULING, &params as *const SchedulerParams as u64) })
        .map(|_| ())
}

pub fn exit_scheduling() -> UmsResult<()> {
    as_result(unsafe { invoke(CMD_EXIT_SCHEDULING, 0) }).map(|_| ())
}

pub fn execute(wid: WorkerId) -> UmsResult<()> {
    as_result(unsafe { invoke(CMD_EXECUTE, wid.0 as u64) }).map(|_| ())
}

pub fn pause() -> UmsResult<()> {
    as_result(unsafe { invoke(CMD_YIELD, YIELD_PAUSE as u64) }).map(|_| ())
}

pub fn worker_exit() -> ! {
    unsafe { invoke(CMD_YIELD, YIELD_FINISH as u64) };
    unreachable!("a finished worker is never executed again")
}

pub fn dequeue(size: u32) -> UmsResult<DequeueBuffer> {
    let mut buf = DequeueBuffer::new(size);
    as_result(unsafe { invoke(CMD_DEQUEUE, &mut buf as *mut DequeueBuffer as u64) })?;
    Ok(buf)
}

/// Landing pad for a worker that returns instead of calling
/// [`worker_exit`]; its address is what [`create_worker`] writes at the
/// top of the worker's stack.
#[unsafe(naked)]
extern "C" fn worker_exit_trampoline() -> ! {
    core::arch::naked_asm!(
        "mov edi, {cmd}",
        "mov esi, {kind}",
        "int {vec}",
        "2:",
        "jmp 2b",
        cmd = const CMD_YIELD,
        kind = const YIELD_FINISH,
        vec = const UMS_INT_VECTOR,
    )
}
