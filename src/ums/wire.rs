/*
 * Control-Message Wire Layout (§6)
 *
 * Command numbering and parameter-block shapes carried over from the
 * original module's `const.h` (`UMS_ENTER` .. `UMS_DEQUEUE_COMPLETION_LIST_ITEMS`,
 * numbered 1-9 under ioctl magic `'R'`). This kernel's control path is an
 * `ioctl`-shaped call through the `Device` trait rather than Linux's
 * `_IO`/`_IOW`/`_IOWR` macros, so only the command numbers and parameter
 * struct layouts are carried forward; the magic number is documentation
 * only.
 */

pub const UMS_IOC_MAGIC: u8 = b'R';

pub const CMD_ENTER: u32 = 1;
pub const CMD_EXIT: u32 = 2;
pub const CMD_CREATE_LIST: u32 = 3;
pub const CMD_CREATE_WORKER: u32 = 4;
pub const CMD_ENTER_SCHEDULING: u32 = 5;
pub const CMD_EXIT_SCHEDULING: u32 = 6;
pub const CMD_EXECUTE: u32 = 7;
pub const CMD_YIELD: u32 = 8;
pub const CMD_DEQUEUE: u32 = 9;

/// `worker_status_t` (§4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum YieldKind {
    Pause = 0,
    Finish = 1,
}

impl YieldKind {
    pub fn from_wire(v: u32) -> Option<Self> {
        match v {
            0 => Some(YieldKind::Pause),
            1 => Some(YieldKind::Finish),
            _ => None,
        }
    }
}

/// `state_t` as it appears on the wire (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum WireState {
    Idle = 0,
    Running = 1,
    Finished = 2,
}

impl From<crate::ums::completion_list::ListState> for WireState {
    fn from(s: crate::ums::completion_list::ListState) -> Self {
        use crate::ums::completion_list::ListState as L;
        match s {
            L::Idle => WireState::Idle,
            L::Running => WireState::Running,
            L::Finished => WireState::Finished,
        }
    }
}

/// `worker_params_t`: input to `create-worker`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct WorkerParams {
    pub entry_point: u64,
    pub function_args: u64,
    pub stack_size: u64,
    pub stack_addr: u64,
    pub clid: u32,
}

/// `scheduler_params_t`: in/out for `enter-scheduling`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SchedulerParams {
    pub entry_point: u64,
    pub clid: u32,
    pub sid: u32,
    pub core_id: i32,
}

/// Fixed header of `list_params_t`; the `workers[size]` tail is handled
/// separately since its length is dynamic (§6 dequeue buffer layout).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ListParamsHeader {
    pub size: u32,
    pub worker_count: u32,
    pub state: u32,
}

/// Sentinel written into a dequeue-buffer slot for "consumed/absent" (§3, §6).
pub const WORKER_SLOT_ABSENT: i32 = -1;
