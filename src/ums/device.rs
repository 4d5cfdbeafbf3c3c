/*
 * UMS Control Device (§4.1, §6)
 *
 * External interface: a device node accepting nine numbered commands.
 * This mirrors `io::device::Device`'s `ioctl(request, arg)` shape. The
 * original module registered itself as a Linux misc char device under
 * `/dev/ums`; the character-device registration boilerplate itself is
 * explicitly out of scope (§1), so `UmsDevice` only implements the trait
 * — wiring it into a concrete `/dev` entry is left to whatever VFS this
 * kernel eventually grows.
 *
 * Every one of the nine commands is issued through the software-interrupt
 * gate (`entry::invoke`, vector `entry::UMS_INT_VECTOR`) rather than
 * returning straight out of `ioctl`: `create-worker` and `enter-scheduling`
 * need a snapshot of the caller's live register image, and
 * `enter-scheduling`/`exit-scheduling`/`execute`/`yield` need to overwrite
 * it — only a trap-gate entry hands the dispatcher that image (§4.5, §9).
 * Commands that need neither (`enter`, `exit`, `create-list`, `dequeue`)
 * still go through the same gate so the device has one uniform entry
 * point, matching how the original ioctl() demultiplexed all nine the
 * same way.
 */

use crate::io::device::{Device, Errno, Stat, S_IFCHR};

use super::completion_list::DequeueBuffer;
use super::context::{self, Context, RegisterFile};
use super::entry;
use super::ids::{CompletionListId, WorkerId};
use super::process::UMS_TABLE;
use super::wire::{self, ListParamsHeader, SchedulerParams, WorkerParams, WORKER_SLOT_ABSENT};
use super::{dispatch, error::UmsError};

pub struct UmsDevice;

impl Device for UmsDevice {
    fn read(&self, _buf: &mut [u8]) -> Result<usize, Errno> {
        Err(Errno::EINVAL)
    }

    fn write(&self, _buf: &[u8]) -> Result<usize, Errno> {
        Err(Errno::EINVAL)
    }

    fn ioctl(&self, request: u32, arg: usize) -> Result<i32, Errno> {
        let result = unsafe { entry::invoke(request, arg as u64) };
        if result < 0 {
            log::debug!("ums: command {} failed: {}", request, result);
        }
        i32::try_from(result).map_err(|_| Errno::EINVAL)
    }

    fn is_tty(&self) -> bool {
        false
    }

    fn stat(&self) -> Stat {
        Stat {
            st_mode: S_IFCHR,
            ..Stat::default()
        }
    }
}

/// Entry point called from `ums_entry_handler` (and, transitively, from
/// `UmsDevice::ioctl`) for every one of the nine commands. `regs` is the
/// calling task's live user-return register image; only
/// `enter-scheduling`/`exit-scheduling`/`execute`/`yield` overwrite it.
pub fn dispatch_from_trap(cmd: u32, arg: u64, regs: &mut RegisterFile) -> i64 {
    let caller = super::current_caller();
    let mut table = UMS_TABLE.lock();

    let outcome = match cmd {
        wire::CMD_ENTER => dispatch::enter(&mut table, caller),
        wire::CMD_EXIT => dispatch::exit(&mut table, caller),
        wire::CMD_CREATE_LIST => dispatch::create_list(&mut table, caller),
        wire::CMD_CREATE_WORKER => create_worker(&mut table, caller, arg, regs),
        wire::CMD_ENTER_SCHEDULING => enter_scheduling(&mut table, caller, arg, regs),
        wire::CMD_EXIT_SCHEDULING => dispatch::exit_scheduling(&mut table, caller, regs),
        wire::CMD_EXECUTE => dispatch::execute(&mut table, caller, WorkerId(arg as u32), regs),
        wire::CMD_YIELD => {
            let kind = wire::YieldKind::from_wire(arg as u32).ok_or(UmsError::WrongInput);
            match kind {
                Ok(kind) => dispatch::yield_now(&mut table, caller, kind, regs),
                Err(e) => Err(e),
            }
        }
        wire::CMD_DEQUEUE => dequeue(&mut table, caller, arg),
        _ => Err(UmsError::WrongInput),
    };

    match outcome {
        Ok(value) => value,
        Err(e) => {
            log::error!("ums: command {} failed: {}", cmd, e);
            e.neg_code()
        }
    }
}

fn create_worker(
    table: &mut super::process::UmsTable,
    caller: super::ids::Caller,
    arg: u64,
    regs: &RegisterFile,
) -> Result<i64, UmsError> {
    let params = unsafe { read_user::<WorkerParams>(arg)? };
    let caller_frame: Context = unsafe { context::capture_current(regs) };
    dispatch::create_worker(
        table,
        caller,
        CompletionListId(params.clid),
        params.entry_point,
        params.function_args,
        params.stack_addr,
        &caller_frame,
    )
}

fn enter_scheduling(
    table: &mut super::process::UmsTable,
    caller: super::ids::Caller,
    arg: u64,
    regs: &mut RegisterFile,
) -> Result<i64, UmsError> {
    let mut params = unsafe { read_user::<SchedulerParams>(arg)? };
    let caller_frame: Context = unsafe { context::capture_current(regs) };
    let sid = dispatch::enter_scheduling(
        table,
        caller,
        CompletionListId(params.clid),
        params.entry_point,
        &caller_frame,
        regs,
    )?;
    params.sid = sid as u32;
    unsafe { write_user(arg, &params)? };
    Ok(sid)
}

fn dequeue(
    table: &mut super::process::UmsTable,
    caller: super::ids::Caller,
    arg: u64,
) -> Result<i64, UmsError> {
    let header = unsafe { read_user::<ListParamsHeader>(arg)? };
    let mut buf = DequeueBuffer::new(header.size);

    let result = dispatch::dequeue(table, caller, &mut buf)?;

    let out_header = ListParamsHeader {
        size: buf.size,
        worker_count: buf.worker_count,
        state: wire::WireState::from(buf.state) as u32,
    };
    unsafe { write_user(arg, &out_header)? };

    let workers_ptr = (arg as usize + core::mem::size_of::<ListParamsHeader>()) as *mut i32;
    for (i, slot) in buf.workers.iter().enumerate() {
        let raw = slot.map(WorkerId::to_wire).unwrap_or(WORKER_SLOT_ABSENT);
        unsafe { core::ptr::write_unaligned(workers_ptr.add(i), raw) };
    }

    Ok(result)
}

/// Upper bound of user-space canonical addresses on x86_64; anything at or
/// above this is kernel space (mirrors `syscall::handlers::validate_user_ptr`).
const KERNEL_SPACE_START: u64 = 0x0000_8000_0000_0000;

fn validate_user_ptr(addr: u64, len: usize) -> Result<(), UmsError> {
    if addr == 0 {
        return Err(UmsError::WrongInput);
    }
    if addr >= KERNEL_SPACE_START {
        return Err(UmsError::WrongInput);
    }
    if addr.checked_add(len as u64).is_none() {
        return Err(UmsError::WrongInput);
    }
    Ok(())
}

unsafe fn read_user<T: Copy>(addr: u64) -> Result<T, UmsError> {
    validate_user_ptr(addr, core::mem::size_of::<T>())?;
    Ok(unsafe { core::ptr::read_unaligned(addr as *const T) })
}

unsafe fn write_user<T: Copy>(addr: u64, value: &T) -> Result<(), UmsError> {
    validate_user_ptr(addr, core::mem::size_of::<T>())?;
    unsafe { core::ptr::write_unaligned(addr as *mut T, *value) };
    Ok(())
}

pub static UMS_DEVICE: UmsDevice = UmsDevice;
