/*
 * UMS Software-Interrupt Entry Point
 *
 * `execute`, `yield`, `enter-scheduling` and `exit-scheduling` must rewrite
 * the calling task's own user-return register image so that the `iretq`
 * ending this handler lands in a *different* logical execution (§4.5, §9).
 * A plain function call cannot do that: only a trap-gate entry, where the
 * CPU has already pushed the return frame and this code pushes the GP
 * registers around it, gives the dispatcher a pointer it can overwrite
 * before the matching pops and `iretq`.
 *
 * This mirrors `scheduler::yield_interrupt_handler` (same push/call/pop/
 * iretq shape, same register order) with one difference: that handler
 * switches to a *different* stack by replacing `rsp` before popping, since
 * the preemptive scheduler may resume a thread with its own kernel stack
 * region. UMS never needs that: `ums_entry_handler` mutates the pushed
 * `RegisterFile` in place and this trampoline pops and `iretq`s from the
 * same stack position it pushed onto.
 */

use super::context::RegisterFile;

/// Software interrupt vector the user-side broker issues via `int 0x82`
/// for every one of the nine commands (§6). Chosen to sit directly after
/// this kernel's existing voluntary-yield vector (`0x81`).
pub const UMS_INT_VECTOR: u8 = 0x82;

#[unsafe(naked)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ums_entry_trampoline() {
    core::arch::naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov rdi, rsp",
        "call {handler}",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        "iretq",
        handler = sym ums_entry_handler,
    )
}

/// Reads the command code and argument word out of the registers the
/// caller loaded before trapping (`rdi` = command, `rsi` = argument), runs
/// the dispatcher, and leaves the result in `rax` for the caller to read
/// after the trampoline's matching `pop`/`iretq`.
#[unsafe(no_mangle)]
extern "C" fn ums_entry_handler(regs: *mut RegisterFile) {
    let regs = unsafe { &mut *regs };
    let cmd = regs.rdi as u32;
    let arg = regs.rsi as u64;
    let result = super::device::dispatch_from_trap(cmd, arg, regs);
    regs.rax = result as u64;
}

/// Issue a UMS command through the software-interrupt gate. Used for the
/// four commands that move the calling task between logical executions
/// (`enter-scheduling`, `exit-scheduling`, `execute`, `yield`); the other
/// five go straight through `UmsDevice::ioctl` since they never touch the
/// caller's own return path.
///
/// # Safety
/// `arg` must be a valid pointer (or plain value) for whatever command is
/// being issued; see `wire.rs` for each command's argument shape.
#[cfg(target_arch = "x86_64")]
pub unsafe fn invoke(cmd: u32, arg: u64) -> i64 {
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
pub unsafe fn invoke(_cmd: u32, _arg: u64) -> i64 {
    -(super::error::UmsError::WrongInput as i32 as i64)
}
