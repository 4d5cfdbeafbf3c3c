/*
 * UMS Context Record and Context-Switch Core
 *
 * The one hard-locked platform dependency in the whole subsystem (§9): given
 * the current task's live user-return register image and a saved image I,
 * arrange that on return-to-user the task executes as if it had been
 * suspended at I. Everything above this module is platform-agnostic.
 *
 * The general shape (GP-register push/pop around a single Rust call, the
 * CPU-pushed iret frame sitting directly below the pushed GP registers) is
 * the same one this kernel already uses for its voluntary-yield software
 * interrupt (`scheduler::yield_interrupt_handler`); this module extends it
 * with the FPU save/restore the cooperative worker/scheduler switch also
 * needs, which the preemptive scheduler never had to do.
 */

/// CPU state captured at the iret boundary: the five words the hardware
/// itself pushes when entering an interrupt/trap gate.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnFrame {
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// The general-purpose register file plus the CPU-pushed return frame,
/// laid out in exactly the order `ums_entry_trampoline` (see `entry.rs`)
/// pushes/pops them. A pointer to a live instance of this struct *is* the
/// current task's user-return register image while control is inside the
/// dispatcher.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterFile {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub frame: ReturnFrame,
}

/// FXSAVE/FXRSTOR legacy save area: 512 bytes, 16-byte aligned.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub struct FpuState(pub [u8; 512]);

impl Default for FpuState {
    fn default() -> Self {
        FpuState([0u8; 512])
    }
}

impl core::fmt::Debug for FpuState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FpuState").field("bytes", &512usize).finish()
    }
}

/// A fully captured suspended execution: CPU registers plus FPU state.
/// This is the "Context record" of the distilled spec (§2) — one instance
/// lives inside every worker record, and one ("saved scheduler context")
/// inside every scheduler record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    pub regs: RegisterFile,
    pub fpu: FpuState,
}

impl Context {
    pub const fn zeroed() -> Self {
        Self {
            regs: RegisterFile {
                r15: 0,
                r14: 0,
                r13: 0,
                r12: 0,
                r11: 0,
                r10: 0,
                r9: 0,
                r8: 0,
                rbp: 0,
                rdi: 0,
                rsi: 0,
                rdx: 0,
                rcx: 0,
                rbx: 0,
                rax: 0,
                frame: ReturnFrame {
                    rip: 0,
                    cs: 0,
                    rflags: 0,
                    rsp: 0,
                    ss: 0,
                },
            },
            fpu: FpuState([0u8; 512]),
        }
    }

    /// Build the initial captured register image for a freshly created
    /// worker (§4.3): a copy of the creating task's user-return image with
    /// the instruction pointer overwritten with the entry address, the
    /// first-argument register with the argument word, and the
    /// stack/base pointers with the caller-supplied stack top.
    pub fn new_worker_entry(caller_frame: &Context, entry: u64, arg: u64, stack_top: u64) -> Self {
        let mut ctx = *caller_frame;
        ctx.regs.frame.rip = entry;
        ctx.regs.rdi = arg;
        ctx.regs.frame.rsp = stack_top;
        ctx.regs.rbp = stack_top;
        ctx
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
unsafe fn fxsave(area: &mut FpuState) {
    unsafe {
        core::arch::asm!(
            "fxsave64 [{0}]",
            in(reg) area.0.as_mut_ptr(),
            options(nostack, preserves_flags),
        );
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
unsafe fn fxrstor(area: &FpuState) {
    unsafe {
        core::arch::asm!(
            "fxrstor64 [{0}]",
            in(reg) area.0.as_ptr(),
            options(nostack, preserves_flags),
        );
    }
}

#[cfg(not(target_arch = "x86_64"))]
unsafe fn fxsave(_area: &mut FpuState) {}
#[cfg(not(target_arch = "x86_64"))]
unsafe fn fxrstor(_area: &FpuState) {}

/// Capture the calling task's current user-return register image together
/// with a live FPU snapshot — the "Context record" of §2 for an execution
/// that has not yet been suspended via a full `swap`.
///
/// # Safety
/// Must be called with the FPU in a state valid to `fxsave` (i.e. not
/// mid-switch).
pub unsafe fn capture_current(live: &RegisterFile) -> Context {
    let mut ctx = Context {
        regs: *live,
        fpu: FpuState::default(),
    };
    unsafe { fxsave(&mut ctx.fpu) };
    ctx
}

/// The context-switch primitive (§4.5, §9). `live` is a pointer to the
/// current task's user-return register image (in practice: the
/// `RegisterFile` pushed onto the kernel stack by `ums_entry_trampoline`,
/// about to be popped and `iretq`'d). Saves `*live` and the live FPU state
/// into `save_into`, then overwrites `*live` and the live FPU unit with
/// `load_from`. The caller is responsible for ensuring this runs with the
/// single dispatcher lock held and that no other path observes `live`
/// between the two halves of the swap.
///
/// # Safety
/// `live` must point at a valid, exclusively-owned `RegisterFile` for the
/// duration of the call.
pub unsafe fn swap(live: *mut RegisterFile, save_into: &mut Context, load_from: &Context) {
    unsafe {
        save_into.regs = *live;
        fxsave(&mut save_into.fpu);
        *live = load_from.regs;
        fxrstor(&load_from.fpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_entry_overwrites_expected_fields() {
        let mut caller = Context::zeroed();
        caller.regs.rax = 0xdead_beef;
        let ctx = Context::new_worker_entry(&caller, 0x1000, 42, 0x7fff_0000);
        assert_eq!(ctx.regs.frame.rip, 0x1000);
        assert_eq!(ctx.regs.rdi, 42);
        assert_eq!(ctx.regs.frame.rsp, 0x7fff_0000);
        assert_eq!(ctx.regs.rbp, 0x7fff_0000);
        // Untouched fields are preserved from the caller's image.
        assert_eq!(ctx.regs.rax, 0xdead_beef);
    }
}
