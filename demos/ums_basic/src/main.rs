#![no_std]
#![no_main]

// Minimal UMS walkthrough: two completion lists, one worker and one
// trivial scheduler apiece, no dequeue loop at all. Mirrors the smallest
// shape a caller can get away with.

mod syscalls {
    unsafe extern "C" {
        pub fn syscall_write(fd: i32, buf: *const u8, count: usize) -> isize;
        pub fn syscall_exit(code: i32) -> !;
    }
}

fn print(s: &str) {
    unsafe {
        syscalls::syscall_write(1, s.as_ptr(), s.len());
    }
}

static mut WORKER1_ARG: u64 = 1;
static mut WORKER2_ARG: u64 = 2;
static mut STACK1: [u8; libums::MIN_WORKER_STACK] = [0; libums::MIN_WORKER_STACK];
static mut STACK2: [u8; libums::MIN_WORKER_STACK] = [0; libums::MIN_WORKER_STACK];

extern "C" fn function1(_args: u64) {
    print("ums_basic: function1\n");
}

extern "C" fn function2(_args: u64) {
    print("ums_basic: function2\n");
}

extern "C" fn scheduler_loop() -> ! {
    print("ums_basic: scheduler_loop\n");
    libums::exit_scheduling().unwrap();
    unreachable!("exit_scheduling does not return")
}

#[unsafe(no_mangle)]
pub extern "C" fn main(_argc: i32, _argv: *const *const u8) -> i32 {
    libums::enter().unwrap();

    let list1 = libums::create_completion_list().unwrap();
    print("ums_basic: completion list 1 created\n");
    let list2 = libums::create_completion_list().unwrap();
    print("ums_basic: completion list 2 created\n");

    unsafe {
        let _ = libums::create_worker(list1, &mut *core::ptr::addr_of_mut!(STACK1), function1, core::ptr::addr_of!(WORKER1_ARG) as u64).unwrap();
        let _ = libums::create_worker(list2, &mut *core::ptr::addr_of_mut!(STACK2), function2, core::ptr::addr_of!(WORKER2_ARG) as u64).unwrap();
    }

    // Each call below blocks here until its scheduler_loop calls
    // exit_scheduling, exactly as if it were an ordinary function call.
    libums::enter_scheduling(list1, scheduler_loop).unwrap();
    libums::enter_scheduling(list2, scheduler_loop).unwrap();

    libums::exit().unwrap();
    0
}

#[unsafe(naked)]
#[unsafe(no_mangle)]
#[unsafe(link_section = ".text.entry")]
pub unsafe extern "C" fn _start() -> ! {
    core::arch::naked_asm!(
        "mov rdi, [rsp]",
        "lea rsi, [rsp + 8]",
        "call main",
        "mov rdi, rax",
        "mov rax, 60",
        "syscall",
        "ud2",
    );
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    print("\nPANIC in ums_basic!\n");
    unsafe { syscalls::syscall_exit(1) };
}
