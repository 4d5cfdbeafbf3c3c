#![no_std]
#![no_main]

// Two completion lists of five workers apiece, each driven by its own
// scheduler's dequeue/execute loop. function1 pauses once mid-run and
// resumes later with its locals intact; function2 runs straight through.

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

const WORKERS_PER_LIST: usize = 5;

static mut STACKS1: [[u8; libums::MIN_WORKER_STACK]; WORKERS_PER_LIST] =
    [[0; libums::MIN_WORKER_STACK]; WORKERS_PER_LIST];
static mut STACKS2: [[u8; libums::MIN_WORKER_STACK]; WORKERS_PER_LIST] =
    [[0; libums::MIN_WORKER_STACK]; WORKERS_PER_LIST];

static ARG1: u64 = 1;
static ARG2: u64 = 2;

extern "C" fn function1(args: u64) {
    print("function1: starting\n");
    let check: u64 = 5;
    libums::pause().unwrap();
    print("function1: resumed\n");
    let _ = (args, check);
    libums::worker_exit();
}

extern "C" fn function2(_args: u64) {
    print("function2: running\n");
    libums::worker_exit();
}

fn run_scheduler_loop(clid: libums::CompletionListId) {
    loop {
        let mut buf = libums::dequeue(WORKERS_PER_LIST as u32).unwrap();
        if buf.is_finished() {
            break;
        }
        while let Ok(wid) = libums::next_worker(&mut buf) {
            print("scheduler: executing worker\n");
            libums::execute(wid).unwrap();
        }
    }
}

extern "C" fn scheduler_loop1() -> ! {
    run_scheduler_loop(current_list1());
    libums::exit_scheduling().unwrap();
    unreachable!("exit_scheduling does not return")
}

extern "C" fn scheduler_loop2() -> ! {
    run_scheduler_loop(current_list2());
    libums::exit_scheduling().unwrap();
    unreachable!("exit_scheduling does not return")
}

// create_completion_list ids are assigned in allocation order starting at
// zero, so a fixed two-list demo can hardcode which one each scheduler
// drives instead of threading state through the naked entry point.
fn current_list1() -> libums::CompletionListId {
    libums::CompletionListId(0)
}
fn current_list2() -> libums::CompletionListId {
    libums::CompletionListId(1)
}

#[unsafe(no_mangle)]
pub extern "C" fn main(_argc: i32, _argv: *const *const u8) -> i32 {
    libums::enter().unwrap();

    let list1 = libums::create_completion_list().unwrap();
    let list2 = libums::create_completion_list().unwrap();

    unsafe {
        let stacks1 = &mut *core::ptr::addr_of_mut!(STACKS1);
        libums::create_worker(list1, &mut stacks1[0], function1, core::ptr::addr_of!(ARG1) as u64).unwrap();
        for stack in stacks1.iter_mut().skip(1) {
            libums::create_worker(list1, stack, function2, core::ptr::addr_of!(ARG2) as u64).unwrap();
        }

        let stacks2 = &mut *core::ptr::addr_of_mut!(STACKS2);
        libums::create_worker(list2, &mut stacks2[0], function1, core::ptr::addr_of!(ARG1) as u64).unwrap();
        for stack in stacks2.iter_mut().skip(1) {
            libums::create_worker(list2, stack, function2, core::ptr::addr_of!(ARG2) as u64).unwrap();
        }
    }

    libums::enter_scheduling(list1, scheduler_loop1).unwrap();
    libums::enter_scheduling(list2, scheduler_loop2).unwrap();

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
    print("\nPANIC in ums_multilist!\n");
    unsafe { syscalls::syscall_exit(1) };
}
