/*
 * UMS Error Codes
 *
 * Mirrors the control device's wire-level error codes one-to-one: every
 * command either succeeds with a non-negative result or fails with one of
 * these, returned to user space as a negative integer.
 */

use core::fmt;

/// Error codes returned by the UMS control-message dispatcher.
///
/// Numeric values match the original module's `const.h` error codes exactly
/// (1000-1016) so that a user-space library can treat `-errno` the same way
/// regardless of which side assigned the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum UmsError {
    ProcessNotFound = 1000,
    ProcessAlreadyExists = 1001,
    CompletionListNotFound = 1002,
    SchedulerNotFound = 1003,
    WorkerNotFound = 1004,
    StateRunning = 1005,
    CmdNotMainThread = 1006,
    WorkerAlreadyRunning = 1007,
    WrongInput = 1008,
    CmdNotScheduler = 1009,
    CmdNotWorker = 1010,
    WorkerAlreadyFinished = 1011,
    NoAvailableWorkers = 1012,
    CompletionListAlreadyFinished = 1013,
    CompletionListLocked = 1016,
}

impl UmsError {
    /// The value placed in the return register: the error code, negated.
    pub fn neg_code(self) -> i64 {
        -(self as i32 as i64)
    }
}

impl fmt::Display for UmsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            UmsError::ProcessNotFound => "process is not managed by UMS",
            UmsError::ProcessAlreadyExists => "process is already managed by UMS",
            UmsError::CompletionListNotFound => "completion list not found",
            UmsError::SchedulerNotFound => "scheduler not found",
            UmsError::WorkerNotFound => "worker not found",
            UmsError::StateRunning => "object is running and cannot be modified",
            UmsError::CmdNotMainThread => "command not issued by the main thread",
            UmsError::WorkerAlreadyRunning => "worker is already running",
            UmsError::WrongInput => "wrong input",
            UmsError::CmdNotScheduler => "command not issued by a scheduler",
            UmsError::CmdNotWorker => "command not issued by a worker",
            UmsError::WorkerAlreadyFinished => "worker has already finished",
            UmsError::NoAvailableWorkers => "no worker threads are available",
            UmsError::CompletionListAlreadyFinished => "completion list already finished",
            UmsError::CompletionListLocked => "completion list is locked",
        };
        write!(f, "{} ({})", msg, *self as i32)
    }
}

pub type UmsResult<T> = Result<T, UmsError>;
