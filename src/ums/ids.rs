/*
 * UMS Identifiers
 *
 * Completion lists, workers and schedulers are each identified by a dense,
 * monotonically increasing, per-process counter that is never reused (§3,
 * §8 invariant: "Identifiers within a process are dense and monotonically
 * increasing from 0"). In-memory absence is modeled as `Option<Id>`; the
 * wire boundary is the only place a bare `-1` appears (§9 design note).
 */

/// Identity of the OS process/thread that issued a control message.
///
/// This is deliberately independent of the kernel's preemptive-scheduler
/// thread bookkeeping: UMS binds scheduler records to whichever execution
/// context invoked `enter-scheduling`, not to a specific scheduling policy's
/// thread object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsPid(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsTid(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub pid: OsPid,
    pub tid: OsTid,
}

macro_rules! ums_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            /// Encode as the wire representation (`-1` is reserved for "absent").
            pub fn to_wire(self) -> i32 {
                self.0 as i32
            }
        }
    };
}

ums_id!(
    /// Per-process completion-list identifier.
    CompletionListId
);
ums_id!(
    /// Per-process worker identifier.
    WorkerId
);
ums_id!(
    /// Per-process scheduler identifier.
    SchedulerId
);

/// Decode a wire slot value; `-1` means absent.
pub fn worker_id_from_wire(raw: i32) -> Option<WorkerId> {
    if raw < 0 { None } else { Some(WorkerId(raw as u32)) }
}

/// Dense id allocator. Never reuses a value, matching the "monotonically
/// increasing from 0" invariant. All mutation happens under the single
/// process-global dispatcher lock (§5), so a plain counter is sufficient;
/// no atomics are needed here.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdAllocator(u32);

impl IdAllocator {
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn alloc(&mut self) -> u32 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc(), 0);
        assert_eq!(alloc.alloc(), 1);
        assert_eq!(alloc.alloc(), 2);
    }

    #[test]
    fn wire_roundtrip() {
        assert_eq!(worker_id_from_wire(-1), None);
        assert_eq!(worker_id_from_wire(3), Some(WorkerId(3)));
        assert_eq!(WorkerId(7).to_wire(), 7);
    }
}
