use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What the control loop publishes after each tick. Everything the
/// telemetry side shows comes from here; nothing flows back.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlSnapshot {
    pub tick: u64,
    pub left_wheel_rad_s: f64,
    pub right_wheel_rad_s: f64,
    pub head_angle_rad: f64,
    pub left_eye_lit: bool,
    pub right_eye_lit: bool,
    pub script_active: bool,
    pub commands_dispatched: u64,
    pub scripts_completed: u64,
    pub keys_ignored: u64,
    pub keys_dropped: u64,
}

struct TripleBuffer<T: Copy + Default> {
    slots: [UnsafeCell<T>; 3],
    index: AtomicUsize,
}

unsafe impl<T: Copy + Default + Send> Send for TripleBuffer<T> {}
unsafe impl<T: Copy + Default + Sync> Sync for TripleBuffer<T> {}

impl<T: Copy + Default> TripleBuffer<T> {
    fn new() -> Self {
        let slots = std::array::from_fn(|_| UnsafeCell::new(T::default()));
        Self {
            slots,
            index: AtomicUsize::new(0),
        }
    }

    fn write(&self, value: T) {
        let current = self.index.load(Ordering::Relaxed);
        let next = (current + 1) % 3;
        unsafe {
            *self.slots[next].get() = value;
        }
        self.index.store(next, Ordering::Release);
    }

    fn read(&self) -> T {
        let idx = self.index.load(Ordering::Acquire);
        unsafe { *self.slots[idx].get() }
    }
}

/// Latest-value cell between the control loop and telemetry readers.
///
/// Exactly one writer (the dispatcher) and any number of readers; a
/// read never blocks the loop and always yields the newest complete
/// snapshot, possibly skipping intermediate ones.
pub struct SnapshotExchange {
    snapshot: TripleBuffer<ControlSnapshot>,
}

impl SnapshotExchange {
    pub fn new() -> Self {
        Self {
            snapshot: TripleBuffer::new(),
        }
    }

    /// Called by the dispatcher every tick.
    pub fn publish(&self, snapshot: ControlSnapshot) {
        self.snapshot.write(snapshot);
    }

    /// Called by telemetry threads at their own pace.
    pub fn read(&self) -> ControlSnapshot {
        self.snapshot.read()
    }
}

impl Default for SnapshotExchange {
    fn default() -> Self {
        Self::new()
    }
}
