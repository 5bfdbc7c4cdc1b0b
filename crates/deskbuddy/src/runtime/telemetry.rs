use buddy_core::{ControlSnapshot, SnapshotExchange};
use buddy_io::metrics::{
    init_metrics, serve_metrics, COMMANDS, HEAD_ANGLE_RAD, KEYS_DROPPED, KEYS_IGNORED,
    LEFT_WHEEL_RAD_S, RIGHT_WHEEL_RAD_S, SCRIPTS_COMPLETED, SCRIPT_ACTIVE, TICKS,
};
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use tracing::info;

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

/// Mirror published control snapshots into the Prometheus registry.
///
/// Gauges track the latest snapshot directly; counters advance by the
/// delta against the last snapshot seen, since the loop's own counts
/// are cumulative.
pub fn start_metrics_updater(
    exchange: Arc<SnapshotExchange>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last = ControlSnapshot::default();
        while !stop.load(std::sync::atomic::Ordering::Relaxed) {
            let snapshot = exchange.read();
            LEFT_WHEEL_RAD_S.set(snapshot.left_wheel_rad_s);
            RIGHT_WHEEL_RAD_S.set(snapshot.right_wheel_rad_s);
            HEAD_ANGLE_RAD.set(snapshot.head_angle_rad);
            SCRIPT_ACTIVE.set(if snapshot.script_active { 1.0 } else { 0.0 });

            if snapshot.tick > last.tick {
                TICKS.inc_by(snapshot.tick - last.tick);
            }
            if snapshot.commands_dispatched > last.commands_dispatched {
                COMMANDS.inc_by(snapshot.commands_dispatched - last.commands_dispatched);
            }
            if snapshot.scripts_completed > last.scripts_completed {
                SCRIPTS_COMPLETED.inc_by(snapshot.scripts_completed - last.scripts_completed);
            }
            if snapshot.keys_ignored > last.keys_ignored {
                KEYS_IGNORED.inc_by(snapshot.keys_ignored - last.keys_ignored);
            }
            if snapshot.keys_dropped > last.keys_dropped {
                KEYS_DROPPED.inc_by(snapshot.keys_dropped - last.keys_dropped);
            }
            last = snapshot;

            thread::sleep(Duration::from_millis(200));
        }
    })
}
