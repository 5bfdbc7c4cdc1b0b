//! Prometheus metrics for the dispatch loop.
//!
//! Counters mirror the loop's own statistics; gauges mirror the last
//! published control snapshot. Everything registers into one global
//! registry scraped over HTTP.

use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Dispatch Loop Metrics
// ============================================================================

/// Total simulation ticks stepped
pub static TICKS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new("buddy_ticks_total", "Total simulation ticks stepped").unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Key presses dispatched as commands
pub static COMMANDS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "buddy_commands_total",
        "Key presses dispatched as commands",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Key presses with no binding
pub static KEYS_IGNORED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "buddy_keys_ignored_total",
        "Key presses ignored because no command is bound to them",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Key presses dropped during script playback
pub static KEYS_DROPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "buddy_keys_dropped_total",
        "Key presses dropped while a canned script was playing",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Canned scripts played to completion
pub static SCRIPTS_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "buddy_scripts_completed_total",
        "Canned scripts played to completion",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

// ============================================================================
// Actuator State Metrics
// ============================================================================

/// Commanded left wheel velocity in rad/s
pub static LEFT_WHEEL_RAD_S: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        "buddy_left_wheel_rad_s",
        "Commanded left wheel velocity in rad/s",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Commanded right wheel velocity in rad/s
pub static RIGHT_WHEEL_RAD_S: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        "buddy_right_wheel_rad_s",
        "Commanded right wheel velocity in rad/s",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Current head tilt angle in radians
pub static HEAD_ANGLE_RAD: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new("buddy_head_angle_rad", "Current head tilt angle in radians").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Script playback status (1 = playing, 0 = idle)
pub static SCRIPT_ACTIVE: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        "buddy_script_active",
        "Script playback status (1=playing, 0=idle)",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            let path = request.url();

            match path {
                "/metrics" => {
                    let encoder = TextEncoder::new();
                    let metric_families = REGISTRY.gather();
                    let mut buffer = Vec::new();

                    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
                        tracing::warn!("Failed to encode metrics: {}", e);
                        let _ = request.respond(
                            Response::from_string("Internal Server Error").with_status_code(500),
                        );
                        continue;
                    }

                    let response = Response::from_data(buffer).with_header(
                        tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"text/plain; version=0.0.4"[..],
                        )
                        .unwrap(),
                    );
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                "/ready" => {
                    // Ready once the loop has stepped at least one tick
                    let ticks = TICKS.get();
                    if ticks > 0 {
                        let _ = request.respond(Response::from_string("Ready"));
                    } else {
                        let _ = request
                            .respond(Response::from_string("Not Ready").with_status_code(503));
                    }
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    // Touch each metric to force initialization
    let _ = TICKS.get();
    let _ = COMMANDS.get();
    let _ = KEYS_IGNORED.get();
    let _ = KEYS_DROPPED.get();
    let _ = SCRIPTS_COMPLETED.get();
    let _ = LEFT_WHEEL_RAD_S.get();
    let _ = RIGHT_WHEEL_RAD_S.get();
    let _ = HEAD_ANGLE_RAD.get();
    let _ = SCRIPT_ACTIVE.get();
}
