use buddy_io::console::RawModeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber with optional JSON output.
///
/// With `raw_terminal` set the writer rewrites line feeds and the
/// compact single-line format is used, so log output stays readable
/// while the console holds the terminal in raw mode.
pub fn init_tracing(json_output: bool, raw_terminal: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,deskbuddy=debug,buddy_core=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    match (json_output, raw_terminal) {
        (true, true) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(|| RawModeWriter::new(std::io::stdout())),
            )
            .init(),
        (true, false) => registry.with(fmt::layer().json()).init(),
        (false, true) => registry
            .with(fmt::layer().with_writer(|| RawModeWriter::new(std::io::stdout())))
            .init(),
        (false, false) => registry.with(fmt::layer().pretty()).init(),
    }
}
