pub mod console;
pub mod journal;
pub mod metrics;

pub use console::{ConsoleError, RawModeWriter, TermKeys, TickPacer, QUIT_KEY};
pub use journal::{Journal, JournalEntry, JournalEventType};
pub use metrics::{init_metrics, serve_metrics};
