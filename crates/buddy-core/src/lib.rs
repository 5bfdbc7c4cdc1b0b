pub mod command;
pub mod devices;
pub mod dispatch;
#[cfg(feature = "simulation")]
pub mod rig;
pub mod script;
pub mod sync;

pub use command::Command;
pub use devices::{RobotIo, Side, StepOutcome};
pub use dispatch::{DispatchConfig, DispatchObserver, DispatchStats, Dispatcher};
#[cfg(feature = "simulation")]
pub use rig::{RigConfig, SimRig};
pub use script::{Actuation, Phase, Playback, Script, ScriptPlayer};
pub use sync::{ControlSnapshot, SnapshotExchange};
