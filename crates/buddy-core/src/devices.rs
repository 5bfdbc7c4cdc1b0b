/// Which side of the robot a paired device sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Result of advancing the simulation by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The tick completed; the run continues.
    Running,
    /// The simulator signalled end of run. Not an error: the loop
    /// shuts down cleanly when it sees this.
    Finished,
}

/// Device boundary of the controller: one method per operation of the
/// stepping API. Handles behind an implementation are acquired once at
/// construction and live for the whole run.
///
/// Actuator writes are infallible; the only way a run ends from the
/// device side is [`StepOutcome::Finished`].
pub trait RobotIo: Send {
    /// Advance the simulated world by one fixed tick.
    fn step(&mut self) -> StepOutcome;
    /// Most recent key pressed during the last tick, if any. At most
    /// one key per tick; keys are never queued.
    fn poll_key(&mut self) -> Option<char>;
    /// Command a wheel's angular velocity in rad/s.
    fn set_wheel_velocity(&mut self, side: Side, rad_s: f64);
    /// Command the head tilt target in radians.
    fn set_head_target(&mut self, angle_rad: f64);
    /// Light or clear one eye LED.
    fn set_eye(&mut self, side: Side, lit: bool);
    /// Current commanded wheel velocity, for telemetry.
    fn wheel_velocity(&self, side: Side) -> f64;
    /// Current head angle, for telemetry. Position-controlled rigs
    /// report the slewed angle, not the last target.
    fn head_angle(&self) -> f64;
    /// Current LED state, for telemetry.
    fn eye(&self, side: Side) -> bool;
}
