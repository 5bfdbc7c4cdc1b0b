use crate::devices::{RobotIo, Side, StepOutcome};
use log::warn;

/// Geometry and run bounds of the simulated rig.
#[derive(Debug, Clone)]
pub struct RigConfig {
    pub tick_seconds: f64,
    pub max_wheel_speed: f64,
    /// Slew rate of the position-controlled head motor.
    pub head_speed_rad_s: f64,
    /// Ticks until the simulator reports end of run. None runs forever.
    pub run_ticks: Option<u64>,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 0.032,
            max_wheel_speed: 6.28,
            head_speed_rad_s: 1.0,
            run_ticks: None,
        }
    }
}

/// Deterministic in-memory desk robot.
///
/// Models exactly what the controller can observe: commanded wheel
/// velocities (clamped to the rig limit), a head that slews toward its
/// target at a fixed rate, two eye LEDs, and a scheduled key feed. The
/// speaker is part of the inventory but has no drive path; nothing in
/// the controller ever plays it.
#[derive(Debug, Clone)]
pub struct SimRig {
    config: RigConfig,
    tick: u64,
    left_wheel: f64,
    right_wheel: f64,
    head_angle: f64,
    head_target: f64,
    eyes: [bool; 2],
    keys: Vec<(u64, char)>,
}

impl SimRig {
    pub fn new(config: RigConfig) -> Self {
        Self {
            config,
            tick: 0,
            left_wheel: 0.0,
            right_wheel: 0.0,
            head_angle: 0.0,
            head_target: 0.0,
            eyes: [false, false],
            keys: Vec::new(),
        }
    }

    /// Names of the devices the rig acquires at startup.
    pub fn device_inventory() -> &'static [&'static str] {
        &[
            "left_wheel_motor",
            "right_wheel_motor",
            "tilt_motor",
            "eye_led_left",
            "eye_led_right",
            "speaker",
        ]
    }

    /// Schedule a key press to surface on the given tick. Several keys
    /// on one tick collapse to the last queued; there is no buffering.
    pub fn queue_key(&mut self, tick: u64, key: char) {
        self.keys.push((tick, key));
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn head_target(&self) -> f64 {
        self.head_target
    }

    fn eye_index(side: Side) -> usize {
        match side {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl RobotIo for SimRig {
    fn step(&mut self) -> StepOutcome {
        if let Some(budget) = self.config.run_ticks {
            if self.tick >= budget {
                return StepOutcome::Finished;
            }
        }
        self.tick += 1;

        // Head slews toward its target at the configured rate.
        let max_move = self.config.head_speed_rad_s * self.config.tick_seconds;
        let error = self.head_target - self.head_angle;
        if error.abs() <= max_move {
            self.head_angle = self.head_target;
        } else {
            self.head_angle += max_move.copysign(error);
        }

        StepOutcome::Running
    }

    fn poll_key(&mut self) -> Option<char> {
        let tick = self.tick;
        self.keys
            .iter()
            .rev()
            .find(|(t, _)| *t == tick)
            .map(|(_, k)| *k)
    }

    fn set_wheel_velocity(&mut self, side: Side, rad_s: f64) {
        let max = self.config.max_wheel_speed;
        let clamped = rad_s.clamp(-max, max);
        if clamped != rad_s {
            warn!("wheel command {rad_s:.2} rad/s clamped to {clamped:.2}");
        }
        match side {
            Side::Left => self.left_wheel = clamped,
            Side::Right => self.right_wheel = clamped,
        }
    }

    fn set_head_target(&mut self, angle_rad: f64) {
        self.head_target = angle_rad;
    }

    fn set_eye(&mut self, side: Side, lit: bool) {
        self.eyes[Self::eye_index(side)] = lit;
    }

    fn wheel_velocity(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left_wheel,
            Side::Right => self.right_wheel,
        }
    }

    fn head_angle(&self) -> f64 {
        self.head_angle
    }

    fn eye(&self, side: Side) -> bool {
        self.eyes[Self::eye_index(side)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_reaches_half_radian_on_the_sixteenth_tick() {
        let mut rig = SimRig::new(RigConfig::default());
        rig.set_head_target(0.5);
        for _ in 0..15 {
            rig.step();
        }
        assert!((rig.head_angle() - 0.48).abs() < 1e-9);
        rig.step();
        assert_eq!(rig.head_angle(), 0.5);
    }

    #[test]
    fn head_slews_downward_too() {
        let mut rig = SimRig::new(RigConfig::default());
        rig.set_head_target(-0.1);
        for _ in 0..4 {
            rig.step();
        }
        assert_eq!(rig.head_angle(), -0.1);
    }

    #[test]
    fn wheel_commands_clamp_to_the_rig_limit() {
        let mut rig = SimRig::new(RigConfig::default());
        rig.set_wheel_velocity(Side::Left, 10.0);
        rig.set_wheel_velocity(Side::Right, -10.0);
        assert_eq!(rig.wheel_velocity(Side::Left), 6.28);
        assert_eq!(rig.wheel_velocity(Side::Right), -6.28);
    }

    #[test]
    fn run_budget_ends_the_run() {
        let mut rig = SimRig::new(RigConfig {
            run_ticks: Some(3),
            ..RigConfig::default()
        });
        for _ in 0..3 {
            assert_eq!(rig.step(), StepOutcome::Running);
        }
        assert_eq!(rig.step(), StepOutcome::Finished);
        assert_eq!(rig.step(), StepOutcome::Finished);
        assert_eq!(rig.tick(), 3);
    }

    #[test]
    fn queued_keys_surface_on_their_tick_and_last_wins() {
        let mut rig = SimRig::new(RigConfig::default());
        rig.queue_key(2, 'a');
        rig.queue_key(2, 'b');
        rig.step();
        assert_eq!(rig.poll_key(), None);
        rig.step();
        assert_eq!(rig.poll_key(), Some('b'));
        rig.step();
        assert_eq!(rig.poll_key(), None);
    }
}
