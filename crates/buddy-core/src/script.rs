use crate::devices::{RobotIo, Side};

/// One actuator write, applied when its phase is entered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Actuation {
    Wheels { left_rad_s: f64, right_rad_s: f64 },
    Head { angle_rad: f64 },
    Eyes { left_lit: bool, right_lit: bool },
}

impl Actuation {
    pub fn apply<IO: RobotIo>(&self, io: &mut IO) {
        match *self {
            Actuation::Wheels {
                left_rad_s,
                right_rad_s,
            } => {
                io.set_wheel_velocity(Side::Left, left_rad_s);
                io.set_wheel_velocity(Side::Right, right_rad_s);
            }
            Actuation::Head { angle_rad } => io.set_head_target(angle_rad),
            Actuation::Eyes { left_lit, right_lit } => {
                io.set_eye(Side::Left, left_lit);
                io.set_eye(Side::Right, right_lit);
            }
        }
    }
}

/// Writes applied on entry, then held for `hold_ticks` ticks.
#[derive(Clone, Debug)]
pub struct Phase {
    pub writes: Vec<Actuation>,
    pub hold_ticks: u32,
}

/// A canned actuator sequence, played one tick at a time.
#[derive(Clone, Debug)]
pub struct Script {
    name: &'static str,
    phases: Vec<Phase>,
}

impl Script {
    pub fn new(name: &'static str, phases: Vec<Phase>) -> Self {
        Self { name, phases }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ticks the script occupies once started: the sum of its holds.
    pub fn total_ticks(&self) -> u64 {
        self.phases.iter().map(|p| u64::from(p.hold_ticks)).sum()
    }
}

/// Whether a player consumed its last tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Playback {
    Running,
    Finished,
}

/// Advances a [`Script`] exactly one tick per call.
///
/// The first call applies the first phase's writes, so the tick a script
/// is started on already belongs to it. A phase's writes go out the tick
/// its hold begins; zero-hold phases apply and fall through in one tick.
/// [`Playback::Finished`] is returned on the tick the final hold elapses.
pub struct ScriptPlayer {
    script: Script,
    phase: usize,
    entered: bool,
    remaining: u32,
}

impl ScriptPlayer {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            phase: 0,
            entered: false,
            remaining: 0,
        }
    }

    pub fn script_name(&self) -> &'static str {
        self.script.name
    }

    pub fn tick<IO: RobotIo>(&mut self, io: &mut IO) -> Playback {
        while self.phase < self.script.phases.len() && !self.entered {
            let entering = &self.script.phases[self.phase];
            for write in &entering.writes {
                write.apply(io);
            }
            self.remaining = entering.hold_ticks;
            self.entered = true;
            if self.remaining == 0 {
                self.phase += 1;
                self.entered = false;
            }
        }
        if self.phase >= self.script.phases.len() {
            // Script with no positive hold: everything fired this tick.
            return Playback::Finished;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.phase += 1;
            self.entered = false;
            if self.phase >= self.script.phases.len() {
                return Playback::Finished;
            }
        }
        Playback::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every write together with the tick it landed on.
    struct Probe {
        tick: u64,
        head: f64,
        writes: Vec<(u64, Actuation)>,
    }

    impl Probe {
        fn new() -> Self {
            Self {
                tick: 0,
                head: 0.0,
                writes: Vec::new(),
            }
        }
    }

    impl RobotIo for Probe {
        fn step(&mut self) -> crate::devices::StepOutcome {
            self.tick += 1;
            crate::devices::StepOutcome::Running
        }
        fn poll_key(&mut self) -> Option<char> {
            None
        }
        fn set_wheel_velocity(&mut self, side: Side, rad_s: f64) {
            // Wheel writes arrive in left/right pairs; record the pair once.
            if side == Side::Left {
                self.writes.push((
                    self.tick,
                    Actuation::Wheels {
                        left_rad_s: rad_s,
                        right_rad_s: rad_s,
                    },
                ));
            }
        }
        fn set_head_target(&mut self, angle_rad: f64) {
            self.head = angle_rad;
            self.writes.push((self.tick, Actuation::Head { angle_rad }));
        }
        fn set_eye(&mut self, side: Side, lit: bool) {
            if side == Side::Left {
                self.writes.push((
                    self.tick,
                    Actuation::Eyes {
                        left_lit: lit,
                        right_lit: lit,
                    },
                ));
            }
        }
        fn wheel_velocity(&self, _side: Side) -> f64 {
            0.0
        }
        fn head_angle(&self) -> f64 {
            self.head
        }
        fn eye(&self, _side: Side) -> bool {
            false
        }
    }

    fn head_phase(angle_rad: f64, hold_ticks: u32) -> Phase {
        Phase {
            writes: vec![Actuation::Head { angle_rad }],
            hold_ticks,
        }
    }

    #[test]
    fn phases_fire_on_hold_boundaries() {
        let script = Script::new(
            "sweep",
            vec![
                head_phase(0.5, 15),
                head_phase(-0.5, 15),
                head_phase(0.0, 15),
            ],
        );
        assert_eq!(script.total_ticks(), 45);

        let mut probe = Probe::new();
        let mut player = ScriptPlayer::new(script);
        let mut consumed = 0u64;
        loop {
            probe.step();
            consumed += 1;
            if player.tick(&mut probe) == Playback::Finished {
                break;
            }
        }

        assert_eq!(consumed, 45);
        let ticks: Vec<u64> = probe.writes.iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, vec![1, 16, 31]);
    }

    #[test]
    fn zero_hold_phases_fall_through_in_one_tick() {
        let script = Script::new(
            "burst",
            vec![head_phase(0.1, 0), head_phase(0.2, 0), head_phase(0.3, 2)],
        );
        let mut probe = Probe::new();
        let mut player = ScriptPlayer::new(script);

        probe.step();
        assert_eq!(player.tick(&mut probe), Playback::Running);
        // All three writes landed on the first tick.
        assert_eq!(probe.writes.len(), 3);
        assert!(probe.writes.iter().all(|(t, _)| *t == 1));

        probe.step();
        assert_eq!(player.tick(&mut probe), Playback::Finished);
    }

    #[test]
    fn empty_script_finishes_on_its_first_tick() {
        let mut probe = Probe::new();
        let mut player = ScriptPlayer::new(Script::new("noop", Vec::new()));
        probe.step();
        assert_eq!(player.tick(&mut probe), Playback::Finished);
        assert!(probe.writes.is_empty());
    }

    #[test]
    fn finished_reported_on_the_last_held_tick() {
        let script = Script::new("short", vec![head_phase(0.4, 3)]);
        let mut probe = Probe::new();
        let mut player = ScriptPlayer::new(script);
        probe.step();
        assert_eq!(player.tick(&mut probe), Playback::Running);
        probe.step();
        assert_eq!(player.tick(&mut probe), Playback::Running);
        probe.step();
        assert_eq!(player.tick(&mut probe), Playback::Finished);
    }
}
