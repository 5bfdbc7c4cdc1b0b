use crate::command::Command;
use crate::devices::{RobotIo, Side, StepOutcome};
use crate::script::{Actuation, Phase, Playback, Script, ScriptPlayer};
use crate::sync::{ControlSnapshot, SnapshotExchange};
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;

/// Tuning for the dispatch loop and the canned scripts.
///
/// Tick length and wheel speeds follow the simulated desk robot build:
/// a 32 ms world step, 6.28 rad/s wheel ceiling, 3.0 rad/s spin rate.
/// Hold counts are wall-clock beat lengths divided by the tick length
/// and rounded down, so a 0.5 s head sweep holds for 15 ticks.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub tick_ms: u64,
    pub max_wheel_speed: f64,
    pub turn_speed: f64,
    pub wave_tilt_rad: f64,
    pub wave_hold_ticks: u32,
    pub blink_hold_ticks: u32,
    pub blink_count: u32,
    pub patrol_cruise_speed: f64,
    pub patrol_cruise_ticks: u32,
    pub patrol_scan_tilt_rad: f64,
    pub patrol_scan_hold_ticks: u32,
    pub patrol_rounds: u32,
    pub dance_tilt_rad: f64,
    pub dance_beat_ticks: u32,
    pub dance_beats: u32,
    pub settle_ticks: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_ms: 32,
            max_wheel_speed: 6.28,
            turn_speed: 3.0,
            wave_tilt_rad: 0.5,
            wave_hold_ticks: 15,
            blink_hold_ticks: 9,
            blink_count: 3,
            patrol_cruise_speed: 3.14,
            patrol_cruise_ticks: 31,
            patrol_scan_tilt_rad: 0.7,
            patrol_scan_hold_ticks: 15,
            patrol_rounds: 5,
            dance_tilt_rad: 0.5,
            dance_beat_ticks: 25,
            dance_beats: 4,
            settle_ticks: 15,
        }
    }
}

impl DispatchConfig {
    pub fn tick_seconds(&self) -> f64 {
        self.tick_ms as f64 / 1000.0
    }

    /// The canned script a command starts, if it starts one.
    pub fn script_for(&self, command: Command) -> Option<Script> {
        match command {
            Command::Wave => Some(self.wave()),
            Command::Blink => Some(self.blink()),
            Command::Patrol => Some(self.patrol()),
            Command::Dance => Some(self.dance()),
            _ => None,
        }
    }

    fn wave(&self) -> Script {
        let tilt = self.wave_tilt_rad;
        let hold = self.wave_hold_ticks;
        Script::new(
            "wave",
            vec![
                Phase {
                    writes: vec![Actuation::Head { angle_rad: tilt }],
                    hold_ticks: hold,
                },
                Phase {
                    writes: vec![Actuation::Head { angle_rad: -tilt }],
                    hold_ticks: hold,
                },
                Phase {
                    writes: vec![Actuation::Head { angle_rad: 0.0 }],
                    hold_ticks: hold,
                },
            ],
        )
    }

    fn blink(&self) -> Script {
        let mut phases = Vec::with_capacity(2 * self.blink_count as usize);
        for _ in 0..self.blink_count {
            phases.push(Phase {
                writes: vec![Actuation::Eyes {
                    left_lit: true,
                    right_lit: true,
                }],
                hold_ticks: self.blink_hold_ticks,
            });
            phases.push(Phase {
                writes: vec![Actuation::Eyes {
                    left_lit: false,
                    right_lit: false,
                }],
                hold_ticks: self.blink_hold_ticks,
            });
        }
        Script::new("blink", phases)
    }

    fn patrol(&self) -> Script {
        let cruise = self.patrol_cruise_speed;
        let scan = self.patrol_scan_tilt_rad;
        let mut phases = Vec::new();
        for _ in 0..self.patrol_rounds {
            phases.push(Phase {
                writes: vec![Actuation::Wheels {
                    left_rad_s: cruise,
                    right_rad_s: cruise,
                }],
                hold_ticks: self.patrol_cruise_ticks,
            });
            phases.push(Phase {
                writes: vec![Actuation::Head { angle_rad: scan }],
                hold_ticks: self.patrol_scan_hold_ticks,
            });
            phases.push(Phase {
                writes: vec![Actuation::Head { angle_rad: -scan }],
                hold_ticks: self.patrol_scan_hold_ticks,
            });
        }
        phases.push(Phase {
            writes: vec![
                Actuation::Wheels {
                    left_rad_s: 0.0,
                    right_rad_s: 0.0,
                },
                Actuation::Head { angle_rad: 0.0 },
            ],
            hold_ticks: self.settle_ticks,
        });
        Script::new("patrol", phases)
    }

    fn dance(&self) -> Script {
        let mut phases = Vec::new();
        for beat in 0..self.dance_beats {
            let up = beat % 2 == 0;
            phases.push(Phase {
                writes: vec![
                    Actuation::Head {
                        angle_rad: if up {
                            self.dance_tilt_rad
                        } else {
                            -self.dance_tilt_rad
                        },
                    },
                    Actuation::Eyes {
                        left_lit: !up,
                        right_lit: up,
                    },
                ],
                hold_ticks: self.dance_beat_ticks,
            });
        }
        phases.push(Phase {
            writes: vec![
                Actuation::Head { angle_rad: 0.0 },
                Actuation::Eyes {
                    left_lit: false,
                    right_lit: false,
                },
            ],
            hold_ticks: self.settle_ticks,
        });
        Script::new("dance", phases)
    }
}

/// Counters kept by the loop, serialized into the journal's closing entry.
#[derive(Clone, Default, Debug, Serialize)]
pub struct DispatchStats {
    pub ticks: u64,
    pub commands_dispatched: u64,
    pub scripts_completed: u64,
    pub keys_ignored: u64,
    pub keys_dropped: u64,
}

/// Receives dispatch milestones. Sinks that record runs (the action
/// journal) implement this; `()` is the no-op observer.
pub trait DispatchObserver {
    fn command(&mut self, tick: u64, command: Command) {
        let _ = (tick, command);
    }
    fn script_finished(&mut self, tick: u64, script: &'static str) {
        let _ = (tick, script);
    }
}

impl DispatchObserver for () {}

/// The control loop: step the world, poll one key, do at most one thing.
///
/// Scripted actions occupy the loop through a [`ScriptPlayer`] advanced
/// once per tick, so the world keeps stepping and the keyboard keeps
/// being polled while they play. Keys seen during playback are dropped,
/// not queued; the drop shows up in [`DispatchStats::keys_dropped`].
pub struct Dispatcher {
    config: DispatchConfig,
    exchange: Option<Arc<SnapshotExchange>>,
    stats: DispatchStats,
    player: Option<ScriptPlayer>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig, exchange: Option<Arc<SnapshotExchange>>) -> Self {
        Self {
            config,
            exchange,
            stats: DispatchStats::default(),
            player: None,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn script_in_flight(&self) -> bool {
        self.player.is_some()
    }

    /// Run to quit or end of run. The only exits are the simulator's
    /// end-of-run signal and the quit command; neither is an error.
    pub fn run<IO: RobotIo, O: DispatchObserver>(&mut self, io: &mut IO, observer: &mut O) {
        loop {
            // Advance the world
            if io.step() == StepOutcome::Finished {
                info!("end of run after {} ticks", self.stats.ticks);
                break;
            }
            self.stats.ticks += 1;
            let tick = self.stats.ticks;

            // Read input
            let key = io.poll_key();

            if let Some(player) = self.player.as_mut() {
                // A script owns the tick; whatever was typed is lost.
                if let Some(dropped) = key {
                    self.stats.keys_dropped += 1;
                    debug!("key {dropped:?} dropped during {}", player.script_name());
                }
                if player.tick(io) == Playback::Finished {
                    let script = player.script_name();
                    self.stats.scripts_completed += 1;
                    info!("{script} finished at tick {tick}");
                    observer.script_finished(tick, script);
                    self.player = None;
                }
            } else if let Some(key) = key {
                match Command::from_key(key) {
                    None => {
                        self.stats.keys_ignored += 1;
                        debug!("ignoring unbound key {key:?}");
                    }
                    Some(Command::Quit) => {
                        self.stats.commands_dispatched += 1;
                        info!("quit requested at tick {tick}");
                        observer.command(tick, Command::Quit);
                        self.publish(io);
                        break;
                    }
                    Some(command) => {
                        self.stats.commands_dispatched += 1;
                        info!("{} at tick {tick}", command.label());
                        observer.command(tick, command);
                        self.perform(command, io, observer);
                    }
                }
            }

            // Publish for telemetry readers
            self.publish(io);
        }
    }

    fn perform<IO: RobotIo, O: DispatchObserver>(
        &mut self,
        command: Command,
        io: &mut IO,
        observer: &mut O,
    ) {
        let max = self.config.max_wheel_speed;
        let turn = self.config.turn_speed;
        match command {
            Command::Forward => Actuation::Wheels {
                left_rad_s: max,
                right_rad_s: max,
            }
            .apply(io),
            Command::Backward => Actuation::Wheels {
                left_rad_s: -max,
                right_rad_s: -max,
            }
            .apply(io),
            Command::TurnLeft => Actuation::Wheels {
                left_rad_s: -turn,
                right_rad_s: turn,
            }
            .apply(io),
            Command::TurnRight => Actuation::Wheels {
                left_rad_s: turn,
                right_rad_s: -turn,
            }
            .apply(io),
            Command::Stop => Actuation::Wheels {
                left_rad_s: 0.0,
                right_rad_s: 0.0,
            }
            .apply(io),
            Command::Reset => {
                Actuation::Wheels {
                    left_rad_s: 0.0,
                    right_rad_s: 0.0,
                }
                .apply(io);
                Actuation::Head { angle_rad: 0.0 }.apply(io);
                Actuation::Eyes {
                    left_lit: false,
                    right_lit: false,
                }
                .apply(io);
            }
            Command::Wave | Command::Blink | Command::Patrol | Command::Dance => {
                if let Some(script) = self.config.script_for(command) {
                    let mut player = ScriptPlayer::new(script);
                    // The starting tick already burns one tick of hold.
                    match player.tick(io) {
                        Playback::Running => self.player = Some(player),
                        Playback::Finished => {
                            self.stats.scripts_completed += 1;
                            info!("{} finished at tick {}", player.script_name(), self.stats.ticks);
                            observer.script_finished(self.stats.ticks, player.script_name());
                        }
                    }
                }
            }
            // Quit never reaches here; the loop breaks on it directly.
            Command::Quit => {}
        }
    }

    fn publish<IO: RobotIo>(&self, io: &IO) {
        if let Some(exchange) = &self.exchange {
            exchange.publish(ControlSnapshot {
                tick: self.stats.ticks,
                left_wheel_rad_s: io.wheel_velocity(Side::Left),
                right_wheel_rad_s: io.wheel_velocity(Side::Right),
                head_angle_rad: io.head_angle(),
                left_eye_lit: io.eye(Side::Left),
                right_eye_lit: io.eye(Side::Right),
                script_active: self.player.is_some(),
                commands_dispatched: self.stats.commands_dispatched,
                scripts_completed: self.stats.scripts_completed,
                keys_ignored: self.stats.keys_ignored,
                keys_dropped: self.stats.keys_dropped,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Write {
        Wheel(Side, f64),
        Head(f64),
        Eye(Side, bool),
    }

    /// Deterministic rig that logs every write with the tick it landed on.
    struct RecordingRig {
        tick: u64,
        budget: u64,
        keys: Vec<(u64, char)>,
        left: f64,
        right: f64,
        head: f64,
        eyes: [bool; 2],
        writes: Vec<(u64, Write)>,
    }

    impl RecordingRig {
        fn new(budget: u64, keys: &[(u64, char)]) -> Self {
            Self {
                tick: 0,
                budget,
                keys: keys.to_vec(),
                left: 0.0,
                right: 0.0,
                head: 0.0,
                eyes: [false, false],
                writes: Vec::new(),
            }
        }

        fn wheel_writes(&self) -> Vec<(u64, Side, f64)> {
            self.writes
                .iter()
                .filter_map(|(t, w)| match w {
                    Write::Wheel(side, v) => Some((*t, *side, *v)),
                    _ => None,
                })
                .collect()
        }

        fn head_writes(&self) -> Vec<(u64, f64)> {
            self.writes
                .iter()
                .filter_map(|(t, w)| match w {
                    Write::Head(v) => Some((*t, *v)),
                    _ => None,
                })
                .collect()
        }

        fn left_eye_writes(&self) -> Vec<(u64, bool)> {
            self.writes
                .iter()
                .filter_map(|(t, w)| match w {
                    Write::Eye(Side::Left, lit) => Some((*t, *lit)),
                    _ => None,
                })
                .collect()
        }
    }

    impl RobotIo for RecordingRig {
        fn step(&mut self) -> StepOutcome {
            if self.tick >= self.budget {
                return StepOutcome::Finished;
            }
            self.tick += 1;
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
            match side {
                Side::Left => self.left = rad_s,
                Side::Right => self.right = rad_s,
            }
            self.writes.push((self.tick, Write::Wheel(side, rad_s)));
        }
        fn set_head_target(&mut self, angle_rad: f64) {
            self.head = angle_rad;
            self.writes.push((self.tick, Write::Head(angle_rad)));
        }
        fn set_eye(&mut self, side: Side, lit: bool) {
            self.eyes[match side {
                Side::Left => 0,
                Side::Right => 1,
            }] = lit;
            self.writes.push((self.tick, Write::Eye(side, lit)));
        }
        fn wheel_velocity(&self, side: Side) -> f64 {
            match side {
                Side::Left => self.left,
                Side::Right => self.right,
            }
        }
        fn head_angle(&self) -> f64 {
            self.head
        }
        fn eye(&self, side: Side) -> bool {
            self.eyes[match side {
                Side::Left => 0,
                Side::Right => 1,
            }]
        }
    }

    fn run_rig(budget: u64, keys: &[(u64, char)]) -> (Dispatcher, RecordingRig) {
        let mut rig = RecordingRig::new(budget, keys);
        let mut dispatcher = Dispatcher::new(DispatchConfig::default(), None);
        dispatcher.run(&mut rig, &mut ());
        (dispatcher, rig)
    }

    #[test]
    fn forward_drives_both_wheels_at_max() {
        let (_, rig) = run_rig(3, &[(1, 'f')]);
        assert_eq!(
            rig.wheel_writes(),
            vec![(1, Side::Left, 6.28), (1, Side::Right, 6.28)]
        );
    }

    #[test]
    fn backward_drives_both_wheels_at_negative_max() {
        let (_, rig) = run_rig(3, &[(1, 'R')]);
        assert_eq!(
            rig.wheel_writes(),
            vec![(1, Side::Left, -6.28), (1, Side::Right, -6.28)]
        );
    }

    #[test]
    fn turns_spin_wheels_in_opposition() {
        let (_, rig) = run_rig(4, &[(1, 'l'), (2, 'g')]);
        assert_eq!(
            rig.wheel_writes(),
            vec![
                (1, Side::Left, -3.0),
                (1, Side::Right, 3.0),
                (2, Side::Left, 3.0),
                (2, Side::Right, -3.0),
            ]
        );
    }

    #[test]
    fn space_zeroes_both_wheels() {
        let (_, rig) = run_rig(4, &[(1, 'f'), (2, ' ')]);
        assert_eq!(rig.wheel_velocity(Side::Left), 0.0);
        assert_eq!(rig.wheel_velocity(Side::Right), 0.0);
    }

    #[test]
    fn wave_sends_three_head_targets_fifteen_ticks_apart() {
        let (dispatcher, rig) = run_rig(60, &[(2, 'w')]);
        assert_eq!(
            rig.head_writes(),
            vec![(2, 0.5), (17, -0.5), (32, 0.0)]
        );
        assert_eq!(dispatcher.stats().scripts_completed, 1);
    }

    #[test]
    fn blink_flashes_six_eye_states_nine_ticks_apart() {
        let (dispatcher, rig) = run_rig(60, &[(1, 'b')]);
        assert_eq!(
            rig.left_eye_writes(),
            vec![
                (1, true),
                (10, false),
                (19, true),
                (28, false),
                (37, true),
                (46, false),
            ]
        );
        assert_eq!(dispatcher.stats().scripts_completed, 1);
        assert!(!rig.eye(Side::Left) && !rig.eye(Side::Right));
    }

    #[test]
    fn keys_are_dropped_while_a_script_plays() {
        // Wave starts at tick 2 and owns ticks 2..=46.
        let (dispatcher, rig) = run_rig(50, &[(2, 'w'), (10, 'f'), (46, 'r'), (47, 'f')]);
        assert_eq!(dispatcher.stats().keys_dropped, 2);
        assert_eq!(
            rig.wheel_writes(),
            vec![(47, Side::Left, 6.28), (47, Side::Right, 6.28)]
        );
    }

    #[test]
    fn quit_exits_without_further_commands() {
        let (dispatcher, rig) = run_rig(100, &[(3, 'q'), (4, 'f')]);
        assert_eq!(dispatcher.stats().ticks, 3);
        assert!(rig.wheel_writes().is_empty());
        assert_eq!(dispatcher.stats().commands_dispatched, 1);
    }

    #[test]
    fn quit_key_is_dropped_during_playback_like_any_other() {
        let (dispatcher, _) = run_rig(120, &[(1, 'b'), (20, 'q'), (60, 'q')]);
        // Blink owns ticks 1..=54; the first q lands inside it.
        assert_eq!(dispatcher.stats().keys_dropped, 1);
        assert_eq!(dispatcher.stats().ticks, 60);
        assert_eq!(dispatcher.stats().scripts_completed, 1);
    }

    #[test]
    fn unbound_keys_change_nothing() {
        let (dispatcher, rig) = run_rig(5, &[(1, 'x'), (2, 'z'), (3, '7')]);
        assert!(rig.writes.is_empty());
        assert_eq!(dispatcher.stats().keys_ignored, 3);
        assert_eq!(dispatcher.stats().commands_dispatched, 0);
    }

    #[test]
    fn end_of_run_wins_over_pending_input() {
        let (dispatcher, rig) = run_rig(5, &[(6, 'f')]);
        assert_eq!(dispatcher.stats().ticks, 5);
        assert!(rig.writes.is_empty());
    }

    #[test]
    fn end_of_run_interrupts_a_playing_script() {
        let (dispatcher, rig) = run_rig(10, &[(1, 'w')]);
        assert_eq!(dispatcher.stats().ticks, 10);
        assert_eq!(dispatcher.stats().scripts_completed, 0);
        assert_eq!(rig.head_writes(), vec![(1, 0.5)]);
    }

    #[test]
    fn reset_restores_neutral_posture() {
        let mut rig = RecordingRig::new(3, &[(2, 's')]);
        rig.left = 2.0;
        rig.right = -2.0;
        rig.head = 0.3;
        rig.eyes = [true, true];
        let mut dispatcher = Dispatcher::new(DispatchConfig::default(), None);
        dispatcher.run(&mut rig, &mut ());
        assert_eq!(rig.wheel_velocity(Side::Left), 0.0);
        assert_eq!(rig.wheel_velocity(Side::Right), 0.0);
        assert_eq!(rig.head_angle(), 0.0);
        assert!(!rig.eye(Side::Left) && !rig.eye(Side::Right));
    }

    #[test]
    fn patrol_runs_five_rounds_then_settles() {
        let (dispatcher, rig) = run_rig(400, &[(1, 'p')]);
        let cruise: Vec<u64> = rig
            .wheel_writes()
            .iter()
            .filter(|(_, side, v)| *side == Side::Left && *v > 0.0)
            .map(|(t, _, _)| *t)
            .collect();
        assert_eq!(cruise, vec![1, 62, 123, 184, 245]);
        // Settle zeroes the wheels and recenters the head.
        assert!(rig
            .wheel_writes()
            .contains(&(306, Side::Left, 0.0)));
        assert!(rig.head_writes().contains(&(306, 0.0)));
        assert_eq!(dispatcher.stats().scripts_completed, 1);
        // 320 ticks total: input is live again on tick 321.
        let (d2, r2) = run_rig(400, &[(1, 'p'), (320, 'f'), (321, 'f')]);
        assert_eq!(d2.stats().keys_dropped, 1);
        assert_eq!(
            r2.wheel_writes()
                .iter()
                .filter(|(t, _, _)| *t == 321)
                .count(),
            2
        );
    }

    #[test]
    fn dance_alternates_head_and_eyes_then_settles() {
        let (dispatcher, rig) = run_rig(200, &[(1, 'd')]);
        assert_eq!(
            rig.head_writes(),
            vec![(1, 0.5), (26, -0.5), (51, 0.5), (76, -0.5), (101, 0.0)]
        );
        assert_eq!(
            rig.left_eye_writes(),
            vec![(1, false), (26, true), (51, false), (76, true), (101, false)]
        );
        assert_eq!(dispatcher.stats().scripts_completed, 1);
        assert_eq!(rig.head_angle(), 0.0);
        assert!(!rig.eye(Side::Left) && !rig.eye(Side::Right));
    }

    #[test]
    fn commands_and_scripts_are_counted() {
        let (dispatcher, _) = run_rig(60, &[(1, 'f'), (2, 'w'), (50, ' ')]);
        let stats = dispatcher.stats();
        assert_eq!(stats.commands_dispatched, 3);
        assert_eq!(stats.scripts_completed, 1);
        assert_eq!(stats.keys_dropped, 0);
    }

    #[test]
    fn snapshots_reflect_the_latest_tick() {
        let exchange = Arc::new(SnapshotExchange::new());
        let mut rig = RecordingRig::new(3, &[(1, 'f')]);
        let mut dispatcher = Dispatcher::new(DispatchConfig::default(), Some(exchange.clone()));
        dispatcher.run(&mut rig, &mut ());
        let snap = exchange.read();
        assert_eq!(snap.tick, 3);
        assert_eq!(snap.left_wheel_rad_s, 6.28);
        assert_eq!(snap.commands_dispatched, 1);
        assert!(!snap.script_active);
    }

    #[test]
    fn observer_sees_commands_and_script_ends() {
        #[derive(Default)]
        struct Log {
            commands: Vec<(u64, Command)>,
            finished: Vec<(u64, &'static str)>,
        }
        impl DispatchObserver for Log {
            fn command(&mut self, tick: u64, command: Command) {
                self.commands.push((tick, command));
            }
            fn script_finished(&mut self, tick: u64, script: &'static str) {
                self.finished.push((tick, script));
            }
        }

        let mut rig = RecordingRig::new(60, &[(1, 'f'), (2, 'w'), (50, 'q')]);
        let mut dispatcher = Dispatcher::new(DispatchConfig::default(), None);
        let mut log = Log::default();
        dispatcher.run(&mut rig, &mut log);
        assert_eq!(
            log.commands,
            vec![(1, Command::Forward), (2, Command::Wave), (50, Command::Quit)]
        );
        assert_eq!(log.finished, vec![(46, "wave")]);
    }
}
