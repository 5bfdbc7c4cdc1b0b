/// Everything a key press can ask the robot to do.
///
/// Letters map case-insensitively; space maps to [`Command::Stop`].
/// Any other key maps to nothing and is ignored by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Both wheels to +max speed.
    Forward,
    /// Both wheels to -max speed.
    Backward,
    /// Spin in place, counter-clockwise.
    TurnLeft,
    /// Spin in place, clockwise.
    TurnRight,
    /// Both wheels to zero.
    Stop,
    /// Head sweep: up, down, center.
    Wave,
    /// Both eyes flash three times.
    Blink,
    /// Cruise-and-scan rounds, then settle.
    Patrol,
    /// Head bobs with alternating eye winks, then settle.
    Dance,
    /// Neutral posture: wheels zero, head centered, eyes off.
    Reset,
    /// End the run.
    Quit,
}

impl Command {
    /// Look up the command bound to a key, if any.
    pub fn from_key(key: char) -> Option<Command> {
        match key.to_ascii_lowercase() {
            'f' => Some(Command::Forward),
            'r' => Some(Command::Backward),
            'l' => Some(Command::TurnLeft),
            'g' => Some(Command::TurnRight),
            ' ' => Some(Command::Stop),
            'w' => Some(Command::Wave),
            'b' => Some(Command::Blink),
            'p' => Some(Command::Patrol),
            'd' => Some(Command::Dance),
            's' => Some(Command::Reset),
            'q' => Some(Command::Quit),
            _ => None,
        }
    }

    /// Stable lowercase name, used by the journal and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Command::Forward => "forward",
            Command::Backward => "backward",
            Command::TurnLeft => "turn_left",
            Command::TurnRight => "turn_right",
            Command::Stop => "stop",
            Command::Wave => "wave",
            Command::Blink => "blink",
            Command::Patrol => "patrol",
            Command::Dance => "dance",
            Command::Reset => "reset",
            Command::Quit => "quit",
        }
    }
}
