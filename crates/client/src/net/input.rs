use skirmish::{ClientMessage, FixedTimestep, InputCommand, DEFAULT_WEAPON};

/// Player intent for one local slot, sampled by the caller every render tick.
#[derive(Debug, Clone, PartialEq)]
pub struct InputState {
    pub move_x: f32,
    pub move_y: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fire: bool,
    pub jump: bool,
    pub sprint: bool,
    pub reload: bool,
    pub weapon_id: String,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            move_x: 0.0,
            move_y: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            fire: false,
            jump: false,
            sprint: false,
            reload: false,
            weapon_id: DEFAULT_WEAPON.to_string(),
        }
    }
}

impl InputState {
    pub fn to_command(&self, seq: u32, dt: f32) -> InputCommand {
        InputCommand {
            seq,
            dt,
            move_x: self.move_x.clamp(-1.0, 1.0),
            move_y: self.move_y.clamp(-1.0, 1.0),
            yaw: self.yaw,
            pitch: self.pitch,
            fire: self.fire,
            jump: self.jump,
            sprint: self.sprint,
            reload: self.reload,
            weapon_id: self.weapon_id.clone(),
        }
    }
}

/// Fixed-rate input stream with a monotonically increasing sequence number.
#[derive(Debug, Clone)]
pub struct InputSender {
    timestep: FixedTimestep,
    seq: u32,
}

impl InputSender {
    pub fn new(send_rate: u32, max_frame_delta: f32) -> Self {
        Self {
            timestep: FixedTimestep::with_max_frame_delta(send_rate, max_frame_delta),
            seq: 0,
        }
    }

    /// Advances by one render frame and returns every input due in it.
    pub fn update(&mut self, frame_dt: f32, input: &InputState) -> Vec<ClientMessage> {
        self.timestep.accumulate(frame_dt);

        let mut commands = Vec::new();
        while self.timestep.consume_tick() {
            commands.push(ClientMessage::Input(
                input.to_command(self.seq, self.timestep.dt()),
            ));
            self.seq = self.seq.wrapping_add(1);
        }
        commands
    }

    /// Sequence number the next input will carry.
    pub fn next_seq(&self) -> u32 {
        self.seq
    }

    pub fn reset(&mut self) {
        self.timestep.reset();
        self.seq = 0;
    }
}

impl Default for InputSender {
    fn default() -> Self {
        Self::new(60, 0.05)
    }
}
