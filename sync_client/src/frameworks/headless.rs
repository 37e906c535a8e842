// Presentation without a renderer: walks a square and keeps remote sprites in a map.

use crate::domain::Presentation;
use std::collections::HashMap;
use sync_protocol::{ParticipantId, PositionSample};
use tracing::info;

const SPEED: f32 = 2.0;
const SIDE_TICKS: u32 = 60;
const IDLE_TICKS: u32 = 30;
const WALK_FRAMES: u32 = 4;

// Unit steps for each side of the square: right, down, left, up.
const DIRECTIONS: [(f32, f32); 4] = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];

#[derive(Debug, Clone)]
pub struct RemoteSprite {
    pub id: ParticipantId,
    pub sample: PositionSample,
}

/// Headless stand-in for a game scene.
///
/// Walks one side of a square, pauses, then turns. The pause exercises the idle path
/// where nothing is sent.
#[derive(Debug)]
pub struct HeadlessPresentation {
    x: f32,
    y: f32,
    frame: u32,
    velocity: (f32, f32),
    side: usize,
    ticks_in_phase: u32,
    idle: bool,
    next_handle: u64,
    sprites: HashMap<u64, RemoteSprite>,
}

impl HeadlessPresentation {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            frame: 0,
            velocity: (0.0, 0.0),
            side: 0,
            ticks_in_phase: 0,
            idle: true,
            next_handle: 0,
            sprites: HashMap::new(),
        }
    }

    /// Advances local movement by one tick.
    pub fn step(&mut self) {
        self.ticks_in_phase += 1;

        if self.idle {
            self.velocity = (0.0, 0.0);
            if self.ticks_in_phase >= IDLE_TICKS {
                self.idle = false;
                self.ticks_in_phase = 0;
            }
            return;
        }

        let (dx, dy) = DIRECTIONS[self.side];
        self.velocity = (dx * SPEED, dy * SPEED);
        self.x += self.velocity.0;
        self.y += self.velocity.1;
        self.frame = (self.frame + 1) % WALK_FRAMES;

        if self.ticks_in_phase >= SIDE_TICKS {
            self.side = (self.side + 1) % DIRECTIONS.len();
            self.idle = true;
            self.ticks_in_phase = 0;
        }
    }

    pub fn sprites(&self) -> impl Iterator<Item = &RemoteSprite> {
        self.sprites.values()
    }
}

impl Presentation for HeadlessPresentation {
    type Handle = u64;

    fn local_velocity(&self) -> (f32, f32) {
        self.velocity
    }

    fn local_sample(&self) -> PositionSample {
        PositionSample::new(self.x, self.y, self.frame)
    }

    fn create_remote_entity(&mut self, id: &ParticipantId, sample: &PositionSample) -> u64 {
        self.next_handle += 1;
        self.sprites.insert(
            self.next_handle,
            RemoteSprite {
                id: id.clone(),
                sample: *sample,
            },
        );
        info!(participant_id = %id, x = sample.x, y = sample.y, "participant appeared");
        self.next_handle
    }

    fn update_remote_entity(&mut self, handle: &mut u64, sample: &PositionSample) {
        if let Some(sprite) = self.sprites.get_mut(handle) {
            sprite.sample = *sample;
        }
    }

    fn is_handle_valid(&self, handle: &u64) -> bool {
        self.sprites.contains_key(handle)
    }

    fn destroy_remote_entity(&mut self, handle: u64) {
        if let Some(sprite) = self.sprites.remove(&handle) {
            info!(participant_id = %sprite.id, "participant left");
        }
    }

    fn on_disconnected(&mut self) {
        info!(remote = self.sprites.len(), "disconnected from relay");
    }
}
