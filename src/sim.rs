//! Drive simulation state: direction intent, speed/fuel/gear, head-bob
//! and video segment sequencing.
//!
//! All continuous variables change in exactly one place, `tick()`, which
//! the UI calls once per rendered frame. Input handlers only set intent.

use crate::models::Street;

/// Cruise target when driving forward
pub const CRUISE_TARGET: f32 = 80.0;
/// Lower target when reversing
pub const REVERSE_TARGET: f32 = 30.0;
/// Fixed per-tick speed smoothing factor. Deliberately not time-scaled:
/// frame-rate variation changes convergence rate, never direction.
pub const SPEED_SMOOTHING: f32 = 0.05;
/// Fuel drained per speed unit per second
pub const FUEL_RATE: f32 = 0.02;
/// Joystick vertical displacement below this is treated as neutral
pub const JOYSTICK_DEAD_ZONE: f32 = 0.15;
/// Rewind rate in media-seconds per wall-second while reversing
pub const REWIND_RATE: f64 = 2.0;
/// Segment duration assumed until media metadata arrives
pub const DEFAULT_SEGMENT_SECS: f64 = 10.0;
/// Street-switch fade, seconds. HUD repopulates only after it elapses.
pub const TRANSITION_SECS: f32 = 0.6;

const BOB_LIMIT: f32 = 6.0;
const BOB_RATE: f32 = 24.0;
const BOB_DECAY: f32 = 0.90;

/// Merged forward/reverse/neutral intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    Reverse,
    #[default]
    Neutral,
}

/// Raw per-frame input snapshot before precedence resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub key_forward: bool,
    pub key_reverse: bool,
    /// Joystick vertical axis, +1 fully forward, -1 fully back
    pub joystick_axis: f32,
    pub autopilot: bool,
}

/// Resolve direction intent with precedence
/// keyboard > joystick > autopilot > neutral.
pub fn resolve_direction(input: &InputState) -> Direction {
    if input.key_forward {
        return Direction::Forward;
    }
    if input.key_reverse {
        return Direction::Reverse;
    }
    if input.joystick_axis > JOYSTICK_DEAD_ZONE {
        return Direction::Forward;
    }
    if input.joystick_axis < -JOYSTICK_DEAD_ZONE {
        return Direction::Reverse;
    }
    if input.autopilot {
        return Direction::Forward;
    }
    Direction::Neutral
}

/// Target speed implied by a direction intent
pub fn target_for(direction: Direction) -> f32 {
    match direction {
        Direction::Forward => CRUISE_TARGET,
        Direction::Reverse => REVERSE_TARGET,
        Direction::Neutral => 0.0,
    }
}

/// Gear label as a pure function of (speed, direction). Reverse forces
/// "R" regardless of speed magnitude.
pub fn gear_label(speed: f32, direction: Direction) -> &'static str {
    if direction == Direction::Reverse {
        return "R";
    }
    match speed {
        s if s < 2.0 => "N",
        s if s < 30.0 => "1",
        s if s < 55.0 => "2",
        s if s < 80.0 => "3",
        _ => "4",
    }
}

/// Logical playback clock over a street's ordered segments
#[derive(Debug, Clone, Default)]
pub struct Playback {
    pub segment: usize,
    pub position: f64,
    pub duration: f64,
    pub playing: bool,
    /// Loading indicator; clears only on `media_loaded` (success)
    pub loading: bool,
}

impl Playback {
    /// Fire-and-forget play attempt for the current segment
    pub fn play(&mut self) {
        self.playing = true;
        self.loading = true;
    }

    /// Media metadata arrived; the only transition that clears `loading`
    pub fn media_loaded(&mut self, duration: f64) {
        if duration.is_finite() && duration > 0.0 {
            self.duration = duration;
        }
        self.loading = false;
    }
}

/// Mutable simulation state for the active session. Created at session
/// start, reset on every street change.
#[derive(Debug, Clone)]
pub struct DriveState {
    pub street_index: usize,
    pub direction: Direction,
    pub speed: f32,
    pub target_speed: f32,
    /// 0-100, monotonically non-increasing while moving
    pub fuel: f32,
    pub bob_offset: f32,
    bob_dir: f32,
    pub paused: bool,
    pub settings_open: bool,
    pub map_ready: bool,
    /// Remaining street-switch fade; HUD shows the new street at zero
    pub transition: f32,
    pub playback: Playback,
}

impl Default for DriveState {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveState {
    pub fn new() -> Self {
        Self {
            street_index: 0,
            direction: Direction::Neutral,
            speed: 0.0,
            target_speed: 0.0,
            fuel: 100.0,
            bob_offset: 0.0,
            bob_dir: 1.0,
            paused: false,
            settings_open: false,
            map_ready: false,
            transition: 0.0,
            playback: Playback::default(),
        }
    }

    /// Reset for a newly selected street. All simulation variables go back
    /// to their initial values behind a brief fade.
    pub fn switch_street(&mut self, index: usize, street: &Street) {
        self.street_index = index;
        self.direction = Direction::Neutral;
        self.speed = 0.0;
        self.target_speed = 0.0;
        self.fuel = 100.0;
        self.bob_offset = 0.0;
        self.bob_dir = 1.0;
        self.transition = TRANSITION_SECS;
        self.playback = Playback {
            segment: 0,
            position: 0.0,
            duration: segment_duration(street, 0),
            playing: false,
            loading: false,
        };
        if !street.segments.is_empty() {
            self.playback.play();
        }
    }

    /// True while the street-switch fade is running; the HUD keeps the
    /// previous (or blank) name/location until it completes.
    pub fn in_transition(&self) -> bool {
        self.transition > 0.0
    }

    /// Apply a resolved direction intent. Only targets change here; the
    /// continuous variables move in `tick`.
    pub fn set_intent(&mut self, direction: Direction) {
        self.direction = direction;
        self.target_speed = target_for(direction);
    }

    /// One frame of simulation. `dt` is seconds since the previous frame.
    pub fn tick(&mut self, dt: f32, shake_enabled: bool, street: &Street) {
        if self.transition > 0.0 {
            self.transition = (self.transition - dt).max(0.0);
        }
        if self.paused {
            return;
        }

        // Fixed per-tick smoothing toward target
        self.speed += (self.target_speed - self.speed) * SPEED_SMOOTHING;
        if self.speed < 0.01 && self.target_speed == 0.0 {
            self.speed = 0.0;
        }

        // Fuel burns with speed and time, clamps at empty, never refills
        if self.speed > 0.0 {
            self.fuel = (self.fuel - self.speed * dt * FUEL_RATE).max(0.0);
        }

        self.step_bob(dt, shake_enabled);
        self.step_playback(dt, street);
    }

    fn step_bob(&mut self, dt: f32, shake_enabled: bool) {
        if self.speed > 1.0 && shake_enabled {
            self.bob_offset += self.bob_dir * BOB_RATE * dt * (self.speed / CRUISE_TARGET);
            if self.bob_offset >= BOB_LIMIT {
                self.bob_offset = BOB_LIMIT;
                self.bob_dir = -1.0;
            } else if self.bob_offset <= -BOB_LIMIT {
                self.bob_offset = -BOB_LIMIT;
                self.bob_dir = 1.0;
            }
        } else {
            self.bob_offset *= BOB_DECAY;
            if self.bob_offset.abs() < 0.05 {
                self.bob_offset = 0.0;
            }
        }
    }

    fn step_playback(&mut self, dt: f32, street: &Street) {
        if street.segments.is_empty() {
            return;
        }
        match self.direction {
            Direction::Forward => {
                if !self.playback.playing || self.speed <= 0.0 {
                    return;
                }
                self.playback.position += dt as f64;
                if self.playback.position >= self.playback.duration {
                    if self.playback.segment + 1 < street.segments.len() {
                        // Advance and play the next segment
                        self.playback.segment += 1;
                        self.playback.position = 0.0;
                        self.playback.duration =
                            segment_duration(street, self.playback.segment);
                        self.playback.play();
                    } else {
                        // Last segment finished: stop cleanly
                        self.playback.position = self.playback.duration;
                        self.playback.playing = false;
                        self.target_speed = 0.0;
                    }
                }
            }
            Direction::Reverse => {
                // Manual rewind, bounded at zero and wrapping within the
                // current segment. Reverse never crosses segment
                // boundaries; only forward motion traverses the list.
                self.playback.position -= REWIND_RATE * dt as f64;
                if self.playback.position < 0.0 {
                    self.playback.position = self.playback.duration;
                }
                self.playback.playing = true;
            }
            Direction::Neutral => {}
        }
    }
}

/// Known duration for a street segment, default until media load
pub fn segment_duration(street: &Street, segment: usize) -> f64 {
    street
        .segment_durations
        .get(segment)
        .copied()
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(DEFAULT_SEGMENT_SECS)
}
