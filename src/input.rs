use std::collections::HashSet;
use std::time::{Duration, Instant};

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard and mouse state accumulated from window events.
#[derive(Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_position: Option<Vec2>,
    mouse_delta: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    self.mouse_buttons_down.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_buttons_down.remove(button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } | WindowEvent::Focused(false) => {
                self.mouse_position = None;
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
            }
            _ => {}
        }
    }

    fn press_key(&mut self, key: KeyCode) {
        // Key repeat arrives as repeated presses; only the first counts.
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    fn move_cursor(&mut self, position: Vec2) {
        if let Some(previous) = self.mouse_position {
            self.mouse_delta += position - previous;
        }
        self.mouse_position = Some(position);
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Mouse movement delta this frame, in pixels.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }
}

/// Per-frame timing and display size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
    pub width: u32,
    pub height: u32,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    /// Seconds since the clock started.
    pub elapsed: f32,
}

/// Produces [`FrameInput`] snapshots.
pub struct FrameClock {
    start: Instant,
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
        }
    }

    pub fn tick(&mut self, width: u32, height: u32) -> FrameInput {
        self.tick_at(Instant::now(), width, height)
    }

    fn tick_at(&mut self, now: Instant, width: u32, height: u32) -> FrameInput {
        // Long stalls (window drags, breakpoints) would fling the camera.
        let delta = now.duration_since(self.last).min(Duration::from_millis(100));
        self.last = now;
        FrameInput {
            width,
            height,
            delta_time: delta.as_secs_f32(),
            elapsed: now.duration_since(self.start).as_secs_f32(),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
