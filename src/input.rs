//! Per-frame input snapshot.
//!
//! The windowing glue writes key/mouse-button state and accumulates raw
//! mouse deltas as events arrive; the core only reads the snapshot (camera
//! controller). The delta is cleared at the end of each frame, button and
//! key state persists until the matching release event.

use std::collections::HashSet;

use winit::{event::MouseButton, keyboard::KeyCode};

#[derive(Debug, Default)]
pub struct Input {
    keys: HashSet<KeyCode>,
    buttons: HashSet<MouseButton>,
    mouse_delta: (f32, f32),
}

impl Input {
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.keys.insert(key);
        } else {
            self.keys.remove(&key);
        }
    }

    pub fn set_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.buttons.insert(button);
        } else {
            self.buttons.remove(&button);
        }
    }

    pub fn accumulate_mouse_delta(&mut self, dx: f64, dy: f64) {
        self.mouse_delta.0 += dx as f32;
        self.mouse_delta.1 += dy as f32;
    }

    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn button_held(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }

    /// Clear the per-frame accumulators. Call once after the update step.
    pub fn end_frame(&mut self) {
        self.mouse_delta = (0.0, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_state_persists_across_frames() {
        let mut input = Input::default();
        input.set_key(KeyCode::KeyW, true);
        input.end_frame();
        assert!(input.key_held(KeyCode::KeyW));
        input.set_key(KeyCode::KeyW, false);
        assert!(!input.key_held(KeyCode::KeyW));
    }

    #[test]
    fn mouse_delta_accumulates_then_clears() {
        let mut input = Input::default();
        input.accumulate_mouse_delta(2.0, -1.0);
        input.accumulate_mouse_delta(1.0, 0.5);
        assert_eq!(input.mouse_delta(), (3.0, -0.5));
        input.end_frame();
        assert_eq!(input.mouse_delta(), (0.0, 0.0));
    }
}
