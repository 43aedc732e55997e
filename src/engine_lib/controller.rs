// src/engine_lib/controller.rs

use std::collections::HashSet;

use winit::{
    event::{DeviceEvent, ElementState, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window},
};

/// Polled keyboard and cursor state built from winit events.
///
/// The cursor is virtual: while grabbed, raw mouse motion is accumulated into
/// an absolute position so the camera can keep working with "last x / last y"
/// style deltas.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    pressed_this_frame: HashSet<KeyCode>,
    cursor: (f64, f64),
    cursor_moved: bool,
    pub cursor_grabbed: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: KeyCode) {
        if self.held.insert(key) {
            self.pressed_this_frame.insert(key);
        }
    }

    pub fn release(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Went down since the last `end_frame`. Key repeat does not count.
    pub fn just_pressed(&self, key: KeyCode) -> bool {
        self.pressed_this_frame.contains(&key)
    }

    pub fn move_cursor(&mut self, dx: f64, dy: f64) {
        self.cursor.0 += dx;
        self.cursor.1 += dy;
        self.cursor_moved = true;
    }

    /// Current virtual cursor position, if it moved this frame.
    pub fn take_cursor_motion(&mut self) -> Option<(f64, f64)> {
        std::mem::take(&mut self.cursor_moved).then_some(self.cursor)
    }

    pub fn end_frame(&mut self) {
        self.pressed_this_frame.clear();
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent, window: &Window) -> bool {
        match event {
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                let PhysicalKey::Code(code) = key_event.physical_key else {
                    return false;
                };
                match key_event.state {
                    ElementState::Pressed => {
                        if code == KeyCode::Escape && !key_event.repeat {
                            self.toggle_cursor_grab(window);
                        }
                        self.press(code);
                    }
                    ElementState::Released => self.release(code),
                }
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if !self.cursor_grabbed && *state == ElementState::Pressed && *button == winit::event::MouseButton::Left {
                    self.grab_cursor(window, true);
                    return true;
                }
                false
            }
            WindowEvent::Focused(focused) => {
                if !*focused {
                    self.held.clear();
                    if self.cursor_grabbed {
                        self.grab_cursor(window, false);
                    }
                }
                false
            }
            _ => false,
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if !self.cursor_grabbed {
            return;
        }
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.move_cursor(*dx, *dy);
        }
    }

    pub fn toggle_cursor_grab(&mut self, window: &Window) {
        self.grab_cursor(window, !self.cursor_grabbed);
    }

    pub fn grab_cursor(&mut self, window: &Window, grab: bool) {
        if grab == self.cursor_grabbed {
            return;
        }
        if grab {
            if window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_e| window.set_cursor_grab(CursorGrabMode::Locked))
                .is_ok()
            {
                window.set_cursor_visible(false);
                self.cursor_grabbed = true;
            } else {
                log::warn!("Could not grab cursor");
            }
        } else if window.set_cursor_grab(CursorGrabMode::None).is_ok() {
            window.set_cursor_visible(true);
            self.cursor_grabbed = false;
        } else {
            log::warn!("Could not release cursor");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn just_pressed_lasts_one_frame() {
        let mut input = InputState::new();
        input.press(KeyCode::KeyO);
        assert!(input.is_pressed(KeyCode::KeyO));
        assert!(input.just_pressed(KeyCode::KeyO));

        input.end_frame();
        input.press(KeyCode::KeyO); // repeat while held
        assert!(input.is_pressed(KeyCode::KeyO));
        assert!(!input.just_pressed(KeyCode::KeyO));

        input.release(KeyCode::KeyO);
        assert!(!input.is_pressed(KeyCode::KeyO));
    }

    #[test]
    fn cursor_motion_accumulates_and_is_taken_once() {
        let mut input = InputState::new();
        assert_eq!(input.take_cursor_motion(), None);
        input.move_cursor(3.0, -1.0);
        input.move_cursor(2.0, 4.0);
        assert_eq!(input.take_cursor_motion(), Some((5.0, 3.0)));
        assert_eq!(input.take_cursor_motion(), None);
    }

    #[test]
    fn motion_is_ignored_while_released() {
        let mut input = InputState::new();
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (10.0, 10.0) });
        assert_eq!(input.take_cursor_motion(), None);

        input.cursor_grabbed = true;
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (10.0, 10.0) });
        assert_eq!(input.take_cursor_motion(), Some((10.0, 10.0)));
    }
}
