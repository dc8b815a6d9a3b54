use std::collections::BTreeSet;

use tinsel_core::{InputMode, KeyCode, MouseButton, Vec2};

use crate::bus::Firing;

#[derive(Debug, Clone)]
struct Buttons<T> {
    down: BTreeSet<T>,
    pressed: BTreeSet<T>,
    released: BTreeSet<T>,
}

impl<T> Default for Buttons<T> {
    fn default() -> Self {
        Self {
            down: BTreeSet::new(),
            pressed: BTreeSet::new(),
            released: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Copy> Buttons<T> {
    fn press(&mut self, b: T) {
        if self.down.insert(b) {
            self.pressed.insert(b);
        }
    }

    fn release(&mut self, b: T) {
        if self.down.remove(&b) {
            self.released.insert(b);
        }
    }

    /// Pressed, then held, then released; each in button order.
    fn transitions(&self) -> Vec<(T, InputMode)> {
        let pressed = self.pressed.iter().map(|b| (*b, InputMode::Pressed));
        let held = self.down.iter().map(|b| (*b, InputMode::Held));
        let released = self.released.iter().map(|b| (*b, InputMode::Released));
        pressed.chain(held).chain(released).collect()
    }

    fn end_tick(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }
}

/// Keyboard and pointer state fed by the host between ticks.
///
/// A press followed by a release before the next tick still yields a
/// `pressed` and a `released` firing, but no `held` one.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: Buttons<KeyCode>,
    mouse: Buttons<MouseButton>,
    pointer: Vec2,
}

impl InputState {
    /// No keys down, pointer at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// A key went down.
    pub fn press_key(&mut self, code: KeyCode) {
        self.keys.press(code);
    }

    /// A key came up.
    pub fn release_key(&mut self, code: KeyCode) {
        self.keys.release(code);
    }

    /// A pointer button went down.
    pub fn press_mouse(&mut self, button: MouseButton) {
        self.mouse.press(button);
    }

    /// A pointer button came up.
    pub fn release_mouse(&mut self, button: MouseButton) {
        self.mouse.release(button);
    }

    /// The pointer moved.
    pub fn set_pointer(&mut self, x: f64, y: f64) {
        self.pointer = Vec2::new(x, y);
    }

    /// True while `code` is held down.
    pub fn key_down(&self, code: KeyCode) -> bool {
        self.keys.down.contains(&code)
    }

    /// True while `button` is held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse.down.contains(&button)
    }

    /// Last reported pointer position.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Firings for this tick: keys first, then pointer buttons.
    pub(crate) fn firings(&self) -> Vec<Firing> {
        let keys = self
            .keys
            .transitions()
            .into_iter()
            .map(|(code, mode)| Firing::Key { code, mode });
        let mouse = self
            .mouse
            .transitions()
            .into_iter()
            .map(|(button, mode)| Firing::Mouse { button, mode });
        keys.chain(mouse).collect()
    }

    /// Forget this tick's transitions. Held buttons stay held.
    pub(crate) fn end_tick(&mut self) {
        self.keys.end_tick();
        self.mouse.end_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, mode: InputMode) -> Firing {
        Firing::Key { code, mode }
    }

    #[test]
    fn first_tick_is_pressed_and_held() {
        let mut input = InputState::new();
        input.press_key(KeyCode::SPACE);
        assert_eq!(
            input.firings(),
            vec![
                key(KeyCode::SPACE, InputMode::Pressed),
                key(KeyCode::SPACE, InputMode::Held),
            ]
        );

        input.end_tick();
        assert_eq!(input.firings(), vec![key(KeyCode::SPACE, InputMode::Held)]);
        assert!(input.key_down(KeyCode::SPACE));
    }

    #[test]
    fn repeated_press_does_not_retrigger() {
        let mut input = InputState::new();
        input.press_key(KeyCode::UP);
        input.end_tick();
        input.press_key(KeyCode::UP);
        assert_eq!(input.firings(), vec![key(KeyCode::UP, InputMode::Held)]);
    }

    #[test]
    fn tap_between_ticks_skips_held() {
        let mut input = InputState::new();
        input.press_key(KeyCode::LEFT);
        input.release_key(KeyCode::LEFT);
        assert_eq!(
            input.firings(),
            vec![
                key(KeyCode::LEFT, InputMode::Pressed),
                key(KeyCode::LEFT, InputMode::Released),
            ]
        );
        assert!(!input.key_down(KeyCode::LEFT));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut input = InputState::new();
        input.release_key(KeyCode::DOWN);
        assert!(input.firings().is_empty());
    }

    #[test]
    fn mouse_follows_keys() {
        let mut input = InputState::new();
        input.press_mouse(MouseButton::Left);
        input.press_key(KeyCode::SPACE);
        input.set_pointer(10.0, 20.0);

        let firings = input.firings();
        assert_eq!(firings.len(), 4);
        assert_eq!(
            firings[2],
            Firing::Mouse {
                button: MouseButton::Left,
                mode: InputMode::Pressed,
            }
        );
        assert!(input.mouse_down(MouseButton::Left));
        assert_eq!(input.pointer(), Vec2::new(10.0, 20.0));
    }
}
