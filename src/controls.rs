use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};

use crate::frame_loop::ExitSignal;

/// Tracks the window events that end the demo.
#[derive(Debug, Default)]
pub struct InputState {
    escape_held: bool,
    pending: Option<ExitSignal>,
}

impl InputState {
    pub fn handle_event<T>(&mut self, event: &Event<'_, T>) {
        if let Event::WindowEvent { event, .. } = event {
            self.handle_window_event(event);
        }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent<'_>) {
        match event {
            WindowEvent::CloseRequested => self.signal(ExitSignal::CloseRequested),
            WindowEvent::KeyboardInput { input, .. } => self.handle_keypress(input),
            _ => (),
        }
    }

    /// Only the press edge of Escape counts; key repeat does not re-trigger.
    pub fn handle_keypress(&mut self, input: &KeyboardInput) {
        if input.virtual_keycode != Some(VirtualKeyCode::Escape) {
            return;
        }
        match input.state {
            ElementState::Pressed => {
                if !self.escape_held {
                    self.escape_held = true;
                    self.signal(ExitSignal::EscapePressed);
                }
            }
            ElementState::Released => self.escape_held = false,
        }
    }

    fn signal(&mut self, signal: ExitSignal) {
        self.pending.get_or_insert(signal);
    }

    pub fn take_exit_signal(&mut self) -> Option<ExitSignal> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use winit::event::ModifiersState;

    use super::*;

    #[allow(deprecated)]
    fn key(keycode: VirtualKeyCode, state: ElementState) -> KeyboardInput {
        KeyboardInput {
            scancode: 0,
            state,
            virtual_keycode: Some(keycode),
            modifiers: ModifiersState::empty(),
        }
    }

    #[test]
    fn escape_press_is_an_edge() {
        let mut input = InputState::default();

        input.handle_keypress(&key(VirtualKeyCode::Escape, ElementState::Pressed));
        assert_eq!(input.take_exit_signal(), Some(ExitSignal::EscapePressed));

        // Held key repeats do not signal again.
        input.handle_keypress(&key(VirtualKeyCode::Escape, ElementState::Pressed));
        assert_eq!(input.take_exit_signal(), None);

        input.handle_keypress(&key(VirtualKeyCode::Escape, ElementState::Released));
        input.handle_keypress(&key(VirtualKeyCode::Escape, ElementState::Pressed));
        assert_eq!(input.take_exit_signal(), Some(ExitSignal::EscapePressed));
    }

    #[test]
    fn other_keys_are_ignored() {
        let mut input = InputState::default();
        input.handle_keypress(&key(VirtualKeyCode::Space, ElementState::Pressed));
        assert_eq!(input.take_exit_signal(), None);
    }

    #[test]
    fn close_request_signals_exit() {
        let mut input = InputState::default();
        input.handle_window_event(&WindowEvent::CloseRequested);
        assert_eq!(input.take_exit_signal(), Some(ExitSignal::CloseRequested));
        assert_eq!(input.take_exit_signal(), None);
    }
}
