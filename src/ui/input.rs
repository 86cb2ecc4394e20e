//! Keyboard input.
//!
//! Drains pending crossterm events once per frame and turns fresh key
//! presses into board commands. Everything here is edge-triggered: a
//! held arrow key repeats through the terminal's own key repeat.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What the player asked for this frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Move { dx: i32, dy: i32 },
    /// Pick up the tile under the cursor, or drop the held one.
    Grab,
    Cancel,
    OpenTiles,
    GrantWild,
    Rebuild,
    Quit,
}

/// Key bindings. Unbound keys map to `None`.
pub fn command_for(code: KeyCode) -> Option<Command> {
    let cmd = match code {
        KeyCode::Left | KeyCode::Char('h') => Command::Move { dx: -1, dy: 0 },
        KeyCode::Right | KeyCode::Char('l') => Command::Move { dx: 1, dy: 0 },
        KeyCode::Up | KeyCode::Char('k') => Command::Move { dx: 0, dy: -1 },
        KeyCode::Down | KeyCode::Char('j') => Command::Move { dx: 0, dy: 1 },
        KeyCode::Char(' ') | KeyCode::Enter => Command::Grab,
        KeyCode::Esc => Command::Cancel,
        KeyCode::Char('o') | KeyCode::Char('O') => Command::OpenTiles,
        KeyCode::Char('w') | KeyCode::Char('W') => Command::GrantWild,
        KeyCode::Char('r') | KeyCode::Char('R') => Command::Rebuild,
        KeyCode::Char('q') | KeyCode::Char('Q') => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

pub struct InputState {
    /// Press/Repeat events collected by the last `drain_events()`.
    pressed: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { pressed: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.pressed.clear();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind != KeyEventKind::Release {
                    self.pressed.push(key);
                }
            }
        }
    }

    /// Block until a key arrives or `timeout` passes.
    pub fn wait_key(&mut self, timeout: Duration) -> Option<KeyEvent> {
        self.pressed.clear();
        while poll(timeout).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    self.pressed.push(key);
                    return Some(key);
                }
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
        None
    }

    pub fn commands(&self) -> impl Iterator<Item = Command> + '_ {
        self.pressed.iter().filter_map(|k| command_for(k.code))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.pressed.iter().any(|k| is_ctrl_c(k))
    }
}

impl Default for InputState {
    fn default() -> Self { Self::new() }
}

pub fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && (key.code == KeyCode::Char('c') || key.code == KeyCode::Char('C'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_vi_keys_move() {
        assert_eq!(command_for(KeyCode::Left), Some(Command::Move { dx: -1, dy: 0 }));
        assert_eq!(command_for(KeyCode::Char('l')), Some(Command::Move { dx: 1, dy: 0 }));
        assert_eq!(command_for(KeyCode::Char('k')), Some(Command::Move { dx: 0, dy: -1 }));
        assert_eq!(command_for(KeyCode::Down), Some(Command::Move { dx: 0, dy: 1 }));
    }

    #[test]
    fn action_keys() {
        assert_eq!(command_for(KeyCode::Char(' ')), Some(Command::Grab));
        assert_eq!(command_for(KeyCode::Enter), Some(Command::Grab));
        assert_eq!(command_for(KeyCode::Char('o')), Some(Command::OpenTiles));
        assert_eq!(command_for(KeyCode::Char('W')), Some(Command::GrantWild));
        assert_eq!(command_for(KeyCode::Char('r')), Some(Command::Rebuild));
        assert_eq!(command_for(KeyCode::Char('q')), Some(Command::Quit));
        assert_eq!(command_for(KeyCode::Char('z')), None);
    }

    #[test]
    fn ctrl_c_detection() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(is_ctrl_c(&key));
        assert!(!is_ctrl_c(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
    }
}
