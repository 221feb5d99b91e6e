//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    SoftDrop,
    HardDrop,
    /// Place tray slot `n` (0-based) at the top centre.
    PlaceSlot(usize),
    Pause,
    Restart,
    Quit,
    None,
}

impl Action {
    /// Actions that keep firing while the key is held.
    pub fn repeats(self) -> bool {
        matches!(self, Self::MoveLeft | Self::MoveRight)
    }
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('x') => Action::RotateCw,
        KeyCode::Char('z') | KeyCode::Char('u') => Action::RotateCcw,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') => Action::HardDrop,
        KeyCode::Char(c @ '1'..='9') => Action::PlaceSlot(c as usize - '1' as usize),
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Action {
        key_to_action(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn arrows_and_vim_keys_agree() {
        assert_eq!(press(KeyCode::Left), press(KeyCode::Char('h')));
        assert_eq!(press(KeyCode::Up), Action::RotateCw);
        assert_eq!(press(KeyCode::Char('z')), Action::RotateCcw);
        assert_eq!(press(KeyCode::Char(' ')), Action::HardDrop);
    }

    #[test]
    fn digits_pick_tray_slots() {
        assert_eq!(press(KeyCode::Char('1')), Action::PlaceSlot(0));
        assert_eq!(press(KeyCode::Char('3')), Action::PlaceSlot(2));
        assert_eq!(press(KeyCode::Char('0')), Action::None);
    }

    #[test]
    fn ctrl_c_quits_other_chords_ignored() {
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Left, KeyModifiers::ALT)),
            Action::None
        );
    }
}
