use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::cmp::min;

/// Single-line text input backing every form field.
#[derive(Clone, Debug, Default)]
pub struct LineEditor {
    pub text: String,
    pub cursor_col: usize,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor_col = 0;
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut buffer = [0u8; 4];
        self.insert_str(ch.encode_utf8(&mut buffer));
    }

    pub fn insert_str(&mut self, text: &str) {
        let normalized = normalize_single_line(text);
        if normalized.is_empty() {
            return;
        }

        self.clamp_cursor();
        let byte_index = char_to_byte_index(&self.text, self.cursor_col);
        self.text.insert_str(byte_index, &normalized);
        self.cursor_col += normalized.chars().count();
    }

    pub fn backspace(&mut self) {
        self.clamp_cursor();
        if self.cursor_col == 0 {
            return;
        }

        let byte_index = char_to_byte_index(&self.text, self.cursor_col - 1);
        self.text.remove(byte_index);
        self.cursor_col -= 1;
    }

    pub fn delete_forward(&mut self) {
        self.clamp_cursor();
        if self.cursor_col >= self.text.chars().count() {
            return;
        }

        let byte_index = char_to_byte_index(&self.text, self.cursor_col);
        self.text.remove(byte_index);
    }

    /// Applies a plain editing key. Returns `false` for keys the editor does not
    /// own (Tab, Enter, Esc, arrows up/down, modified keys) so the caller can
    /// route them.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
        {
            return false;
        }
        match key.code {
            KeyCode::Char(ch) => self.insert_char(ch),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Left => {
                self.clamp_cursor();
                self.cursor_col = self.cursor_col.saturating_sub(1);
            }
            KeyCode::Right => {
                self.clamp_cursor();
                self.cursor_col = (self.cursor_col + 1).min(self.text.chars().count());
            }
            KeyCode::Home => self.cursor_col = 0,
            KeyCode::End => self.cursor_col = self.text.chars().count(),
            _ => return false,
        }
        true
    }

    fn clamp_cursor(&mut self) {
        self.cursor_col = min(self.cursor_col, self.text.chars().count());
    }
}

fn normalize_single_line(text: &str) -> String {
    text.chars()
        .filter(|ch| *ch != '\r')
        .map(|ch| if ch == '\n' || ch == '\t' { ' ' } else { ch })
        .collect()
}

fn char_to_byte_index(text: &str, char_index: usize) -> usize {
    match text.char_indices().nth(char_index) {
        Some((idx, _)) => idx,
        None => text.len(),
    }
}
