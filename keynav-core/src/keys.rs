//! Key names: normalization, conversion from terminal key events, display

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Canonical form of a key name: trimmed and lowercased
pub fn normalize_key_name(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Turn a key event into a key name like "q", "esc", "f5" or "ctrl+p"
///
/// Returns `None` for keys that have no stable name (media keys, bare
/// modifiers and the like).
pub fn key_name_from_event(event: KeyEvent) -> Option<String> {
    let base = match event.code {
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::BackTab => return Some("shift+tab".to_string()),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Insert => "insert".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_lowercase().to_string(),
        _ => return None,
    };

    let mut name = String::new();
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        name.push_str("ctrl+");
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        name.push_str("alt+");
    }
    // Shift is already folded into the character for printable keys
    if event.modifiers.contains(KeyModifiers::SHIFT) && !matches!(event.code, KeyCode::Char(_)) {
        name.push_str("shift+");
    }
    name.push_str(&base);
    Some(name)
}

/// Format a key name for display (e.g., "ctrl+p" -> "^P", "q" -> "Q", "tab" -> "Tab")
pub fn format_key_for_display(key: &str) -> String {
    let key = normalize_key_name(key);

    if key == "shift+tab" || key == "backtab" {
        return "Shift+Tab".to_string();
    }

    let parts: Vec<&str> = key.split('+').collect();
    let key_part = parts.last().copied().unwrap_or(key.as_str());
    let modifiers: String = parts[..parts.len().saturating_sub(1)]
        .iter()
        .filter_map(|part| match part.trim() {
            "ctrl" | "control" => Some("^"),
            "shift" => Some("Shift+"),
            "alt" => Some("Alt+"),
            _ => None,
        })
        .collect();

    let key_display = match key_part {
        "esc" | "escape" => "Esc".to_string(),
        "enter" | "return" => "Enter".to_string(),
        "tab" => "Tab".to_string(),
        "backspace" => "Backspace".to_string(),
        "up" => "Up".to_string(),
        "down" => "Down".to_string(),
        "left" => "Left".to_string(),
        "right" => "Right".to_string(),
        "home" => "Home".to_string(),
        "end" => "End".to_string(),
        "pageup" => "PgUp".to_string(),
        "pagedown" => "PgDn".to_string(),
        "delete" => "Del".to_string(),
        "insert" => "Ins".to_string(),
        "space" => "Space".to_string(),
        f if f.len() > 1 && f.starts_with('f') && f[1..].chars().all(|c| c.is_ascii_digit()) => {
            f.to_uppercase()
        }
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_alphabetic() => c.to_uppercase().collect(),
                _ => other.to_string(),
            }
        }
    };

    format!("{modifiers}{key_display}")
}
