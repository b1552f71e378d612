//! Legacy xterm key encoding.

use super::{Key, Modifiers, NamedKey};

/// Named key with a letter terminator (`CSI X` or `SS3 X`).
struct LetterKey {
    term: u8,
    /// F1–F4 always use SS3 when unmodified; cursor keys only in
    /// application cursor mode.
    always_ss3: bool,
}

fn letter_key(key: NamedKey) -> Option<LetterKey> {
    let (term, always_ss3) = match key {
        NamedKey::ArrowUp => (b'A', false),
        NamedKey::ArrowDown => (b'B', false),
        NamedKey::ArrowRight => (b'C', false),
        NamedKey::ArrowLeft => (b'D', false),
        NamedKey::Home => (b'H', false),
        NamedKey::End => (b'F', false),
        NamedKey::F(1) => (b'P', true),
        NamedKey::F(2) => (b'Q', true),
        NamedKey::F(3) => (b'R', true),
        NamedKey::F(4) => (b'S', true),
        _ => return None,
    };
    Some(LetterKey { term, always_ss3 })
}

/// Number for `CSI {num} ~` keys.
fn tilde_number(key: NamedKey) -> Option<u8> {
    Some(match key {
        NamedKey::Insert => 2,
        NamedKey::Delete => 3,
        NamedKey::PageUp => 5,
        NamedKey::PageDown => 6,
        NamedKey::F(5) => 15,
        NamedKey::F(6) => 17,
        NamedKey::F(7) => 18,
        NamedKey::F(8) => 19,
        NamedKey::F(9) => 20,
        NamedKey::F(10) => 21,
        NamedKey::F(11) => 23,
        NamedKey::F(12) => 24,
        _ => return None,
    })
}

/// Encode a key press. `app_cursor` is DECCKM. Returns an empty `Vec` for
/// keys that produce no input.
pub fn encode_key(key: Key, mods: Modifiers, app_cursor: bool) -> Vec<u8> {
    match key {
        Key::Char(c) => encode_char(c, mods),
        Key::Named(named) => encode_named(named, mods, app_cursor),
    }
}

fn encode_named(key: NamedKey, mods: Modifiers, app_cursor: bool) -> Vec<u8> {
    let mod_param = mods.xterm_param();

    if let Some(lk) = letter_key(key) {
        return if mod_param > 0 {
            format!("\x1b[1;{}{}", mod_param, lk.term as char).into_bytes()
        } else if lk.always_ss3 || app_cursor {
            vec![0x1b, b'O', lk.term]
        } else {
            vec![0x1b, b'[', lk.term]
        };
    }

    if let Some(num) = tilde_number(key) {
        return if mod_param > 0 {
            format!("\x1b[{num};{mod_param}~").into_bytes()
        } else {
            format!("\x1b[{num}~").into_bytes()
        };
    }

    match key {
        NamedKey::Enter => alt_prefixed(mods, b'\r'),
        NamedKey::Backspace => alt_prefixed(mods, 0x7f),
        NamedKey::Tab if mods.contains(Modifiers::SHIFT) => b"\x1b[Z".to_vec(),
        NamedKey::Tab => vec![b'\t'],
        NamedKey::Escape => vec![0x1b],
        NamedKey::Space if mods.contains(Modifiers::CONTROL) => alt_prefixed(mods, 0x00),
        NamedKey::Space => alt_prefixed(mods, b' '),
        _ => Vec::new(),
    }
}

/// Encode a character key. Ctrl maps to C0 bytes, Alt adds an ESC prefix.
pub fn encode_char(c: char, mods: Modifiers) -> Vec<u8> {
    if mods.contains(Modifiers::CONTROL) {
        if let Some(c0) = ctrl_key_byte(c) {
            return alt_prefixed(mods, c0);
        }
    }

    let mut buf = [0u8; 4];
    let text = c.encode_utf8(&mut buf).as_bytes();
    let mut out = Vec::with_capacity(text.len() + 1);
    if mods.contains(Modifiers::ALT) {
        out.push(0x1b);
    }
    out.extend_from_slice(text);
    out
}

fn alt_prefixed(mods: Modifiers, byte: u8) -> Vec<u8> {
    if mods.contains(Modifiers::ALT) {
        vec![0x1b, byte]
    } else {
        vec![byte]
    }
}

/// Map a Ctrl+key combination to its C0 control byte (xterm rules).
fn ctrl_key_byte(c: char) -> Option<u8> {
    if !c.is_ascii() {
        return None;
    }
    let b = c as u8;
    match b {
        b'a'..=b'z' => Some(b - b'a' + 1),
        b'A'..=b'Z' => Some(b - b'A' + 1),
        b'[' | b'3' => Some(0x1b),
        b'\\' | b'4' => Some(0x1c),
        b']' | b'5' => Some(0x1d),
        b'^' | b'6' => Some(0x1e),
        b'_' | b'7' => Some(0x1f),
        b'`' | b'2' | b' ' | b'@' => Some(0x00),
        b'8' | b'?' => Some(0x7f),
        _ => None,
    }
}
