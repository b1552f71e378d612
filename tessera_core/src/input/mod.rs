//! Host input events and their encoding for the PTY.
//!
//! The window layer converts platform events into these types; the frame
//! coordinator routes them to a widget or, by default, to the terminal,
//! which encodes keys with [`encode_key`].

mod encode;

use bitflags::bitflags;

pub use encode::{encode_char, encode_key};

bitflags! {
    /// Keyboard modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT   = 0b0001;
        const ALT     = 0b0010;
        const CONTROL = 0b0100;
        const SUPER   = 0b1000;
    }
}

impl Modifiers {
    /// xterm modifier parameter (1 + bitmask), 0 when no modifier is held.
    pub fn xterm_param(self) -> u8 {
        if self.is_empty() { 0 } else { self.bits() + 1 }
    }
}

/// Keys without a printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Backspace,
    Tab,
    Escape,
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    /// F1 through F12.
    F(u8),
}

/// A key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Named(NamedKey),
}

/// A key press with modifiers, as routed by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub mods: Modifiers,
}

impl KeyInput {
    pub fn new(key: Key, mods: Modifiers) -> Self {
        Self { key, mods }
    }

    pub fn char(c: char) -> Self {
        Self::new(Key::Char(c), Modifiers::empty())
    }

    pub fn named(key: NamedKey) -> Self {
        Self::new(Key::Named(key), Modifiers::empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseKind {
    Move,
    Press(MouseButton),
    Release(MouseButton),
    /// Scroll delta in lines; positive is up.
    Scroll { dx: f32, dy: f32 },
}

/// A mouse event in surface pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseInput {
    pub kind: MouseKind,
    pub x: f32,
    pub y: f32,
    pub mods: Modifiers,
}

impl MouseInput {
    pub fn new(kind: MouseKind, x: f32, y: f32) -> Self {
        Self {
            kind,
            x,
            y,
            mods: Modifiers::empty(),
        }
    }
}
