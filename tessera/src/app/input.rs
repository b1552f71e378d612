//! winit input to tessera input.

use winit::event::{ElementState, MouseButton as WinitButton, MouseScrollDelta};
use winit::keyboard::{Key as WinitKey, ModifiersState, NamedKey as WinitNamed};

use tessera_core::{Key, KeyInput, Modifiers, MouseButton, MouseKind, NamedKey};

pub(crate) fn modifiers(state: ModifiersState) -> Modifiers {
    let mut mods = Modifiers::empty();
    mods.set(Modifiers::SHIFT, state.shift_key());
    mods.set(Modifiers::ALT, state.alt_key());
    mods.set(Modifiers::CONTROL, state.control_key());
    mods.set(Modifiers::SUPER, state.super_key());
    mods
}

fn named(key: WinitNamed) -> Option<NamedKey> {
    Some(match key {
        WinitNamed::Enter => NamedKey::Enter,
        WinitNamed::Backspace => NamedKey::Backspace,
        WinitNamed::Tab => NamedKey::Tab,
        WinitNamed::Escape => NamedKey::Escape,
        WinitNamed::Space => NamedKey::Space,
        WinitNamed::ArrowUp => NamedKey::ArrowUp,
        WinitNamed::ArrowDown => NamedKey::ArrowDown,
        WinitNamed::ArrowLeft => NamedKey::ArrowLeft,
        WinitNamed::ArrowRight => NamedKey::ArrowRight,
        WinitNamed::Home => NamedKey::Home,
        WinitNamed::End => NamedKey::End,
        WinitNamed::Insert => NamedKey::Insert,
        WinitNamed::Delete => NamedKey::Delete,
        WinitNamed::PageUp => NamedKey::PageUp,
        WinitNamed::PageDown => NamedKey::PageDown,
        WinitNamed::F1 => NamedKey::F(1),
        WinitNamed::F2 => NamedKey::F(2),
        WinitNamed::F3 => NamedKey::F(3),
        WinitNamed::F4 => NamedKey::F(4),
        WinitNamed::F5 => NamedKey::F(5),
        WinitNamed::F6 => NamedKey::F(6),
        WinitNamed::F7 => NamedKey::F(7),
        WinitNamed::F8 => NamedKey::F(8),
        WinitNamed::F9 => NamedKey::F(9),
        WinitNamed::F10 => NamedKey::F(10),
        WinitNamed::F11 => NamedKey::F(11),
        WinitNamed::F12 => NamedKey::F(12),
        _ => return None,
    })
}

/// Key presses as tessera key inputs. A multi-character text key yields
/// one input per character. Releases and unmapped keys yield nothing.
pub(crate) fn key_inputs(key: &WinitKey, state: ElementState, mods: Modifiers) -> Vec<KeyInput> {
    if state != ElementState::Pressed {
        return Vec::new();
    }
    match key {
        WinitKey::Named(k) => named(*k)
            .map(|k| KeyInput::new(Key::Named(k), mods))
            .into_iter()
            .collect(),
        WinitKey::Character(s) => s
            .chars()
            .map(|c| KeyInput::new(Key::Char(c), mods))
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn mouse_button(button: WinitButton) -> Option<MouseButton> {
    match button {
        WinitButton::Left => Some(MouseButton::Left),
        WinitButton::Middle => Some(MouseButton::Middle),
        WinitButton::Right => Some(MouseButton::Right),
        _ => None,
    }
}

pub(crate) fn button_kind(state: ElementState, button: MouseButton) -> MouseKind {
    match state {
        ElementState::Pressed => MouseKind::Press(button),
        ElementState::Released => MouseKind::Release(button),
    }
}

/// Wheel delta in lines; pixel deltas are divided by the cell height.
pub(crate) fn scroll_kind(delta: MouseScrollDelta, cell_height: f32) -> MouseKind {
    let (dx, dy) = match delta {
        MouseScrollDelta::LineDelta(x, y) => (x, y),
        MouseScrollDelta::PixelDelta(p) => {
            let h = f64::from(cell_height.max(1.0));
            ((p.x / h) as f32, (p.y / h) as f32)
        }
    };
    MouseKind::Scroll { dx, dy }
}
