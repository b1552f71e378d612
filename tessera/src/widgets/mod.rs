//! Widgets built into the binary rather than supplied by a plugin.

pub mod terminal_view;

pub use terminal_view::TerminalView;
