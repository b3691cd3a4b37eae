//! Client Flags
//!
//! Capability bitflags and the small state enums carried by every managed
//! window.

use bitflags::bitflags;

bitflags! {
    /// Decorations present on a frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Decorations: u32 {
        const TITLEBAR = 1 << 0;
        const BORDER   = 1 << 1;
        const HANDLE   = 1 << 2;
        const ICONIFY  = 1 << 3;
        const MAXIMIZE = 1 << 4;
        const CLOSE    = 1 << 5;
        const MENU     = 1 << 6;
    }
}

impl Default for Decorations {
    /// Everything except the close button, which only appears once the
    /// client advertises WM_DELETE_WINDOW.
    fn default() -> Self {
        Self::TITLEBAR | Self::BORDER | Self::HANDLE | Self::ICONIFY | Self::MAXIMIZE | Self::MENU
    }
}

bitflags! {
    /// User operations permitted on a window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Functions: u32 {
        const RESIZE   = 1 << 0;
        const MOVE     = 1 << 1;
        const ICONIFY  = 1 << 2;
        const MAXIMIZE = 1 << 3;
        const CLOSE    = 1 << 4;
    }
}

impl Default for Functions {
    fn default() -> Self {
        Self::RESIZE | Self::MOVE | Self::ICONIFY | Self::MAXIMIZE
    }
}

bitflags! {
    /// Pointer/keyboard modifier state reported with button and motion events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u32 {
        const SHIFT   = 1 << 0;
        const CONTROL = 1 << 2;
        const MOD1    = 1 << 3;
        const BUTTON1 = 1 << 8;
        const BUTTON2 = 1 << 9;
        const BUTTON3 = 1 << 10;
    }
}

/// ICCCM input model of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    /// Takes focus when the manager assigns it.
    Passive,
    /// Takes focus itself and also accepts it from the manager.
    LocallyActive,
    /// Only ever takes focus itself (WM_TAKE_FOCUS).
    GloballyActive,
    /// Never receives keyboard input.
    NoInput,
}

impl FocusMode {
    /// Derive the input model from the WM_HINTS input field (absent means
    /// "accepts input") and whether WM_TAKE_FOCUS is advertised.
    pub fn derive(input: Option<bool>, take_focus: bool) -> Self {
        match (input.unwrap_or(true), take_focus) {
            (true, false) => Self::Passive,
            (true, true) => Self::LocallyActive,
            (false, true) => Self::GloballyActive,
            (false, false) => Self::NoInput,
        }
    }

    /// Whether the manager may hand input focus to the client directly.
    pub fn accepts_focus(self) -> bool {
        matches!(self, Self::Passive | Self::LocallyActive)
    }
}

/// Protocol-visible window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Normal,
    Iconic,
    Withdrawn,
}

impl LifecycleState {
    /// ICCCM WM_STATE / initial_state encoding.
    pub fn to_icccm(self) -> u32 {
        match self {
            Self::Withdrawn => 0,
            Self::Normal => 1,
            Self::Iconic => 3,
        }
    }

    /// Decode an ICCCM state value. The obsolete Zoom (2) and Inactive (4)
    /// states collapse to Normal.
    pub fn from_icccm(value: u32) -> Self {
        match value {
            0 => Self::Withdrawn,
            3 => Self::Iconic,
            _ => Self::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capabilities_lack_close() {
        assert!(!Decorations::default().contains(Decorations::CLOSE));
        assert!(!Functions::default().contains(Functions::CLOSE));
        assert!(Functions::default().contains(Functions::MOVE | Functions::RESIZE));
    }

    #[test]
    fn test_focus_mode_derivation() {
        assert_eq!(FocusMode::derive(None, false), FocusMode::Passive);
        assert_eq!(FocusMode::derive(Some(true), true), FocusMode::LocallyActive);
        assert_eq!(FocusMode::derive(Some(false), true), FocusMode::GloballyActive);
        assert_eq!(FocusMode::derive(Some(false), false), FocusMode::NoInput);
        assert!(!FocusMode::NoInput.accepts_focus());
    }

    #[test]
    fn test_icccm_state_encoding() {
        for state in [LifecycleState::Normal, LifecycleState::Iconic, LifecycleState::Withdrawn] {
            assert_eq!(LifecycleState::from_icccm(state.to_icccm()), state);
        }
        assert_eq!(LifecycleState::from_icccm(2), LifecycleState::Normal);
    }
}
