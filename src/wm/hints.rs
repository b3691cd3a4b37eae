//! Hints Module
//!
//! Window hints parsing and application (WM_NORMAL_HINTS, WM_HINTS,
//! _MOTIF_WM_HINTS) plus the capability negotiation that turns them into
//! decoration and function flags.

use tracing::debug;

use crate::shared::Size;
use crate::wm::client_flags::{Decorations, Functions, LifecycleState};

// WM_NORMAL_HINTS flag bits.
pub(crate) const US_POSITION: u32 = 1 << 0;
pub(crate) const P_POSITION: u32 = 1 << 2;
pub(crate) const P_MIN_SIZE: u32 = 1 << 4;
pub(crate) const P_MAX_SIZE: u32 = 1 << 5;
pub(crate) const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
pub(crate) const P_BASE_SIZE: u32 = 1 << 8;
const P_WIN_GRAVITY: u32 = 1 << 9;

// WM_HINTS flag bits.
pub(crate) const INPUT_HINT: u32 = 1 << 0;
pub(crate) const STATE_HINT: u32 = 1 << 1;
pub(crate) const WINDOW_GROUP_HINT: u32 = 1 << 6;
pub(crate) const URGENCY_HINT: u32 = 1 << 8;

// _MOTIF_WM_HINTS flag bits.
const MWM_HINTS_FUNCTIONS: u32 = 1 << 0;
pub(crate) const MWM_HINTS_DECORATIONS: u32 = 1 << 1;

const MWM_FUNC_ALL: u32 = 1 << 0;
const MWM_FUNC_RESIZE: u32 = 1 << 1;
const MWM_FUNC_MOVE: u32 = 1 << 2;
const MWM_FUNC_ICONIFY: u32 = 1 << 3;
const MWM_FUNC_MAXIMIZE: u32 = 1 << 4;
const MWM_FUNC_CLOSE: u32 = 1 << 5;

const MWM_DECOR_ALL: u32 = 1 << 0;
const MWM_DECOR_BORDER: u32 = 1 << 1;
const MWM_DECOR_HANDLE: u32 = 1 << 2;
pub(crate) const MWM_DECOR_TITLE: u32 = 1 << 3;
const MWM_DECOR_MENU: u32 = 1 << 4;
const MWM_DECOR_ICONIFY: u32 = 1 << 5;
const MWM_DECOR_MAXIMIZE: u32 = 1 << 6;

/// Number of 32-bit words in a complete WM_NORMAL_HINTS property.
pub const SIZE_HINTS_WORDS: u32 = 18;
/// Number of 32-bit words in a complete WM_HINTS property.
pub const WM_HINTS_WORDS: u32 = 9;
/// Number of 32-bit words read from _MOTIF_WM_HINTS.
pub const MWM_HINTS_WORDS: u32 = 5;

/// X11 window gravity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl Gravity {
    /// Decode the protocol value. Forget (0) and anything unknown map to
    /// NorthWest.
    pub fn from_protocol(value: u32) -> Self {
        match value {
            2 => Self::North,
            3 => Self::NorthEast,
            4 => Self::West,
            5 => Self::Center,
            6 => Self::East,
            7 => Self::SouthWest,
            8 => Self::South,
            9 => Self::SouthEast,
            10 => Self::Static,
            _ => Self::NorthWest,
        }
    }
}

/// Resolved size constraints, always populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHints {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub width_inc: u32,
    pub height_inc: u32,
    pub base_width: u32,
    pub base_height: u32,
    pub min_aspect: (u32, u32),
    pub max_aspect: (u32, u32),
    pub gravity: Gravity,
    /// The client asked for a specific position (user or program).
    pub positioned: bool,
    /// Both a minimum and a maximum size were supplied.
    pub declared_min_max: bool,
}

impl SizeHints {
    /// Defaults used when the client supplies nothing.
    pub fn defaults(screen: Size) -> Self {
        Self {
            min_width: 1,
            min_height: 1,
            max_width: screen.width,
            max_height: screen.height,
            width_inc: 1,
            height_inc: 1,
            base_width: 0,
            base_height: 0,
            min_aspect: (1, 1),
            max_aspect: (1, 1),
            gravity: Gravity::NorthWest,
            positioned: false,
            declared_min_max: false,
        }
    }

    /// Parse WM_NORMAL_HINTS words. A missing or short property yields the
    /// defaults.
    pub fn from_words(words: Option<&[u32]>, screen: Size) -> Self {
        let mut hints = Self::defaults(screen);
        let words = match words {
            Some(w) if w.len() >= SIZE_HINTS_WORDS as usize => w,
            _ => return hints,
        };
        let flags = words[0];

        if flags & P_MIN_SIZE != 0 {
            hints.min_width = words[5].max(1);
            hints.min_height = words[6].max(1);
        }
        if flags & P_MAX_SIZE != 0 {
            hints.max_width = words[7];
            hints.max_height = words[8];
        }
        if flags & P_RESIZE_INC != 0 {
            hints.width_inc = words[9].max(1);
            hints.height_inc = words[10].max(1);
        }
        if flags & P_ASPECT != 0 {
            hints.min_aspect = (words[11], words[12]);
            hints.max_aspect = (words[13], words[14]);
        }
        if flags & P_BASE_SIZE != 0 {
            hints.base_width = words[15];
            hints.base_height = words[16];
        }
        if flags & P_WIN_GRAVITY != 0 {
            hints.gravity = Gravity::from_protocol(words[17]);
        }
        hints.positioned = flags & (US_POSITION | P_POSITION) != 0;
        hints.declared_min_max = flags & P_MIN_SIZE != 0 && flags & P_MAX_SIZE != 0;

        hints.max_width = hints.max_width.max(hints.min_width);
        hints.max_height = hints.max_height.max(hints.min_height);
        hints
    }

    /// Whether the client declared identical min and max sizes. A lone
    /// minimum never makes a window fixed, even when it fills the screen.
    pub fn is_fixed(&self) -> bool {
        self.declared_min_max && self.min_width == self.max_width && self.min_height == self.max_height
    }

    /// Clamp a candidate client size to the hints and snap it down to the
    /// increment grid anchored at the base size.
    pub fn constrain(&self, width: u32, height: u32) -> Constrained {
        let (w, cols) = snap_axis(width, self.min_width, self.max_width, self.base_width, self.width_inc);
        let (h, rows) = snap_axis(height, self.min_height, self.max_height, self.base_height, self.height_inc);
        Constrained {
            size: Size::new(w, h),
            units: (cols, rows),
        }
    }
}

/// Output of [`SizeHints::constrain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constrained {
    /// Client size that satisfies the hints.
    pub size: Size,
    /// Size in increments above the base, for the resize label.
    pub units: (u32, u32),
}

fn snap_axis(value: u32, min: u32, max: u32, base: u32, inc: u32) -> (u32, u32) {
    let inc = inc.max(1);
    let upper = max.max(min);
    let clamped = value.clamp(min, upper);
    let mut steps = clamped.saturating_sub(base) / inc;
    let mut snapped = base + steps * inc;

    // Snapping down may fall under the minimum; take the first grid point
    // at or above it, provided that still fits.
    if snapped < min {
        steps = (min - base.min(min)).div_ceil(inc);
        snapped = base + steps * inc;
        if snapped > upper {
            return (min, min.saturating_sub(base) / inc);
        }
    }
    // A base above the maximum leaves no grid point in range.
    if snapped > upper {
        return (upper, 0);
    }
    (snapped, steps)
}

/// Parsed WM_HINTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmHints {
    pub input: Option<bool>,
    pub initial_state: Option<LifecycleState>,
    pub group: Option<u32>,
    pub urgent: bool,
}

impl WmHints {
    /// Parse WM_HINTS words; short or missing replies are absent.
    pub fn from_words(words: Option<&[u32]>) -> Option<Self> {
        let words = words.filter(|w| w.len() >= WM_HINTS_WORDS as usize)?;
        let flags = words[0];
        Some(Self {
            input: (flags & INPUT_HINT != 0).then_some(words[1] != 0),
            initial_state: (flags & STATE_HINT != 0).then(|| LifecycleState::from_icccm(words[2])),
            group: (flags & WINDOW_GROUP_HINT != 0 && words[8] != 0).then_some(words[8]),
            urgent: flags & URGENCY_HINT != 0,
        })
    }
}

/// Parsed _MOTIF_WM_HINTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MwmHints {
    pub functions: Option<Functions>,
    pub decorations: Option<Decorations>,
}

impl MwmHints {
    pub fn from_words(words: Option<&[u32]>) -> Option<Self> {
        let words = words.filter(|w| w.len() >= 3)?;
        let flags = words[0];

        let functions = (flags & MWM_HINTS_FUNCTIONS != 0).then(|| {
            let f = words[1];
            if f & MWM_FUNC_ALL != 0 {
                return Functions::all();
            }
            let mut out = Functions::empty();
            out.set(Functions::RESIZE, f & MWM_FUNC_RESIZE != 0);
            out.set(Functions::MOVE, f & MWM_FUNC_MOVE != 0);
            out.set(Functions::ICONIFY, f & MWM_FUNC_ICONIFY != 0);
            out.set(Functions::MAXIMIZE, f & MWM_FUNC_MAXIMIZE != 0);
            out.set(Functions::CLOSE, f & MWM_FUNC_CLOSE != 0);
            out
        });

        let decorations = (flags & MWM_HINTS_DECORATIONS != 0).then(|| {
            let d = words[2];
            if d & MWM_DECOR_ALL != 0 {
                return Decorations::all();
            }
            let mut out = Decorations::empty();
            out.set(Decorations::BORDER, d & MWM_DECOR_BORDER != 0);
            out.set(Decorations::HANDLE, d & MWM_DECOR_HANDLE != 0);
            out.set(Decorations::TITLEBAR, d & MWM_DECOR_TITLE != 0);
            out.set(Decorations::MENU, d & MWM_DECOR_MENU != 0);
            out.set(Decorations::ICONIFY, d & MWM_DECOR_ICONIFY != 0);
            out.set(Decorations::MAXIMIZE, d & MWM_DECOR_MAXIMIZE != 0);
            out
        });

        Some(Self { functions, decorations })
    }
}

/// Inputs to capability negotiation.
#[derive(Debug, Clone, Copy)]
pub struct Negotiation<'a> {
    pub transient: bool,
    pub size_hints: &'a SizeHints,
    pub mwm: Option<MwmHints>,
    pub close_protocol: bool,
}

/// Derive decoration and function flags from scratch. Always starts from
/// the defaults, so re-running with the same inputs gives the same result.
pub fn negotiate(input: Negotiation<'_>) -> (Decorations, Functions) {
    let mut decorations = Decorations::default();
    let mut functions = Functions::default();

    if let Some(mwm) = input.mwm {
        if let Some(d) = mwm.decorations {
            decorations &= d;
        }
        if let Some(f) = mwm.functions {
            functions &= f;
        }
    }

    // The delete protocol brings the close button back whatever the
    // Motif hints say.
    if input.close_protocol {
        decorations |= Decorations::CLOSE;
        functions |= Functions::CLOSE;
    }

    if input.transient {
        decorations -= Decorations::BORDER | Decorations::HANDLE | Decorations::MAXIMIZE;
        functions -= Functions::RESIZE;
    } else if input.size_hints.is_fixed() {
        decorations -= Decorations::MAXIMIZE | Decorations::HANDLE;
        functions -= Functions::RESIZE | Functions::MAXIMIZE;
    }

    debug!(
        "Negotiated decorations={:?} functions={:?} (transient={})",
        decorations, functions, input.transient
    );
    (decorations, functions)
}
