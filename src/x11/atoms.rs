//! Interned atoms used by the backend.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, ConnectionExt};

use crate::wm::connection::Protocol;

#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_take_focus: Atom,
    pub wm_colormap_windows: Atom,
    pub wm_state: Atom,
    pub motif_wm_hints: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> { Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom) };

        Ok(Self {
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_take_focus: intern("WM_TAKE_FOCUS")?,
            wm_colormap_windows: intern("WM_COLORMAP_WINDOWS")?,
            wm_state: intern("WM_STATE")?,
            motif_wm_hints: intern("_MOTIF_WM_HINTS")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            utf8_string: intern("UTF8_STRING")?,
        })
    }

    /// WM_PROTOCOLS entry named by `atom`, if the core cares about it. A
    /// listed WM_STATE asks for the stored state to be restored.
    pub fn protocol(&self, atom: Atom) -> Option<Protocol> {
        match atom {
            a if a == self.wm_delete_window => Some(Protocol::Delete),
            a if a == self.wm_take_focus => Some(Protocol::TakeFocus),
            a if a == self.wm_state => Some(Protocol::WindowState),
            a if a == self.wm_colormap_windows => Some(Protocol::Colormap),
            _ => None,
        }
    }
}
