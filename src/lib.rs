//! boxwm
//!
//! A Blackbox-style reparenting window manager core for X11. The [`wm`]
//! module holds the backend-independent window logic; [`x11`] drives it
//! against a real server.

pub mod config;
pub mod shared;
pub mod wm;
pub mod x11;
