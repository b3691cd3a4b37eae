//! Types shared between the window management core and the X11 backend.

pub mod geometry;

pub use geometry::{Geometry, Size};
