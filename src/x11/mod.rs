//! X11 Backend
//!
//! x11rb implementations of the core's [`WindowingSystem`](crate::wm::WindowingSystem)
//! and [`DecorationRenderer`](crate::wm::DecorationRenderer), plus event
//! translation and socket readiness for the tokio main loop.

pub mod atoms;
pub mod connection;
pub mod event_stream;
pub mod render;
pub mod translate;

pub use atoms::Atoms;
pub use connection::XConnection;
pub use event_stream::X11EventStream;
pub use render::PixmapRenderer;
