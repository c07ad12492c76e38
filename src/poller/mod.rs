//! Client-side status polling.
//!
//! A poller repeatedly reads the tracked status on a fixed interval and
//! republishes it to a [`Renderer`]. Driver mode additionally writes the
//! status on explicit user action.

pub mod display;
pub mod status_poller;

pub use display::*;
pub use status_poller::*;
