//! Window event loop.
//!
//! [`Runtime`] owns the winit `EventLoop`, one window and the [`Gpu`](crate::device::Gpu)
//! bound to it, and forwards events and redraws to a [`core::App`](crate::core::App).

mod runtime;

pub use runtime::{RedrawMode, Runtime, RuntimeConfig, RuntimeCtx};
