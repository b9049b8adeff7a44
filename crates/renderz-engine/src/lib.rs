//! Render-Z engine crate.
//!
//! Texture caching, scene-to-pass compilation and the staged 2D pipeline,
//! plus the platform + GPU runtime the viewer runs on.

pub mod backend;
pub mod compile;
pub mod coords;
pub mod core;
pub mod device;
pub mod error;
pub mod logging;
pub mod paint;
pub mod pipeline;
pub mod scene;
pub mod texture;
pub mod time;
pub mod window;

pub use error::{RenderError, RenderResult};
