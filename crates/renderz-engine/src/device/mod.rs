//! wgpu device ownership.
//!
//! [`Gpu`] binds a device to a window surface for the viewer; [`HeadlessGpu`]
//! is a bare device/queue for offscreen pipeline rendering.

mod gpu;
mod headless;
mod init;
mod surface;

pub use gpu::{Gpu, GpuFrame};
pub use surface::SurfaceErrorAction;
pub use headless::HeadlessGpu;
pub use init::{GpuInit, HeadlessInit};
