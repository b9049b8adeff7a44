use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::FrameCtx;

/// Returned by app callbacks to keep the loop running or stop it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Callbacks the [`Runtime`](crate::window::Runtime) drives.
pub trait App {
    /// Raw window events, before the runtime handles resize/close.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called on every redraw with the window's device and surface.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called once before the window and its device are dropped. GPU resources
    /// created from the device should be released here.
    fn on_exit(&mut self) {}
}
