mod demo_scene;
mod viewer;

use anyhow::Result;

use renderz_engine::device::GpuInit;
use renderz_engine::logging::{init_logging, LoggingConfig};
use renderz_engine::window::{RedrawMode, Runtime, RuntimeConfig};

use crate::demo_scene::demo_scene;
use crate::viewer::{Viewer, ViewerConfig};

fn main() -> Result<()> {
    let flag = |name: &str| std::env::args().skip(1).any(|a| a == name);

    init_logging(if flag("--verbose") { LoggingConfig::verbose() } else { LoggingConfig::default() });

    let config = ViewerConfig {
        minimal_preview: flag("--minimal"),
        ..ViewerConfig::default()
    };
    let redraw = if flag("--on-demand") { RedrawMode::OnDemand } else { RedrawMode::Continuous };

    log::info!("keys: T transparent, D depth map, M minimal preview, R rebuild, Esc quit");

    Runtime::run(
        RuntimeConfig {
            title: "Render-Z".to_string(),
            redraw,
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        Viewer::new(config, demo_scene),
    )
}
