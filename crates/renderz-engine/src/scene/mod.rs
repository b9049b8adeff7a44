//! Scene graph consumed by pipelines.
//!
//! Responsibilities:
//! - hold the three stages a 2D pipeline walks (pre, shape, render)
//! - model stage items as a tree with named components and component lists
//! - keep component payloads renderer-agnostic; the compiler turns them into
//!   pass programs

mod component;
mod stage;

pub use component::{
    Border, Boolean, Camera2D, CodeComponent, ComponentBody, ComponentKind, Composite, Material,
    Pattern, Shape2D, ShapeComponent, Transform2D,
};
pub use stage::{Scene, Stage, StageItem, StageKind, SHAPES_LIST};
