//! Scene-to-pass compilation.
//!
//! Stage items are flattened by an [`SdfStream`] into a [`ShapeProgram`];
//! pipelines wrap those (and the pre/render stage components) into
//! [`PassProgram`]s that a backend turns into runnable passes.

pub mod eval;
mod program;
mod stream;
pub mod wgsl;

pub use program::{PassProgram, PlacedShape, ShapeProgram, EMPTY_DISTANCE, EMPTY_SHAPE};
pub use stream::{SdfStream, ShapeRef};
