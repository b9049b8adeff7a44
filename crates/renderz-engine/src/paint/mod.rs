//! Color model shared by scene components and backends.
//!
//! Colors are linear and premultiplied. Geometry types live in `coords`.

pub mod color;

pub use color::Color;
