//! Coordinate types shared by the scene model, the SDF compiler and backends.
//!
//! Canonical scene space:
//! - world units, camera maps pixels to world
//! - origin at the viewport center for an un-offset camera
//! - +X right, +Y down (pixel rows grow downwards)

mod vec2;

pub use vec2::Vec2;
