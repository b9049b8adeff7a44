use crate::coords::Vec2;
use crate::paint::Color;

/// Placement of a shape or stage item: translation followed by rotation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform2D {
    pub offset: Vec2,
    /// Rotation in degrees.
    pub rotation: f32,
}

impl Transform2D {
    #[inline]
    pub const fn identity() -> Self {
        Self { offset: Vec2::zero(), rotation: 0.0 }
    }

    #[inline]
    pub const fn translate(x: f32, y: f32) -> Self {
        Self { offset: Vec2::new(x, y), rotation: 0.0 }
    }

    #[inline]
    pub const fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    /// Composes `child` into this (parent) transform.
    ///
    /// The result maps the child's local space straight to the parent's parent space.
    pub fn then(self, child: Transform2D) -> Transform2D {
        Transform2D {
            offset: self.offset + child.offset.rotated(self.rotation.to_radians()),
            rotation: self.rotation + child.rotation,
        }
    }

    /// Maps a point from the outer space into this transform's local space.
    #[inline]
    pub fn to_local(self, p: Vec2) -> Vec2 {
        (p - self.offset).rotated(-self.rotation.to_radians())
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

/// 2D camera. Maps pixel coordinates to world coordinates:
/// `world = (pixel - resolution / 2) / zoom + offset`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera2D {
    pub offset: Vec2,
    pub zoom: f32,
}

impl Camera2D {
    #[inline]
    pub const fn new(offset: Vec2, zoom: f32) -> Self {
        Self { offset, zoom }
    }

    /// Zoom clamped away from zero; every pass divides by it.
    #[inline]
    pub fn effective_zoom(self) -> f32 {
        if self.zoom.is_finite() && self.zoom.abs() > 1e-4 { self.zoom } else { 1.0 }
    }

    #[inline]
    pub fn pixel_to_world(self, pixel: Vec2, resolution: Vec2) -> Vec2 {
        (pixel - resolution * 0.5) / self.effective_zoom() + self.offset
    }
}

impl Default for Camera2D {
    fn default() -> Self {
        Self { offset: Vec2::zero(), zoom: 1.0 }
    }
}

/// Background pattern filling the pre pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Solid { color: Color },
    /// Checkerboard in world space; `cell` is the edge length of one square.
    Checker { a: Color, b: Color, cell: f32 },
    /// Screen-space gradient from the top row to the bottom row.
    VerticalGradient { top: Color, bottom: Color },
}

/// 2D signed-distance primitive, centered at its local origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Shape2D {
    Circle { radius: f32 },
    Box { half_size: Vec2, rounding: f32 },
    Ring { radius: f32, thickness: f32 },
}

/// How a shape combines with the shapes pushed before it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Boolean {
    #[default]
    Union,
    Subtract,
    Intersect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeComponent {
    pub shape: Shape2D,
    pub transform: Transform2D,
    pub boolean: Boolean,
}

/// Fill material of a stage item's shapes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub color: Color,
}

impl Material {
    #[inline]
    pub const fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self { color: Color::white() }
    }
}

/// Band drawn along the inside edge of every shape during composition.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

/// Composition pass settings.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Composite {
    /// Antialiasing width in pixels.
    pub antialias: f32,
    pub border: Option<Border>,
}

impl Default for Composite {
    fn default() -> Self {
        Self { antialias: 1.0, border: None }
    }
}

/// Discriminant of [`ComponentBody`], used for stage queries.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComponentKind {
    Camera2D,
    Pattern,
    Shape,
    Render,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentBody {
    Camera2D(Camera2D),
    Pattern(Pattern),
    Shape(ShapeComponent),
    Render(Composite),
}

/// A named unit of behavior attached to a stage item.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeComponent {
    pub name: String,
    pub body: ComponentBody,
}

impl CodeComponent {
    pub fn new(name: impl Into<String>, body: ComponentBody) -> Self {
        Self { name: name.into(), body }
    }

    pub fn camera(name: impl Into<String>, camera: Camera2D) -> Self {
        Self::new(name, ComponentBody::Camera2D(camera))
    }

    pub fn pattern(name: impl Into<String>, pattern: Pattern) -> Self {
        Self::new(name, ComponentBody::Pattern(pattern))
    }

    /// Shape at the local origin, combined by union.
    pub fn shape(name: impl Into<String>, shape: Shape2D) -> Self {
        Self::placed_shape(name, shape, Transform2D::identity(), Boolean::Union)
    }

    pub fn placed_shape(
        name: impl Into<String>,
        shape: Shape2D,
        transform: Transform2D,
        boolean: Boolean,
    ) -> Self {
        Self::new(name, ComponentBody::Shape(ShapeComponent { shape, transform, boolean }))
    }

    pub fn render(name: impl Into<String>, composite: Composite) -> Self {
        Self::new(name, ComponentBody::Render(composite))
    }

    #[inline]
    pub fn kind(&self) -> ComponentKind {
        match self.body {
            ComponentBody::Camera2D(_) => ComponentKind::Camera2D,
            ComponentBody::Pattern(_) => ComponentKind::Pattern,
            ComponentBody::Shape(_) => ComponentKind::Shape,
            ComponentBody::Render(_) => ComponentKind::Render,
        }
    }
}
