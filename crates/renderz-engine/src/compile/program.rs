use crate::error::{RenderError, RenderResult};
use crate::scene::{Boolean, Camera2D, Composite, Material, Pattern, Shape2D, Transform2D};

/// Distance written where no shape contributes.
pub const EMPTY_DISTANCE: f32 = 10000.0;

/// Shape-pass value for "nothing here": the sentinel in all four channels.
pub const EMPTY_SHAPE: [f32; 4] = [EMPTY_DISTANCE; 4];

/// A shape with its fully composed world-to-local transform.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedShape {
    /// Hit-test id, unique within one build.
    pub id: u32,
    pub shape: Shape2D,
    pub transform: Transform2D,
    pub boolean: Boolean,
    /// Index into [`ShapeProgram::materials`].
    pub material: u32,
}

/// Flattened output of an SDF stream.
///
/// Shapes are evaluated in order and combined with their boolean operator. The
/// shape pass writes `(distance_px, -1, material, id)` per pixel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeProgram {
    pub shapes: Vec<PlacedShape>,
    pub materials: Vec<Material>,
}

impl ShapeProgram {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Backend-agnostic description of one pipeline pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassProgram {
    /// Background fill; no inputs.
    Pattern { camera: Camera2D, pattern: Pattern },
    /// Distance/material encoding of all shapes; no inputs.
    Shapes { camera: Camera2D, program: ShapeProgram },
    /// Inputs: `[shape, background]`.
    Composite { composite: Composite, materials: Vec<Material> },
}

impl PassProgram {
    /// Number of input textures `render` expects for this program.
    #[inline]
    pub fn input_count(&self) -> usize {
        match self {
            PassProgram::Pattern { .. } | PassProgram::Shapes { .. } => 0,
            PassProgram::Composite { .. } => 2,
        }
    }

    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            PassProgram::Pattern { .. } => "pattern",
            PassProgram::Shapes { .. } => "shapes",
            PassProgram::Composite { .. } => "composite",
        }
    }

    /// Rejects programs whose parameters no backend can evaluate: non-finite
    /// values, negative sizes, a zero checker cell or antialias width.
    pub fn validate(&self) -> RenderResult<()> {
        let reason = match self {
            PassProgram::Pattern { camera, pattern } => check_camera(camera).or_else(|| check_pattern(pattern)),
            PassProgram::Shapes { camera, program } => check_camera(camera)
                .or_else(|| program.shapes.iter().find_map(check_shape))
                .or_else(|| check_materials(&program.materials)),
            PassProgram::Composite { composite, materials } => {
                check_composite(composite).or_else(|| check_materials(materials))
            }
        };
        match reason {
            Some(reason) => Err(RenderError::Compile { pass: self.label().to_string(), reason }),
            None => Ok(()),
        }
    }
}

fn check_camera(camera: &Camera2D) -> Option<String> {
    (!camera.offset.is_finite()).then(|| "camera offset is not finite".to_string())
}

fn check_pattern(pattern: &Pattern) -> Option<String> {
    let colors_finite = match pattern {
        Pattern::Solid { color } => color.is_finite(),
        Pattern::Checker { a, b, cell } => {
            if !(cell.is_finite() && *cell > 0.0) {
                return Some(format!("checker cell must be positive, got {cell}"));
            }
            a.is_finite() && b.is_finite()
        }
        Pattern::VerticalGradient { top, bottom } => top.is_finite() && bottom.is_finite(),
    };
    (!colors_finite).then(|| "pattern color is not finite".to_string())
}

fn check_shape(placed: &PlacedShape) -> Option<String> {
    let size_ok = |v: f32| v.is_finite() && v >= 0.0;
    let params_ok = match placed.shape {
        Shape2D::Circle { radius } => size_ok(radius),
        Shape2D::Box { half_size, rounding } => size_ok(half_size.x) && size_ok(half_size.y) && size_ok(rounding),
        Shape2D::Ring { radius, thickness } => size_ok(radius) && size_ok(thickness),
    };
    let transform_ok = placed.transform.offset.is_finite() && placed.transform.rotation.is_finite();

    if !params_ok {
        Some(format!("shape #{} has invalid parameters {:?}", placed.id, placed.shape))
    } else if !transform_ok {
        Some(format!("shape #{} has a non-finite transform", placed.id))
    } else {
        None
    }
}

fn check_materials(materials: &[Material]) -> Option<String> {
    materials
        .iter()
        .position(|m| !m.color.is_finite())
        .map(|i| format!("material {i} color is not finite"))
}

fn check_composite(composite: &Composite) -> Option<String> {
    if !(composite.antialias.is_finite() && composite.antialias > 0.0) {
        return Some(format!("antialias width must be positive, got {}", composite.antialias));
    }
    match composite.border {
        Some(border) if !(border.width.is_finite() && border.width >= 0.0 && border.color.is_finite()) => {
            Some(format!("invalid border {border:?}"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::paint::Color;
    use crate::scene::Border;

    fn shapes(shape: Shape2D) -> PassProgram {
        PassProgram::Shapes {
            camera: Camera2D::default(),
            program: ShapeProgram {
                shapes: vec![PlacedShape {
                    id: 4,
                    shape,
                    transform: Transform2D::identity(),
                    boolean: Boolean::Union,
                    material: 0,
                }],
                materials: vec![Material::default()],
            },
        }
    }

    #[test]
    fn well_formed_programs_validate() {
        assert!(shapes(Shape2D::Circle { radius: 3.0 }).validate().is_ok());
        assert!(shapes(Shape2D::Box { half_size: Vec2::new(2.0, 1.0), rounding: 0.0 }).validate().is_ok());
        let checker = PassProgram::Pattern {
            camera: Camera2D::default(),
            pattern: Pattern::Checker { a: Color::white(), b: Color::black(), cell: 8.0 },
        };
        assert!(checker.validate().is_ok());
    }

    #[test]
    fn invalid_shape_parameters_are_rejected() {
        let err = shapes(Shape2D::Circle { radius: f32::NAN }).validate().unwrap_err();
        assert!(matches!(err, RenderError::Compile { ref pass, .. } if pass == "shapes"));
        assert!(shapes(Shape2D::Ring { radius: 2.0, thickness: -1.0 }).validate().is_err());
    }

    #[test]
    fn zero_checker_cell_is_rejected() {
        let program = PassProgram::Pattern {
            camera: Camera2D::default(),
            pattern: Pattern::Checker { a: Color::white(), b: Color::black(), cell: 0.0 },
        };
        assert!(program.validate().is_err());
    }

    #[test]
    fn composite_needs_positive_antialias() {
        let composite = |antialias, border| PassProgram::Composite {
            composite: Composite { antialias, border },
            materials: vec![Material::default()],
        };
        assert!(composite(1.0, None).validate().is_ok());
        assert!(composite(0.0, None).validate().is_err());
        let bad_border = Some(Border { width: f32::INFINITY, color: Color::black() });
        assert!(composite(1.0, bad_border).validate().is_err());
    }
}
