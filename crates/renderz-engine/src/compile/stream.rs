use std::collections::BTreeMap;

use crate::scene::{
    Camera2D, CodeComponent, ComponentBody, Material, StageItem, Transform2D,
};

use super::program::{PlacedShape, ShapeProgram};

/// Where a shape id came from: the stage-item path and the component name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeRef {
    pub path: Vec<String>,
    pub component: String,
}

#[derive(Debug, Clone)]
struct Level {
    name: String,
    transform: Transform2D,
    material: u32,
}

/// Accumulates shapes from a stage-item hierarchy into a [`ShapeProgram`].
///
/// Usage mirrors the hierarchy walk:
///
/// ```text
/// stream.open_stream(camera);
/// stream.push_stage_item(item);
/// for shape in shapes { stream.push_component(shape); }
/// // recurse into children...
/// stream.pull_stage_item();
/// let program = stream.close_stream();
/// ```
///
/// Shape ids keep counting across streams until [`SdfStream::reset`].
#[derive(Debug, Default)]
pub struct SdfStream {
    open: bool,
    camera: Camera2D,
    hierarchy: Vec<Level>,
    shapes: Vec<PlacedShape>,
    materials: Vec<Material>,
    ids: BTreeMap<u32, ShapeRef>,
    id_counter: u32,
}

impl SdfStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all state, including the id counter and the id map.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[inline]
    pub fn camera(&self) -> Camera2D {
        self.camera
    }

    /// Starts a new program. Material 0 is the default material.
    pub fn open_stream(&mut self, camera: Camera2D) {
        debug_assert!(!self.open, "open_stream called on an open stream");
        self.open = true;
        self.camera = camera;
        self.hierarchy.clear();
        self.shapes.clear();
        self.materials.clear();
        self.materials.push(Material::default());
    }

    /// Enters `item`: its transform composes onto the parent's and its material
    /// (if any) applies to every shape pushed until the matching pull.
    pub fn push_stage_item(&mut self, item: &StageItem) {
        let (parent_transform, parent_material) = self
            .hierarchy
            .last()
            .map_or((Transform2D::identity(), 0), |l| (l.transform, l.material));

        let material = match item.material {
            Some(m) => self.intern_material(m),
            None => parent_material,
        };

        self.hierarchy.push(Level {
            name: item.name.clone(),
            transform: parent_transform.then(item.transform),
            material,
        });
    }

    /// Leaves the most recently pushed stage item.
    pub fn pull_stage_item(&mut self) {
        debug_assert!(!self.hierarchy.is_empty(), "pull_stage_item without push_stage_item");
        self.hierarchy.pop();
    }

    /// Appends a shape component and returns its id.
    ///
    /// Components that are not shapes are skipped and yield `None`.
    pub fn push_component(&mut self, component: &CodeComponent) -> Option<u32> {
        let ComponentBody::Shape(shape) = &component.body else {
            log::warn!("skipping non-shape component `{}` in shape list", component.name);
            return None;
        };

        let (transform, material) = self
            .hierarchy
            .last()
            .map_or((Transform2D::identity(), 0), |l| (l.transform, l.material));

        let id = self.id_counter;
        self.id_counter += 1;

        self.shapes.push(PlacedShape {
            id,
            shape: shape.shape,
            transform: transform.then(shape.transform),
            boolean: shape.boolean,
            material,
        });
        self.ids.insert(
            id,
            ShapeRef {
                path: self.hierarchy.iter().map(|l| l.name.clone()).collect(),
                component: component.name.clone(),
            },
        );

        Some(id)
    }

    /// Finishes the current program.
    pub fn close_stream(&mut self) -> ShapeProgram {
        debug_assert!(self.open, "close_stream without open_stream");
        debug_assert!(self.hierarchy.is_empty(), "unbalanced push/pull_stage_item");
        self.open = false;
        self.hierarchy.clear();
        ShapeProgram {
            shapes: std::mem::take(&mut self.shapes),
            materials: std::mem::take(&mut self.materials),
        }
    }

    /// Ids assigned since the last reset.
    #[inline]
    pub fn ids(&self) -> &BTreeMap<u32, ShapeRef> {
        &self.ids
    }

    pub fn take_ids(&mut self) -> BTreeMap<u32, ShapeRef> {
        std::mem::take(&mut self.ids)
    }

    fn intern_material(&mut self, material: Material) -> u32 {
        if let Some(i) = self.materials.iter().position(|m| *m == material) {
            return i as u32;
        }
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }
}
