use std::collections::BTreeMap;

use super::{CodeComponent, ComponentKind, Material, Transform2D};

/// Name of the component list holding an item's 2D shapes.
pub const SHAPES_LIST: &str = "shapes";

/// Stage identifier. A 2D scene always has exactly these three stages.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    /// Background pattern and camera.
    Pre,
    /// Signed-distance shapes.
    Shape,
    /// Final color composition.
    Render,
}

/// A node in a stage hierarchy.
///
/// Items carry a default component (looked up by `default_name`), any number of
/// named component lists, and nested children. Transforms and materials apply
/// to the item's own shapes and are inherited by its children.
#[derive(Debug, Clone, PartialEq)]
pub struct StageItem {
    pub name: String,
    pub default_name: String,
    pub components: BTreeMap<String, CodeComponent>,
    pub component_lists: BTreeMap<String, Vec<CodeComponent>>,
    pub children: Vec<StageItem>,
    pub transform: Transform2D,
    pub material: Option<Material>,
}

impl StageItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_name: "main".to_string(),
            components: BTreeMap::new(),
            component_lists: BTreeMap::new(),
            children: Vec::new(),
            transform: Transform2D::identity(),
            material: None,
        }
    }

    /// Sets the component stored under `default_name`.
    pub fn with_default_component(mut self, component: CodeComponent) -> Self {
        self.components.insert(self.default_name.clone(), component);
        self
    }

    pub fn with_component_list(mut self, name: impl Into<String>, list: Vec<CodeComponent>) -> Self {
        self.component_lists.insert(name.into(), list);
        self
    }

    /// Shorthand for `with_component_list(SHAPES_LIST, shapes)`.
    pub fn with_shapes(self, shapes: Vec<CodeComponent>) -> Self {
        self.with_component_list(SHAPES_LIST, shapes)
    }

    pub fn with_child(mut self, child: StageItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_transform(mut self, transform: Transform2D) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    #[inline]
    pub fn default_component(&self) -> Option<&CodeComponent> {
        self.components.get(&self.default_name)
    }

    #[inline]
    pub fn component_list(&self, name: &str) -> Option<&[CodeComponent]> {
        self.component_lists.get(name).map(Vec::as_slice)
    }
}

/// An ordered list of top-level stage items.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub kind: StageKind,
    pub children: Vec<StageItem>,
}

impl Stage {
    pub fn new(kind: StageKind) -> Self {
        Self { kind, children: Vec::new() }
    }

    #[inline]
    pub fn children(&self) -> &[StageItem] {
        &self.children
    }

    pub fn push(&mut self, item: StageItem) {
        self.children.push(item);
    }

    /// Returns the first default component of `kind` among the top-level items.
    pub fn first_component_of_kind(&self, kind: ComponentKind) -> Option<&CodeComponent> {
        self.children
            .iter()
            .filter_map(StageItem::default_component)
            .find(|c| c.kind() == kind)
    }
}

/// A complete 2D scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pre: Stage,
    shape: Stage,
    render: Stage,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            pre: Stage::new(StageKind::Pre),
            shape: Stage::new(StageKind::Shape),
            render: Stage::new(StageKind::Render),
        }
    }

    #[inline]
    pub fn stage(&self, kind: StageKind) -> &Stage {
        match kind {
            StageKind::Pre => &self.pre,
            StageKind::Shape => &self.shape,
            StageKind::Render => &self.render,
        }
    }

    #[inline]
    pub fn stage_mut(&mut self, kind: StageKind) -> &mut Stage {
        match kind {
            StageKind::Pre => &mut self.pre,
            StageKind::Shape => &mut self.shape,
            StageKind::Render => &mut self.render,
        }
    }

    /// Appends `item` to the stage of `kind` and returns `self` for chaining.
    pub fn with_item(mut self, kind: StageKind, item: StageItem) -> Self {
        self.stage_mut(kind).push(item);
        self
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
