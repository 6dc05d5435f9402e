use glam::{Mat4, Quat, Vec3};
use thiserror::Error;

use crate::config::{EnvironmentConfig, SceneConfig};
use crate::geometry::{self, MeshData};

/// Every object is on this layer; the main camera renders it
pub const DEFAULT_LAYER: u32 = 0;
/// Objects visible to the reflection probe
pub const REFLECTION_LAYER: u32 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("a model is already loaded; the scene holds at most one")]
    ModelAlreadyLoaded,
    #[error("node {node} references missing node {missing}")]
    DanglingNode { node: usize, missing: usize },
    #[error("primitive {primitive} references missing node {missing}")]
    DanglingPrimitive { primitive: usize, missing: usize },
    #[error("node {0} is its own ancestor")]
    Cycle(usize),
}

/// Bitmask of layers an object belongs to, or a camera can see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layers(u32);

impl Layers {
    /// Only the default layer
    pub const fn new() -> Self {
        Self(1 << DEFAULT_LAYER)
    }

    /// Only `layer`
    pub const fn only(layer: u32) -> Self {
        Self(1 << layer)
    }

    pub fn enable(&mut self, layer: u32) {
        self.0 |= 1 << layer;
    }

    /// True when the two masks share a layer
    pub fn test(&self, other: Layers) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for Layers {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Surface description shared by the built-in objects and loaded primitives
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Linear RGB; may exceed 1 for emissive-looking unlit surfaces
    pub base_color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
    /// Unlit surfaces ignore the environment and output `base_color`
    pub unlit: bool,
}

impl Material {
    pub fn standard(base_color: [f32; 3], metalness: f32, roughness: f32) -> Self {
        Self {
            base_color,
            metalness,
            roughness,
            unlit: false,
        }
    }

    pub fn basic(base_color: [f32; 3]) -> Self {
        Self {
            base_color,
            metalness: 0.0,
            roughness: 1.0,
            unlit: true,
        }
    }
}

/// Built-in mesh object (floor, ring light)
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: &'static str,
    pub mesh: MeshData,
    pub material: Material,
    pub transform: Transform,
    pub layers: Layers,
}

/// Node of a loaded model's hierarchy
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub transform: Transform,
}

/// Drawable piece of a loaded model, attached to a node
#[derive(Debug, Clone)]
pub struct Primitive {
    pub node: usize,
    pub mesh: MeshData,
    pub material: Material,
}

/// The single loaded model placed in the scene
#[derive(Debug, Clone)]
pub struct ModelInstance {
    pub name: String,
    pub placement: Transform,
    nodes: Vec<SceneNode>,
    primitives: Vec<Primitive>,
    /// Node indices ordered parents-first
    order: Vec<usize>,
    world: Vec<Mat4>,
}

impl ModelInstance {
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<SceneNode>,
        primitives: Vec<Primitive>,
        placement: Transform,
    ) -> Result<Self, SceneError> {
        for (index, node) in nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                if parent >= nodes.len() {
                    return Err(SceneError::DanglingNode { node: index, missing: parent });
                }
            }
        }
        for (index, primitive) in primitives.iter().enumerate() {
            if primitive.node >= nodes.len() {
                return Err(SceneError::DanglingPrimitive {
                    primitive: index,
                    missing: primitive.node,
                });
            }
        }

        let order = parents_first(&nodes)?;
        let mut instance = Self {
            name: name.into(),
            placement,
            world: vec![Mat4::IDENTITY; nodes.len()],
            nodes,
            primitives,
            order,
        };
        instance.update_world_matrices();
        Ok(instance)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn node_transform_mut(&mut self, node: usize) -> Option<&mut Transform> {
        self.nodes.get_mut(node).map(|n| &mut n.transform)
    }

    /// Recompute every node's world matrix from local transforms
    pub fn update_world_matrices(&mut self) {
        let root = self.placement.matrix();
        for &index in &self.order {
            let node = &self.nodes[index];
            let parent = node.parent.map_or(root, |p| self.world[p]);
            self.world[index] = parent * node.transform.matrix();
        }
    }

    pub fn world_matrix(&self, node: usize) -> Mat4 {
        self.world.get(node).copied().unwrap_or(Mat4::IDENTITY)
    }

    pub fn primitive_matrix(&self, primitive: usize) -> Mat4 {
        self.primitives
            .get(primitive)
            .map_or(Mat4::IDENTITY, |p| self.world_matrix(p.node))
    }
}

fn parents_first(nodes: &[SceneNode]) -> Result<Vec<usize>, SceneError> {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut stack = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        match node.parent {
            Some(parent) => children[parent].push(index),
            None => stack.push(index),
        }
    }
    stack.reverse();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(index) = stack.pop() {
        order.push(index);
        stack.extend(children[index].iter().rev());
    }

    // Nodes never reached from a root sit on a parent cycle
    if order.len() != nodes.len() {
        let mut seen = vec![false; nodes.len()];
        for &index in &order {
            seen[index] = true;
        }
        let first = seen.iter().position(|s| !s).unwrap_or(0);
        return Err(SceneError::Cycle(first));
    }
    Ok(order)
}

/// Rotation of the ring light about X at a given time
pub fn ring_light_rotation(elapsed: f32, amplitude: f32) -> f32 {
    elapsed.sin() * amplitude
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background {
    pub intensity: f32,
    pub blurriness: f32,
}

/// Everything the renderer draws
#[derive(Debug, Clone)]
pub struct SceneGraph {
    pub floor: SceneObject,
    pub ring_light: SceneObject,
    pub background: Background,
    ring_light_rotation: f32,
    ring_light_amplitude: f32,
    model: Option<ModelInstance>,
}

impl SceneGraph {
    pub fn new(config: &SceneConfig, environment: &EnvironmentConfig) -> Self {
        let floor_color = geometry::hex_to_linear(&config.floor.color).unwrap_or_else(|| {
            log::warn!("Invalid floor color {:?}, using grey", config.floor.color);
            [0.5, 0.5, 0.5]
        });

        let floor = SceneObject {
            name: "floor",
            mesh: geometry::cylinder(config.floor.radius, config.floor.height, config.floor.segments),
            material: Material::standard(floor_color, config.floor.metalness, config.floor.roughness),
            transform: Transform::IDENTITY,
            layers: Layers::new(),
        };

        let ring = &config.ring_light;
        let mut ring_layers = Layers::new();
        ring_layers.enable(REFLECTION_LAYER);
        let ring_light = SceneObject {
            name: "ring_light",
            mesh: geometry::torus(ring.radius, ring.tube, ring.radial_segments, ring.tubular_segments),
            material: Material::basic(ring.color),
            transform: Transform::from_translation(Vec3::new(0.0, ring.height, 0.0)),
            layers: ring_layers,
        };

        Self {
            floor,
            ring_light,
            background: Background {
                intensity: environment.intensity,
                blurriness: environment.blurriness,
            },
            ring_light_rotation: 0.0,
            ring_light_amplitude: ring.amplitude,
            model: None,
        }
    }

    /// Point the ring light at its oscillation angle for `elapsed`
    pub fn animate_ring_light(&mut self, elapsed: f32) {
        self.ring_light_rotation = ring_light_rotation(elapsed, self.ring_light_amplitude);
        self.ring_light.transform.rotation = Quat::from_rotation_x(self.ring_light_rotation);
    }

    pub fn ring_light_rotation(&self) -> f32 {
        self.ring_light_rotation
    }

    /// Position of the floor; the framing rule measures distance to it
    pub fn floor_anchor(&self) -> Vec3 {
        self.floor.transform.translation
    }

    /// Place the model. A second model is rejected.
    pub fn attach_model(&mut self, model: ModelInstance) -> Result<(), SceneError> {
        if self.model.is_some() {
            return Err(SceneError::ModelAlreadyLoaded);
        }
        self.model = Some(model);
        Ok(())
    }

    pub fn model(&self) -> Option<&ModelInstance> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut ModelInstance> {
        self.model.as_mut()
    }

    /// Nodes contributed by the loaded model, zero when none is loaded
    pub fn model_node_count(&self) -> usize {
        self.model.as_ref().map_or(0, |m| m.nodes().len())
    }

    /// Built-in objects in draw order
    pub fn objects(&self) -> [&SceneObject; 2] {
        [&self.floor, &self.ring_light]
    }

    /// Built-in objects visible to a camera with the given layers, with their
    /// index into `objects()`
    pub fn objects_on(&self, camera_layers: Layers) -> impl Iterator<Item = (usize, &SceneObject)> {
        self.objects()
            .into_iter()
            .enumerate()
            .filter(move |(_, object)| object.layers.test(camera_layers))
    }
}
