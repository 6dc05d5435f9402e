use anyhow::{bail, Context, Result};
use glam::{Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::Path;

use crate::animation::{AnimationClip, Channel, ChannelValues, Interpolation};
use crate::geometry::{compute_normals, MeshData};
use crate::scene::{Material, Primitive, SceneNode, Transform};
use crate::types::Vertex;

/// Decoded model, ready to be placed in the scene
#[derive(Debug, Clone)]
pub struct ModelData {
    pub name: String,
    pub nodes: Vec<SceneNode>,
    pub primitives: Vec<Primitive>,
    pub clips: Vec<AnimationClip>,
}

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Extension lists from the top of a glTF document
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtensionManifest {
    #[serde(default)]
    extensions_used: Vec<String>,
    #[serde(default)]
    extensions_required: Vec<String>,
}

impl ExtensionManifest {
    /// Read the JSON part of a `.gltf` or `.glb` file
    fn from_slice(bytes: &[u8]) -> Result<Self> {
        let json = if bytes.starts_with(b"glTF") {
            gltf::binary::Glb::from_slice(bytes)
                .context("Invalid GLB container")?
                .json
        } else {
            Cow::Borrowed(bytes)
        };
        serde_json::from_slice(&json).context("Invalid glTF JSON")
    }
}

/// Loads a glTF/GLB file: node hierarchy, triangle primitives, animation clips
///
/// Draco-compressed meshes are not decoded. A file that requires them fails
/// with a dedicated error; one that only uses them loads its uncompressed
/// fallback.
pub fn load_model(path: impl AsRef<Path>) -> Result<ModelData> {
    let path = path.as_ref();
    log::info!("Loading glTF file: {:?}", path);

    let bytes = std::fs::read(path).context(format!("Failed to load glTF file: {:?}", path))?;

    let manifest = ExtensionManifest::from_slice(&bytes)
        .context(format!("Failed to load glTF file: {:?}", path))?;
    if manifest.extensions_required.iter().any(|e| e == DRACO_EXTENSION) {
        bail!("Draco-compressed meshes unsupported ({} requires {})", path.display(), DRACO_EXTENSION);
    }
    if manifest.extensions_used.iter().any(|e| e == DRACO_EXTENSION) {
        log::warn!("{:?} carries Draco meshes; using the uncompressed fallback", path);
    }

    let file = gltf::Gltf::from_slice(&bytes).context(format!("Failed to load glTF file: {:?}", path))?;
    let buffers = gltf::import_buffers(&file.document, path.parent(), file.blob)
        .context(format!("Failed to read buffers of {:?}", path))?;
    let gltf = file.document;

    log::debug!(
        "glTF: {} scenes, {} nodes, {} meshes, {} animations",
        gltf.scenes().count(),
        gltf.nodes().count(),
        gltf.meshes().count(),
        gltf.animations().count()
    );

    let nodes = read_nodes(&gltf);
    let primitives = read_primitives(&gltf, &buffers)?;
    let clips = gltf
        .animations()
        .enumerate()
        .map(|(index, animation)| read_clip(index, &animation, &buffers))
        .collect::<Vec<_>>();

    if primitives.is_empty() {
        log::warn!("No triangle geometry found in {:?}", path);
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());

    log::info!(
        "Loaded {}: {} nodes, {} primitives, {} clips",
        name,
        nodes.len(),
        primitives.len(),
        clips.len()
    );

    Ok(ModelData {
        name,
        nodes,
        primitives,
        clips,
    })
}

/// Flatten the node list, keeping glTF indices so channels can target them.
///
/// Nodes outside the default scene are kept but never drawn unless referenced.
fn read_nodes(gltf: &gltf::Document) -> Vec<SceneNode> {
    let mut nodes: Vec<SceneNode> = gltf
        .nodes()
        .map(|node| {
            let (translation, rotation, scale) = node.transform().decomposed();
            SceneNode {
                name: node.name().map(str::to_string),
                parent: None,
                transform: Transform {
                    translation: Vec3::from_array(translation),
                    rotation: Quat::from_array(rotation),
                    scale: Vec3::from_array(scale),
                },
            }
        })
        .collect();

    for node in gltf.nodes() {
        for child in node.children() {
            nodes[child.index()].parent = Some(node.index());
        }
    }
    nodes
}

fn read_primitives(gltf: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<Vec<Primitive>> {
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    let Some(scene) = scene else {
        return Ok(Vec::new());
    };

    let mut primitives = Vec::new();
    let mut stack: Vec<gltf::Node> = scene.nodes().collect();
    while let Some(node) = stack.pop() {
        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                if let Some(mesh_data) = read_mesh(&primitive, buffers)
                    .with_context(|| format!("Mesh {:?} of node {}", mesh.name(), node.index()))?
                {
                    primitives.push(Primitive {
                        node: node.index(),
                        mesh: mesh_data,
                        material: read_material(&primitive.material()),
                    });
                }
            }
        }
        stack.extend(node.children());
    }
    Ok(primitives)
}

/// Triangle primitives only; points and lines are skipped
fn read_mesh(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Result<Option<MeshData>> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::debug!("Skipping primitive with mode {:?}", primitive.mode());
        return Ok(None);
    }

    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<Vec3> = reader
        .read_positions()
        .context("Mesh primitive has no positions")?
        .map(Vec3::from_array)
        .collect();

    if positions.is_empty() {
        return Ok(None);
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        bail!("Index {} out of range for {} vertices", bad, positions.len());
    }

    let normals: Vec<Vec3> = match reader.read_normals() {
        Some(normals) => normals.map(Vec3::from_array).collect(),
        None => compute_normals(&positions, &indices),
    };

    let vertices = positions
        .iter()
        .zip(normals.iter().chain(std::iter::repeat(&Vec3::Y)))
        .map(|(p, n)| Vertex::new(p.to_array(), n.to_array()))
        .collect();

    Ok(Some(MeshData { vertices, indices }))
}

fn read_material(material: &gltf::Material) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _a] = pbr.base_color_factor();
    Material::standard([r, g, b], pbr.metallic_factor(), pbr.roughness_factor())
}

fn read_clip(index: usize, animation: &gltf::Animation, buffers: &[gltf::buffer::Data]) -> AnimationClip {
    let mut channels = Vec::new();

    for channel in animation.channels() {
        let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();

        let cubic = channel.sampler().interpolation() == gltf::animation::Interpolation::CubicSpline;
        let interpolation = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            _ => Interpolation::Linear,
        };

        let values = match reader.read_outputs() {
            Some(ReadOutputs::Translations(v)) => {
                ChannelValues::Translation(spline_values(v.map(Vec3::from_array).collect(), cubic))
            }
            Some(ReadOutputs::Rotations(v)) => {
                ChannelValues::Rotation(spline_values(v.into_f32().map(Quat::from_array).collect(), cubic))
            }
            Some(ReadOutputs::Scales(v)) => {
                ChannelValues::Scale(spline_values(v.map(Vec3::from_array).collect(), cubic))
            }
            Some(ReadOutputs::MorphTargetWeights(_)) => {
                log::debug!("Skipping morph target channel");
                continue;
            }
            None => continue,
        };

        channels.push(Channel {
            node: channel.target().node().index(),
            interpolation,
            times,
            values,
        });
    }

    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("clip_{}", index));
    AnimationClip::new(name, channels)
}

/// Cubic-spline outputs come as (in-tangent, value, out-tangent) triples; keep the values
fn spline_values<T: Copy>(outputs: Vec<T>, cubic: bool) -> Vec<T> {
    if cubic {
        outputs.chunks_exact(3).map(|triple| triple[1]).collect()
    } else {
        outputs
    }
}
