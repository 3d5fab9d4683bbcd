//! glTF model import
//!
//! Flattens a GLB into a node list with triangle meshes, materials and
//! animation clips. Materials are adjusted on import so every surface
//! responds to the zone's lights and reflects its environment.

use std::path::Path;
use std::sync::Arc;

use gltf::animation::util::ReadOutputs;
use tracing::{debug, info, warn};

use crate::rasterizer::{
    mat4_from_trs, mat4_identity, mat4_mul, Color, Mat4, Material, Mesh, Quat, Texture, Vec2,
    Vec3, Vertex,
};
use super::animation::{AnimationClip, Channel, ChannelValues, Interpolation};
use super::environment::read_with_progress;
use super::error::AssetResult;

/// Metalness given to materials that were unlit in the source file
const UNLIT_METALNESS: f32 = 0.4;
/// Roughness given to materials that were unlit in the source file
const UNLIT_ROUGHNESS: f32 = 0.6;
const MAX_METALNESS: f32 = 0.7;
const MIN_ROUGHNESS: f32 = 0.3;
/// Substituted when a material reports zero roughness
const DEFAULT_ROUGHNESS: f32 = 0.5;
const ENV_INTENSITY: f32 = 1.0;

/// Triangle list drawn with one material
#[derive(Debug, Clone)]
pub struct Primitive {
    pub mesh: Mesh,
    pub material: usize,
}

/// Scene-graph node with its current pose
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub children: Vec<usize>,
    pub primitives: Vec<Primitive>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: String::new(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            children: Vec::new(),
            primitives: Vec::new(),
        }
    }
}

impl Node {
    pub fn local_transform(&self) -> Mat4 {
        mat4_from_trs(self.translation, self.rotation, self.scale)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub nodes: Vec<Node>,
    /// Scene roots
    pub roots: Vec<usize>,
    pub materials: Vec<Material>,
    pub clips: Vec<AnimationClip>,
}

impl Model {
    /// World transform of every node, with `base` applied above the roots.
    /// Nodes unreachable from a root keep the identity.
    pub fn world_transforms(&self, base: &Mat4) -> Vec<Mat4> {
        let mut out = vec![mat4_identity(); self.nodes.len()];
        let mut stack: Vec<(usize, Mat4)> = self.roots.iter().map(|&r| (r, *base)).collect();
        let mut visited = vec![false; self.nodes.len()];

        while let Some((idx, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(idx) else {
                continue;
            };
            if std::mem::replace(&mut visited[idx], true) {
                continue;
            }
            let world = mat4_mul(&parent, &node.local_transform());
            out[idx] = world;
            stack.extend(node.children.iter().map(|&c| (c, world)));
        }
        out
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|n| n.primitives.iter())
            .map(|p| p.mesh.triangle_count())
            .sum()
    }
}

/// Make a material respond to lights and the environment.
///
/// Unlit materials become lit with fixed metalness/roughness, keeping their
/// color and texture. Lit materials get metalness capped and roughness
/// floored. All materials reflect the environment at intensity 1.0.
pub fn fix_up_material(material: &mut Material) {
    if !material.lit {
        material.lit = true;
        material.metalness = UNLIT_METALNESS;
        material.roughness = UNLIT_ROUGHNESS;
    } else {
        let metal = if material.metalness.is_finite() { material.metalness } else { 0.0 };
        material.metalness = metal.min(MAX_METALNESS);
        let rough = if material.roughness > 0.0 { material.roughness } else { DEFAULT_ROUGHNESS };
        material.roughness = rough.max(MIN_ROUGHNESS);
    }
    material.env_intensity = ENV_INTENSITY;
}

/// Convert decoded glTF image data to a linear texture
fn texture_from_gltf(image: &gltf::image::Data) -> Option<Texture> {
    use gltf::image::Format;

    let channels = match image.format {
        Format::R8 => 1,
        Format::R8G8 => 2,
        Format::R8G8B8 => 3,
        Format::R8G8B8A8 => 4,
        other => {
            warn!("skipping texture with unsupported pixel format {:?}", other);
            return None;
        }
    };
    let texels = image
        .pixels
        .chunks_exact(channels)
        .map(|p| match channels {
            1 | 2 => Color::new(p[0], p[0], p[0]).to_linear(),
            _ => Color::new(p[0], p[1], p[2]).to_linear(),
        })
        .collect::<Vec<_>>();
    let (w, h) = (image.width as usize, image.height as usize);
    if texels.len() != w * h || texels.is_empty() {
        return None;
    }
    Some(Texture::from_texels(w, h, texels))
}

fn convert_material(m: &gltf::Material, textures: &[Option<Arc<Texture>>]) -> Material {
    let pbr = m.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    let base_texture = pbr
        .base_color_texture()
        .and_then(|info| textures.get(info.texture().source().index()).cloned().flatten());
    let opacity = match m.alpha_mode() {
        gltf::material::AlphaMode::Blend => a,
        _ => 1.0,
    };

    let mut material = Material {
        name: m.name().unwrap_or_default().to_string(),
        base_color: Vec3::new(r, g, b),
        base_texture,
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        emissive: Vec3::from_array(m.emissive_factor()),
        emissive_intensity: 1.0,
        env_intensity: 1.0,
        opacity,
        lit: !m.unlit(),
        double_sided: m.double_sided(),
    };
    fix_up_material(&mut material);
    material
}

/// glTF default material (white, fully metallic and rough), after fix-up
fn default_material() -> Material {
    let mut material = Material {
        name: "default".into(),
        metalness: 1.0,
        roughness: 1.0,
        ..Material::default()
    };
    fix_up_material(&mut material);
    material
}

/// Smooth normals from face winding, for primitives that ship without them
fn compute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut acc = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let n = (vertices[b].pos - vertices[a].pos).cross(vertices[c].pos - vertices[a].pos);
        for i in [a, b, c] {
            acc[i] = acc[i] + n;
        }
    }
    for (v, n) in vertices.iter_mut().zip(acc) {
        v.normal = n.normalize();
    }
}

fn convert_primitive(
    prim: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    default_material: usize,
) -> Option<Primitive> {
    if prim.mode() != gltf::mesh::Mode::Triangles {
        debug!("skipping non-triangle primitive {:?}", prim.mode());
        return None;
    }
    let reader = prim.reader(|b| buffers.get(b.index()).map(|bb| bb.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
    let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|t| t.into_f32().collect());

    let mut vertices: Vec<Vertex> = positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let normal = normals
                .as_ref()
                .and_then(|n| n.get(i))
                .map(|n| Vec3::from_array(*n))
                .unwrap_or(Vec3::ZERO);
            let uv = uvs
                .as_ref()
                .and_then(|u| u.get(i))
                .map(|u| Vec2::new(u[0], u[1]))
                .unwrap_or_default();
            Vertex::new(Vec3::from_array(*p), normal, uv)
        })
        .collect();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(idx) => idx.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };

    if normals.is_none() {
        compute_normals(&mut vertices, &indices);
    }

    Some(Primitive {
        mesh: Mesh { vertices, indices },
        material: prim.material().index().unwrap_or(default_material),
    })
}

/// Cubic-spline outputs store (in-tangent, value, out-tangent) per key
fn keyframes<T: Copy>(v: Vec<T>, cubic: bool) -> Vec<T> {
    if cubic {
        v.chunks_exact(3).map(|c| c[1]).collect()
    } else {
        v
    }
}

fn convert_clip(anim: &gltf::Animation, buffers: &[gltf::buffer::Data]) -> AnimationClip {
    let mut channels = Vec::new();

    for channel in anim.channels() {
        let reader = channel.reader(|b| buffers.get(b.index()).map(|bb| bb.0.as_slice()));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();

        let (interpolation, cubic) = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Step => (Interpolation::Step, false),
            gltf::animation::Interpolation::Linear => (Interpolation::Linear, false),
            gltf::animation::Interpolation::CubicSpline => (Interpolation::Linear, true),
        };
        let values = match reader.read_outputs() {
            Some(ReadOutputs::Translations(t)) => {
                ChannelValues::Translation(keyframes(t.map(Vec3::from_array).collect(), cubic))
            }
            Some(ReadOutputs::Rotations(r)) => ChannelValues::Rotation(keyframes(
                r.into_f32().map(Quat::from_array).collect(),
                cubic,
            )),
            Some(ReadOutputs::Scales(s)) => {
                ChannelValues::Scale(keyframes(s.map(Vec3::from_array).collect(), cubic))
            }
            // Morph target weights are not rendered
            Some(ReadOutputs::MorphTargetWeights(_)) | None => continue,
        };

        channels.push(Channel {
            node: channel.target().node().index(),
            interpolation,
            times,
            values,
        });
    }

    AnimationClip::new(anim.name().unwrap_or_default().to_string(), channels)
}

/// Parse GLB/glTF bytes
pub fn import_model(bytes: &[u8]) -> AssetResult<Model> {
    let (doc, buffers, images) = gltf::import_slice(bytes)?;

    let textures: Vec<Option<Arc<Texture>>> = images
        .iter()
        .map(|img| texture_from_gltf(img).map(Arc::new))
        .collect();

    let mut materials: Vec<Material> = doc
        .materials()
        .map(|m| convert_material(&m, &textures))
        .collect();
    let default_idx = materials.len();
    materials.push(default_material());

    let nodes: Vec<Node> = doc
        .nodes()
        .map(|n| {
            let (t, r, s) = n.transform().decomposed();
            let primitives = n
                .mesh()
                .map(|mesh| {
                    mesh.primitives()
                        .filter_map(|p| convert_primitive(&p, &buffers, default_idx))
                        .collect()
                })
                .unwrap_or_default();
            Node {
                name: n.name().unwrap_or_default().to_string(),
                translation: Vec3::from_array(t),
                rotation: Quat::from_array(r),
                scale: Vec3::from_array(s),
                children: n.children().map(|c| c.index()).collect(),
                primitives,
            }
        })
        .collect();

    let roots = match doc.default_scene().or_else(|| doc.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => {
            // No scene: treat every parentless node as a root
            let mut is_child = vec![false; nodes.len()];
            for n in &nodes {
                for &c in &n.children {
                    if let Some(flag) = is_child.get_mut(c) {
                        *flag = true;
                    }
                }
            }
            (0..nodes.len()).filter(|&i| !is_child[i]).collect()
        }
    };

    let clips: Vec<AnimationClip> = doc.animations().map(|a| convert_clip(&a, &buffers)).collect();

    let model = Model { nodes, roots, materials, clips };
    info!(
        "model imported: {} nodes, {} triangles, {} materials, {} clips",
        model.nodes.len(),
        model.triangle_count(),
        model.materials.len(),
        model.clips.len()
    );
    for (i, clip) in model.clips.iter().enumerate() {
        debug!("clip {}: {} ({:.2}s)", i, clip.name, clip.duration);
    }
    Ok(model)
}

/// Read and import a model. Progress covers reading (0.0..0.9) then parsing (1.0).
pub fn load_model(path: &Path, mut on_progress: impl FnMut(f32)) -> AssetResult<Model> {
    info!("loading model {}", path.display());
    let bytes = read_with_progress(path, |f| on_progress(f * 0.9))?;
    let model = import_model(&bytes)?;
    on_progress(1.0);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::mat4_transform_point;

    #[test]
    fn test_unlit_becomes_lit() {
        let mut m = Material { lit: false, base_color: Vec3::new(0.2, 0.3, 0.4), ..Material::default() };
        fix_up_material(&mut m);
        assert!(m.lit);
        assert!((m.metalness - 0.4).abs() < 0.001);
        assert!((m.roughness - 0.6).abs() < 0.001);
        assert!((m.base_color.y - 0.3).abs() < 0.001);
        assert!((m.env_intensity - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_pbr_clamps() {
        let mut m = Material { metalness: 1.0, roughness: 0.1, ..Material::default() };
        fix_up_material(&mut m);
        assert!((m.metalness - 0.7).abs() < 0.001);
        assert!((m.roughness - 0.3).abs() < 0.001);

        let mut m = Material { metalness: 0.2, roughness: 0.0, ..Material::default() };
        fix_up_material(&mut m);
        assert!((m.metalness - 0.2).abs() < 0.001);
        assert!((m.roughness - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_fix_up_is_stable() {
        let mut m = Material { metalness: 0.9, roughness: 0.2, ..Material::default() };
        fix_up_material(&mut m);
        let once = (m.metalness, m.roughness);
        fix_up_material(&mut m);
        assert_eq!(once, (m.metalness, m.roughness));
    }

    #[test]
    fn test_world_transforms_chain() {
        let model = Model {
            nodes: vec![
                Node { translation: Vec3::new(1.0, 0.0, 0.0), children: vec![1], ..Node::default() },
                Node { translation: Vec3::new(0.0, 2.0, 0.0), ..Node::default() },
            ],
            roots: vec![0],
            ..Model::default()
        };
        let base = mat4_from_trs(Vec3::new(0.0, -2.0, 5.0), Quat::IDENTITY, Vec3::ONE);
        let world = model.world_transforms(&base);
        let p = mat4_transform_point(&world[1], Vec3::ZERO);
        assert!((p.x - 1.0).abs() < 0.001);
        assert!(p.y.abs() < 0.001);
        assert!((p.z - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_compute_normals_from_winding() {
        let mut verts = vec![
            Vertex::new(Vec3::ZERO, Vec3::ZERO, Vec2::default()),
            Vertex::new(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, Vec2::default()),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO, Vec2::default()),
        ];
        compute_normals(&mut verts, &[0, 1, 2]);
        assert!((verts[0].normal.z - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(import_model(b"definitely not a glb").is_err());
    }

    #[test]
    fn test_minimal_gltf_imports() {
        // One triangle, positions only, embedded as a data URI
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bytes: Vec<u8> = positions.iter().flat_map(|f| f.to_le_bytes()).collect();
        let b64 = base64_encode(&bytes);
        let json = format!(
            r#"{{
                "asset": {{"version": "2.0"}},
                "scene": 0,
                "scenes": [{{"nodes": [0]}}],
                "nodes": [{{"mesh": 0, "translation": [0, 1, 0]}}],
                "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}}}]}}],
                "buffers": [{{"byteLength": 36, "uri": "data:application/octet-stream;base64,{b64}"}}],
                "bufferViews": [{{"buffer": 0, "byteLength": 36}}],
                "accessors": [{{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                                "min": [0, 0, 0], "max": [1, 1, 0]}}]
            }}"#
        );
        let model = import_model(json.as_bytes()).expect("import");
        assert_eq!(model.roots, vec![0]);
        assert_eq!(model.triangle_count(), 1);
        assert!((model.nodes[0].translation.y - 1.0).abs() < 0.001);
        // No material: falls back to the fixed-up default
        let prim = &model.nodes[0].primitives[0];
        assert!((model.materials[prim.material].metalness - 0.7).abs() < 0.001);
        assert!((prim.mesh.vertices[0].normal.z - 1.0).abs() < 0.001);
    }

    fn base64_encode(data: &[u8]) -> String {
        const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        let mut out = String::new();
        for chunk in data.chunks(3) {
            let b = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
            let n = (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32;
            out.push(TABLE[(n >> 18) as usize & 63] as char);
            out.push(TABLE[(n >> 12) as usize & 63] as char);
            out.push(if chunk.len() > 1 { TABLE[(n >> 6) as usize & 63] as char } else { '=' });
            out.push(if chunk.len() > 2 { TABLE[n as usize & 63] as char } else { '=' });
        }
        out
    }
}
