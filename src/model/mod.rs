//! Decoded model representation and the model decoder seam
//!
//! The embedded payload is decoded by an implementation of [`ModelDecoder`].
//! Its output is a node hierarchy ([`SceneNode`]) whose mesh nodes carry named
//! vertex attributes, an optional index list and a material.

mod glb;

pub use glb::{write_glb, GlbDecoder, GlbError};

use std::collections::BTreeMap;
use std::future::Future;

use glam::{DMat3, DMat4, DVec3};
use serde_json::{Map, Value};

use crate::error::{B3dmError, B3dmResult};
use crate::readiness::CodecRequirements;

/// Vertex attributes understood by the geometry merge.
///
/// The set is closed: adding a kind means extending [`AttributeKind::arity`]
/// and [`AttributeKind::from_name`] together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKind {
    Position,
    Normal,
    Color,
    Uv,
    Uv2,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 5] = [
        AttributeKind::Position,
        AttributeKind::Normal,
        AttributeKind::Color,
        AttributeKind::Uv,
        AttributeKind::Uv2,
    ];

    pub fn from_name(name: &str) -> B3dmResult<Self> {
        match name {
            "position" => Ok(Self::Position),
            "normal" => Ok(Self::Normal),
            "color" => Ok(Self::Color),
            "uv" => Ok(Self::Uv),
            "uv2" => Ok(Self::Uv2),
            other => Err(B3dmError::UnknownAttribute(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Normal => "normal",
            Self::Color => "color",
            Self::Uv => "uv",
            Self::Uv2 => "uv2",
        }
    }

    /// Components per vertex
    pub fn arity(self) -> usize {
        match self {
            Self::Position | Self::Normal | Self::Color => 3,
            Self::Uv | Self::Uv2 => 2,
        }
    }
}

/// Flat per-vertex float data
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    /// Components per vertex
    pub item_size: usize,
    pub data: Vec<f32>,
}

impl VertexAttribute {
    pub fn new(item_size: usize, data: Vec<f32>) -> Self {
        Self { item_size, data }
    }

    pub fn zeroed(item_size: usize, count: usize) -> Self {
        Self::new(item_size, vec![0.0; item_size * count])
    }

    /// Number of vertices
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }
}

/// Surface description carried alongside each mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    /// Linear RGBA
    pub base_color: [f32; 4],
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
            double_sided: false,
        }
    }
}

/// Vertex buffers of one drawable primitive, keyed by attribute name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub attributes: BTreeMap<String, VertexAttribute>,
    pub indices: Option<Vec<u32>>,
    pub material: Material,
}

impl Mesh {
    pub fn with_positions(positions: Vec<f32>) -> Self {
        let mut mesh = Self::default();
        mesh.set_attribute(AttributeKind::Position.name(), VertexAttribute::new(3, positions));
        mesh
    }

    pub fn set_attribute(&mut self, name: &str, attribute: VertexAttribute) {
        self.attributes.insert(name.to_string(), attribute);
    }

    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.get(name)
    }

    /// Vertex count taken from the position attribute
    pub fn vertex_count(&self) -> usize {
        self.attribute(AttributeKind::Position.name())
            .map_or(0, VertexAttribute::count)
    }

    /// Transform positions and normals in place. Normals use the
    /// inverse-transpose of the upper 3x3 and are renormalized.
    pub fn apply_matrix(&mut self, matrix: &DMat4) {
        if let Some(position) = self.attributes.get_mut(AttributeKind::Position.name()) {
            if position.item_size == 3 {
                for p in position.data.chunks_exact_mut(3) {
                    let v = matrix.transform_point3(DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64));
                    p.copy_from_slice(&v.as_vec3().to_array());
                }
            }
        }

        if let Some(normal) = self.attributes.get_mut(AttributeKind::Normal.name()) {
            if normal.item_size == 3 {
                let linear = DMat3::from_mat4(*matrix);
                let normal_matrix = if linear.determinant() == 0.0 {
                    DMat3::ZERO
                } else {
                    linear.inverse().transpose()
                };
                for n in normal.data.chunks_exact_mut(3) {
                    let v = normal_matrix * DVec3::new(n[0] as f64, n[1] as f64, n[2] as f64);
                    n.copy_from_slice(&v.normalize_or_zero().as_vec3().to_array());
                }
            }
        }
    }
}

/// A node of the decoded hierarchy. `transform` is local to the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    pub transform: DMat4,
    pub mesh: Option<Mesh>,
    pub children: Vec<SceneNode>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: None,
            transform: DMat4::IDENTITY,
            mesh: None,
            children: Vec::new(),
        }
    }
}

impl SceneNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mesh(mesh: Mesh) -> Self {
        Self {
            mesh: Some(mesh),
            ..Self::default()
        }
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Left-multiply `matrix` onto the local transform, so it applies after
    /// whatever the node already does.
    pub fn apply_matrix(&mut self, matrix: &DMat4) {
        self.transform = *matrix * self.transform;
    }

    /// Depth-first, parent before children.
    pub fn traverse_mut(&mut self, f: &mut dyn FnMut(&mut SceneNode)) {
        f(self);
        for child in &mut self.children {
            child.traverse_mut(f);
        }
    }

    /// Visit every node with its world transform, depth-first.
    pub fn traverse_world(&self, parent: &DMat4, f: &mut dyn FnMut(&SceneNode, &DMat4)) {
        let world = *parent * self.transform;
        f(self, &world);
        for child in &self.children {
            child.traverse_world(&world, f);
        }
    }

    pub fn mesh_count(&self) -> usize {
        usize::from(self.is_mesh()) + self.children.iter().map(SceneNode::mesh_count).sum::<usize>()
    }

    /// Consume the hierarchy, returning each mesh with its world transform in
    /// depth-first order.
    pub fn into_world_meshes(self) -> Vec<(Mesh, DMat4)> {
        let mut out = Vec::new();
        self.collect_world_meshes(&DMat4::IDENTITY, &mut out);
        out
    }

    fn collect_world_meshes(self, parent: &DMat4, out: &mut Vec<(Mesh, DMat4)>) {
        let world = *parent * self.transform;
        if let Some(mesh) = self.mesh {
            out.push((mesh, world));
        }
        for child in self.children {
            child.collect_world_meshes(&world, out);
        }
    }
}

/// Output of a [`ModelDecoder`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedModel {
    pub scene: SceneNode,
    /// The payload's `asset` object, if any
    pub asset: Option<Value>,
    /// Top-level extension objects keyed by extension name
    pub extensions: Map<String, Value>,
}

impl DecodedModel {
    /// Center from the embedded `CESIUM_RTC` extension
    pub fn rtc_center(&self) -> Option<DVec3> {
        let center = self.extensions.get("CESIUM_RTC")?.get("center")?.as_array()?;
        match center.as_slice() {
            [x, y, z] => Some(DVec3::new(x.as_f64()?, y.as_f64()?, z.as_f64()?)),
            _ => None,
        }
    }
}

/// Decoder for the embedded model payload.
///
/// Decoding is asynchronous and the payload is only borrowed; implementations
/// that need ownership copy it once.
pub trait ModelDecoder: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Auxiliary codecs that must be initialized before [`ModelDecoder::decode`]
    /// may be called.
    fn requirements(&self) -> CodecRequirements {
        CodecRequirements::default()
    }

    fn decode(&self, payload: &[u8]) -> impl Future<Output = Result<DecodedModel, Self::Error>> + Send;
}
