//! Geometry merge normalization for instanced drawing
//!
//! Meshes decoded from one container usually disagree on which vertex
//! attributes they carry. Merging them into a single buffer set requires
//! every mesh to carry every attribute, so missing ones are synthesized as
//! zeros before concatenation.

use std::collections::{BTreeMap, BTreeSet};

use glam::DMat4;

use crate::error::{B3dmError, B3dmResult};
use crate::model::{AttributeKind, Material, Mesh, VertexAttribute};

/// Range of the merged index (or vertex) list drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryGroup {
    pub start: usize,
    pub count: usize,
    pub material_index: usize,
}

/// Consolidated vertex buffers of a merged mesh sequence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedGeometry {
    pub attributes: BTreeMap<AttributeKind, VertexAttribute>,
    /// Present when any input mesh was indexed
    pub indices: Option<Vec<u32>>,
    /// One group per input mesh, in input order
    pub groups: Vec<GeometryGroup>,
    pub vertex_count: usize,
}

impl MergedGeometry {
    pub fn attribute(&self, kind: AttributeKind) -> Option<&VertexAttribute> {
        self.attributes.get(&kind)
    }

    /// Raw little-endian bytes of one attribute, ready for upload.
    pub fn attribute_bytes(&self, kind: AttributeKind) -> Option<&[u8]> {
        self.attributes
            .get(&kind)
            .map(|attribute| bytemuck::cast_slice(attribute.data.as_slice()))
    }

    pub fn index_bytes(&self) -> Option<&[u8]> {
        self.indices.as_deref().map(bytemuck::cast_slice)
    }
}

/// Merged geometry plus everything a fixed-capacity instanced draw needs
#[derive(Debug, Clone, PartialEq)]
pub struct InstancedBufferSet {
    pub geometry: MergedGeometry,
    /// Parallel to `geometry.groups`
    pub materials: Vec<Material>,
    pub capacity: u32,
    /// Transform shared by every instance before its own
    pub base_transform: DMat4,
}

impl InstancedBufferSet {
    pub fn new(geometry: MergedGeometry, materials: Vec<Material>, capacity: u32) -> Self {
        Self {
            geometry,
            materials,
            capacity,
            base_transform: DMat4::IDENTITY,
        }
    }
}

/// Attribute kinds present on `mesh`, checked against the closed set.
fn mesh_kinds(index: usize, mesh: &Mesh) -> B3dmResult<Vec<AttributeKind>> {
    let vertex_count = mesh.vertex_count();
    let mut kinds = Vec::with_capacity(mesh.attributes.len());

    for (name, attribute) in &mesh.attributes {
        let kind = AttributeKind::from_name(name)?;
        if attribute.item_size != kind.arity() {
            return Err(B3dmError::AttributeArity {
                name: name.clone(),
                expected: kind.arity(),
                found: attribute.item_size,
            });
        }
        if attribute.data.len() != vertex_count * kind.arity() {
            return Err(B3dmError::MalformedMesh {
                mesh: index,
                reason: format!(
                    "attribute '{name}' holds {} vertices, position holds {vertex_count}",
                    attribute.count()
                ),
            });
        }
        kinds.push(kind);
    }

    if !kinds.contains(&AttributeKind::Position) {
        return Err(B3dmError::MalformedMesh {
            mesh: index,
            reason: "missing position attribute".to_string(),
        });
    }

    if let Some(&bad) = mesh
        .indices
        .iter()
        .flatten()
        .find(|&&i| i as usize >= vertex_count)
    {
        return Err(B3dmError::MalformedMesh {
            mesh: index,
            reason: format!("index {bad} out of range for {vertex_count} vertices"),
        });
    }
    Ok(kinds)
}

/// Bake each mesh's world transform, unify attribute sets and concatenate.
///
/// Output order follows input order, vertex order within a mesh is kept, and
/// no attribute present on any input is dropped. Materials are returned
/// parallel to the merged groups.
pub fn normalize_and_merge(
    meshes: Vec<(Mesh, DMat4)>,
) -> B3dmResult<(MergedGeometry, Vec<Material>)> {
    let mut union = BTreeSet::new();
    for (index, (mesh, _)) in meshes.iter().enumerate() {
        union.extend(mesh_kinds(index, mesh)?);
    }
    let any_indexed = meshes.iter().any(|(mesh, _)| mesh.indices.is_some());

    let mut merged = MergedGeometry {
        attributes: union
            .iter()
            .map(|&kind| (kind, VertexAttribute::new(kind.arity(), Vec::new())))
            .collect(),
        indices: any_indexed.then(Vec::new),
        ..MergedGeometry::default()
    };
    let mut materials = Vec::with_capacity(meshes.len());

    for (material_index, (mut mesh, world)) in meshes.into_iter().enumerate() {
        mesh.apply_matrix(&world);
        let vertex_count = mesh.vertex_count();
        // merged indices are u32; the last vertex of this mesh must stay addressable
        let base_vertex = merged
            .vertex_count
            .checked_add(vertex_count)
            .filter(|&end| end <= u32::MAX as usize)
            .map(|_| merged.vertex_count as u32)
            .ok_or_else(|| B3dmError::MalformedMesh {
                mesh: material_index,
                reason: "merged vertex count exceeds the u32 index range".to_string(),
            })?;

        for (&kind, target) in merged.attributes.iter_mut() {
            match mesh.attributes.remove(kind.name()) {
                Some(attribute) => target.data.extend_from_slice(&attribute.data),
                None => target
                    .data
                    .extend_from_slice(&VertexAttribute::zeroed(kind.arity(), vertex_count).data),
            }
        }

        let group = match merged.indices.as_mut() {
            Some(indices) => {
                let start = indices.len();
                match mesh.indices.take() {
                    Some(local) => indices.extend(local.iter().map(|i| i + base_vertex)),
                    None => indices.extend(base_vertex..base_vertex + vertex_count as u32),
                }
                GeometryGroup {
                    start,
                    count: indices.len() - start,
                    material_index,
                }
            }
            None => GeometryGroup {
                start: merged.vertex_count,
                count: vertex_count,
                material_index,
            },
        };

        merged.groups.push(group);
        merged.vertex_count += vertex_count;
        materials.push(mesh.material);
    }

    log::debug!(
        "merged {} meshes: {} vertices, attributes {:?}",
        materials.len(),
        merged.vertex_count,
        merged.attributes.keys().map(|k| k.name()).collect::<Vec<_>>()
    );
    Ok((merged, materials))
}
