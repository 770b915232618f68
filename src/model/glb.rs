//! Binary glTF (GLB) model decoder
//!
//! Reference [`ModelDecoder`] for the payloads found in b3dm containers. Reads
//! the JSON and BIN chunks, walks the default scene's node hierarchy and
//! extracts every mesh primitive as a [`Mesh`].

use glam::{DMat4, DQuat, DVec3};
use serde_json::{Map, Value};

use super::{AttributeKind, DecodedModel, Material, Mesh, ModelDecoder, SceneNode, VertexAttribute};
use crate::readiness::CodecRequirements;
use crate::table::{ComponentType, ElementType, TypedColumn};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;
const MAX_NODE_DEPTH: usize = 64;
/// Upper bound for zero-filled accessors that have no bufferView
const MAX_UNBACKED_ACCESSOR_BYTES: usize = 64 << 20;

/// Errors raised while decoding a GLB payload
#[derive(Debug, thiserror::Error)]
pub enum GlbError {
    #[error("invalid GLB: {0}")]
    Invalid(String),

    #[error("unsupported glTF feature: {0}")]
    Unsupported(String),

    #[error("glTF JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn invalid<T: Into<String>>(msg: T) -> GlbError {
    GlbError::Invalid(msg.into())
}

type GlbResult<T> = Result<T, GlbError>;

/// Decoder for binary glTF 2.0 payloads
#[derive(Debug, Clone, Default)]
pub struct GlbDecoder {
    requirements: CodecRequirements,
}

impl GlbDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare auxiliary codecs the host has attached to this decoder; decoding
    /// waits until they report ready.
    pub fn with_requirements(mut self, requirements: CodecRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Decode synchronously.
    pub fn decode_glb(&self, data: &[u8]) -> GlbResult<DecodedModel> {
        let (json, bin) = split_chunks(data)?;
        let document = Document::new(&json, bin);

        let scene = document.build_scene()?;
        let extensions = json
            .get("extensions")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Ok(DecodedModel {
            scene,
            asset: json.get("asset").cloned(),
            extensions,
        })
    }
}

impl ModelDecoder for GlbDecoder {
    type Error = GlbError;

    fn requirements(&self) -> CodecRequirements {
        self.requirements
    }

    async fn decode(&self, payload: &[u8]) -> Result<DecodedModel, GlbError> {
        self.decode_glb(payload)
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Split a GLB into its parsed JSON chunk and the (possibly empty) BIN chunk.
fn split_chunks(data: &[u8]) -> GlbResult<(Value, &[u8])> {
    if data.len() < 12 {
        return Err(invalid("GLB header too small"));
    }
    if &data[0..4] != GLB_MAGIC {
        return Err(invalid(format!("bad GLB magic {:?}", &data[0..4])));
    }

    let version = read_u32(data, 4);
    if version != 2 {
        return Err(GlbError::Unsupported(format!("glTF container version {}", version)));
    }

    let total_length = read_u32(data, 8) as usize;
    if total_length > data.len() {
        return Err(invalid(format!(
            "GLB declares {} bytes, payload holds {}",
            total_length,
            data.len()
        )));
    }
    let data = &data[..total_length];

    let mut offset = 12usize;
    let mut json_chunk: Option<Value> = None;
    let mut bin_chunk: Option<&[u8]> = None;

    while offset + 8 <= data.len() {
        let chunk_length = read_u32(data, offset) as usize;
        let chunk_type = read_u32(data, offset + 4);
        offset += 8;

        let end = offset
            .checked_add(chunk_length)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| invalid("chunk runs past end of GLB"))?;

        match chunk_type {
            CHUNK_JSON => json_chunk = Some(serde_json::from_slice(&data[offset..end])?),
            CHUNK_BIN => bin_chunk = Some(&data[offset..end]),
            // unknown chunks must be skipped
            _ => {}
        }
        offset = end;
    }

    let json = json_chunk.ok_or_else(|| invalid("no JSON chunk"))?;
    Ok((json, bin_chunk.unwrap_or(&[])))
}

/// Index-addressable view over the glTF JSON arrays
struct Document<'a> {
    json: &'a Value,
    bin: &'a [u8],
}

impl<'a> Document<'a> {
    fn new(json: &'a Value, bin: &'a [u8]) -> Self {
        Self { json, bin }
    }

    fn array(&self, key: &str) -> &'a [Value] {
        self.json
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn item(&self, key: &str, index: usize) -> GlbResult<&'a Value> {
        self.array(key)
            .get(index)
            .ok_or_else(|| invalid(format!("{key}[{index}] out of range")))
    }

    /// Root node indices of the default scene, or every parentless node.
    fn root_nodes(&self) -> GlbResult<Vec<usize>> {
        let scenes = self.array("scenes");
        if !scenes.is_empty() {
            let index = self.json.get("scene").and_then(Value::as_u64).unwrap_or(0) as usize;
            let scene = scenes
                .get(index)
                .ok_or_else(|| invalid(format!("default scene {index} out of range")))?;
            return Ok(index_list(scene.get("nodes")));
        }

        let nodes = self.array("nodes");
        let mut is_child = vec![false; nodes.len()];
        for node in nodes {
            for child in index_list(node.get("children")) {
                if let Some(flag) = is_child.get_mut(child) {
                    *flag = true;
                }
            }
        }
        Ok((0..nodes.len()).filter(|&i| !is_child[i]).collect())
    }

    fn build_scene(&self) -> GlbResult<SceneNode> {
        let mut root = SceneNode::new();
        let mut visited = vec![false; self.array("nodes").len()];
        for index in self.root_nodes()? {
            root.children.push(self.build_node(index, 0, &mut visited)?);
        }
        Ok(root)
    }

    /// Nodes must form strict trees: each node is reached at most once.
    fn build_node(&self, index: usize, depth: usize, visited: &mut [bool]) -> GlbResult<SceneNode> {
        if depth > MAX_NODE_DEPTH {
            return Err(invalid("node hierarchy too deep"));
        }
        let node = self.item("nodes", index)?;
        if std::mem::replace(&mut visited[index], true) {
            return Err(invalid(format!("node {index} is reachable more than once")));
        }

        let mut scene_node = SceneNode {
            name: node.get("name").and_then(Value::as_str).map(String::from),
            transform: node_transform(node)?,
            ..SceneNode::new()
        };

        if let Some(mesh_index) = node.get("mesh").and_then(Value::as_u64) {
            let mut primitives = self.build_mesh(mesh_index as usize)?;
            if primitives.len() == 1 {
                scene_node.mesh = primitives.pop();
            } else {
                scene_node
                    .children
                    .extend(primitives.into_iter().map(SceneNode::with_mesh));
            }
        }

        for child in index_list(node.get("children")) {
            scene_node
                .children
                .push(self.build_node(child, depth + 1, visited)?);
        }
        Ok(scene_node)
    }

    fn build_mesh(&self, index: usize) -> GlbResult<Vec<Mesh>> {
        let mesh = self.item("meshes", index)?;
        let primitives = mesh
            .get("primitives")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid(format!("mesh {index} has no primitives")))?;
        primitives.iter().map(|p| self.build_primitive(p)).collect()
    }

    fn build_primitive(&self, primitive: &Value) -> GlbResult<Mesh> {
        if primitive
            .get("extensions")
            .and_then(|e| e.get("KHR_draco_mesh_compression"))
            .is_some()
        {
            return Err(GlbError::Unsupported(
                "KHR_draco_mesh_compression primitives".to_string(),
            ));
        }

        let attributes = primitive
            .get("attributes")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("primitive has no attributes"))?;

        let mut mesh = Mesh::default();
        for (semantic, accessor) in attributes {
            let accessor = accessor
                .as_u64()
                .ok_or_else(|| invalid(format!("attribute {semantic} is not an accessor index")))?;
            let (name, attribute) = self.read_attribute(semantic, accessor as usize)?;
            mesh.set_attribute(&name, attribute);
        }

        if let Some(accessor) = primitive.get("indices").and_then(Value::as_u64) {
            let (column, _) = self.read_accessor(accessor as usize)?;
            let indices = column
                .to_u32_vec()
                .ok_or_else(|| invalid("index accessor must be unsigned"))?;
            mesh.indices = Some(indices);
        }

        if let Some(material) = primitive.get("material").and_then(Value::as_u64) {
            mesh.material = read_material(self.item("materials", material as usize)?);
        }

        Ok(mesh)
    }

    /// Read one vertex attribute, renamed to its engine name.
    fn read_attribute(&self, semantic: &str, accessor: usize) -> GlbResult<(String, VertexAttribute)> {
        let (column, element) = self.read_accessor(accessor)?;
        let normalized = self
            .item("accessors", accessor)?
            .get("normalized")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let is_color = semantic == "COLOR_0";

        let data = if normalized || (is_color && column.component_type() != ComponentType::Float) {
            column.to_normalized_f32_vec()
        } else {
            column.to_f32_vec()
        };
        let item_size = element.component_count();

        let name = match semantic {
            "POSITION" => AttributeKind::Position.name().to_string(),
            "NORMAL" => AttributeKind::Normal.name().to_string(),
            "COLOR_0" => AttributeKind::Color.name().to_string(),
            "TEXCOORD_0" => AttributeKind::Uv.name().to_string(),
            "TEXCOORD_1" => AttributeKind::Uv2.name().to_string(),
            other => other.to_ascii_lowercase(),
        };

        // RGBA vertex colors are kept as RGB
        if is_color && item_size == 4 {
            let rgb = data.chunks_exact(4).flat_map(|c| [c[0], c[1], c[2]]).collect();
            return Ok((name, VertexAttribute::new(3, rgb)));
        }
        Ok((name, VertexAttribute::new(item_size, data)))
    }

    /// Read an accessor's elements, honoring byte stride.
    fn read_accessor(&self, index: usize) -> GlbResult<(TypedColumn, ElementType)> {
        let accessor = self.item("accessors", index)?;
        if accessor.get("sparse").is_some() {
            return Err(GlbError::Unsupported("sparse accessors".to_string()));
        }

        let count = accessor.get("count").and_then(Value::as_u64).unwrap_or(0) as usize;
        let code = accessor.get("componentType").and_then(Value::as_u64).unwrap_or(0);
        let component_type = ComponentType::from_gl_code(code)
            .ok_or_else(|| invalid(format!("accessor {index} has component type {code}")))?;
        let type_tag = accessor.get("type").and_then(Value::as_str).unwrap_or("SCALAR");
        let element = ElementType::from_tag(type_tag)
            .map_err(|_| GlbError::Unsupported(format!("accessor type {type_tag}")))?;

        let element_size = component_type.byte_width() * element.component_count();
        let Some(view_index) = accessor.get("bufferView").and_then(Value::as_u64) else {
            // no buffer view: all zeros
            let len = element_size
                .checked_mul(count)
                .filter(|&len| len <= MAX_UNBACKED_ACCESSOR_BYTES)
                .ok_or_else(|| {
                    invalid(format!("accessor {index} without bufferView is too large ({count} elements)"))
                })?;
            let zeros = vec![0u8; len];
            return Ok((TypedColumn::read(component_type, &zeros), element));
        };

        let view = self.item("bufferViews", view_index as usize)?;
        if view.get("buffer").and_then(Value::as_u64).unwrap_or(0) != 0 {
            return Err(GlbError::Unsupported("external buffers".to_string()));
        }
        let view_offset = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0) as usize;
        let view_length = view.get("byteLength").and_then(Value::as_u64).unwrap_or(0) as usize;
        let view_end = view_offset
            .checked_add(view_length)
            .filter(|&end| end <= self.bin.len())
            .ok_or_else(|| invalid(format!("bufferView {view_index} exceeds BIN chunk")))?;
        let view_bytes = &self.bin[view_offset..view_end];

        let stride = view
            .get("byteStride")
            .and_then(Value::as_u64)
            .map_or(element_size, |s| s as usize);
        if stride < element_size {
            return Err(invalid(format!(
                "bufferView {view_index} stride {stride} is smaller than its {element_size}-byte elements"
            )));
        }
        let start = accessor.get("byteOffset").and_then(Value::as_u64).unwrap_or(0) as usize;

        // stride >= element_size > 0, so a span inside the view also bounds `count`
        if count > 0 {
            let last_end = (count - 1)
                .checked_mul(stride)
                .and_then(|x| x.checked_add(start))
                .and_then(|x| x.checked_add(element_size));
            if last_end.map_or(true, |end| end > view_bytes.len()) {
                return Err(invalid(format!("accessor {index} overruns its bufferView")));
            }
        }

        let column = if stride == element_size {
            TypedColumn::read(component_type, &view_bytes[start..start + element_size * count])
        } else {
            let mut packed = Vec::with_capacity(element_size * count);
            for i in 0..count {
                let at = start + i * stride;
                packed.extend_from_slice(&view_bytes[at..at + element_size]);
            }
            TypedColumn::read(component_type, &packed)
        };
        Ok((column, element))
    }
}

fn index_list(value: Option<&Value>) -> Vec<usize> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_u64).map(|i| i as usize).collect())
        .unwrap_or_default()
}

fn f64_array<const N: usize>(value: &Value, what: &str) -> GlbResult<[f64; N]> {
    let items = value
        .as_array()
        .filter(|items| items.len() == N)
        .ok_or_else(|| invalid(format!("{what} must have {N} numbers")))?;
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item
            .as_f64()
            .ok_or_else(|| invalid(format!("{what} must have {N} numbers")))?;
    }
    Ok(out)
}

/// Local transform from `matrix` (column-major) or TRS.
fn node_transform(node: &Value) -> GlbResult<DMat4> {
    if let Some(matrix) = node.get("matrix") {
        return Ok(DMat4::from_cols_array(&f64_array::<16>(matrix, "node.matrix")?));
    }

    let translation = match node.get("translation") {
        Some(t) => DVec3::from_array(f64_array::<3>(t, "node.translation")?),
        None => DVec3::ZERO,
    };
    let rotation = match node.get("rotation") {
        Some(r) => DQuat::from_array(f64_array::<4>(r, "node.rotation")?),
        None => DQuat::IDENTITY,
    };
    let scale = match node.get("scale") {
        Some(s) => DVec3::from_array(f64_array::<3>(s, "node.scale")?),
        None => DVec3::ONE,
    };
    Ok(DMat4::from_scale_rotation_translation(scale, rotation, translation))
}

fn read_material(material: &Value) -> Material {
    let pbr = material.get("pbrMetallicRoughness");
    let base_color = pbr
        .and_then(|p| p.get("baseColorFactor"))
        .and_then(|c| f64_array::<4>(c, "baseColorFactor").ok())
        .map(|c| c.map(|x| x as f32))
        .unwrap_or([1.0, 1.0, 1.0, 1.0]);

    Material {
        name: material.get("name").and_then(Value::as_str).map(String::from),
        base_color,
        double_sided: material
            .get("doubleSided")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

/// Assemble a GLB container from a JSON document and BIN chunk.
pub fn write_glb(json: &Map<String, Value>, bin: &[u8]) -> Vec<u8> {
    let mut json_bytes = Value::Object(json.clone()).to_string().into_bytes();
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }
    let mut bin_bytes = bin.to_vec();
    while bin_bytes.len() % 4 != 0 {
        bin_bytes.push(0);
    }

    let mut total = 12 + 8 + json_bytes.len();
    if !bin_bytes.is_empty() {
        total += 8 + bin_bytes.len();
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_bytes);
    if !bin_bytes.is_empty() {
        out.extend_from_slice(&(bin_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin_bytes);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn triangle_glb(extra_node: Value) -> Vec<u8> {
        let mut bin = f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        bin.extend_from_slice(&[0u8, 1, 2, 0]);
        let json = json!({
            "asset": {"version": "2.0", "generator": "unit-test"},
            "extensions": {"CESIUM_RTC": {"center": [100.0, 200.0, 300.0]}},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [extra_node],
            "meshes": [{"primitives": [{
                "attributes": {"POSITION": 0},
                "indices": 1,
                "material": 0
            }]}],
            "materials": [{"name": "roof", "pbrMetallicRoughness": {"baseColorFactor": [0.5, 0.25, 1.0, 1.0]}}],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
                {"bufferView": 1, "componentType": 5121, "count": 3, "type": "SCALAR"}
            ],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 36},
                {"buffer": 0, "byteOffset": 36, "byteLength": 3}
            ],
            "buffers": [{"byteLength": 40}]
        });
        write_glb(json.as_object().unwrap(), &bin)
    }

    #[test]
    fn test_decode_triangle() {
        let glb = triangle_glb(json!({"mesh": 0, "translation": [1.0, 2.0, 3.0], "name": "tri"}));
        let model = GlbDecoder::new().decode_glb(&glb).unwrap();

        assert_eq!(model.rtc_center(), Some(DVec3::new(100.0, 200.0, 300.0)));
        assert_eq!(model.asset.as_ref().and_then(|a| a.get("version")), Some(&json!("2.0")));
        assert_eq!(model.scene.mesh_count(), 1);

        let node = &model.scene.children[0];
        assert_eq!(node.name.as_deref(), Some("tri"));
        assert_eq!(node.transform, DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0)));

        let mesh = node.mesh.as_ref().unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices, Some(vec![0, 1, 2]));
        assert_eq!(mesh.material.name.as_deref(), Some("roof"));
        assert_eq!(mesh.material.base_color, [0.5, 0.25, 1.0, 1.0]);
    }

    #[test]
    fn test_strided_interleaved_attributes() {
        // position(3) + uv(2) interleaved, stride 20
        let bin = f32_bytes(&[
            0.0, 0.0, 0.0, 0.1, 0.2, //
            1.0, 0.0, 0.0, 0.3, 0.4,
        ]);
        let json = json!({
            "nodes": [{"mesh": 0}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0, "TEXCOORD_0": 1, "_BATCHID": 2}}]}],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC3"},
                {"bufferView": 0, "byteOffset": 12, "componentType": 5126, "count": 2, "type": "VEC2"},
                {"componentType": 5123, "count": 2, "type": "SCALAR"}
            ],
            "bufferViews": [{"buffer": 0, "byteLength": 40, "byteStride": 20}]
        });
        let glb = write_glb(json.as_object().unwrap(), &bin);
        let model = GlbDecoder::new().decode_glb(&glb).unwrap();
        let mesh = model.scene.children[0].mesh.as_ref().unwrap();

        assert_eq!(mesh.attribute("position").unwrap().data, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(mesh.attribute("uv").unwrap().data, vec![0.1, 0.2, 0.3, 0.4]);
        // non-engine semantics keep a lower-cased name
        assert_eq!(mesh.attribute("_batchid").unwrap().data, vec![0.0, 0.0]);
    }

    #[test]
    fn test_multi_primitive_mesh_becomes_children() {
        let bin = f32_bytes(&[0.0; 9]);
        let json = json!({
            "nodes": [{"mesh": 0}],
            "meshes": [{"primitives": [
                {"attributes": {"POSITION": 0}},
                {"attributes": {"POSITION": 0}}
            ]}],
            "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}],
            "bufferViews": [{"buffer": 0, "byteLength": 36}]
        });
        let glb = write_glb(json.as_object().unwrap(), &bin);
        let model = GlbDecoder::new().decode_glb(&glb).unwrap();
        let node = &model.scene.children[0];
        assert!(node.mesh.is_none());
        assert_eq!(node.children.len(), 2);
        assert_eq!(model.scene.mesh_count(), 2);
    }

    #[test]
    fn test_rgba_color_becomes_rgb() {
        let json = json!({
            "nodes": [{"mesh": 0}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0, "COLOR_0": 1}}]}],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 1, "type": "VEC3"},
                {"bufferView": 1, "componentType": 5121, "normalized": true, "count": 1, "type": "VEC4"}
            ],
            "bufferViews": [
                {"buffer": 0, "byteLength": 12},
                {"buffer": 0, "byteOffset": 12, "byteLength": 4}
            ]
        });
        let mut bin = f32_bytes(&[0.0, 0.0, 0.0]);
        bin.extend_from_slice(&[255, 0, 255, 128]);
        let glb = write_glb(json.as_object().unwrap(), &bin);
        let model = GlbDecoder::new().decode_glb(&glb).unwrap();
        let color = model.scene.children[0].mesh.as_ref().unwrap().attribute("color").unwrap();
        assert_eq!(color.item_size, 3);
        assert_eq!(color.data, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rejects_bad_payloads() {
        assert!(matches!(GlbDecoder::new().decode_glb(b"nope"), Err(GlbError::Invalid(_))));

        let mut glb = triangle_glb(json!({"mesh": 0}));
        glb[0] = b'x';
        assert!(matches!(GlbDecoder::new().decode_glb(&glb), Err(GlbError::Invalid(_))));

        let json = json!({
            "nodes": [{"mesh": 0}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
            "accessors": [{"bufferView": 0, "componentType": 5126, "count": 10, "type": "VEC3"}],
            "bufferViews": [{"buffer": 0, "byteLength": 12}]
        });
        let glb = write_glb(json.as_object().unwrap(), &f32_bytes(&[0.0; 3]));
        let err = GlbDecoder::new().decode_glb(&glb).unwrap_err();
        assert!(err.to_string().contains("overruns"));
    }

    #[test]
    fn test_huge_accessor_counts_are_rejected() {
        let unbacked = json!({
            "nodes": [{"mesh": 0}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
            "accessors": [{"componentType": 5126, "count": 1u64 << 62, "type": "SCALAR"}]
        });
        let glb = write_glb(unbacked.as_object().unwrap(), &[]);
        let err = GlbDecoder::new().decode_glb(&glb).unwrap_err();
        assert!(matches!(err, GlbError::Invalid(_)));
        assert!(err.to_string().contains("too large"));

        // zero stride would repeat one element `count` times
        let zero_stride = json!({
            "nodes": [{"mesh": 0}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
            "accessors": [{"bufferView": 0, "componentType": 5126, "count": 1u64 << 40, "type": "VEC3"}],
            "bufferViews": [{"buffer": 0, "byteLength": 12, "byteStride": 0}]
        });
        let glb = write_glb(zero_stride.as_object().unwrap(), &f32_bytes(&[0.0; 3]));
        let err = GlbDecoder::new().decode_glb(&glb).unwrap_err();
        assert!(matches!(err, GlbError::Invalid(_)));
        assert!(err.to_string().contains("stride"));
    }

    #[test]
    fn test_shared_children_are_rejected() {
        // every node lists its successor twice; rebuilding would double per level
        let nodes: Vec<Value> = (0..21)
            .map(|i| if i < 20 { json!({"children": [i + 1, i + 1]}) } else { json!({}) })
            .collect();
        let doc = json!({"scenes": [{"nodes": [0]}], "nodes": nodes});
        let glb = write_glb(doc.as_object().unwrap(), &[]);
        let err = GlbDecoder::new().decode_glb(&glb).unwrap_err();
        assert!(err.to_string().contains("node 20 is reachable more than once"));

        let cyclic = json!({"nodes": [{"children": [1]}, {"children": [0]}], "scenes": [{"nodes": [0]}]});
        let glb = write_glb(cyclic.as_object().unwrap(), &[]);
        assert!(matches!(GlbDecoder::new().decode_glb(&glb), Err(GlbError::Invalid(_))));
    }

    #[test]
    fn test_draco_primitives_unsupported() {
        let json = json!({
            "nodes": [{"mesh": 0}],
            "meshes": [{"primitives": [{
                "attributes": {"POSITION": 0},
                "extensions": {"KHR_draco_mesh_compression": {"bufferView": 0, "attributes": {}}}
            }]}]
        });
        let glb = write_glb(json.as_object().unwrap(), &[]);
        assert!(matches!(GlbDecoder::new().decode_glb(&glb), Err(GlbError::Unsupported(_))));
    }
}
