// tests/support/mod.rs
// Builders for synthetic b3dm containers and their GLB payloads.
// RELEVANT FILES:src/envelope.rs,src/model/glb.rs

#![allow(dead_code)]

use b3dm_decoder::model::write_glb;
use b3dm_decoder::{B3dmHeader, HEADER_LEN};
use serde_json::{json, Map, Value};

/// One mesh primitive of a synthetic GLB.
#[derive(Debug, Clone, Default)]
pub struct MeshSpec {
    pub vertices: usize,
    pub normals: bool,
    pub uvs: bool,
    pub indexed: bool,
    pub translation: Option<[f64; 3]>,
}

impl MeshSpec {
    pub fn new(vertices: usize) -> Self {
        Self {
            vertices,
            ..Self::default()
        }
    }

    pub fn with_normals(mut self) -> Self {
        self.normals = true;
        self
    }

    pub fn with_uvs(mut self) -> Self {
        self.uvs = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn translated(mut self, t: [f64; 3]) -> Self {
        self.translation = Some(t);
        self
    }
}

/// Accumulates BIN bytes plus the matching bufferViews and accessors.
#[derive(Default)]
struct GlbBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl GlbBuilder {
    fn push_f32(&mut self, values: &[f32], kind: &str, count: usize) -> usize {
        let offset = self.bin.len();
        self.bin.extend(values.iter().flat_map(|v| v.to_le_bytes()));
        self.push_accessor(offset, values.len() * 4, 5126, kind, count)
    }

    fn push_u16(&mut self, values: &[u16]) -> usize {
        let offset = self.bin.len();
        self.bin.extend(values.iter().flat_map(|v| v.to_le_bytes()));
        let len = values.len() * 2;
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        self.push_accessor(offset, len, 5123, "SCALAR", values.len())
    }

    fn push_accessor(&mut self, offset: usize, len: usize, code: u32, kind: &str, count: usize) -> usize {
        self.views
            .push(json!({"buffer": 0, "byteOffset": offset, "byteLength": len}));
        self.accessors.push(json!({
            "bufferView": self.views.len() - 1,
            "componentType": code,
            "count": count,
            "type": kind
        }));
        self.accessors.len() - 1
    }
}

/// Build a GLB with one root node per mesh. Positions are `(i, 0, 0)` for
/// vertex `i`; normals point along +Z and uvs are `(0.5, 0.5)`.
pub fn glb(meshes: &[MeshSpec], extensions: Option<Value>) -> Vec<u8> {
    let mut builder = GlbBuilder::default();
    let mut json_meshes = Vec::new();
    let mut nodes = Vec::new();

    for (index, mesh) in meshes.iter().enumerate() {
        let positions: Vec<f32> = (0..mesh.vertices).flat_map(|i| [i as f32, 0.0, 0.0]).collect();
        let mut attributes = Map::new();
        attributes.insert(
            "POSITION".to_string(),
            json!(builder.push_f32(&positions, "VEC3", mesh.vertices)),
        );
        if mesh.normals {
            let normals = [0.0f32, 0.0, 1.0].repeat(mesh.vertices);
            attributes.insert(
                "NORMAL".to_string(),
                json!(builder.push_f32(&normals, "VEC3", mesh.vertices)),
            );
        }
        if mesh.uvs {
            let uvs = vec![0.5f32; mesh.vertices * 2];
            attributes.insert(
                "TEXCOORD_0".to_string(),
                json!(builder.push_f32(&uvs, "VEC2", mesh.vertices)),
            );
        }

        let mut primitive = json!({"attributes": attributes, "material": 0});
        if mesh.indexed {
            let indices: Vec<u16> = (0..mesh.vertices as u16).rev().collect();
            primitive["indices"] = json!(builder.push_u16(&indices));
        }
        json_meshes.push(json!({"primitives": [primitive]}));

        let mut node = json!({"mesh": index, "name": format!("mesh-{index}")});
        if let Some(t) = mesh.translation {
            node["translation"] = json!(t);
        }
        nodes.push(node);
    }

    let mut doc = json!({
        "asset": {"version": "2.0", "generator": "b3dm-decoder tests"},
        "scene": 0,
        "scenes": [{"nodes": (0..meshes.len()).collect::<Vec<_>>()}],
        "nodes": nodes,
        "meshes": json_meshes,
        "materials": [{"name": "default"}],
        "accessors": builder.accessors,
        "bufferViews": builder.views,
        "buffers": [{"byteLength": builder.bin.len()}]
    });
    if let Some(ext) = extensions {
        doc["extensions"] = ext;
    }
    write_glb(doc.as_object().unwrap(), &builder.bin)
}

/// The four table blocks of a container.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub feature_json: Vec<u8>,
    pub feature_binary: Vec<u8>,
    pub batch_json: Vec<u8>,
    pub batch_binary: Vec<u8>,
}

impl Tables {
    pub fn feature(json: Value) -> Self {
        Self {
            feature_json: padded_json(&json),
            ..Self::default()
        }
    }

    pub fn with_feature_binary(mut self, bytes: Vec<u8>) -> Self {
        self.feature_binary = bytes;
        self
    }

    pub fn with_batch(mut self, json: Value, binary: Vec<u8>) -> Self {
        self.batch_json = padded_json(&json);
        self.batch_binary = binary;
        self
    }
}

/// JSON text padded with spaces to an 8-byte boundary, as writers do.
pub fn padded_json(value: &Value) -> Vec<u8> {
    let mut bytes = value.to_string().into_bytes();
    while (HEADER_LEN + bytes.len()) % 8 != 0 {
        bytes.push(b' ');
    }
    bytes
}

/// Assemble a b3dm container around `payload`.
pub fn b3dm(tables: &Tables, payload: &[u8]) -> Vec<u8> {
    let total = HEADER_LEN
        + tables.feature_json.len()
        + tables.feature_binary.len()
        + tables.batch_json.len()
        + tables.batch_binary.len()
        + payload.len();
    let header = B3dmHeader {
        magic: *b"b3dm",
        version: 1,
        byte_length: total as u32,
        feature_table_json_byte_length: tables.feature_json.len() as u32,
        feature_table_binary_byte_length: tables.feature_binary.len() as u32,
        batch_table_json_byte_length: tables.batch_json.len() as u32,
        batch_table_binary_byte_length: tables.batch_binary.len() as u32,
    };

    let mut out = header.to_le_bytes().to_vec();
    out.extend_from_slice(&tables.feature_json);
    out.extend_from_slice(&tables.feature_binary);
    out.extend_from_slice(&tables.batch_json);
    out.extend_from_slice(&tables.batch_binary);
    out.extend_from_slice(payload);
    out
}
