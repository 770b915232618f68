//! Decoder for batched 3D model (b3dm) tile containers.
//!
//! A container is a 28-byte header, a feature table and a batch table (each a
//! JSON block plus a binary block) and an embedded glTF payload. Decoding
//! validates the envelope, resolves both tables, hands the payload to a
//! [`ModelDecoder`] and applies the reference-center and up-axis corrections
//! to the resulting scene. [`B3dmDecoder::decode_instanced`] additionally
//! merges every mesh into one buffer set for instanced drawing.
//!
//! ```no_run
//! use b3dm_decoder::{B3dmDecoder, CodecReadiness, DecodeOptions, GlbDecoder};
//!
//! # async fn run(bytes: Vec<u8>) -> b3dm_decoder::B3dmResult<()> {
//! let decoder = B3dmDecoder::new(GlbDecoder::new(), CodecReadiness::ready());
//! let scene = decoder.decode(&bytes, &DecodeOptions::default(), None).await?;
//! println!("{} meshes", scene.root.mesh_count());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod decoder;
pub mod envelope;
pub mod error;
pub mod merge;
pub mod model;
pub mod readiness;
pub mod spatial;
pub mod table;

pub use config::{DecodeOptions, InstancedOptions};
pub use decoder::{B3dmDecoder, DecodedScene, MeshCallback};
pub use envelope::{B3dmHeader, EnvelopeLayout, B3DM_MAGIC, HEADER_LEN};
pub use error::{B3dmError, B3dmResult};
pub use merge::{normalize_and_merge, GeometryGroup, InstancedBufferSet, MergedGeometry};
pub use model::{
    AttributeKind, DecodedModel, GlbDecoder, GlbError, Material, Mesh, ModelDecoder, SceneNode,
    VertexAttribute,
};
pub use readiness::{CodecReadiness, CodecRequirements, CodecState};
pub use spatial::{normalize_scene, Z_UP_TO_Y_UP};
pub use table::{BatchTable, FeatureTable};
