//! B3DM decode pipeline
//!
//! envelope → feature table → batch table → model payload → spatial
//! corrections, plus the geometry merge on the instanced path. Every
//! structural check runs before the model decoder is invoked.

use std::path::Path;

use glam::DVec3;
use serde_json::Value;

use crate::config::{DecodeOptions, InstancedOptions};
use crate::envelope::{B3dmHeader, EnvelopeLayout};
use crate::error::{B3dmError, B3dmResult};
use crate::merge::{normalize_and_merge, InstancedBufferSet};
use crate::model::{ModelDecoder, SceneNode};
use crate::readiness::CodecReadiness;
use crate::spatial::normalize_scene;
use crate::table::{BatchTable, FeatureTable};

/// Callback invoked once per mesh node after the spatial corrections
pub type MeshCallback<'a> = &'a mut (dyn FnMut(&mut SceneNode) + Send);

/// A decoded container
#[derive(Debug, Clone)]
pub struct DecodedScene {
    pub header: B3dmHeader,
    pub root: SceneNode,
    pub feature_table: FeatureTable,
    /// Per-feature metadata, one entry per feature
    pub batch_table: BatchTable,
    /// The model payload's `asset` object
    pub asset: Option<Value>,
    /// Reference center applied to the root, if any
    pub rtc_center: Option<DVec3>,
}

/// Parsed container tables, before the payload is decoded
#[derive(Debug, Clone)]
struct ParsedEnvelope {
    layout: EnvelopeLayout,
    feature_table: FeatureTable,
    batch_table: BatchTable,
}

fn parse_envelope(data: &[u8]) -> B3dmResult<ParsedEnvelope> {
    let layout = EnvelopeLayout::parse(data)?;
    let feature_table = FeatureTable::parse(
        &data[layout.feature_table_json.clone()],
        &data[layout.feature_table_binary.clone()],
    )?;
    let batch_table = BatchTable::parse(
        &data[layout.batch_table_json.clone()],
        &data[layout.batch_table_binary.clone()],
        feature_table.batch_length() as usize,
    )?;
    Ok(ParsedEnvelope {
        layout,
        feature_table,
        batch_table,
    })
}

/// Decoder for b3dm containers, generic over the embedded model decoder
#[derive(Debug, Clone)]
pub struct B3dmDecoder<D> {
    model_decoder: D,
    readiness: CodecReadiness,
}

impl<D: ModelDecoder> B3dmDecoder<D> {
    pub fn new(model_decoder: D, readiness: CodecReadiness) -> Self {
        Self {
            model_decoder,
            readiness,
        }
    }

    pub fn model_decoder(&self) -> &D {
        &self.model_decoder
    }

    pub fn readiness(&self) -> &CodecReadiness {
        &self.readiness
    }

    /// Decode a container into a scene.
    ///
    /// Suspends only while waiting for the model decoder's codecs and for the
    /// model decoder itself.
    pub async fn decode(
        &self,
        data: &[u8],
        options: &DecodeOptions,
        mesh_callback: Option<MeshCallback<'_>>,
    ) -> B3dmResult<DecodedScene> {
        options.validate()?;
        let parsed = parse_envelope(data)?;

        self.readiness
            .wait_for(self.model_decoder.requirements())
            .await?;

        let payload = parsed
            .layout
            .payload(data)
            .ok_or(B3dmError::TruncatedBuffer {
                section: "payload",
                end: parsed.layout.payload.end as u64,
                available: data.len() as u64,
            })?;
        let mut model = self
            .model_decoder
            .decode(payload)
            .await
            .map_err(B3dmError::payload)?;

        let embedded_center = model.rtc_center();
        let rtc_center = normalize_scene(
            &mut model.scene,
            parsed.feature_table.rtc_center(),
            embedded_center,
            options,
            mesh_callback,
        );

        log::debug!(
            "decoded b3dm: {} meshes, {} features, rtc center {:?}",
            model.scene.mesh_count(),
            parsed.feature_table.batch_length(),
            rtc_center
        );

        Ok(DecodedScene {
            header: parsed.layout.header,
            root: model.scene,
            feature_table: parsed.feature_table,
            batch_table: parsed.batch_table,
            asset: model.asset,
            rtc_center,
        })
    }

    /// Decode a container and merge every mesh into one instanceable
    /// buffer set. Expects a shallow hierarchy; nested transforms are baked.
    pub async fn decode_instanced(
        &self,
        data: &[u8],
        options: &InstancedOptions,
        mesh_callback: Option<MeshCallback<'_>>,
    ) -> B3dmResult<InstancedBufferSet> {
        options.validate()?;
        let scene = self.decode(data, &options.decode, mesh_callback).await?;
        let (geometry, materials) = normalize_and_merge(scene.root.into_world_meshes())?;
        Ok(InstancedBufferSet::new(geometry, materials, options.capacity))
    }

    /// Read a container from disk and decode it.
    pub async fn decode_file<P: AsRef<Path>>(
        &self,
        path: P,
        options: &DecodeOptions,
        mesh_callback: Option<MeshCallback<'_>>,
    ) -> B3dmResult<DecodedScene> {
        let data = tokio::fs::read(path).await?;
        self.decode(&data, options, mesh_callback).await
    }
}
