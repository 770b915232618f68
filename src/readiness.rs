//! Codec readiness signal
//!
//! Model decoders may depend on auxiliary codecs (compressed meshes,
//! compressed textures) that initialize asynchronously. The initialization
//! path marks each codec ready once; decodes await the state they need
//! instead of polling for it.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{B3dmError, B3dmResult};

/// Codecs a model decoder needs before it can run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecRequirements {
    /// Compressed-mesh decoder (e.g. Draco)
    pub mesh_codec: bool,
    /// Compressed-texture transcoder (e.g. KTX2/Basis)
    pub texture_codec: bool,
}

impl CodecRequirements {
    pub const NONE: Self = Self {
        mesh_codec: false,
        texture_codec: false,
    };
}

/// Which codecs have finished initializing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecState {
    pub mesh_codec_ready: bool,
    pub texture_codec_ready: bool,
}

impl CodecState {
    pub fn satisfies(&self, requirements: CodecRequirements) -> bool {
        (!requirements.mesh_codec || self.mesh_codec_ready)
            && (!requirements.texture_codec || self.texture_codec_ready)
    }
}

/// Shared, clonable readiness flag set by the codec initialization path.
///
/// Decoders only read it.
#[derive(Debug, Clone)]
pub struct CodecReadiness {
    tx: Arc<watch::Sender<CodecState>>,
}

impl Default for CodecReadiness {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecReadiness {
    /// Nothing initialized yet.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CodecState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Every codec already available.
    pub fn ready() -> Self {
        let readiness = Self::new();
        readiness.mark_mesh_codec_ready();
        readiness.mark_texture_codec_ready();
        readiness
    }

    pub fn mark_mesh_codec_ready(&self) {
        self.tx.send_modify(|state| state.mesh_codec_ready = true);
        log::debug!("mesh codec ready");
    }

    pub fn mark_texture_codec_ready(&self) {
        self.tx.send_modify(|state| state.texture_codec_ready = true);
        log::debug!("texture codec ready");
    }

    pub fn state(&self) -> CodecState {
        *self.tx.borrow()
    }

    /// Resolve once the state satisfies `requirements`. There is no timeout;
    /// callers wanting one wrap this future.
    pub async fn wait_for(&self, requirements: CodecRequirements) -> B3dmResult<()> {
        let mut rx = self.tx.subscribe();
        let satisfied = rx
            .wait_for(|state| state.satisfies(requirements))
            .await
            .is_ok();
        if satisfied {
            Ok(())
        } else {
            Err(B3dmError::payload("codec readiness signal closed"))
        }
    }
}
