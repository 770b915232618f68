//! Local-origin translation and up-axis correction for decoded scenes

use glam::{DMat4, DVec3, DVec4};

use crate::config::DecodeOptions;
use crate::model::SceneNode;

/// Fixed 90 degree rotation about +X, row-major:
/// `[1 0 0 0; 0 0 -1 0; 0 1 0 0; 0 0 0 1]`. Maps +Y onto +Z.
pub const Z_UP_TO_Y_UP: DMat4 = DMat4::from_cols(
    DVec4::new(1.0, 0.0, 0.0, 0.0),
    DVec4::new(0.0, 0.0, 1.0, 0.0),
    DVec4::new(0.0, -1.0, 0.0, 0.0),
    DVec4::new(0.0, 0.0, 0.0, 1.0),
);

/// Where the applied reference center came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcSource {
    FeatureTable,
    EmbeddedExtension,
}

/// Translate the scene root by the reference center, if any.
///
/// The feature table's center takes precedence; at most one source is applied.
pub fn apply_local_origin(
    root: &mut SceneNode,
    feature_table_center: Option<DVec3>,
    embedded_center: Option<DVec3>,
) -> Option<(RtcSource, DVec3)> {
    let (source, center) = match (feature_table_center, embedded_center) {
        (Some(center), embedded) => {
            if let Some(ignored) = embedded {
                log::debug!(
                    "RTC_CENTER {:?} from feature table overrides embedded center {:?}",
                    center,
                    ignored
                );
            }
            (RtcSource::FeatureTable, center)
        }
        (None, Some(center)) => (RtcSource::EmbeddedExtension, center),
        (None, None) => return None,
    };

    root.apply_matrix(&DMat4::from_translation(center));
    Some((source, center))
}

/// Apply the axis swap to the root and/or every mesh node.
pub fn apply_up_axis(root: &mut SceneNode, options: &DecodeOptions) {
    if options.scene_z_up_to_y_up {
        root.apply_matrix(&Z_UP_TO_Y_UP);
    }
    if options.mesh_z_up_to_y_up {
        root.traverse_mut(&mut |node| {
            if node.is_mesh() {
                node.apply_matrix(&Z_UP_TO_Y_UP);
            }
        });
    }
}

/// Run both corrections in order, then hand every mesh node to `mesh_callback`.
pub fn normalize_scene(
    root: &mut SceneNode,
    feature_table_center: Option<DVec3>,
    embedded_center: Option<DVec3>,
    options: &DecodeOptions,
    mesh_callback: Option<&mut (dyn FnMut(&mut SceneNode) + Send)>,
) -> Option<DVec3> {
    let applied = apply_local_origin(root, feature_table_center, embedded_center);
    apply_up_axis(root, options);

    if let Some(callback) = mesh_callback {
        root.traverse_mut(&mut |node| {
            if node.is_mesh() {
                callback(node);
            }
        });
    }

    applied.map(|(_, center)| center)
}
