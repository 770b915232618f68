// tests/test_instanced_merge.rs
// Instanced decode path: attribute unification, baking and index handling.
// RELEVANT FILES:src/merge.rs,src/decoder.rs,src/model/mod.rs

mod support;

use b3dm_decoder::{
    AttributeKind, B3dmDecoder, CodecReadiness, DecodeOptions, GeometryGroup, GlbDecoder,
    InstancedOptions,
};
use glam::DMat4;
use serde_json::json;
use support::{b3dm, glb, MeshSpec, Tables};

fn decoder() -> B3dmDecoder<GlbDecoder> {
    B3dmDecoder::new(GlbDecoder::new(), CodecReadiness::ready())
}

#[tokio::test]
async fn disjoint_attribute_sets_are_unified() {
    let meshes = [
        MeshSpec::new(4),
        MeshSpec::new(6).with_normals(),
        MeshSpec::new(8).with_uvs(),
    ];
    let data = b3dm(&Tables::default(), &glb(&meshes, None));

    let set = decoder()
        .decode_instanced(&data, &InstancedOptions::with_capacity(32), None)
        .await
        .unwrap();
    let geometry = &set.geometry;

    assert_eq!(set.capacity, 32);
    assert_eq!(set.base_transform, DMat4::IDENTITY);
    assert_eq!(geometry.vertex_count, 18);
    assert_eq!(
        geometry.attributes.keys().copied().collect::<Vec<_>>(),
        vec![AttributeKind::Position, AttributeKind::Normal, AttributeKind::Uv]
    );

    let normal = &geometry.attribute(AttributeKind::Normal).unwrap().data;
    assert_eq!(normal.len(), 18 * 3);
    assert!(normal[..4 * 3].iter().all(|&x| x == 0.0));
    assert!(normal[4 * 3..10 * 3].chunks(3).all(|n| n == [0.0, 0.0, 1.0]));
    assert!(normal[10 * 3..].iter().all(|&x| x == 0.0));

    let uv = &geometry.attribute(AttributeKind::Uv).unwrap().data;
    assert_eq!(uv.len(), 18 * 2);
    assert!(uv[..10 * 2].iter().all(|&x| x == 0.0));
    assert!(uv[10 * 2..].iter().all(|&x| x == 0.5));

    assert_eq!(geometry.indices, None);
    assert_eq!(
        geometry.groups,
        vec![
            GeometryGroup { start: 0, count: 4, material_index: 0 },
            GeometryGroup { start: 4, count: 6, material_index: 1 },
            GeometryGroup { start: 10, count: 8, material_index: 2 },
        ]
    );
    assert_eq!(set.materials.len(), 3);
    assert!(set
        .materials
        .iter()
        .all(|m| m.name.as_deref() == Some("default")));
}

#[tokio::test]
async fn node_and_rtc_transforms_are_baked() {
    let tables = Tables::feature(json!({"BATCH_LENGTH": 0, "RTC_CENTER": [10.0, 0.0, -5.0]}));
    let meshes = [MeshSpec::new(2), MeshSpec::new(1).translated([0.0, 0.0, 3.0])];
    let data = b3dm(&tables, &glb(&meshes, None));

    let set = decoder()
        .decode_instanced(&data, &InstancedOptions::default(), None)
        .await
        .unwrap();
    let positions = &set.geometry.attribute(AttributeKind::Position).unwrap().data;
    assert_eq!(
        positions,
        &vec![10.0, 0.0, -5.0, 11.0, 0.0, -5.0, 10.0, 0.0, -2.0]
    );
}

#[tokio::test]
async fn mesh_axis_swap_is_baked() {
    let data = b3dm(
        &Tables::default(),
        &glb(&[MeshSpec::new(2).translated([0.0, 1.0, 0.0])], None),
    );
    let options = InstancedOptions {
        decode: DecodeOptions {
            scene_z_up_to_y_up: false,
            mesh_z_up_to_y_up: true,
        },
        capacity: 4,
    };

    let set = decoder().decode_instanced(&data, &options, None).await.unwrap();
    let positions = &set.geometry.attribute(AttributeKind::Position).unwrap().data;
    // (x, y, z) -> (x, -z, y) after the node's own translation
    assert_eq!(positions, &vec![0.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
}

#[tokio::test]
async fn mixed_indexing_generates_sequential_indices() {
    let meshes = [MeshSpec::new(3).indexed(), MeshSpec::new(2)];
    let data = b3dm(&Tables::default(), &glb(&meshes, None));

    let set = decoder()
        .decode_instanced(&data, &InstancedOptions::default(), None)
        .await
        .unwrap();
    let geometry = &set.geometry;
    assert_eq!(geometry.indices, Some(vec![2, 1, 0, 3, 4]));
    assert_eq!(geometry.groups[1], GeometryGroup { start: 3, count: 2, material_index: 1 });
    assert_eq!(geometry.index_bytes().map(<[u8]>::len), Some(5 * 4));
}

#[tokio::test]
async fn instanced_decode_is_deterministic() {
    let meshes = [
        MeshSpec::new(3).with_normals().indexed(),
        MeshSpec::new(5).with_uvs().translated([1.0, 2.0, 3.0]),
    ];
    let data = b3dm(
        &Tables::feature(json!({"BATCH_LENGTH": 0, "RTC_CENTER": [1e6, 2e6, 3e6]})),
        &glb(&meshes, None),
    );
    let options = InstancedOptions::with_capacity(8);

    let decoder = decoder();
    let a = decoder.decode_instanced(&data, &options, None).await.unwrap();
    let b = decoder.decode_instanced(&data, &options, None).await.unwrap();
    assert_eq!(a, b);
    for kind in AttributeKind::ALL {
        assert_eq!(a.geometry.attribute_bytes(kind), b.geometry.attribute_bytes(kind));
    }
}
