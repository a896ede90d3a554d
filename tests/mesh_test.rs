use render_sandbox::{
    data_structures::model::ModelVertex,
    resources::mesh::{compute_normals, compute_tangents},
};

use crate::common::test_utils::assert_vec3_eq;

mod common;

fn vertex(position: [f32; 3], tex_coords: [f32; 2]) -> ModelVertex {
    ModelVertex {
        position,
        tex_coords,
        normal: [0.0, 0.0, 1.0],
        ..Default::default()
    }
}

/// Unit quad in the xy plane with u along +x and v along -y.
fn quad() -> (Vec<ModelVertex>, Vec<u32>) {
    let vertices = vec![
        vertex([0.0, 0.0, 0.0], [0.0, 1.0]),
        vertex([1.0, 0.0, 0.0], [1.0, 1.0]),
        vertex([1.0, 1.0, 0.0], [1.0, 0.0]),
        vertex([0.0, 1.0, 0.0], [0.0, 0.0]),
    ];
    (vertices, vec![0, 1, 2, 0, 2, 3])
}

#[test]
fn should_align_tangents_with_u_direction() {
    let (mut vertices, indices) = quad();
    compute_tangents(&mut vertices, &indices);
    for v in &vertices {
        assert_vec3_eq(v.tangent, [1.0, 0.0, 0.0]);
    }
}

#[test]
fn should_leave_degenerate_uvs_alone() {
    let mut vertices = vec![
        vertex([0.0, 0.0, 0.0], [0.5, 0.5]),
        vertex([1.0, 0.0, 0.0], [0.5, 0.5]),
        vertex([0.0, 1.0, 0.0], [0.5, 0.5]),
    ];
    compute_tangents(&mut vertices, &[0, 1, 2]);
    for v in &vertices {
        assert_eq!(v.tangent, [0.0; 3]);
        assert!(v.bitangent.iter().all(|c| c.is_finite()));
    }
}

#[test]
fn should_ignore_out_of_range_indices() {
    let (mut vertices, _) = quad();
    compute_tangents(&mut vertices, &[0, 1, 9]);
    compute_normals(&mut vertices, &[0, 1, 9]);
    for v in &vertices {
        assert_eq!(v.tangent, [0.0; 3]);
        assert_eq!(v.normal, [0.0, 1.0, 0.0]);
    }
}

#[test]
fn should_compute_face_normals_from_winding() {
    let (mut vertices, indices) = quad();
    for v in vertices.iter_mut() {
        v.normal = [0.0; 3];
    }
    compute_normals(&mut vertices, &indices);
    for v in &vertices {
        assert_vec3_eq(v.normal, [0.0, 0.0, 1.0]);
    }

    let reversed: Vec<u32> = indices.chunks(3).flat_map(|t| [t[0], t[2], t[1]]).collect();
    compute_normals(&mut vertices, &reversed);
    for v in &vertices {
        assert_vec3_eq(v.normal, [0.0, 0.0, -1.0]);
    }
}

#[test]
fn should_weight_shared_normals_by_area() {
    // A large triangle facing +z and a small one facing +x share vertex 0
    let mut vertices = vec![
        vertex([0.0, 0.0, 0.0], [0.0; 2]),
        vertex([10.0, 0.0, 0.0], [0.0; 2]),
        vertex([0.0, 10.0, 0.0], [0.0; 2]),
        vertex([0.0, 0.1, 0.0], [0.0; 2]),
        vertex([0.0, 0.0, 0.1], [0.0; 2]),
    ];
    compute_normals(&mut vertices, &[0, 1, 2, 0, 3, 4]);
    let n = vertices[0].normal;
    assert!(n[2] > 0.99, "large face should dominate, got {:?}", n);
    assert!(n[0] > 0.0);
}
