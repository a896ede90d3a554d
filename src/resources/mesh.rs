use cgmath::InnerSpace;

use crate::data_structures::model;

/// Smooth vertex normals from area-weighted face normals.
pub fn compute_normals(vertices: &mut [model::ModelVertex], indices: &[u32]) {
    let mut normals = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];
    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let p0: cgmath::Vector3<f32> = vertices[i0].position.into();
        let p1: cgmath::Vector3<f32> = vertices[i1].position.into();
        let p2: cgmath::Vector3<f32> = vertices[i2].position.into();
        // Unnormalized cross product weights by triangle area
        let face = (p1 - p0).cross(p2 - p0);
        for i in [i0, i1, i2] {
            normals[i] += face;
        }
    }
    for (vertex, normal) in vertices.iter_mut().zip(normals) {
        vertex.normal = if normal.magnitude2() > 0.0 {
            normal.normalize().into()
        } else {
            [0.0, 1.0, 0.0]
        };
    }
}

/**
 * Fill in tangents and bitangents for vertices that came without them.
 *
 * Tangents are accumulated per triangle from the UV gradients and averaged
 * over every triangle that touches a vertex. Degenerate UVs leave the
 * contribution out instead of poisoning the average with NaNs.
 */
pub fn compute_tangents(vertices: &mut [model::ModelVertex], indices: &[u32]) {
    let mut tangents = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];
    let mut bitangents = tangents.clone();
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let (v0, v1, v2) = (vertices[i0], vertices[i1], vertices[i2]);

        let pos0: cgmath::Vector3<_> = v0.position.into();
        let pos1: cgmath::Vector3<_> = v1.position.into();
        let pos2: cgmath::Vector3<_> = v2.position.into();

        let uv0: cgmath::Vector2<_> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<_> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<_> = v2.tex_coords.into();

        // Calculate the edges of the triangle
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;

        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving the following system of equations gives tangent and bitangent:
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // Flipped to get right-handed normal maps with wgpu texture coordinates
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for i in [i0, i1, i2] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
            triangles_included[i] += 1;
        }
    }

    // Average the tangents/bitangents
    for (i, n) in triangles_included.into_iter().enumerate() {
        if n == 0 {
            continue;
        }
        let denom = 1.0 / n as f32;
        let v = &mut vertices[i];
        v.tangent = (tangents[i] * denom).into();
        v.bitangent = (bitangents[i] * denom).into();
    }
}
