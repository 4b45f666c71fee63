//! Static ribbon geometry shared by every line instance.
//!
//! Each line point contributes two vertices, one on either side of the line, and each
//! segment between consecutive points becomes a quad of two triangles. The vertices
//! carry only the point index and side; actual positions are fetched from the
//! position grid in the vertex shader.

use bytemuck::{Pod, Zeroable};

/// One ribbon vertex.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct LineVertex {
    /// Row of the position grid this vertex follows.
    pub line_point: u32,
    /// `-1` for the left edge, `+1` for the right.
    pub side: i32,
}

/// Vertex and index lists for one `num_line_points` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineGeometry {
    pub vertices: Vec<LineVertex>,
    pub indices: Vec<u32>,
}

impl LineGeometry {
    pub fn new(num_line_points: u32) -> Self {
        let vertices = (0..num_line_points)
            .flat_map(|point| {
                [
                    LineVertex { line_point: point, side: -1 },
                    LineVertex { line_point: point, side: 1 },
                ]
            })
            .collect();

        let segments = num_line_points.saturating_sub(1);
        let mut indices = Vec::with_capacity(segments as usize * 6);
        for i in 0..segments {
            let bottom_left = i * 2;
            let bottom_right = i * 2 + 1;
            let top_left = i * 2 + 2;
            let top_right = i * 2 + 3;
            indices.extend_from_slice(&[
                bottom_right,
                top_right,
                bottom_left,
                bottom_left,
                top_right,
                top_left,
            ]);
        }

        Self { vertices, indices }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}
