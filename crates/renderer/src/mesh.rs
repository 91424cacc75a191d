//! Hardcoded demo geometry.

use glam::{Vec2, Vec3};
use practices_core::DemoScene;
use practices_rhi::vertex::Vertex;

pub const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex::new(Vec2::new(0.0, -0.5), Vec3::new(1.0, 0.0, 0.0)),
    Vertex::new(Vec2::new(0.5, 0.5), Vec3::new(0.0, 1.0, 0.0)),
    Vertex::new(Vec2::new(-0.5, 0.5), Vec3::new(0.0, 0.0, 1.0)),
];

pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new(Vec2::new(-0.5, -0.5), Vec3::new(1.0, 0.0, 0.0)),
    Vertex::new(Vec2::new(0.5, -0.5), Vec3::new(0.0, 1.0, 0.0)),
    Vertex::new(Vec2::new(0.5, 0.5), Vec3::new(0.0, 0.0, 1.0)),
    Vertex::new(Vec2::new(-0.5, 0.5), Vec3::new(1.0, 1.0, 1.0)),
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Geometry for one demo scene. Drawn indexed when `indices` is set.
#[derive(Clone, Copy, Debug)]
pub struct MeshData {
    pub vertices: &'static [Vertex],
    pub indices: Option<&'static [u16]>,
}

impl MeshData {
    pub fn for_scene(scene: DemoScene) -> Self {
        match scene {
            DemoScene::Triangle => Self {
                vertices: &TRIANGLE_VERTICES,
                indices: None,
            },
            DemoScene::Quad => Self {
                vertices: &QUAD_VERTICES,
                indices: Some(&QUAD_INDICES),
            },
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> Option<u32> {
        self.indices.map(|indices| indices.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_is_not_indexed() {
        let mesh = MeshData::for_scene(DemoScene::Triangle);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), None);
    }

    #[test]
    fn test_quad_is_two_triangles() {
        let mesh = MeshData::for_scene(DemoScene::Quad);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.index_count(), Some(6));
    }

    #[test]
    fn test_quad_indices_in_range() {
        assert!(
            QUAD_INDICES
                .iter()
                .all(|&i| (i as usize) < QUAD_VERTICES.len())
        );
    }
}
