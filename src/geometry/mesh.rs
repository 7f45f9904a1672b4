//! Indexed triangle mesh with per-vertex normals and texture
//! coordinates, loadable from OBJ files. Traversal is a linear scan over
//! the triangles guarded by a bounding-box slab test; spatial
//! acceleration lives outside the core.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};

use crate::light::area::intersect_triangle;
use crate::math::{Ray, ShadingFrame};

use super::{intersect_aabb, Shape, ShapeHit};

#[derive(Clone)]
pub struct Mesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,
    indices: Vec<u32>,
    bounds_min: Vec3,
    bounds_max: Vec3,
}

impl Mesh {
    pub fn new(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        texcoords: Vec<Vec2>,
        indices: Vec<u32>,
    ) -> Self {
        let mut bounds_min = Vec3::splat(f32::MAX);
        let mut bounds_max = Vec3::splat(f32::MIN);
        for p in &positions {
            bounds_min = bounds_min.min(*p);
            bounds_max = bounds_max.max(*p);
        }
        Self {
            positions,
            normals,
            texcoords,
            indices,
            bounds_min,
            bounds_max,
        }
    }

    /// Load every model of an OBJ file into a single mesh. Normals are
    /// required; texture coordinates default to zero when missing.
    pub fn load_obj(path: &Path) -> Result<Self> {
        let (models, _materials) = tobj::load_obj(path)
            .map_err(|e| anyhow!("{:?}", e))
            .with_context(|| format!("failed to load mesh {}", path.display()))?;

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut texcoords = Vec::new();
        let mut indices = Vec::new();

        for model in models {
            let mesh = model.mesh;
            if mesh.normals.is_empty() {
                return Err(anyhow!(
                    "mesh '{}' in {} has no normals",
                    model.name,
                    path.display()
                ));
            }
            info!(
                "loaded model '{}': {} triangles",
                model.name,
                mesh.indices.len() / 3
            );

            let base = positions.len() as u32;
            for p in mesh.positions.chunks(3) {
                positions.push(Vec3::new(p[0], p[1], p[2]));
            }
            for n in mesh.normals.chunks(3) {
                normals.push(Vec3::new(n[0], n[1], n[2]));
            }
            if mesh.texcoords.is_empty() {
                texcoords.extend(std::iter::repeat(Vec2::ZERO).take(mesh.positions.len() / 3));
            } else {
                for t in mesh.texcoords.chunks(2) {
                    texcoords.push(Vec2::new(t[0], t[1]));
                }
            }
            indices.extend(mesh.indices.iter().map(|i| base + i));
        }

        if indices.is_empty() {
            return Err(anyhow!("{} contains no triangles", path.display()));
        }
        Ok(Self::new(positions, normals, texcoords, indices))
    }

    pub fn triangle_count(&self) -> u32 {
        (self.indices.len() / 3) as u32
    }

    fn triangle(&self, index: u32) -> (Vec3, Vec3, Vec3) {
        let i = index as usize * 3;
        (
            self.positions[self.indices[i] as usize],
            self.positions[self.indices[i + 1] as usize],
            self.positions[self.indices[i + 2] as usize],
        )
    }
}

impl Shape for Mesh {
    fn intersect(&self, ray: &Ray) -> Option<ShapeHit> {
        if !intersect_aabb(ray, self.bounds_min, self.bounds_max, f32::MAX) {
            return None;
        }

        let mut best: Option<ShapeHit> = None;
        for tri in 0..self.triangle_count() {
            let (p0, p1, p2) = self.triangle(tri);
            if let Some((t, u, v)) = intersect_triangle(ray, p0, p1 - p0, p2 - p0) {
                if best.map_or(true, |b| t < b.distance) {
                    best = Some(ShapeHit {
                        distance: t,
                        u,
                        v,
                        sub_object_id: tri,
                    });
                }
            }
        }
        best
    }

    fn shading_frame(&self, ray: &Ray, hit: &ShapeHit) -> (ShadingFrame, Vec2) {
        let i = hit.sub_object_id as usize * 3;
        let (i0, i1, i2) = (
            self.indices[i] as usize,
            self.indices[i + 1] as usize,
            self.indices[i + 2] as usize,
        );
        let w = 1.0 - hit.u - hit.v;

        let normal = (self.normals[i0] * w + self.normals[i1] * hit.u + self.normals[i2] * hit.v)
            .normalize();
        let uv =
            self.texcoords[i0] * w + self.texcoords[i1] * hit.u + self.texcoords[i2] * hit.v;

        let position = ray.at(hit.distance);
        (ShadingFrame::new(position, normal), uv)
    }

    fn bounds(&self) -> Option<(Vec3, Vec3)> {
        Some((self.bounds_min, self.bounds_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        // unit quad in the XZ plane at y = 0, facing +Y
        Mesh::new(
            vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(-1.0, 0.0, 1.0),
            ],
            vec![Vec3::Y; 4],
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn finds_the_nearest_triangle() {
        let mesh = quad();
        let ray = Ray::new(Vec3::new(0.2, 2.0, 0.3), Vec3::new(0.0, -1.0, 0.0));
        let hit = mesh.intersect(&ray).expect("quad missed");
        assert!((hit.distance - 2.0).abs() < 1.0e-4);
        let (frame, _) = mesh.shading_frame(&ray, &hit);
        assert!((frame.normal - Vec3::Y).length() < 1.0e-4);
    }

    #[test]
    fn bbox_rejects_rays_that_cannot_hit() {
        let mesh = quad();
        let ray = Ray::new(Vec3::new(5.0, 2.0, 5.0), Vec3::Y);
        assert!(mesh.intersect(&ray).is_none());
    }
}
