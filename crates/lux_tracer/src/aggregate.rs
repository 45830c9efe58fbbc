//! Ray queries over a set of entities.

use crate::Entity;
use lux_math::{Aabb, Ray, Vec2, Vec3};
use std::sync::Arc;

/// Record of a ray-entity intersection.
#[derive(Clone, Copy)]
pub struct HitRecord<'a> {
    pub t: f32,
    pub pos: Vec3,
    /// Outward geometric normal
    pub normal: Vec3,
    pub uv: Vec2,
    pub entity: &'a Entity,
}

impl<'a> HitRecord<'a> {
    /// Whether a ray travelling along `dir` hit the outward-facing side.
    pub fn front_face(&self, dir: Vec3) -> bool {
        dir.dot(self.normal) < 0.0
    }
}

/// Immutable spatial index over entities.
///
/// Queries are read-only and may run concurrently from any number of threads.
pub trait Aggregate: Send + Sync {
    fn has_intersection(&self, ray: &Ray) -> bool;

    /// Intersection with the smallest `t` in `[t_min, t_max)`.
    fn closest_intersection(&self, ray: &Ray) -> Option<HitRecord<'_>>;

    /// Bound of all entities. Degenerate when there are none.
    fn world_bound(&self) -> Aabb;
}

/// Closest hit among `entities`, narrowing the ray as hits are found.
pub(crate) fn closest_in<'a>(
    entities: impl IntoIterator<Item = &'a Arc<Entity>>,
    ray: &Ray,
) -> Option<HitRecord<'a>> {
    let mut closest: Option<HitRecord<'a>> = None;
    let mut narrowed = *ray;
    for entity in entities {
        if let Some(hit) = entity.geometry().intersect(&narrowed) {
            narrowed.t_max = hit.t;
            closest = Some(HitRecord {
                t: hit.t,
                pos: hit.pos,
                normal: hit.normal,
                uv: hit.uv,
                entity: entity.as_ref(),
            });
        }
    }
    closest
}

/// Linear scan over every entity. Reference for the BVH.
pub struct NativeAggregate {
    entities: Vec<Arc<Entity>>,
    bound: Aabb,
}

impl NativeAggregate {
    pub fn build(entities: &[Arc<Entity>]) -> Self {
        let bound = entities.iter().fold(Aabb::EMPTY, |acc, e| {
            Aabb::surrounding(&acc, &e.geometry().bounding_box())
        });
        Self {
            entities: entities.to_vec(),
            bound,
        }
    }
}

impl Aggregate for NativeAggregate {
    fn has_intersection(&self, ray: &Ray) -> bool {
        self.entities
            .iter()
            .any(|e| e.geometry().has_intersection(ray))
    }

    fn closest_intersection(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        closest_in(&self.entities, ray)
    }

    fn world_bound(&self) -> Aabb {
        self.bound
    }
}
