//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Median split on the longest centroid axis. Large subtrees are built in
//! parallel with rayon.

use crate::aggregate::{closest_in, Aggregate, HitRecord};
use crate::Entity;
use lux_math::{Aabb, Ray, Vec3};
use std::sync::Arc;

/// Maximum entities per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// Subtrees with more entities than this are built on the rayon pool.
const PARALLEL_BUILD_THRESHOLD: usize = 1024;

enum BvhNode {
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    Leaf {
        entities: Vec<Arc<Entity>>,
        bbox: Aabb,
    },
    Empty,
}

/// Entity with its bound cached for the build.
struct BuildItem {
    entity: Arc<Entity>,
    bbox: Aabb,
    centroid: Vec3,
}

pub struct BvhAggregate {
    root: BvhNode,
    node_count: usize,
    depth: usize,
}

impl BvhAggregate {
    pub fn build(entities: &[Arc<Entity>]) -> Self {
        let items: Vec<BuildItem> = entities
            .iter()
            .map(|entity| {
                let bbox = entity.geometry().bounding_box();
                BuildItem {
                    entity: Arc::clone(entity),
                    bbox,
                    centroid: bbox.centroid(),
                }
            })
            .collect();

        let root = if items.is_empty() {
            BvhNode::Empty
        } else {
            build_node(items)
        };
        let node_count = root.node_count();
        let depth = root.depth();
        log::debug!(
            "Built BVH over {} entities: {} nodes, depth {}",
            entities.len(),
            node_count,
            depth
        );

        Self {
            root,
            node_count,
            depth,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

fn build_node(mut items: Vec<BuildItem>) -> BvhNode {
    let bbox = items
        .iter()
        .fold(Aabb::EMPTY, |acc, item| Aabb::surrounding(&acc, &item.bbox));

    if items.len() <= LEAF_MAX_SIZE {
        return BvhNode::Leaf {
            entities: items.into_iter().map(|item| item.entity).collect(),
            bbox,
        };
    }

    // Split axis from centroid spread
    let centroid_bounds = items
        .iter()
        .fold(Aabb::EMPTY, |acc, item| acc.include(item.centroid));
    let axis = centroid_bounds.longest_axis();

    items.sort_unstable_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));

    let right_items = items.split_off(items.len() / 2);
    let left_items = items;

    let (left, right) = if left_items.len() + right_items.len() > PARALLEL_BUILD_THRESHOLD {
        rayon::join(|| build_node(left_items), || build_node(right_items))
    } else {
        (build_node(left_items), build_node(right_items))
    };

    BvhNode::Branch {
        left: Box::new(left),
        right: Box::new(right),
        bbox,
    }
}

impl BvhNode {
    fn has_intersection(&self, ray: &Ray) -> bool {
        match self {
            BvhNode::Empty => false,
            BvhNode::Leaf { entities, bbox } => {
                bbox.hit(ray, ray.range())
                    && entities.iter().any(|e| e.geometry().has_intersection(ray))
            }
            BvhNode::Branch { left, right, bbox } => {
                bbox.hit(ray, ray.range())
                    && (left.has_intersection(ray) || right.has_intersection(ray))
            }
        }
    }

    fn closest_intersection(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        match self {
            BvhNode::Empty => None,
            BvhNode::Leaf { entities, bbox } => {
                if !bbox.hit(ray, ray.range()) {
                    return None;
                }
                closest_in(entities, ray)
            }
            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, ray.range()) {
                    return None;
                }

                let hit_left = left.closest_intersection(ray);

                // Only check right up to closest hit
                let mut right_ray = *ray;
                if let Some(hit) = &hit_left {
                    right_ray.t_max = hit.t;
                }
                right.closest_intersection(&right_ray).or(hit_left)
            }
        }
    }

    fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } | BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    fn node_count(&self) -> usize {
        match self {
            BvhNode::Empty => 0,
            BvhNode::Leaf { .. } => 1,
            BvhNode::Branch { left, right, .. } => 1 + left.node_count() + right.node_count(),
        }
    }

    fn depth(&self) -> usize {
        match self {
            BvhNode::Empty => 0,
            BvhNode::Leaf { .. } => 1,
            BvhNode::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

impl Aggregate for BvhAggregate {
    fn has_intersection(&self, ray: &Ray) -> bool {
        self.root.has_intersection(ray)
    }

    fn closest_intersection(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        self.root.closest_intersection(ray)
    }

    fn world_bound(&self) -> Aabb {
        self.root.bounding_box()
    }
}
