/// Fixed-depth octree over a bounding box
///
/// Nodes live in one arena and refer to children by index. Inserting a
/// point allocates the missing nodes on its path and marks the leaf at
/// `max_depth` alive. Leaves only exist at `max_depth`; every node above is
/// internal.
pub mod bounds;

pub use bounds::{octant_address, slab_intersect, Aabb, Ray, RayHit};

use crate::error::{Error, Result};
use bounds::entry_normal;
use glam::Vec3;
use rayon::prelude::*;

/// Inward nudge for ray origins lying exactly on a root face.
const PLANE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct OctreeConfig {
    /// Depth of the leaves; the root is depth 1.
    pub max_depth: u32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self { max_depth: 7 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    const ROOT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Internal {
        split: Vec3,
        children: [Option<NodeId>; 8],
    },
    Leaf {
        alive: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub aabb: Aabb,
    pub kind: NodeKind,
}

/// Pending traversal work: a node and the ray interval inside it.
#[derive(Clone, Copy)]
struct Visit {
    node: NodeId,
    tmin: f32,
    tmax: f32,
    normal: Vec3,
    depth: u32,
}

#[derive(Debug, Clone)]
pub struct Octree {
    max_depth: u32,
    nodes: Vec<Node>,
}

impl Default for Octree {
    fn default() -> Self {
        Self::new(OctreeConfig::default())
    }
}

impl Octree {
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            max_depth: config.max_depth.max(1),
            nodes: Vec::new(),
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Reset the tree to a single root spanning `min..=max`. Callers wanting
    /// cubic voxels pass a cube.
    pub fn set_aabb(&mut self, min: Vec3, max: Vec3) -> Result<()> {
        let aabb = Aabb::new(min, max);
        if !aabb.is_valid() {
            return Err(Error::InvalidConfiguration(format!(
                "octree bounds {min} .. {max} are empty or not finite"
            )));
        }
        self.nodes.clear();
        self.alloc(aabb, 1);
        log::debug!(
            "octree bounds set to {min} .. {max}, voxel size {:?}",
            self.voxel_size()
        );
        Ok(())
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| n.aabb)
    }

    /// Drop every voxel, keeping the bounds.
    pub fn clear(&mut self) {
        if let Some(aabb) = self.bounds() {
            self.nodes.clear();
            self.alloc(aabb, 1);
        }
    }

    /// Edge lengths of one leaf.
    pub fn voxel_size(&self) -> Option<Vec3> {
        let levels = (self.max_depth - 1).min(31);
        self.bounds()
            .map(|b| b.size() / (1u32 << levels) as f32)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.alive_leaves().count()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Boxes of every alive leaf.
    pub fn alive_leaves(&self) -> impl Iterator<Item = Aabb> + '_ {
        self.nodes.iter().filter_map(|n| match n.kind {
            NodeKind::Leaf { alive: true } => Some(n.aabb),
            _ => None,
        })
    }

    fn alloc(&mut self, aabb: Aabb, depth: u32) -> NodeId {
        let kind = if depth >= self.max_depth {
            NodeKind::Leaf { alive: false }
        } else {
            NodeKind::Internal {
                split: aabb.center(),
                children: [None; 8],
            }
        };
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { aabb, kind });
        id
    }

    /// Mark the voxel holding `p` alive. Returns `Ok(false)` when `p` lies
    /// outside the bounds.
    pub fn add_point(&mut self, p: Vec3) -> Result<bool> {
        let root = self.nodes.first().ok_or(Error::BoundsNotSet)?;
        if !root.aabb.contains(p) {
            return Ok(false);
        }

        let mut id = NodeId::ROOT;
        for depth in 1..self.max_depth {
            let (split, existing, address) = match &self.nodes[id.index()].kind {
                NodeKind::Internal { split, children } => {
                    let address = octant_address(p, *split);
                    (*split, children[address], address)
                }
                NodeKind::Leaf { .. } => break,
            };

            id = match existing {
                Some(child) => child,
                None => {
                    let aabb = self.nodes[id.index()].aabb.octant(address, split);
                    let child = self.alloc(aabb, depth + 1);
                    if let NodeKind::Internal { children, .. } = &mut self.nodes[id.index()].kind {
                        children[address] = Some(child);
                    }
                    child
                }
            };
        }

        if let NodeKind::Leaf { alive } = &mut self.nodes[id.index()].kind {
            *alive = true;
        }
        Ok(true)
    }

    /// True when `p` falls in an alive voxel.
    pub fn is_inside(&self, p: Vec3) -> bool {
        let Some(root) = self.nodes.first() else {
            return false;
        };
        if !root.aabb.contains(p) {
            return false;
        }

        let mut id = NodeId::ROOT;
        loop {
            match &self.nodes[id.index()].kind {
                NodeKind::Leaf { alive } => return *alive,
                NodeKind::Internal { split, children } => {
                    match children[octant_address(p, *split)] {
                        Some(child) => id = child,
                        None => return false,
                    }
                }
            }
        }
    }

    /// Nearest alive voxel hit by the ray, skipping the voxel that contains
    /// the origin. `None` on a miss, a zero direction or unset bounds.
    pub fn closest_leaf(&self, origin: Vec3, direction: Vec3) -> Option<RayHit> {
        let root = self.nodes.first()?;
        if direction == Vec3::ZERO || !direction.is_finite() || !origin.is_finite() {
            return None;
        }

        // Origins on a root face graze it tangentially; pull them inside.
        let mut o = origin;
        for axis in 0..3 {
            if o[axis] == root.aabb.min[axis] {
                o[axis] += PLANE_EPSILON;
            } else if o[axis] == root.aabb.max[axis] {
                o[axis] -= PLANE_EPSILON;
            }
        }
        let ray = Ray::new(o, direction);

        let (tmin, tmax, normal) = slab_intersect(&ray, &root.aabb)?;
        let mut stack = vec![Visit {
            node: NodeId::ROOT,
            tmin: tmin.max(0.0),
            tmax,
            normal,
            depth: 1,
        }];

        while let Some(visit) = stack.pop() {
            let node = &self.nodes[visit.node.index()];
            match &node.kind {
                NodeKind::Leaf { alive } => {
                    debug_assert_eq!(visit.depth, self.max_depth);
                    if *alive && !node.aabb.contains(origin) {
                        return Some(RayHit {
                            distance: visit.tmin,
                            normal: visit.normal,
                        });
                    }
                }
                NodeKind::Internal { split, children } => {
                    self.push_children(&ray, &visit, *split, children, &mut stack);
                }
            }
        }
        None
    }

    /// Split the visit interval at the split planes and push the children
    /// it passes through, farthest first so the nearest is popped next.
    fn push_children(
        &self,
        ray: &Ray,
        visit: &Visit,
        split: Vec3,
        children: &[Option<NodeId>; 8],
        stack: &mut Vec<Visit>,
    ) {
        // (t, normal of the plane entered at t)
        let mut bounds = [(visit.tmin, visit.normal); 4];
        let mut count = 1;
        for axis in 0..3 {
            let d = ray.direction[axis];
            if d == 0.0 {
                continue;
            }
            let t = (split[axis] - ray.origin[axis]) / d;
            if t > visit.tmin && t < visit.tmax {
                bounds[count] = (t, entry_normal(axis, d));
                count += 1;
            }
        }
        bounds[..count].sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        for k in (0..count).rev() {
            let (t0, normal) = bounds[k];
            let t1 = if k + 1 < count { bounds[k + 1].0 } else { visit.tmax };
            let mid = ray.at((t0 + t1) * 0.5);
            if let Some(child) = children[octant_address(mid, split)] {
                stack.push(Visit {
                    node: child,
                    tmin: t0,
                    tmax: t1,
                    normal,
                    depth: visit.depth + 1,
                });
            }
        }
    }

    /// [`Octree::closest_leaf`] for a batch of rays, evaluated in parallel.
    pub fn closest_leaves(&self, rays: &[Ray]) -> Vec<Option<RayHit>> {
        rays.par_iter()
            .map(|r| self.closest_leaf(r.origin, r.direction))
            .collect()
    }
}
