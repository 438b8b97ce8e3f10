use glam::Vec3;

/// Axis-aligned box, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point, or `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        Some(it.fold(Self::new(first, first), |b, p| {
            Self::new(b.min.min(p), b.max.max(p))
        }))
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Finite and strictly positive on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.cmplt(self.max).all()
    }

    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Cube sharing this box's center whose side is the longest extent.
    pub fn cubic(&self) -> Self {
        let half = Vec3::splat(self.size().max_element() * 0.5);
        let c = self.center();
        Self::new(c - half, c + half)
    }

    /// Box of the child in octant `address` when split at `split`.
    /// Bit 2 selects the upper x half, bit 1 y, bit 0 z.
    pub fn octant(&self, address: usize, split: Vec3) -> Self {
        let mut min = self.min;
        let mut max = self.max;
        for (axis, bit) in [(0, 0b100), (1, 0b010), (2, 0b001)] {
            if address & bit != 0 {
                min[axis] = split[axis];
            } else {
                max[axis] = split[axis];
            }
        }
        Self::new(min, max)
    }
}

/// 3-bit child address of `p` relative to `split`.
#[inline]
pub fn octant_address(p: Vec3, split: Vec3) -> usize {
    let mut address = 0;
    if p.x >= split.x {
        address |= 0b100;
    }
    if p.y >= split.y {
        address |= 0b010;
    }
    if p.z >= split.z {
        address |= 0b001;
    }
    address
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Closest occupied voxel along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Ray parameter of the entry point, in units of the direction length.
    pub distance: f32,
    /// Normal of the voxel face the ray entered through.
    pub normal: Vec3,
}

/// Normal of the plane perpendicular to `axis` facing against `d`.
#[inline]
pub(crate) fn entry_normal(axis: usize, d: f32) -> Vec3 {
    let mut n = Vec3::ZERO;
    n[axis] = if d > 0.0 { -1.0 } else { 1.0 };
    n
}

/// Slab test. Zero direction components skip their axis, missing if the
/// origin lies outside that slab. Returns `(tmin, tmax, entry normal)`;
/// `tmin` may be negative when the origin is inside.
pub fn slab_intersect(ray: &Ray, aabb: &Aabb) -> Option<(f32, f32, Vec3)> {
    let mut tmin = f32::NEG_INFINITY;
    let mut tmax = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let o = ray.origin[axis];
        let d = ray.direction[axis];
        let (lo, hi) = (aabb.min[axis], aabb.max[axis]);

        if d == 0.0 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let (t0, t1) = ((lo - o) * inv, (hi - o) * inv);
        let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };

        if near > tmin {
            tmin = near;
            normal = entry_normal(axis, d);
        }
        tmax = tmax.min(far);
    }

    if tmin > tmax || tmax < 0.0 || !tmin.is_finite() {
        return None;
    }
    Some((tmin, tmax, normal))
}
