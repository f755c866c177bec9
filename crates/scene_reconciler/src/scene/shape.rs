//! Ray and bounding-volume primitives used for hit testing
//!
//! Shapes are expressed in an object's local space. The scene graph transforms
//! the pick ray into local space before calling [`HitShape::intersect_ray`].

use crate::foundation::math::Vec3;

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray (normalized on construction)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Slab-method ray test.
    ///
    /// Returns the entry distance and the face normal, or `None` on a miss.
    /// A ray starting inside the box reports distance zero.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        let mut normal = Vec3::zeros();

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            if dir.abs() < f32::EPSILON {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t1 = (self.min[axis] - origin) * inv;
            let mut t2 = (self.max[axis] - origin) * inv;
            let mut sign = -1.0;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
                sign = 1.0;
            }
            if t1 > tmin {
                tmin = t1;
                normal = Vec3::zeros();
                normal[axis] = sign;
            }
            tmax = tmax.min(t2);
        }

        if tmax >= tmin && tmax >= 0.0 {
            Some((tmin.max(0.0), normal))
        } else {
            None
        }
    }
}

/// A bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center of the sphere
    pub center: Vec3,
    /// Radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Test ray intersection with this sphere.
    ///
    /// Returns `(distance, normal)` for the closest positive intersection.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(&ray.direction);
        let b = 2.0 * oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_discriminant = discriminant.sqrt();
        let t1 = (-b - sqrt_discriminant) / (2.0 * a);
        let t2 = (-b + sqrt_discriminant) / (2.0 * a);
        let t = if t1 > 0.0 {
            t1
        } else if t2 > 0.0 {
            t2
        } else {
            return None;
        };

        let normal = (ray.point_at(t) - self.center).normalize();
        Some((t, normal))
    }
}

/// Local-space shape a native object exposes for picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitShape {
    /// Box volume
    Box(Aabb),
    /// Sphere volume
    Sphere(BoundingSphere),
}

impl HitShape {
    /// Intersect a local-space ray with this shape
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        match self {
            Self::Box(aabb) => aabb.intersect_ray(ray),
            Self::Sphere(sphere) => sphere.intersect_ray(ray),
        }
    }
}
