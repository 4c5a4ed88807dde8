//! Planar interpolation over a triangle.

use crate::geometry::point::GridPoint;

/// The plane `z = z0 + a·(x − x0) + b·(y − y0)` through three lifted grid points.
///
/// The plane is anchored at its first vertex so evaluation stays accurate far
/// from the raster origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    origin: GridPoint,
    z0: f64,
    a: f64,
    b: f64,
}

impl Plane {
    /// Fits the plane through `(p0, z0)`, `(p1, z1)`, `(p2, z2)`.
    ///
    /// Returns `None` when the three points are collinear in the XY projection.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use terra_tin::geometry::plane::Plane;
    /// use terra_tin::geometry::point::GridPoint;
    ///
    /// let plane = Plane::from_points(
    ///     [GridPoint::new(0, 0), GridPoint::new(4, 0), GridPoint::new(0, 4)],
    ///     [1.0, 5.0, 9.0],
    /// )
    /// .unwrap();
    /// assert_eq!(plane.eval(GridPoint::new(1, 1)), 4.0);
    /// ```
    #[must_use]
    pub fn from_points(points: [GridPoint; 3], z: [f64; 3]) -> Option<Self> {
        let [p0, p1, p2] = points;
        let ux = (p1.x - p0.x) as f64;
        let uy = (p1.y - p0.y) as f64;
        let uz = z[1] - z[0];
        let vx = (p2.x - p0.x) as f64;
        let vy = (p2.y - p0.y) as f64;
        let vz = z[2] - z[0];

        // Normal = u × v
        let nx = uy.mul_add(vz, -(uz * vy));
        let ny = uz.mul_add(vx, -(ux * vz));
        let nz = ux.mul_add(vy, -(uy * vx));
        if nz == 0.0 {
            return None;
        }

        Some(Self {
            origin: p0,
            z0: z[0],
            a: -nx / nz,
            b: -ny / nz,
        })
    }

    /// Interpolated elevation at a grid point.
    #[must_use]
    pub fn eval(&self, p: GridPoint) -> f64 {
        let dx = (p.x - self.origin.x) as f64;
        let dy = (p.y - self.origin.y) as f64;
        self.a.mul_add(dx, self.b.mul_add(dy, self.z0))
    }

    /// Elevation change per column step.
    #[must_use]
    pub const fn dz_dx(&self) -> f64 {
        self.a
    }

    /// Elevation change per row step.
    #[must_use]
    pub const fn dz_dy(&self) -> f64 {
        self.b
    }
}
