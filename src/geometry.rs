use std::{
    fmt,
    ops::{Add, Mul, Sub},
};

pub type Scalar = f64;
pub const EPSILON: f64 = f64::EPSILON;

/// Millimeters per inch, used for all DPI conversions
pub const MM_PER_INCH: Scalar = 25.4;

/// Format floats in a compact way
pub fn scalar_fmt(f: &mut fmt::Formatter<'_>, value: Scalar) -> fmt::Result {
    let value_abs = value.abs();
    if value_abs.fract() < EPSILON {
        write!(f, "{}", value.trunc() as i64)
    } else if value_abs > 9999.0 || value_abs <= 0.0001 {
        write!(f, "{:.3e}", value)
    } else {
        let ten: Scalar = 10.0;
        let round = ten.powi(6 - (value_abs.trunc() + 1.0).log10().ceil() as i32);
        write!(f, "{}", (value * round).round() / round)
    }
}

/// Size of one pixel in millimeters for the given resolution
#[inline]
pub fn mm_per_pixel(dpi: Scalar) -> Scalar {
    MM_PER_INCH / dpi
}

/// 2D position in millimeters
#[derive(Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point(pub [Scalar; 2]);

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Point([x, y]) = self;
        scalar_fmt(f, *x)?;
        write!(f, ",")?;
        scalar_fmt(f, *y)?;
        Ok(())
    }
}

impl Point {
    #[inline]
    pub const fn new(x: Scalar, y: Scalar) -> Self {
        Self([x, y])
    }

    /// Get `x` component of the point
    #[inline]
    pub fn x(self) -> Scalar {
        self.0[0]
    }

    /// Get `y` component of the point
    #[inline]
    pub fn y(self) -> Scalar {
        self.0[1]
    }

    /// Determine if self is close to the other within the margin of error
    pub fn is_close_to(self, other: Point, eps: Scalar) -> bool {
        let Self([x0, y0]) = self;
        let Self([x1, y1]) = other;
        (x0 - x1).abs() < eps && (y0 - y1).abs() < eps
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, other: Point) -> Self::Output {
        let Point([x0, y0]) = self;
        let Point([x1, y1]) = other;
        Point([x0 + x1, y0 + y1])
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, other: Point) -> Self::Output {
        let Point([x0, y0]) = self;
        let Point([x1, y1]) = other;
        Point([x0 - x1, y0 - y1])
    }
}

impl Mul<Point> for Scalar {
    type Output = Point;

    #[inline]
    fn mul(self, other: Point) -> Self::Output {
        let Point([x, y]) = other;
        Point([self * x, self * y])
    }
}

/// Maps millimeter coordinates onto the integer unit grid of the rasterizer.
///
/// `units = (mm - origin) * dpi / 25.4 * units_per_pixel`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitTransform {
    origin: Point,
    scale_x: Scalar,
    scale_y: Scalar,
}

impl UnitTransform {
    pub fn new(origin: Point, dpi: (Scalar, Scalar), units_per_pixel: (u64, u64)) -> Self {
        Self {
            origin,
            scale_x: units_per_pixel.0 as Scalar / mm_per_pixel(dpi.0),
            scale_y: units_per_pixel.1 as Scalar / mm_per_pixel(dpi.1),
        }
    }

    /// Apply transformation, result is still fractional
    #[inline]
    pub fn apply(&self, point: Point) -> Point {
        let Point([x, y]) = point - self.origin;
        Point([x * self.scale_x, y * self.scale_y])
    }
}
