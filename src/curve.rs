//! Analytic pitch curves.
//!
//! Every curve is given in polar form around the gear axis, `x(t) = r(t) cos t` and
//! `y(t) = r(t) sin t`, so each variant only needs to provide the radius and its first two
//! derivatives; the Cartesian derivatives are shared.

use crate::error::GearsError;
use crate::error::Result;
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

/// A radius (or radius derivative) as a function of the rotation angle.
pub type RadiusFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// The number of polygon sides used to estimate the perimeter of curves without a closed form.
const PERIMETER_SAMPLES: usize = 4096;

/// A circular pitch curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    radius: f64,
    inner_radius: f64,
}

/// A focus-centered elliptical pitch curve, optionally with several lobes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipse {
    a: f64,
    b: f64,
    eccentricity: f64,
    nodes: usize,
    semi_latus: f64,
    inner_radius: f64,
}

/// A superelliptical pitch curve `|x/a|^n + |y/b|^n = 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Superellipse {
    a: f64,
    b: f64,
    exponent: f64,
    inner_radius: f64,
}

/// A user supplied polar pitch curve.
#[derive(Clone)]
pub struct CustomCurve {
    radius: RadiusFn,
    first: RadiusFn,
    second: RadiusFn,
    inner_radius: f64,
    perimeter_hint: Option<f64>,
}

impl fmt::Debug for CustomCurve {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CustomCurve")
            .field("radius(0)", &(self.radius)(0.0))
            .field("inner_radius", &self.inner_radius)
            .field("perimeter_hint", &self.perimeter_hint)
            .finish()
    }
}

/// The pitch curve of a gear.
///
/// This is a closed set of shapes, selected at construction and never mutated afterwards.
#[derive(Clone, Debug)]
pub enum PitchCurve {
    /// A circle around the axis.
    Circular(Circle),

    /// An ellipse with a focus on the axis.
    Elliptical(Ellipse),

    /// A superellipse centered on the axis.
    Superelliptical(Superellipse),

    /// An arbitrary polar curve.
    Custom(CustomCurve),
}

fn positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GearsError::invalid(name, format!("{} is not positive", value)))
    }
}

fn bore(inner_radius: f64, min_radius: f64) -> Result<f64> {
    if !inner_radius.is_finite() || inner_radius < 0.0 {
        return Err(GearsError::invalid(
            "inner radius",
            format!("{} is negative", inner_radius),
        ));
    }
    if inner_radius >= min_radius {
        return Err(GearsError::invalid(
            "inner radius",
            format!(
                "{} is not inside the pitch curve (minimal radius: {})",
                inner_radius, min_radius
            ),
        ));
    }
    Ok(inner_radius)
}

impl PitchCurve {
    /// A circle of some radius with a bore.
    pub fn circle(radius: f64, inner_radius: f64) -> Result<Self> {
        let radius = positive("radius", radius)?;
        let inner_radius = bore(inner_radius, radius)?;
        Ok(PitchCurve::Circular(Circle {
            radius,
            inner_radius,
        }))
    }

    /// An ellipse with semi-major axis `a` and eccentricity `e`, repeated `nodes` times per turn.
    pub fn ellipse(a: f64, eccentricity: f64, nodes: usize, inner_radius: f64) -> Result<Self> {
        let a = positive("semi-major axis", a)?;
        if !(0.0..1.0).contains(&eccentricity) {
            return Err(GearsError::invalid(
                "eccentricity",
                format!("{} is not in [0, 1)", eccentricity),
            ));
        }
        if nodes == 0 {
            return Err(GearsError::invalid("nodes", "zero"));
        }
        let semi_latus = a * (1.0 - eccentricity * eccentricity);
        let inner_radius = bore(inner_radius, semi_latus / (1.0 + eccentricity))?;
        Ok(PitchCurve::Elliptical(Ellipse {
            a,
            b: a * (1.0 - eccentricity * eccentricity).sqrt(),
            eccentricity,
            nodes,
            semi_latus,
            inner_radius,
        }))
    }

    /// A superellipse with semi-axes `a`, `b` and some exponent (at least 2).
    pub fn superellipse(a: f64, b: f64, exponent: f64, inner_radius: f64) -> Result<Self> {
        let a = positive("semi-axis a", a)?;
        let b = positive("semi-axis b", b)?;
        if !exponent.is_finite() || exponent < 2.0 {
            return Err(GearsError::invalid(
                "exponent",
                format!("{} is less than 2", exponent),
            ));
        }
        let inner_radius = bore(inner_radius, a.min(b))?;
        Ok(PitchCurve::Superelliptical(Superellipse {
            a,
            b,
            exponent,
            inner_radius,
        }))
    }

    /// A polar curve given by its radius and the first two derivatives of the radius.
    ///
    /// The derivatives are trusted; nothing checks they actually match the radius.
    pub fn custom(
        radius: RadiusFn,
        first: RadiusFn,
        second: RadiusFn,
        inner_radius: f64,
        perimeter_hint: Option<f64>,
    ) -> Result<Self> {
        let min_radius = (0..PERIMETER_SAMPLES)
            .map(|index| radius(2.0 * PI * index as f64 / PERIMETER_SAMPLES as f64))
            .fold(f64::INFINITY, f64::min);
        positive("radius", min_radius)?;
        let inner_radius = bore(inner_radius, min_radius)?;
        if let Some(perimeter) = perimeter_hint {
            positive("perimeter", perimeter)?;
        }
        Ok(PitchCurve::Custom(CustomCurve {
            radius,
            first,
            second,
            inner_radius,
            perimeter_hint,
        }))
    }

    /// Whether the curve is a circle (which places one anchor per tooth instead of two).
    pub fn is_circular(&self) -> bool {
        match self {
            PitchCurve::Circular(_) => true,
            PitchCurve::Elliptical(ellipse) => ellipse.eccentricity == 0.0,
            _ => false,
        }
    }

    /// The radius and its first two derivatives at some angle.
    fn polar(&self, t: f64) -> (f64, f64, f64) {
        match self {
            PitchCurve::Circular(circle) => (circle.radius, 0.0, 0.0),
            PitchCurve::Elliptical(ellipse) => ellipse.polar(t),
            PitchCurve::Superelliptical(superellipse) => superellipse.polar(t),
            PitchCurve::Custom(custom) => ((custom.radius)(t), (custom.first)(t), (custom.second)(t)),
        }
    }

    /// The pitch radius at some angle.
    pub fn outer_radius(&self, t: f64) -> f64 {
        match self {
            PitchCurve::Circular(circle) => circle.radius,
            PitchCurve::Custom(custom) => (custom.radius)(t),
            _ => self.polar(t).0,
        }
    }

    /// The bore radius at some angle.
    pub fn inner_radius(&self, _t: f64) -> f64 {
        match self {
            PitchCurve::Circular(circle) => circle.inner_radius,
            PitchCurve::Elliptical(ellipse) => ellipse.inner_radius,
            PitchCurve::Superelliptical(superellipse) => superellipse.inner_radius,
            PitchCurve::Custom(custom) => custom.inner_radius,
        }
    }

    /// `dx/dt`.
    pub fn dx(&self, t: f64) -> f64 {
        let (r, dr, _) = self.polar(t);
        dr * t.cos() - r * t.sin()
    }

    /// `dy/dt`.
    pub fn dy(&self, t: f64) -> f64 {
        let (r, dr, _) = self.polar(t);
        dr * t.sin() + r * t.cos()
    }

    /// `d²x/dt²`.
    pub fn dx2(&self, t: f64) -> f64 {
        let (r, dr, ddr) = self.polar(t);
        ddr * t.cos() - 2.0 * dr * t.sin() - r * t.cos()
    }

    /// `d²y/dt²`.
    pub fn dy2(&self, t: f64) -> f64 {
        let (r, dr, ddr) = self.polar(t);
        ddr * t.sin() + 2.0 * dr * t.cos() - r * t.sin()
    }

    /// The radius of curvature at some angle (infinite where the curve is straight).
    pub fn radius_of_curvature(&self, t: f64) -> f64 {
        let dx = self.dx(t);
        let dy = self.dy(t);
        let denominator = dx * self.dy2(t) - self.dx2(t) * dy;
        if denominator == 0.0 {
            f64::INFINITY
        } else {
            (dx * dx + dy * dy).powf(1.5) / denominator.abs()
        }
    }

    /// An estimate of the perimeter, only good enough to seed the pitch refinement.
    pub fn perimeter(&self) -> f64 {
        match self {
            PitchCurve::Circular(circle) => 2.0 * PI * circle.radius,
            PitchCurve::Elliptical(ellipse) => ellipse.perimeter(),
            PitchCurve::Custom(CustomCurve {
                perimeter_hint: Some(perimeter),
                ..
            }) => *perimeter,
            _ => self.sampled_perimeter(),
        }
    }

    fn sampled_perimeter(&self) -> f64 {
        let point = |index: usize| {
            let t = 2.0 * PI * index as f64 / PERIMETER_SAMPLES as f64;
            let r = self.outer_radius(t);
            (r * t.cos(), r * t.sin())
        };
        (0..PERIMETER_SAMPLES)
            .map(|index| {
                let (from_x, from_y) = point(index);
                let (to_x, to_y) = point(index + 1);
                (to_x - from_x).hypot(to_y - from_y)
            })
            .sum()
    }
}

impl Ellipse {
    fn polar(&self, t: f64) -> (f64, f64, f64) {
        let e = self.eccentricity;
        let k = self.nodes as f64;
        let p = self.semi_latus;
        let (sine, cosine) = (k * t).sin_cos();
        let denominator = 1.0 - e * cosine;
        let r = p / denominator;
        let dr = -p * e * k * sine / denominator.powi(2);
        let ddr = -p * e * k * k * cosine / denominator.powi(2)
            + 2.0 * p * e * e * k * k * sine * sine / denominator.powi(3);
        (r, dr, ddr)
    }

    /// Ramanujan's approximation.
    fn perimeter(&self) -> f64 {
        let h = ((self.a - self.b) / (self.a + self.b)).powi(2);
        PI * (self.a + self.b) * (1.0 + 3.0 * h / (10.0 + (4.0 - 3.0 * h).sqrt()))
    }
}

impl Superellipse {
    fn polar(&self, t: f64) -> (f64, f64, f64) {
        let n = self.exponent;
        let a_n = self.a.powf(n);
        let b_n = self.b.powf(n);
        let (sine, cosine) = t.sin_cos();
        let abs_cosine = cosine.abs();
        let abs_sine = sine.abs();

        // u = |cos t / a|^n + |sin t / b|^n and r = u^(-1/n).
        let u = abs_cosine.powf(n) / a_n + abs_sine.powf(n) / b_n;
        let du = -n * abs_cosine.powf(n - 2.0) * cosine * sine / a_n
            + n * abs_sine.powf(n - 2.0) * sine * cosine / b_n;
        let ddu = -n * abs_cosine.powf(n - 2.0) * (cosine * cosine - (n - 1.0) * sine * sine) / a_n
            + n * abs_sine.powf(n - 2.0) * ((n - 1.0) * cosine * cosine - sine * sine) / b_n;

        let r = u.powf(-1.0 / n);
        let dr = -u.powf(-1.0 / n - 1.0) * du / n;
        let ddr = (1.0 / n) * (1.0 / n + 1.0) * u.powf(-1.0 / n - 2.0) * du * du
            - u.powf(-1.0 / n - 1.0) * ddu / n;
        (r, dr, ddr)
    }
}

#[cfg(test)]
fn assert_derivatives(curve: &PitchCurve) {
    let h = 1e-5;
    for index in 0..64 {
        let t = 2.0 * PI * (index as f64 + 0.37) / 64.0;
        let x = |t: f64| curve.outer_radius(t) * t.cos();
        let y = |t: f64| curve.outer_radius(t) * t.sin();
        assert_float_absolute_eq!(curve.dx(t), (x(t + h) - x(t - h)) / (2.0 * h), 1e-6);
        assert_float_absolute_eq!(curve.dy(t), (y(t + h) - y(t - h)) / (2.0 * h), 1e-6);
        assert_float_absolute_eq!(
            curve.dx2(t),
            (curve.dx(t + h) - curve.dx(t - h)) / (2.0 * h),
            1e-5
        );
        assert_float_absolute_eq!(
            curve.dy2(t),
            (curve.dy(t + h) - curve.dy(t - h)) / (2.0 * h),
            1e-5
        );
    }
}

#[cfg(test)]
#[test]
fn test_circle() {
    let circle = PitchCurve::circle(1.5, 0.25).unwrap();
    assert!(circle.is_circular());
    for index in 0..100 {
        let t = 2.0 * PI * index as f64 / 100.0;
        assert!(circle.outer_radius(t) == 1.5);
        assert_float_absolute_eq!(circle.dx(t).powi(2) + circle.dy(t).powi(2), 2.25, 1e-12);
        assert_float_absolute_eq!(circle.radius_of_curvature(t), 1.5, 1e-12);
    }
    assert_float_absolute_eq!(circle.perimeter(), 3.0 * PI, 1e-12);
    assert!(circle.inner_radius(1.0) == 0.25);
    assert_derivatives(&circle);
}

#[cfg(test)]
#[test]
fn test_ellipse() {
    let ellipse = PitchCurve::ellipse(1.0, 0.15, 2, 0.0625).unwrap();
    assert!(!ellipse.is_circular());
    assert_float_absolute_eq!(ellipse.outer_radius(0.0), 1.0 + 0.15, 1e-12);
    assert_float_absolute_eq!(ellipse.outer_radius(PI / 2.0), 1.0 - 0.15, 1e-12);
    assert_derivatives(&ellipse);
    assert_derivatives(&PitchCurve::ellipse(2.0, 0.5, 1, 0.0).unwrap());

    // With one node this is a real ellipse, whose perimeter Ramanujan gets nearly exact.
    let single = PitchCurve::ellipse(1.0, 0.6, 1, 0.0).unwrap();
    let PitchCurve::Elliptical(ref shape) = single else {
        unreachable!()
    };
    assert_float_absolute_eq!(single.perimeter(), single.sampled_perimeter(), 1e-4);
    assert_float_absolute_eq!(shape.b, 0.8, 1e-12);

    assert!(PitchCurve::ellipse(1.0, 0.0, 1, 0.0).unwrap().is_circular());
}

#[cfg(test)]
#[test]
fn test_superellipse() {
    let superellipse = PitchCurve::superellipse(1.0, 0.7, 2.5, 0.1).unwrap();
    assert_float_absolute_eq!(superellipse.outer_radius(0.0), 1.0, 1e-12);
    assert_float_absolute_eq!(superellipse.outer_radius(PI / 2.0), 0.7, 1e-12);
    assert_derivatives(&superellipse);

    // With exponent 2 this is an ellipse centered at the axis.
    let ellipse = PitchCurve::superellipse(1.0, 0.8, 2.0, 0.0).unwrap();
    assert_derivatives(&ellipse);
    assert_float_absolute_eq!(ellipse.perimeter(), 5.672_333, 1e-4);
}

#[cfg(test)]
#[test]
fn test_custom() {
    // A cardioid-like bulge around a unit circle.
    let custom = PitchCurve::custom(
        Arc::new(|t: f64| 1.0 + 0.1 * t.cos()),
        Arc::new(|t: f64| -0.1 * t.sin()),
        Arc::new(|t: f64| -0.1 * t.cos()),
        0.2,
        None,
    )
    .unwrap();
    assert!(!custom.is_circular());
    assert_derivatives(&custom);
    assert!(custom.perimeter() > 2.0 * PI);
    assert!(format!("{:?}", custom).contains("CustomCurve"));
}

#[cfg(test)]
#[test]
fn test_invalid_parameters() {
    assert!(matches!(
        PitchCurve::ellipse(1.0, 1.2, 2, 0.0),
        Err(GearsError::InvalidParameter {
            name: "eccentricity",
            ..
        })
    ));
    assert!(PitchCurve::ellipse(1.0, -0.1, 2, 0.0).is_err());
    assert!(PitchCurve::ellipse(1.0, 0.1, 0, 0.0).is_err());
    assert!(PitchCurve::circle(0.0, 0.0).is_err());
    assert!(PitchCurve::circle(1.0, 1.0).is_err());
    assert!(PitchCurve::circle(1.0, -0.5).is_err());
    assert!(PitchCurve::superellipse(1.0, 1.0, 1.5, 0.0).is_err());
    assert!(PitchCurve::custom(
        Arc::new(|t: f64| t.cos()),
        Arc::new(|t: f64| -t.sin()),
        Arc::new(|t: f64| -t.cos()),
        0.0,
        None,
    )
    .is_err());
}
