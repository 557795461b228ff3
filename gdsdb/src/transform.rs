//!
//! # Transforms
//!
//! Placement of cell-instances, and the composition of nested placements,
//! expressed on GDSII's own terms: reflection, rotation, magnification, and translation.
//!

// Crates.io
use serde::{Deserialize, Serialize};

// Local Imports
use crate::data::{GdsBoundary, GdsBox, GdsNode, GdsPath, GdsPoint, GdsStrans, GdsTextElem};

///
/// # Placement Transform
///
/// Applied to a point in the order GDSII prescribes:
/// 1. Reflection about the x-axis, if `mirror_x`
/// 2. Counter-clockwise rotation by `rotation` degrees
/// 3. Scaling by `magnification`
/// 4. Translation by (`dx`, `dy`)
///
/// Composition via [Transform::cascade] is associative but not commutative.
///
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Transform {
    /// X Translation
    pub dx: f64,
    /// Y Translation
    pub dy: f64,
    /// Counter-clockwise rotation, in degrees
    pub rotation: f64,
    /// Reflection about the x-axis, applied before rotation
    pub mirror_x: bool,
    /// Scale factor. Always positive.
    pub magnification: f64,
}
impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
impl Transform {
    /// The identity transform, leaving any transformed object unmodified
    pub fn identity() -> Self {
        Self {
            dx: 0.,
            dy: 0.,
            rotation: 0.,
            mirror_x: false,
            magnification: 1.,
        }
    }
    /// Translation by (x,y)
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            dx: x,
            dy: y,
            ..Self::identity()
        }
    }
    /// Rotatation by `angle` degrees counter-clockwise
    pub fn rotate(angle: f64) -> Self {
        Self {
            rotation: normalize_angle(angle),
            ..Self::identity()
        }
    }
    /// Reflection about the x-axis, i.e. flipping y-coordinates
    pub fn reflect_vert() -> Self {
        Self {
            mirror_x: true,
            ..Self::identity()
        }
    }
    /// Scaling by `mag`
    pub fn scale(mag: f64) -> Self {
        Self {
            magnification: mag,
            ..Self::identity()
        }
    }
    /// Create the placement transform of an instance at `origin`, with optional settings `strans`.
    ///
    /// The absolute-magnification and absolute-angle flags are not honored here;
    /// magnification and angle always compose with those of enclosing instances.
    pub fn from_strans(origin: &GdsPoint, strans: Option<&GdsStrans>) -> Self {
        let mut trans = Self::translate(f64::from(origin.x), f64::from(origin.y));
        if let Some(s) = strans {
            trans.mirror_x = s.reflected;
            trans.rotation = normalize_angle(s.angle.unwrap_or(0.));
            trans.magnification = s.mag.unwrap_or(1.);
        }
        trans
    }
    /// Convert our reflection, rotation, and magnification back to [GdsStrans] form.
    /// Translation is dropped. Absolute-flags are copied from `prev`,
    /// as are the presence of its optional `mag` and `angle` fields.
    pub fn to_strans(&self, prev: Option<&GdsStrans>) -> GdsStrans {
        let prev = prev.cloned().unwrap_or_default();
        GdsStrans {
            reflected: self.mirror_x,
            abs_mag: prev.abs_mag,
            abs_angle: prev.abs_angle,
            mag: if prev.mag.is_some() || self.magnification != 1. {
                Some(self.magnification)
            } else {
                None
            },
            angle: if prev.angle.is_some() || self.rotation != 0. {
                Some(self.rotation)
            } else {
                None
            },
        }
    }
    /// Boolean indication of whether we leave every point unmodified
    pub fn is_identity(&self) -> bool {
        self.dx == 0.
            && self.dy == 0.
            && !self.mirror_x
            && self.rotation == 0.
            && self.magnification == 1.
    }
    /// Create a new [Transform] that is the cascade of `parent` and `child`.
    ///
    /// "Parents" and "children" refer to typical layout-instance hierarchies,
    /// in which each layer of instance has a nested set of transformations relative to its top-level parent.
    /// The resulting transform applies `child` first, then `parent`.
    pub fn cascade(parent: &Transform, child: &Transform) -> Transform {
        // Reflection "flips" the direction of any rotation applied after it
        let rotation = if parent.mirror_x {
            parent.rotation - child.rotation
        } else {
            parent.rotation + child.rotation
        };
        // The result-transform's origin is the parent-transformed child's origin
        let (dx, dy) = parent.apply_f64(child.dx, child.dy);
        Transform {
            dx,
            dy,
            rotation: normalize_angle(rotation),
            mirror_x: parent.mirror_x ^ child.mirror_x,
            magnification: parent.magnification * child.magnification,
        }
    }
    /// Our 2x2 linear matrix, in row-major order, including reflection, rotation, and scaling
    pub fn matrix(&self) -> [[f64; 2]; 2] {
        let (cos, sin) = cos_sin(self.rotation);
        let (m, f) = (self.magnification, if self.mirror_x { -1. } else { 1. });
        [[m * cos, -m * sin * f], [m * sin, m * cos * f]]
    }
    /// Apply to floating-point coordinates (x,y), without rounding
    pub fn apply_f64(&self, x: f64, y: f64) -> (f64, f64) {
        let a = self.matrix();
        (
            a[0][0] * x + a[0][1] * y + self.dx,
            a[1][0] * x + a[1][1] * y + self.dy,
        )
    }
    /// Apply to [GdsPoint] `pt`, rounding to the nearest integer coordinates
    pub fn apply(&self, pt: &GdsPoint) -> GdsPoint {
        let (x, y) = self.apply_f64(f64::from(pt.x), f64::from(pt.y));
        GdsPoint::new(x.round() as i32, y.round() as i32)
    }
    /// Scale a length, e.g. a path width, rounding to the nearest integer
    fn scale_len(&self, len: i32) -> i32 {
        (f64::from(len) * self.magnification).round() as i32
    }
}

/// Normalize `angle` to the range [0, 360)
fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.);
    if a == 360. {
        0.
    } else {
        a
    }
}
/// Get the cosine and sine of `angle` degrees,
/// exactly for the Manhattan angles which make up nearly all real layout
fn cos_sin(angle: f64) -> (f64, f64) {
    match angle {
        a if a == 0. => (1., 0.),
        a if a == 90. => (0., 1.),
        a if a == 180. => (-1., 0.),
        a if a == 270. => (0., -1.),
        a => {
            let r = a.to_radians();
            (r.cos(), r.sin())
        }
    }
}

///
/// # Transformable Trait
///
/// Implemented by the primitive elements, producing a copy at transformed coordinates.
///
pub trait Transformable {
    /// Apply [Transform] `trans`, creating a new, transformed copy of `self`
    fn transform(&self, trans: &Transform) -> Self;
}
impl Transformable for GdsPoint {
    fn transform(&self, trans: &Transform) -> Self {
        trans.apply(self)
    }
}
impl Transformable for GdsBoundary {
    fn transform(&self, trans: &Transform) -> Self {
        Self {
            xy: self.xy.iter().map(|p| trans.apply(p)).collect(),
            ..self.clone()
        }
    }
}
impl Transformable for GdsPath {
    /// Positive widths scale with magnification.
    /// Negative widths are absolute, and remain unchanged.
    fn transform(&self, trans: &Transform) -> Self {
        Self {
            xy: self.xy.iter().map(|p| trans.apply(p)).collect(),
            width: self
                .width
                .map(|w| if w > 0 { trans.scale_len(w) } else { w }),
            begin_extn: self.begin_extn.map(|e| trans.scale_len(e)),
            end_extn: self.end_extn.map(|e| trans.scale_len(e)),
            ..self.clone()
        }
    }
}
impl Transformable for GdsTextElem {
    /// Text orientation composes with `trans`
    fn transform(&self, trans: &Transform) -> Self {
        let local = Transform::from_strans(&GdsPoint::default(), self.strans.as_ref());
        let composed = Transform::cascade(trans, &local);
        let strans = composed.to_strans(self.strans.as_ref());
        Self {
            xy: trans.apply(&self.xy),
            strans: if strans == GdsStrans::default() {
                None
            } else {
                Some(strans)
            },
            width: self
                .width
                .map(|w| if w > 0 { trans.scale_len(w) } else { w }),
            ..self.clone()
        }
    }
}
impl Transformable for GdsNode {
    fn transform(&self, trans: &Transform) -> Self {
        Self {
            xy: self.xy.iter().map(|p| trans.apply(p)).collect(),
            ..self.clone()
        }
    }
}
impl Transformable for GdsBox {
    fn transform(&self, trans: &Transform) -> Self {
        Self {
            xy: self.xy.map(|p| trans.apply(&p)),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identity_leaves_points() {
        let trans = Transform::identity();
        assert!(trans.is_identity());
        assert_eq!(trans.apply(&GdsPoint::new(-3, 7)), GdsPoint::new(-3, 7));
    }
    #[test]
    fn transform_rotate() {
        let trans = Transform::rotate(90.);
        assert_eq!(trans.apply(&GdsPoint::new(1, 0)), GdsPoint::new(0, 1));
        assert_eq!(trans.apply(&GdsPoint::new(2, 3)), GdsPoint::new(-3, 2));
        let trans = Transform::rotate(-90.);
        assert_eq!(trans.rotation, 270.);
        assert_eq!(trans.apply(&GdsPoint::new(2, 3)), GdsPoint::new(3, -2));
    }
    #[test]
    fn test_cascade1() {
        let trans1 = Transform::reflect_vert();
        let trans2 = Transform::translate(1., 1.);

        let p = GdsPoint::new(1, 1);
        let cascade1 = Transform::cascade(&trans1, &trans2);
        assert_eq!(cascade1.apply(&p), GdsPoint::new(2, -2));

        let cascade2 = Transform::cascade(&trans2, &trans1);
        assert_eq!(cascade2.apply(&p), GdsPoint::new(2, 0));
    }
    #[test]
    fn reflects_before_rotating() {
        let strans = GdsStrans {
            reflected: true,
            angle: Some(90.),
            ..Default::default()
        };
        let trans = Transform::from_strans(&GdsPoint::new(10, 0), Some(&strans));
        // (1,2) reflects to (1,-2), rotates to (2,1), translates to (12,1)
        assert_eq!(trans.apply(&GdsPoint::new(1, 2)), GdsPoint::new(12, 1));
    }
    #[test]
    fn cascade_under_reflection() {
        // A rotated child, inside a reflected parent, rotates the opposite direction
        let parent = Transform::reflect_vert();
        let child = Transform::rotate(90.);
        let both = Transform::cascade(&parent, &child);
        assert!(both.mirror_x);
        assert_eq!(both.rotation, 270.);
        let p = GdsPoint::new(2, 3);
        assert_eq!(both.apply(&p), parent.apply(&child.apply(&p)));
    }
    #[test]
    fn path_width_scales() {
        let path = GdsPath {
            layer: 1,
            datatype: 0,
            xy: GdsPoint::vec(&[(0, 0), (10, 0)]),
            width: Some(4),
            ..Default::default()
        };
        let trans = Transform::cascade(&Transform::translate(1., 1.), &Transform::scale(2.5));
        let moved = path.transform(&trans);
        assert_eq!(moved.xy, GdsPoint::vec(&[(1, 1), (26, 1)]));
        assert_eq!(moved.width, Some(10));

        let absolute = GdsPath {
            width: Some(-4),
            ..path
        };
        assert_eq!(absolute.transform(&trans).width, Some(-4));
    }
    #[test]
    fn text_orientation_composes() {
        let text = GdsTextElem {
            string: "vdd".into(),
            layer: 5,
            texttype: 0,
            xy: GdsPoint::new(1, 0),
            strans: Some(GdsStrans {
                angle: Some(90.),
                ..Default::default()
            }),
            ..Default::default()
        };
        let moved = text.transform(&Transform::rotate(180.));
        assert_eq!(moved.xy, GdsPoint::new(-1, 0));
        let strans = moved.strans.unwrap();
        assert_eq!(strans.angle, Some(270.));
        assert!(!strans.reflected);
        assert_eq!(strans.mag, None);

        // Un-rotated text gains no STRANS
        let plain = GdsTextElem {
            strans: None,
            ..text
        };
        assert_eq!(plain.transform(&Transform::translate(3., 4.)).strans, None);
    }

    fn arb_transform() -> impl Strategy<Value = Transform> {
        (
            -1000i32..1000,
            -1000i32..1000,
            0u8..8,
            any::<bool>(),
            1u8..4,
        )
            .prop_map(|(dx, dy, rot, mirror_x, mag)| Transform {
                dx: f64::from(dx),
                dy: f64::from(dy),
                rotation: f64::from(rot) * 45.,
                mirror_x,
                magnification: f64::from(mag) * 0.5,
            })
    }

    proptest! {
        #[test]
        fn cascade_is_associative(
            a in arb_transform(),
            b in arb_transform(),
            c in arb_transform(),
            x in -1000i32..1000,
            y in -1000i32..1000,
        ) {
            let left = Transform::cascade(&Transform::cascade(&a, &b), &c);
            let right = Transform::cascade(&a, &Transform::cascade(&b, &c));
            prop_assert_eq!(left.mirror_x, right.mirror_x);
            prop_assert!((left.magnification - right.magnification).abs() < 1e-9);
            let (lx, ly) = left.apply_f64(f64::from(x), f64::from(y));
            let (rx, ry) = right.apply_f64(f64::from(x), f64::from(y));
            prop_assert!((lx - rx).abs() < 1e-6 && (ly - ry).abs() < 1e-6);
        }

        #[test]
        fn cascade_matches_nested_application(
            a in arb_transform(),
            b in arb_transform(),
            x in -1000i32..1000,
            y in -1000i32..1000,
        ) {
            let (ix, iy) = b.apply_f64(f64::from(x), f64::from(y));
            let (nx, ny) = a.apply_f64(ix, iy);
            let (cx, cy) = Transform::cascade(&a, &b).apply_f64(f64::from(x), f64::from(y));
            prop_assert!((nx - cx).abs() < 1e-6 && (ny - cy).abs() < 1e-6);
        }
    }
}
