//! Expression features and similarity scoring.
//!
//! A face's expression is described by a [`FeatureVector`]: its landmarks, re-centered so that the
//! nose tip is the origin. Two feature vectors are compared with [`similarity`], which computes the
//! cosine similarity over the concatenated X and Y coordinates of all points.
//!
//! Only translation is removed. Moving closer to or farther from the camera scales the vector,
//! and tilting the head rotates it, both of which affect the score independently of the
//! expression.

use std::fmt;

use itertools::Itertools;

use crate::landmark::{LandmarkIdx, Landmarks};
use crate::{Error, Result};

/// The landmark that becomes the origin of a [`FeatureVector`].
pub const ORIGIN: LandmarkIdx = LandmarkIdx::NoseTip;

/// A landmark set translated so that the nose tip is at `(0, 0)`.
///
/// Preserves the number of points and their index semantics. Z coordinates are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    points: Box<[[f32; 2]]>,
}

impl FeatureVector {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[[f32; 2]] {
        &self.points
    }

    /// Returns the squared magnitude of the vector (sum of `x² + y²` over all points).
    pub fn norm_squared(&self) -> f32 {
        self.points.iter().map(|[x, y]| x * x + y * y).sum()
    }
}

/// A feature vector can be fed back into [`normalize`]; its Z coordinates are zero.
impl From<&FeatureVector> for Landmarks {
    fn from(features: &FeatureVector) -> Self {
        Landmarks::from_positions(
            features
                .points
                .iter()
                .map(|&[x, y]| [x, y, 0.0])
                .collect::<Vec<_>>(),
        )
    }
}

/// Translates `landmarks` so that the nose tip becomes the origin.
///
/// Normalizing an already normalized set returns the same vector, since the nose tip is already at
/// exactly `(0, 0)`.
///
/// # Errors
///
/// Returns [`Error::TooFewLandmarks`] if `landmarks` does not contain the nose tip.
pub fn normalize(landmarks: &Landmarks) -> Result<FeatureVector> {
    let origin = landmarks.get(ORIGIN).ok_or(Error::TooFewLandmarks {
        len: landmarks.len(),
        required: ORIGIN.into(),
    })?;
    let (ox, oy) = (origin.x(), origin.y());

    let points = landmarks
        .positions()
        .iter()
        .map(|&[x, y, _]| [x - ox, y - oy])
        .collect();
    Ok(FeatureVector { points })
}

/// Why no similarity value could be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indeterminate {
    /// No frame has been scored yet.
    NotScored,
    /// The reference expression is still loading or failed to load.
    ReferenceUnavailable,
    /// One of the compared vectors has zero or non-finite magnitude.
    DegenerateNorm,
}

/// Result of comparing the live expression against the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    /// Cosine similarity in range -1.0 to 1.0.
    Similarity(f32),
    Indeterminate(Indeterminate),
}

impl Score {
    /// Returns the similarity value, if one was computed.
    pub fn value(&self) -> Option<f32> {
        match *self {
            Score::Similarity(v) => Some(v),
            Score::Indeterminate(_) => None,
        }
    }

    /// Returns the similarity as an integer percentage (`floor(similarity * 100)`).
    ///
    /// Returns [`None`] when the score is indeterminate, in which case no number should be shown.
    pub fn percent(&self) -> Option<i32> {
        // Round away float noise first, or identical faces can land on 99.
        self.value()
            .map(|v| ((v * 100.0 * 1e3).round() / 1e3).floor() as i32)
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Score::Indeterminate(_))
    }
}

impl Default for Score {
    fn default() -> Self {
        Score::Indeterminate(Indeterminate::NotScored)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent() {
            Some(percent) => write!(f, "{percent}%"),
            None => f.write_str("--"),
        }
    }
}

/// Computes the cosine similarity of two feature vectors.
///
/// The result is symmetric in its arguments. If either vector has zero magnitude (every landmark
/// coincides with the nose tip) or contains non-finite coordinates, the result is
/// [`Indeterminate::DegenerateNorm`].
///
/// # Errors
///
/// Returns [`Error::LengthMismatch`] if the vectors have different lengths. This indicates that the
/// live detector and the reference detector are configured differently.
pub fn similarity(live: &FeatureVector, reference: &FeatureVector) -> Result<Score> {
    if live.len() != reference.len() {
        return Err(Error::LengthMismatch {
            live: live.len(),
            reference: reference.len(),
        });
    }

    let norm_live = live.norm_squared();
    let norm_ref = reference.norm_squared();
    let usable = |norm: f32| norm != 0.0 && norm.is_finite();
    if !usable(norm_live) || !usable(norm_ref) {
        return Ok(Score::Indeterminate(Indeterminate::DegenerateNorm));
    }

    let dot: f32 = live
        .points()
        .iter()
        .zip_eq(reference.points())
        .map(|([ax, ay], [bx, by])| ax * bx + ay * by)
        .sum();

    let cos = dot / (norm_live.sqrt() * norm_ref.sqrt());
    if !cos.is_finite() {
        return Ok(Score::Indeterminate(Indeterminate::DegenerateNorm));
    }
    Ok(Score::Similarity(cos.clamp(-1.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::test;

    #[test]
    fn nose_tip_becomes_origin() {
        for _ in 0..20 {
            let lms = test::random_face();
            let features = normalize(&lms).unwrap();
            assert_eq!(features.len(), lms.len());
            assert_eq!(features.points()[usize::from(ORIGIN)], [0.0, 0.0]);
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        for _ in 0..20 {
            let once = normalize(&test::random_face()).unwrap();
            let twice = normalize(&Landmarks::from(&once)).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalize_ignores_z() {
        let mut lms = test::neutral_face();
        let flat = normalize(&lms).unwrap();
        lms.map_positions(|[x, y, z]| [x, y, z + 5.0]);
        assert_eq!(normalize(&lms).unwrap(), flat);
    }

    #[test]
    fn normalize_too_short() {
        match normalize(&Landmarks::new(0)) {
            Err(Error::TooFewLandmarks { len: 0, required: 1 }) => {}
            other => panic!("unexpected result {other:?}"),
        }
        match normalize(&Landmarks::new(1)) {
            Err(Error::TooFewLandmarks { len: 1, required: 1 }) => {}
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(normalize(&Landmarks::new(2)).unwrap().len(), 2);
    }

    #[test]
    fn self_similarity_is_one() {
        let features = normalize(&test::random_face()).unwrap();
        let score = similarity(&features, &features).unwrap();
        assert_relative_eq!(score.value().unwrap(), 1.0, epsilon = 1e-5);
        assert_eq!(score.percent(), Some(100));
    }

    #[test]
    fn similarity_is_commutative() {
        for _ in 0..20 {
            let a = normalize(&test::random_face()).unwrap();
            let b = normalize(&test::random_face()).unwrap();
            assert_eq!(similarity(&a, &b).unwrap(), similarity(&b, &a).unwrap());
        }
    }

    #[test]
    fn similarity_is_bounded() {
        for _ in 0..20 {
            let a = normalize(&test::random_face()).unwrap();
            let b = normalize(&test::random_face()).unwrap();
            let v = similarity(&a, &b).unwrap().value().unwrap();
            assert!((-1.0..=1.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn opposite_vectors() {
        let a = normalize(&test::neutral_face()).unwrap();
        let mut flipped = Landmarks::from(&a);
        flipped.map_positions(|[x, y, z]| [-x, -y, z]);
        let b = normalize(&flipped).unwrap();
        let score = similarity(&a, &b).unwrap();
        assert_relative_eq!(score.value().unwrap(), -1.0, epsilon = 1e-5);
    }

    #[test]
    fn degenerate_norm() {
        let degenerate = normalize(&Landmarks::new(test::NUM_POINTS)).unwrap();
        let face = normalize(&test::neutral_face()).unwrap();
        let expected = Score::Indeterminate(Indeterminate::DegenerateNorm);
        assert_eq!(similarity(&degenerate, &face).unwrap(), expected);
        assert_eq!(similarity(&face, &degenerate).unwrap(), expected);
        assert_eq!(similarity(&degenerate, &degenerate).unwrap(), expected);
        assert_eq!(expected.percent(), None);
    }

    #[test]
    fn non_finite_coordinates() {
        let face = normalize(&test::neutral_face()).unwrap();
        let expected = Score::Indeterminate(Indeterminate::DegenerateNorm);
        for bad in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            let mut lms = test::neutral_face();
            lms.positions_mut()[10][0] *= bad;
            let broken = normalize(&lms).unwrap();
            let score = similarity(&broken, &face).unwrap();
            assert_eq!(score, expected);
            assert_eq!(similarity(&face, &broken).unwrap(), expected);
            assert_eq!(score.to_string(), "--");
        }
    }

    #[test]
    fn length_mismatch() {
        let a = normalize(&test::neutral_face()).unwrap();
        let b = normalize(&Landmarks::new(10)).unwrap();
        match similarity(&a, &b) {
            Err(Error::LengthMismatch { live, reference }) => {
                assert_eq!(live, test::NUM_POINTS);
                assert_eq!(reference, 10);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn percent_floors() {
        assert_eq!(Score::Similarity(0.987).percent(), Some(98));
        assert_eq!(Score::Similarity(1.0).percent(), Some(100));
        assert_eq!(Score::Similarity(-0.5).percent(), Some(-50));
        assert_eq!(Score::default().percent(), None);
        assert_eq!(Score::Similarity(0.5).to_string(), "50%");
        assert_eq!(Score::default().to_string(), "--");
    }
}
