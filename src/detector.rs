//! The face landmark detector interface.
//!
//! Landmark estimation itself is provided by an external back end (for example a face mesh
//! network). This crate only depends on the [`Detector`] trait, so the pipeline can be driven by
//! any implementation, including the [`ReplayDetector`][crate::recording::ReplayDetector] that
//! plays back recorded landmarks.

use serde::{Deserialize, Serialize};

use crate::image::Image;
use crate::landmark::{Landmarks, NUM_LANDMARKS};

/// Estimates face landmarks in an image.
pub trait Detector {
    /// Detects the landmarks of the first face in `image`.
    ///
    /// Returns `Ok(None)` if no face is visible. That is a normal outcome, not an error.
    ///
    /// Landmark coordinates must be normalized to the image size: `x` and `y` in range 0.0 to 1.0
    /// with the origin at the top left corner. `z` is relative depth and is ignored by the
    /// pipeline.
    fn detect(&mut self, image: &Image) -> anyhow::Result<Option<Landmarks>>;
}

impl<D: Detector + ?Sized> Detector for &mut D {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Option<Landmarks>> {
        (**self).detect(image)
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Option<Landmarks>> {
        (**self).detect(image)
    }
}

/// Configuration a [`Detector`] back end is expected to run with.
///
/// The pipeline only ever looks at one face and relies on the refined (iris-aware) face mesh
/// indices, so back ends should be configured accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Maximum number of faces to detect. Only the first one is used.
    pub max_faces: usize,
    /// Whether the refined mesh (with iris landmarks) is requested.
    pub refine_landmarks: bool,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl DetectorOptions {
    /// Number of landmarks per face produced by a back end using these options.
    pub fn landmark_count(&self) -> usize {
        if self.refine_landmarks {
            NUM_LANDMARKS
        } else {
            // The unrefined mesh lacks the 10 iris points.
            NUM_LANDMARKS - 10
        }
    }
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_faces: 1,
            refine_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}
