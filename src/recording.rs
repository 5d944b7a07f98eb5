//! Recorded landmark streams.
//!
//! A [`Recording`] stores the landmarks a detector produced for a sequence of frames, plus the
//! landmarks of a reference image. Recordings are JSON documents:
//!
//! ```json
//! {
//!   "resolution": { "width": 640, "height": 480 },
//!   "reference": [[0.5, 0.55, 0.0], ...],
//!   "frames": [[[0.5, 0.55, 0.0], ...], null, ...]
//! }
//! ```
//!
//! A `null` frame means no face was detected. [`ReplayDetector`] plays a recording back through
//! the [`Detector`] trait, which allows running the pipeline without a camera or a neural network.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::detector::Detector;
use crate::image::{Image, Resolution};
use crate::landmark::{Landmarks, Position};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Resolution the frames were captured at.
    #[serde(default)]
    pub resolution: Resolution,
    /// Landmarks of the reference image, or `null` if it showed no face.
    #[serde(default)]
    pub reference: Option<Vec<Position>>,
    /// Per-frame landmarks.
    #[serde(default)]
    pub frames: Vec<Option<Vec<Position>>>,
}

impl Recording {
    /// Loads a recording from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recording '{}'", path.display()))?;
        let recording: Recording = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse recording '{}'", path.display()))?;
        log::debug!(
            "loaded recording '{}' with {} frames at {}",
            path.display(),
            recording.frames.len(),
            recording.resolution,
        );
        Ok(recording)
    }

    /// Writes the recording to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write recording '{}'", path.display()))?;
        Ok(())
    }

    /// Appends a frame.
    pub fn push(&mut self, landmarks: Option<&Landmarks>) {
        self.frames
            .push(landmarks.map(|lms| lms.positions().to_vec()));
    }

    /// Returns a detector that plays back the frames.
    pub fn frame_detector(&self) -> ReplayDetector {
        ReplayDetector::new(self.frames.iter().map(|frame| to_landmarks(frame.as_deref())))
    }

    /// Returns a detector that reports the reference landmarks once.
    pub fn reference_detector(&self) -> ReplayDetector {
        ReplayDetector::new([to_landmarks(self.reference.as_deref())])
    }
}

fn to_landmarks(positions: Option<&[Position]>) -> Option<Landmarks> {
    positions.map(Landmarks::from_positions)
}

/// A [`Detector`] that returns prerecorded results in order, ignoring the image.
///
/// Once all results are used up, no face is reported.
#[derive(Debug, Clone)]
pub struct ReplayDetector {
    results: VecDeque<Option<Landmarks>>,
}

impl ReplayDetector {
    pub fn new<I: IntoIterator<Item = Option<Landmarks>>>(results: I) -> Self {
        Self {
            results: results.into_iter().collect(),
        }
    }

    /// Number of results left to play back.
    pub fn remaining(&self) -> usize {
        self.results.len()
    }
}

impl Detector for ReplayDetector {
    fn detect(&mut self, _image: &Image) -> anyhow::Result<Option<Landmarks>> {
        match self.results.pop_front() {
            Some(result) => Ok(result),
            None => {
                log::trace!("replay exhausted");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::neutral_face;

    #[test]
    fn parse() {
        let json = r#"{
            "resolution": {"width": 320, "height": 240},
            "reference": null,
            "frames": [[[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]], null]
        }"#;
        let recording: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(recording.resolution, Resolution::new(320, 240));
        assert!(recording.reference.is_none());

        let mut detector = recording.frame_detector();
        let image = Image::new(1, 1);
        assert_eq!(detector.remaining(), 2);
        let first = detector.detect(&image).unwrap().unwrap();
        assert_eq!(first.positions(), &[[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]);
        assert!(detector.detect(&image).unwrap().is_none());
        assert!(detector.detect(&image).unwrap().is_none());
    }

    #[test]
    fn defaults() {
        let recording: Recording = serde_json::from_str("{}").unwrap();
        assert_eq!(recording.resolution, Resolution::VGA);
        assert!(recording.frames.is_empty());
    }

    #[test]
    fn push_and_reference() {
        let mut recording = Recording {
            reference: Some(neutral_face().positions().to_vec()),
            ..Recording::default()
        };
        recording.push(Some(&neutral_face()));
        recording.push(None);
        assert_eq!(recording.frames.len(), 2);

        let mut detector = recording.reference_detector();
        let reference = detector.detect(&Image::new(1, 1)).unwrap();
        assert_eq!(reference, Some(neutral_face()));
        assert_eq!(detector.remaining(), 0);
    }

    #[test]
    fn save_and_load() {
        let mut recording = Recording {
            resolution: Resolution::new(320, 240),
            reference: Some(neutral_face().positions().to_vec()),
            frames: Vec::new(),
        };
        recording.push(None);
        recording.push(Some(&neutral_face()));

        let path = std::env::temp_dir().join(format!("mimic-recording-{}.json", std::process::id()));
        recording.save(&path).unwrap();
        let loaded = Recording::load(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.unwrap(), recording);
    }

    #[test]
    fn load_missing_file() {
        let err = Recording::load("/nonexistent/recording.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/recording.json"), "{err}");
    }
}
