//! Asynchronous analysis of the reference expression.
//!
//! The reference image is analyzed once, on a background thread, so that slow image decoding and
//! landmark detection never stall the frame loop. [`ReferenceLoader`] tracks the analysis:
//!
//! ```text
//! Idle --start--> Loading --+--> Ready(vector)
//!                           +--> Failed(cause)
//! ```
//!
//! `Ready` and `Failed` are final. There is no retry; a different reference needs a new loader.

use std::path::{Path, PathBuf};

use crate::detector::Detector;
use crate::expression::{self, FeatureVector};
use crate::image::Image;
use crate::worker::{self, PromiseHandle};

/// Where the reference expression comes from.
#[derive(Debug, Clone)]
pub enum ReferenceSource {
    /// An image file to load (JPEG or PNG).
    Path(PathBuf),
    /// An already decoded image.
    Image(Image),
}

impl From<PathBuf> for ReferenceSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ReferenceSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Image> for ReferenceSource {
    fn from(image: Image) -> Self {
        Self::Image(image)
    }
}

/// Why the reference expression could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("no face detected in the reference image")]
    NoFace,
    #[error("reference image could not be loaded: {0}")]
    ImageUnavailable(String),
    #[error("landmark detection failed on the reference image: {0}")]
    Detector(String),
    #[error("reference analysis ended without a result")]
    Abandoned,
}

/// State of a [`ReferenceLoader`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceState {
    Idle,
    Loading,
    Ready(FeatureVector),
    Failed(ReferenceError),
}

/// Loads the reference expression in the background and holds the resulting vector.
pub struct ReferenceLoader {
    state: ReferenceState,
    pending: Option<PromiseHandle<Result<FeatureVector, ReferenceError>>>,
}

impl ReferenceLoader {
    /// Creates an idle loader.
    pub fn new() -> Self {
        Self {
            state: ReferenceState::Idle,
            pending: None,
        }
    }

    /// Creates a loader that is already [`ReferenceState::Ready`] with a precomputed vector.
    pub fn ready(vector: FeatureVector) -> Self {
        Self {
            state: ReferenceState::Ready(vector),
            pending: None,
        }
    }

    /// Starts analyzing `source` with `detector` on a background thread.
    ///
    /// Only the first call has an effect. Later calls are ignored with a warning.
    pub fn start<D>(&mut self, detector: D, source: impl Into<ReferenceSource>)
    where
        D: Detector + Send + 'static,
    {
        if self.state != ReferenceState::Idle {
            log::warn!("reference analysis already started, ignoring new request");
            return;
        }

        let source = source.into();
        log::debug!("starting reference analysis of {}", source_name(&source));
        match worker::spawn("reference-analysis", move || analyze(detector, source)) {
            Ok(handle) => {
                self.pending = Some(handle);
                self.state = ReferenceState::Loading;
            }
            Err(e) => {
                log::error!("failed to spawn reference analysis thread: {e}");
                self.state = ReferenceState::Failed(ReferenceError::Abandoned);
            }
        }
    }

    /// Picks up the analysis result if it has arrived. Never blocks.
    pub fn poll(&mut self) -> &ReferenceState {
        if let Some(handle) = &self.pending {
            if let Some(result) = handle.try_take() {
                self.pending = None;
                self.finish(result.unwrap_or(Err(ReferenceError::Abandoned)));
            }
        }
        &self.state
    }

    /// Blocks until the analysis has finished, and returns the final state.
    ///
    /// Returns immediately if no analysis is pending.
    pub fn wait(&mut self) -> &ReferenceState {
        if let Some(handle) = self.pending.take() {
            self.finish(handle.block().unwrap_or(Err(ReferenceError::Abandoned)));
        }
        &self.state
    }

    /// Drops the pending analysis, if any.
    ///
    /// The background thread runs to completion and its result is discarded. A loader that was
    /// still loading ends up [`ReferenceError::Abandoned`].
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            log::debug!("reference analysis cancelled");
            self.state = ReferenceState::Failed(ReferenceError::Abandoned);
        }
    }

    pub fn state(&self) -> &ReferenceState {
        &self.state
    }

    /// Returns the reference vector once the loader is [`ReferenceState::Ready`].
    pub fn vector(&self) -> Option<&FeatureVector> {
        match &self.state {
            ReferenceState::Ready(vector) => Some(vector),
            _ => None,
        }
    }

    fn finish(&mut self, result: Result<FeatureVector, ReferenceError>) {
        self.state = match result {
            Ok(vector) => {
                log::debug!("reference expression ready ({} points)", vector.len());
                ReferenceState::Ready(vector)
            }
            Err(e) => {
                log::warn!("{e}; similarity scores will be unavailable");
                ReferenceState::Failed(e)
            }
        };
    }
}

impl Default for ReferenceLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn source_name(source: &ReferenceSource) -> String {
    match source {
        ReferenceSource::Path(path) => format!("'{}'", path.display()),
        ReferenceSource::Image(image) => format!("{image:?}"),
    }
}

/// Runs the reference analysis on the calling thread.
pub fn analyze<D: Detector>(
    mut detector: D,
    source: ReferenceSource,
) -> Result<FeatureVector, ReferenceError> {
    let image = match source {
        ReferenceSource::Path(path) => Image::load(&path)
            .map_err(|e| ReferenceError::ImageUnavailable(format!("{}: {e:#}", path.display())))?,
        ReferenceSource::Image(image) => image,
    };

    let landmarks = detector
        .detect(&image)
        .map_err(|e| ReferenceError::Detector(format!("{e:#}")))?
        .ok_or(ReferenceError::NoFace)?;

    // A face with too few landmarks to locate the nose tip counts as no face.
    expression::normalize(&landmarks).map_err(|e| {
        log::warn!("reference landmarks unusable: {e}");
        ReferenceError::NoFace
    })
}
