//! The per-frame pipeline.
//!
//! A [`Session`] ties together the landmark [`Detector`], the [`ReferenceLoader`] and the overlay
//! geometry. Each call to [`Session::process_frame`] detects the face in a camera frame, scores
//! its expression against the reference, and draws the frame, landmark markers and overlays onto
//! two surfaces: a direct one and a horizontally mirrored one.
//!
//! Only one detection, normalization and score is computed per frame. The mirrored view differs
//! from the direct one only by the transform set on its surface.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::detector::Detector;
use crate::draw::{self, Surface, Transform};
use crate::expression::{self, Indeterminate, Score};
use crate::image::{Color, Image};
use crate::landmark::Landmarks;
use crate::overlay::{self, OverlayKind, OverlayParams, StyleVariant};
use crate::reference::{ReferenceLoader, ReferenceState};
use crate::timer::{FpsCounter, Timer};
use crate::{Error, Result};

/// Options controlling what a [`Session`] draws and how it scores.
///
/// Can be deserialized from JSON; missing fields take their default values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    marker_color: Color,
    marker_opacity: f32,
    marker_radius: f32,
    overlay_enabled: bool,
    style_variant: StyleVariant,
    mustache_enabled: bool,
    eyewear: OverlayParams,
    mustache: OverlayParams,
    reset_score_on_miss: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            marker_color: Color::CYAN,
            marker_opacity: 1.0,
            marker_radius: 2.0,
            overlay_enabled: true,
            style_variant: StyleVariant::Default,
            mustache_enabled: false,
            eyewear: OverlayParams::EYEWEAR,
            mustache: OverlayParams::MUSTACHE,
            reset_score_on_miss: false,
        }
    }
}

impl SessionOptions {
    /// Reads options from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read options from '{}'", path.display()))?;
        let options = serde_json::from_str(&data)
            .with_context(|| format!("invalid options in '{}'", path.display()))?;
        Ok(options)
    }

    /// Sets the color of the landmark markers.
    pub fn marker_color(self, marker_color: Color) -> Self {
        Self {
            marker_color,
            ..self
        }
    }

    /// Sets the opacity of the landmark markers (0.0 to 1.0).
    pub fn marker_opacity(self, marker_opacity: f32) -> Self {
        Self {
            marker_opacity,
            ..self
        }
    }

    /// Sets the marker radius in pixels. A radius of 0 or less disables markers.
    pub fn marker_radius(self, marker_radius: f32) -> Self {
        Self {
            marker_radius,
            ..self
        }
    }

    pub fn overlay_enabled(self, overlay_enabled: bool) -> Self {
        Self {
            overlay_enabled,
            ..self
        }
    }

    pub fn style_variant(self, style_variant: StyleVariant) -> Self {
        Self {
            style_variant,
            ..self
        }
    }

    /// Enables or disables the mustache overlay. It is disabled by default.
    pub fn mustache_enabled(self, mustache_enabled: bool) -> Self {
        Self {
            mustache_enabled,
            ..self
        }
    }

    /// Overrides the sizing of the eyewear overlay.
    pub fn eyewear_params(self, eyewear: OverlayParams) -> Self {
        Self { eyewear, ..self }
    }

    /// Overrides the sizing of the mustache overlay.
    pub fn mustache_params(self, mustache: OverlayParams) -> Self {
        Self { mustache, ..self }
    }

    /// Selects what happens to the score when no face is detected.
    ///
    /// By default the last score is kept. If `reset` is `true`, the score becomes indeterminate
    /// instead.
    pub fn reset_score_on_miss(self, reset: bool) -> Self {
        Self {
            reset_score_on_miss: reset,
            ..self
        }
    }

    pub fn is_overlay_enabled(&self) -> bool {
        self.overlay_enabled
    }

    pub fn is_mustache_enabled(&self) -> bool {
        self.mustache_enabled
    }

    pub fn style(&self) -> StyleVariant {
        self.style_variant
    }

    fn marker(&self) -> Option<(Color, f32)> {
        (self.marker_radius > 0.0).then(|| {
            (
                self.marker_color.with_opacity(self.marker_opacity),
                self.marker_radius,
            )
        })
    }
}

/// Outcome of processing one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Whether a face was found in the frame.
    pub face_detected: bool,
    /// The session's score after this frame.
    pub score: Score,
}

/// Runs the expression-mimicking pipeline on a stream of camera frames.
pub struct Session<D: Detector> {
    detector: D,
    reference: ReferenceLoader,
    options: SessionOptions,
    score: Score,
    stopped: bool,
    t_detect: Timer,
    t_score: Timer,
    t_draw: Timer,
    fps: FpsCounter,
}

impl<D: Detector> Session<D> {
    /// Creates a session.
    ///
    /// `reference` is usually a [`ReferenceLoader`] that has just been started. Frames are scored
    /// as [`Indeterminate::ReferenceUnavailable`] until it is ready.
    pub fn new(detector: D, reference: ReferenceLoader, options: SessionOptions) -> Self {
        Self {
            detector,
            reference,
            options,
            score: Score::default(),
            stopped: false,
            t_detect: Timer::new("detect"),
            t_score: Timer::new("score"),
            t_draw: Timer::new("draw"),
            fps: FpsCounter::new("session"),
        }
    }

    /// Processes a camera frame.
    ///
    /// Both surfaces are cleared and redrawn. `direct` shows the frame as captured, `mirrored` shows
    /// it flipped horizontally. Markers and overlays are drawn on both when a face is detected.
    ///
    /// # Errors
    ///
    /// - [`Error::Stopped`] if [`Session::stop`] was called. Nothing is drawn.
    /// - [`Error::Detection`] if the detector fails. Both surfaces show the plain frame.
    /// - [`Error::LengthMismatch`] if the detected landmarks cannot be compared with the reference.
    ///   The frame is fully drawn and the score is left unchanged.
    ///
    /// A landmark set too short to contain the nose tip is reported as no face, not as an error.
    ///
    /// All errors only affect the current frame.
    pub fn process_frame<A: Surface, B: Surface>(
        &mut self,
        frame: &Image,
        direct: &mut A,
        mirrored: &mut B,
    ) -> Result<FrameReport> {
        if self.stopped {
            return Err(Error::Stopped);
        }

        // Toggles are sampled once, so both surfaces agree within a frame.
        let options = self.options;

        if let ReferenceState::Failed(e) = self.reference.poll() {
            log::trace!("reference unavailable: {e}");
        }

        let detection = self.t_detect.time(|| self.detector.detect(frame));

        self.t_draw.time(|| {
            direct.clear();
            direct.draw_frame(frame);
            mirrored.clear();
            mirrored.set_transform(Transform::MirrorHorizontal);
            mirrored.draw_frame(frame);
        });

        let face = match detection {
            Ok(Some(landmarks)) => match self.t_score.time(|| expression::normalize(&landmarks)) {
                Ok(features) => Some((landmarks, features)),
                Err(e) => {
                    // Without a nose tip there is nothing to anchor to.
                    log::trace!("unusable landmark set, treating as no face: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::error!("landmark detection failed: {e:#}");
                return Err(Error::Detection(e));
            }
        };

        let Some((landmarks, features)) = face else {
            if options.reset_score_on_miss {
                self.score = Score::default();
            }
            log::trace!("no face detected, score {}", self.score);
            self.tick();
            return Ok(FrameReport {
                face_detected: false,
                score: self.score,
            });
        };

        let scored = self.t_score.time(|| match self.reference.vector() {
            Some(reference) => expression::similarity(&features, reference),
            None => Ok(Score::Indeterminate(Indeterminate::ReferenceUnavailable)),
        });

        self.t_draw.time(|| {
            draw_face(direct, &landmarks, &options);
            draw_face(mirrored, &landmarks, &options);
        });

        match scored {
            Ok(score) => {
                log::trace!("score {score}");
                self.score = score;
            }
            Err(e) => {
                log::error!("cannot score frame: {e}");
                return Err(e);
            }
        }

        self.tick();
        Ok(FrameReport {
            face_detected: true,
            score: self.score,
        })
    }

    /// Returns the most recent score.
    pub fn score(&self) -> Score {
        self.score
    }

    /// Shows or hides the overlays, starting with the next frame.
    pub fn set_overlay_enabled(&mut self, enabled: bool) {
        log::debug!("overlay {}", if enabled { "enabled" } else { "disabled" });
        self.options.overlay_enabled = enabled;
    }

    /// Selects the eyewear style, starting with the next frame.
    pub fn set_style_variant(&mut self, style: StyleVariant) {
        log::debug!("style variant {style:?}");
        self.options.style_variant = style;
    }

    pub fn set_mustache_enabled(&mut self, enabled: bool) {
        self.options.mustache_enabled = enabled;
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn reference(&self) -> &ReferenceLoader {
        &self.reference
    }

    /// Switches to a new reference expression.
    ///
    /// A pending analysis of the old reference is discarded. The current score becomes
    /// indeterminate.
    pub fn replace_reference(&mut self, reference: ReferenceLoader) {
        self.reference.cancel();
        self.reference = reference;
        self.score = Score::default();
    }

    /// Stops the session.
    ///
    /// All later [`Session::process_frame`] calls fail with [`Error::Stopped`]. A pending reference
    /// analysis is discarded; its thread finishes on its own.
    pub fn stop(&mut self) {
        if !self.stopped {
            log::debug!("session stopped");
            self.stopped = true;
            self.reference.cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Returns profiling timers for the pipeline stages.
    pub fn timers(&self) -> impl IntoIterator<Item = &Timer> + '_ {
        [&self.t_detect, &self.t_score, &self.t_draw]
    }

    fn tick(&mut self) {
        self.fps
            .tick_with([&self.t_detect, &self.t_score, &self.t_draw]);
    }
}

/// Draws landmark markers and the enabled overlays.
///
/// Coordinates are computed in the pixel space of `surface`; any mirroring is left to the transform
/// already set on it.
fn draw_face<S: Surface>(surface: &mut S, landmarks: &Landmarks, options: &SessionOptions) {
    let res = surface.resolution();

    if let Some((color, radius)) = options.marker() {
        for landmark in landmarks.iter() {
            let (x, y) = res.to_pixels(landmark.x(), landmark.y());
            draw::marker(surface, x, y).color(color).radius(radius);
        }
    }

    if !options.overlay_enabled {
        return;
    }

    let mut overlays = vec![(OverlayKind::Eyewear, options.eyewear)];
    if options.mustache_enabled {
        overlays.push((OverlayKind::Mustache, options.mustache));
    }
    for (kind, params) in overlays {
        match overlay::place_overlay_with(landmarks, kind, options.style_variant, res, params) {
            Ok(placement) => {
                draw::overlay(surface, placement.asset, placement.rect);
            }
            Err(e) => log::debug!("no {kind:?} overlay this frame: {e}"),
        }
    }
}
