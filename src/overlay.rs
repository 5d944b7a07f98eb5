//! Placement of cosmetic overlays (eyewear, mustache) relative to facial landmarks.
//!
//! Overlay sizes are derived from the distance between two anchor landmarks, multiplied by a fixed
//! magnification factor. The factors and aspect ratios in [`OverlayParams::EYEWEAR`] and
//! [`OverlayParams::MUSTACHE`] were chosen to fit the stock overlay images. They are not derived
//! from anatomy, and need retuning if differently proportioned assets are used.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::image::Resolution;
use crate::landmark::{LandmarkIdx, Landmarks};
use crate::rect::Rect;
use crate::{Error, Result};

/// The kinds of overlays that can be placed on a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Eyewear,
    Mustache,
}

/// Selects which eyewear image is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleVariant {
    #[default]
    Default,
    Alternate,
}

/// Identifies an overlay image that a [`Surface`][crate::draw::Surface] should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayAsset {
    Glasses,
    GlassesAlternate,
    Mustache,
}

impl OverlayAsset {
    /// Returns the asset used for an overlay kind in a given style.
    ///
    /// The style only affects eyewear.
    pub fn select(kind: OverlayKind, style: StyleVariant) -> Self {
        match (kind, style) {
            (OverlayKind::Eyewear, StyleVariant::Default) => OverlayAsset::Glasses,
            (OverlayKind::Eyewear, StyleVariant::Alternate) => OverlayAsset::GlassesAlternate,
            (OverlayKind::Mustache, _) => OverlayAsset::Mustache,
        }
    }

    /// File name the asset is conventionally stored under.
    pub fn file_name(&self) -> &'static str {
        match self {
            OverlayAsset::Glasses => "glasses.png",
            OverlayAsset::GlassesAlternate => "glasses_alt.png",
            OverlayAsset::Mustache => "mustache.png",
        }
    }
}

/// Sizing parameters for one overlay kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayParams {
    /// Overlay width relative to the pixel distance between the anchor landmarks.
    pub scale: f32,
    /// Width divided by height.
    pub aspect: f32,
}

impl OverlayParams {
    pub const EYEWEAR: Self = Self {
        scale: 2.0,
        aspect: 3.0,
    };

    pub const MUSTACHE: Self = Self {
        scale: 1.5,
        aspect: 3.0,
    };
}

/// Where and what to draw for one overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    pub asset: OverlayAsset,
    pub rect: Rect,
}

/// Computes the placement of an overlay using the stock [`OverlayParams`].
///
/// `landmarks` must be the raw (not re-centered) landmarks in normalized frame coordinates;
/// `resolution` is the size of the destination surface.
///
/// # Errors
///
/// Returns [`Error::TooFewLandmarks`] if an anchor landmark is missing.
pub fn place_overlay(
    landmarks: &Landmarks,
    kind: OverlayKind,
    style: StyleVariant,
    resolution: Resolution,
) -> Result<OverlayPlacement> {
    let params = match kind {
        OverlayKind::Eyewear => OverlayParams::EYEWEAR,
        OverlayKind::Mustache => OverlayParams::MUSTACHE,
    };
    place_overlay_with(landmarks, kind, style, resolution, params)
}

/// Computes the placement of an overlay with custom sizing parameters.
pub fn place_overlay_with(
    landmarks: &Landmarks,
    kind: OverlayKind,
    style: StyleVariant,
    resolution: Resolution,
    params: OverlayParams,
) -> Result<OverlayPlacement> {
    let rect = match kind {
        OverlayKind::Eyewear => eyewear_rect(landmarks, resolution, params)?,
        OverlayKind::Mustache => mustache_rect(landmarks, resolution, params)?,
    };
    log::trace!("{kind:?} overlay at {rect:?}");
    Ok(OverlayPlacement {
        asset: OverlayAsset::select(kind, style),
        rect,
    })
}

/// Centered on the midpoint between the outer eye corners.
fn eyewear_rect(landmarks: &Landmarks, res: Resolution, params: OverlayParams) -> Result<Rect> {
    let left = anchor(landmarks, LandmarkIdx::LeftEyeOuterCorner)?;
    let right = anchor(landmarks, LandmarkIdx::RightEyeOuterCorner)?;

    let width = (right.x - left.x).abs() * res.width() as f32 * params.scale;
    let height = width / params.aspect;
    let mid = (left + right) * 0.5;
    let (cx, cy) = res.to_pixels(mid.x, mid.y);

    Ok(Rect::from_top_left(
        cx - width / 2.0,
        cy - height / 2.0,
        width,
        height,
    ))
}

/// Horizontally centered between the mouth corners, top edge at the nose tip.
fn mustache_rect(landmarks: &Landmarks, res: Resolution, params: OverlayParams) -> Result<Rect> {
    let nose = anchor(landmarks, LandmarkIdx::NoseTip)?;
    let left = anchor(landmarks, LandmarkIdx::MouthLeft)?;
    let right = anchor(landmarks, LandmarkIdx::MouthRight)?;

    let width = (right.x - left.x).abs() * res.width() as f32 * params.scale;
    let height = width / params.aspect;
    let (cx, _) = res.to_pixels((left.x + right.x) * 0.5, 0.0);
    let (_, top) = res.to_pixels(0.0, nose.y);

    Ok(Rect::from_top_left(cx - width / 2.0, top, width, height))
}

fn anchor(landmarks: &Landmarks, idx: LandmarkIdx) -> Result<Vector2<f32>> {
    let lm = landmarks.get(idx).ok_or(Error::TooFewLandmarks {
        len: landmarks.len(),
        required: idx.into(),
    })?;
    Ok(Vector2::new(lm.x(), lm.y()))
}
