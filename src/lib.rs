//! Expression analysis and overlay placement for an expression-mimicking game.
//!
//! The player tries to copy the facial expression shown in a reference image. Every camera frame
//! is run through a face landmark [`Detector`][detector::Detector]; the landmarks are re-centered
//! on the nose tip and compared with the reference expression using cosine similarity. Cosmetic
//! overlays (eyewear, optionally a mustache) are positioned from the same landmarks.
//!
//! The entry point is [`Session`][session::Session]. It draws onto two
//! [`Surface`][draw::Surface]s, one showing the frame as captured and one mirrored horizontally.
//!
//! # Coordinates
//!
//! Landmarks use normalized image coordinates: X and Y are in range 0.0 to 1.0, with the origin at
//! the top left corner and Y pointing down. Drawing happens in pixel coordinates of the destination
//! surface.
//!
//! # Environment Variables
//!
//! * `MIMIC_ASSET_DIR`: directory the `mimic` replay tool loads overlay images from
//!   (`glasses.png`, `glasses_alt.png`, `mustache.png`). Defaults to `assets`.
//! * `RUST_LOG`: overrides the log filter set up by [`init_logger!`].

pub mod detector;
pub mod draw;
mod error;
pub mod expression;
pub mod image;
pub mod landmark;
pub mod overlay;
pub mod recording;
pub mod rect;
pub mod reference;
pub mod session;
pub mod timer;
pub mod worker;


use log::LevelFilter;

pub use error::{Error, Result};

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this library will log at *trace*
/// level. Otherwise, they will log at *debug* level. `RUST_LOG` is honored on top of that.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
