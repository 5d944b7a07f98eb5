//! Replays a landmark recording through the pipeline and writes the rendered surfaces to disk.
//!
//! Usage: `mimic <recording.json> <out-dir> [options.json]`

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use mimic::draw::Surface;
use mimic::image::{Color, Image, ImageSurface};
use mimic::overlay::OverlayAsset;
use mimic::recording::Recording;
use mimic::reference::ReferenceLoader;
use mimic::session::{Session, SessionOptions};
use mimic::timer::Timer;

const ASSETS: [OverlayAsset; 3] = [
    OverlayAsset::Glasses,
    OverlayAsset::GlassesAlternate,
    OverlayAsset::Mustache,
];

fn main() -> anyhow::Result<()> {
    mimic::init_logger!();

    let mut args = env::args_os().skip(1);
    let (recording_path, out_dir) = match (args.next(), args.next()) {
        (Some(recording), Some(out)) => (PathBuf::from(recording), PathBuf::from(out)),
        _ => {
            eprintln!("usage: mimic <recording.json> <out-dir> [options.json]");
            process::exit(1);
        }
    };
    let options = match args.next() {
        Some(path) => SessionOptions::load(path)?,
        None => SessionOptions::default(),
    };

    let recording = Recording::load(&recording_path)?;
    let res = recording.resolution;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create '{}'", out_dir.display()))?;

    let frame = Image::filled(res, Color::from_rgb8(40, 40, 40));
    let mut reference = ReferenceLoader::new();
    reference.start(recording.reference_detector(), frame.clone());
    // Recordings are short; having the reference in place from the first frame makes the output
    // reproducible.
    reference.wait();

    let mut direct = ImageSurface::new(res);
    let mut mirrored = ImageSurface::new(res);
    load_assets(&mut direct, &mut mirrored);

    let mut session = Session::new(recording.frame_detector(), reference, options);
    let t_save = Timer::new("save");
    for index in 0..recording.frames.len() {
        match session.process_frame(&frame, &mut direct, &mut mirrored) {
            Ok(report) => log::info!(
                "frame {index}: face {}, score {}",
                if report.face_detected { "found" } else { "missing" },
                report.score,
            ),
            Err(e) => log::error!("frame {index}: {e}"),
        }

        t_save.time(|| -> anyhow::Result<()> {
            direct.image().save(out_dir.join(format!("frame_{index:04}_direct.png")))?;
            mirrored.image().save(out_dir.join(format!("frame_{index:04}_mirrored.png")))?;
            Ok(())
        })?;
    }

    session.stop();
    log::info!(
        "final score {} ({})",
        session.score(),
        session
            .timers()
            .into_iter()
            .chain([&t_save])
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

fn asset_dir() -> PathBuf {
    env::var_os("MIMIC_ASSET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets"))
}

/// Registers the overlay images found in the asset directory. Missing images are drawn as outlines.
fn load_assets(direct: &mut ImageSurface, mirrored: &mut ImageSurface) {
    let dir = asset_dir();
    for asset in ASSETS {
        let path = dir.join(asset.file_name());
        match load_asset(&path) {
            Ok(image) => {
                direct.set_asset(asset, image.clone());
                mirrored.set_asset(asset, image);
            }
            Err(e) => log::warn!("{e:#}"),
        }
    }
    log::debug!("surfaces ready at {}", direct.resolution());
}

fn load_asset(path: &Path) -> anyhow::Result<Image> {
    Image::load(path).with_context(|| format!("overlay image '{}' unavailable", path.display()))
}
