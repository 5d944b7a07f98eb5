use std::time::Duration;

use approx::assert_relative_eq;
use crossbeam::channel::{self, Receiver, Sender};
use mimic::draw::CommandRecorder;
use mimic::expression::{self, Indeterminate, Score};
use mimic::image::{Color, Image, ImageSurface, Resolution};
use mimic::landmark::{Landmark, LandmarkIdx, Landmarks, NUM_LANDMARKS};
use mimic::overlay::{self, OverlayAsset, OverlayKind, StyleVariant};
use mimic::recording::{Recording, ReplayDetector};
use mimic::reference::{ReferenceError, ReferenceLoader, ReferenceState};
use mimic::session::{Session, SessionOptions};
use mimic::Error;

/// Reference detector that blocks until released, then reports back when it has returned.
struct Gated {
    release: Receiver<()>,
    done: Sender<()>,
    landmarks: Option<Landmarks>,
}

impl mimic::detector::Detector for Gated {
    fn detect(&mut self, _: &Image) -> anyhow::Result<Option<Landmarks>> {
        self.release.recv().ok();
        let result = self.landmarks.take();
        self.done.send(()).ok();
        Ok(result)
    }
}

fn gated(landmarks: Option<Landmarks>) -> (ReferenceLoader, Sender<()>, Receiver<()>) {
    let (release_tx, release_rx) = channel::bounded(1);
    let (done_tx, done_rx) = channel::bounded(1);
    let mut loader = ReferenceLoader::new();
    loader.start(
        Gated {
            release: release_rx,
            done: done_tx,
            landmarks,
        },
        frame(),
    );
    (loader, release_tx, done_rx)
}

fn face(eye_l: (f32, f32), eye_r: (f32, f32)) -> Landmarks {
    let mut lms = Landmarks::new(NUM_LANDMARKS);
    for i in 0..NUM_LANDMARKS {
        let t = i as f32 * 0.37;
        lms.set(
            i,
            Landmark::new([0.5 + 0.15 * t.sin(), 0.5 + 0.2 * t.cos(), 0.0]),
        );
    }
    let mut place = |idx: LandmarkIdx, (x, y): (f32, f32)| {
        lms.set(idx.into(), Landmark::new([x, y, 0.0]));
    };
    place(LandmarkIdx::NoseTip, (0.5, 0.55));
    place(LandmarkIdx::LeftEyeOuterCorner, eye_l);
    place(LandmarkIdx::RightEyeOuterCorner, eye_r);
    place(LandmarkIdx::MouthLeft, (0.45, 0.65));
    place(LandmarkIdx::MouthRight, (0.55, 0.65));
    lms
}

fn default_face() -> Landmarks {
    face((0.3, 0.4), (0.7, 0.4))
}

fn frame() -> Image {
    Image::filled(Resolution::VGA, Color::BLACK)
}

fn recorders() -> (CommandRecorder, CommandRecorder) {
    (
        CommandRecorder::new(Resolution::VGA),
        CommandRecorder::new(Resolution::VGA),
    )
}

fn started(reference: Option<Landmarks>) -> ReferenceLoader {
    let mut loader = ReferenceLoader::new();
    loader.start(ReplayDetector::new([reference]), frame());
    loader
}

#[test]
fn identical_expression_scores_100() {
    let mut reference = started(Some(default_face()));
    reference.wait();
    let mut session = Session::new(
        ReplayDetector::new([Some(default_face())]),
        reference,
        SessionOptions::default(),
    );
    let (mut direct, mut mirrored) = recorders();
    let report = session
        .process_frame(&frame(), &mut direct, &mut mirrored)
        .unwrap();
    assert!(report.face_detected);
    assert_eq!(report.score.percent(), Some(100));
    assert_eq!(report.score.to_string(), "100%");
}

#[test]
fn reference_without_face() {
    let mut reference = started(None);
    assert_eq!(
        reference.wait(),
        &ReferenceState::Failed(ReferenceError::NoFace)
    );
    let mut session = Session::new(
        ReplayDetector::new([Some(default_face())]),
        reference,
        SessionOptions::default(),
    );
    let (mut direct, mut mirrored) = recorders();
    let report = session
        .process_frame(&frame(), &mut direct, &mut mirrored)
        .unwrap();
    assert_eq!(
        report.score,
        Score::Indeterminate(Indeterminate::ReferenceUnavailable)
    );
    assert_eq!(report.score.percent(), None);
    assert_eq!(report.score.to_string(), "--");
    // Markers and overlays do not depend on the reference.
    assert_eq!(direct.marker_count(), NUM_LANDMARKS);
    assert_eq!(direct.overlays().len(), 1);
}

#[test]
fn frames_without_reference_are_indeterminate() {
    let mut session = Session::new(
        ReplayDetector::new([Some(default_face())]),
        ReferenceLoader::new(),
        SessionOptions::default(),
    );
    let (mut direct, mut mirrored) = recorders();
    let report = session
        .process_frame(&frame(), &mut direct, &mut mirrored)
        .unwrap();
    assert!(report.score.is_indeterminate());
}

#[test]
fn frames_while_reference_loading_are_indeterminate() {
    let (reference, release, done) = gated(Some(default_face()));
    assert_eq!(reference.state(), &ReferenceState::Loading);

    let mut session = Session::new(
        ReplayDetector::new([Some(default_face()), Some(default_face())]),
        reference,
        SessionOptions::default(),
    );
    let (mut direct, mut mirrored) = recorders();
    for _ in 0..2 {
        let report = session
            .process_frame(&frame(), &mut direct, &mut mirrored)
            .unwrap();
        assert!(report.face_detected);
        assert_eq!(
            report.score,
            Score::Indeterminate(Indeterminate::ReferenceUnavailable)
        );
        assert_eq!(session.reference().state(), &ReferenceState::Loading);
        assert_eq!(direct.marker_count(), NUM_LANDMARKS);
    }

    release.send(()).unwrap();
    done.recv_timeout(Duration::from_secs(5)).unwrap();
}

#[test]
fn stop_discards_pending_reference() {
    let (reference, release, done) = gated(Some(default_face()));
    let mut session = Session::new(
        ReplayDetector::new([Some(default_face())]),
        reference,
        SessionOptions::default(),
    );
    let (mut direct, mut mirrored) = recorders();
    let report = session
        .process_frame(&frame(), &mut direct, &mut mirrored)
        .unwrap();
    assert_eq!(
        report.score,
        Score::Indeterminate(Indeterminate::ReferenceUnavailable)
    );

    session.stop();
    assert_eq!(
        session.reference().state(),
        &ReferenceState::Failed(ReferenceError::Abandoned)
    );

    // The analysis finishes after the session stopped; its result goes nowhere.
    release.send(()).unwrap();
    done.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        session.reference().state(),
        &ReferenceState::Failed(ReferenceError::Abandoned)
    );
    assert!(session.reference().vector().is_none());
    assert!(matches!(
        session.process_frame(&frame(), &mut direct, &mut mirrored),
        Err(Error::Stopped)
    ));
    assert_eq!(session.score(), report.score);
}

#[test]
fn eyewear_geometry() {
    let placement = overlay::place_overlay(
        &default_face(),
        OverlayKind::Eyewear,
        StyleVariant::Default,
        Resolution::VGA,
    )
    .unwrap();
    assert_eq!(placement.asset, OverlayAsset::Glasses);
    assert_relative_eq!(placement.rect.width(), 512.0, epsilon = 1e-3);
    assert_relative_eq!(placement.rect.height(), 512.0 / 3.0, epsilon = 1e-3);
    assert_relative_eq!(placement.rect.x(), 64.0, epsilon = 1e-3);
    assert_relative_eq!(placement.rect.y(), 192.0 - 256.0 / 3.0, epsilon = 1e-3);
}

#[test]
fn mirrored_overlay_is_reflected() {
    // Asymmetric eyes so the reflection is visible.
    let lms = face((0.2, 0.4), (0.4, 0.4));
    let mut session = Session::new(
        ReplayDetector::new([Some(lms)]),
        ReferenceLoader::new(),
        SessionOptions::default(),
    );
    let (mut direct, mut mirrored) = recorders();
    session
        .process_frame(&frame(), &mut direct, &mut mirrored)
        .unwrap();

    let (_, d) = direct.overlays()[0];
    let (_, m) = mirrored.overlays()[0];
    let w = Resolution::VGA.width() as f32;
    assert_relative_eq!(m.x(), w - d.x() - d.width(), epsilon = 1e-3);
    assert_relative_eq!(m.y(), d.y(), epsilon = 1e-3);
    assert_relative_eq!(m.width(), d.width(), epsilon = 1e-3);
    assert_relative_eq!(m.height(), d.height(), epsilon = 1e-3);
}

#[test]
fn stop_rejects_frames() {
    let mut session = Session::new(
        ReplayDetector::new([Some(default_face())]),
        started(Some(default_face())),
        SessionOptions::default(),
    );
    session.stop();
    let (mut direct, mut mirrored) = recorders();
    assert!(matches!(
        session.process_frame(&frame(), &mut direct, &mut mirrored),
        Err(Error::Stopped)
    ));
}

#[test]
fn detector_error_is_frame_local() {
    struct Flaky(u32);

    impl mimic::detector::Detector for Flaky {
        fn detect(&mut self, _: &Image) -> anyhow::Result<Option<Landmarks>> {
            self.0 += 1;
            if self.0 == 1 {
                anyhow::bail!("camera glitch");
            }
            Ok(Some(default_face()))
        }
    }

    let mut session = Session::new(Flaky(0), ReferenceLoader::new(), SessionOptions::default());
    let (mut direct, mut mirrored) = recorders();
    assert!(matches!(
        session.process_frame(&frame(), &mut direct, &mut mirrored),
        Err(Error::Detection(_))
    ));
    assert!(session
        .process_frame(&frame(), &mut direct, &mut mirrored)
        .unwrap()
        .face_detected);
}

#[test]
fn similarity_is_symmetric_for_random_faces() {
    for _ in 0..20 {
        let mut a = Landmarks::new(NUM_LANDMARKS);
        let mut b = Landmarks::new(NUM_LANDMARKS);
        a.map_positions(|_| [fastrand::f32(), fastrand::f32(), 0.0]);
        b.map_positions(|_| [fastrand::f32(), fastrand::f32(), 0.0]);
        let a = expression::normalize(&a).unwrap();
        let b = expression::normalize(&b).unwrap();

        let ab = expression::similarity(&a, &b).unwrap().value().unwrap();
        let ba = expression::similarity(&b, &a).unwrap().value().unwrap();
        assert_relative_eq!(ab, ba, epsilon = 1e-6);
        assert!((-1.0..=1.0).contains(&ab));
    }
}

#[test]
fn replay_renders_images() {
    let mut recording = Recording {
        resolution: Resolution::new(160, 120),
        reference: Some(default_face().positions().to_vec()),
        frames: Vec::new(),
    };
    recording.push(Some(&default_face()));
    recording.push(None);

    let mut reference = ReferenceLoader::new();
    reference.start(recording.reference_detector(), frame());
    reference.wait();

    let mut session = Session::new(
        recording.frame_detector(),
        reference,
        SessionOptions::default().marker_color(Color::GREEN),
    );
    let res = recording.resolution;
    let mut direct = ImageSurface::new(res);
    let mut mirrored = ImageSurface::new(res);
    let frame = Image::filled(res, Color::BLACK);

    let report = session
        .process_frame(&frame, &mut direct, &mut mirrored)
        .unwrap();
    assert_eq!(report.score.percent(), Some(100));
    // Nose tip at (0.5, 0.55) -> pixel (80, 66).
    assert_eq!(direct.image().get(80, 66), Color::GREEN);
    assert_eq!(mirrored.image().get(80, 66), Color::GREEN);

    let report = session
        .process_frame(&frame, &mut direct, &mut mirrored)
        .unwrap();
    assert!(!report.face_detected);
    assert_eq!(report.score.percent(), Some(100));
    assert_eq!(direct.image().get(80, 66), Color::BLACK);
}
