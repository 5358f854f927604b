mod common;

use std::sync::Arc;

use common::*;
use framesift_core::context::{PaintObject, ProcessingContext, Stage};
use framesift_core::pixels::{CropRect, Decoded};
use framesift_core::settings::{ProcessingSettings, QualityFilterType};
use framesift_core::sources::raw_video::{
    RawPixelFormat, RawVideoDecoderFactory, RawVideoFormat,
};
use framesift_core::sources::{DecoderFactory, RawFrame};
use framesift_core::stages;

fn run_pipeline(settings: ProcessingSettings, frame: RawFrame) -> Box<ProcessingContext> {
    let mut ctx = Box::new(ProcessingContext::new(Arc::new(settings)));
    ctx.decoder = Some(MonoDecoderFactory::standard().create_decoder());
    ctx.raw_frame = Some(frame);
    stages::process(ctx)
}

fn settings_in(dir: &std::path::Path) -> ProcessingSettings {
    ProcessingSettings {
        save_images_directory: dir.to_path_buf(),
        ..ProcessingSettings::default()
    }
}

#[test]
fn decode_produces_float_and_grayscale() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = run_pipeline(settings_in(dir.path()), test_frame(flat_frame(10), 0));
    assert!(ctx.stage_success, "{:?}", ctx.error);
    assert_eq!(ctx.decoded_float.len(), 1);
    assert_eq!(ctx.grayscale.dim(), (FRAME_H, FRAME_W));
    assert_eq!(ctx.grayscale[[0, 0]], 10.0);
}

#[test]
fn decode_negative_inverts_values() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.negative = true;
    let ctx = run_pipeline(settings, test_frame(flat_frame(10), 0));
    match ctx.decoded.as_ref().unwrap() {
        Decoded::Mono8(m) => assert_eq!(m[[0, 0]], 245),
        other => panic!("expected Mono8, got {other:?}"),
    }
    assert_eq!(ctx.grayscale[[0, 0]], 245.0);
}

#[test]
fn bgr_grayscale_uses_luma_weights() {
    // One pure-red and one pure-green pixel through the raw BGR decoder.
    let format = RawVideoFormat {
        width: 2,
        height: 1,
        pixel_format: RawPixelFormat::Bgr8,
        header_bytes: 0,
    };
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.estimate_quality = false;

    let mut ctx = Box::new(ProcessingContext::new(Arc::new(settings)));
    ctx.decoder = Some(RawVideoDecoderFactory::new(format).create_decoder());
    // BGR byte order: red pixel then green pixel.
    ctx.raw_frame = Some(test_frame(vec![0, 0, 255, 0, 255, 0], 0));
    let ctx = stages::process(ctx);

    assert!(ctx.stage_success, "{:?}", ctx.error);
    assert_eq!(ctx.decoded_float.len(), 3);
    assert!((ctx.grayscale[[0, 0]] - 0.299 * 255.0).abs() < 1e-3);
    assert!((ctx.grayscale[[0, 1]] - 0.587 * 255.0).abs() < 1e-3);
}

#[test]
fn full_sequence_without_render() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = run_pipeline(settings_in(dir.path()), test_frame(detail_frame(1), 0));
    assert!(ctx.stage_success);
    assert_eq!(
        ctx.completed_stages,
        vec![Stage::Decode, Stage::Crop, Stage::EstimateQuality, Stage::Save]
    );
    assert!(ctx.quality > 0.0);
    // Saving is off by default: the filename is computed but nothing is
    // written.
    assert!(ctx.filename.to_string_lossy().contains("frame-"));
    assert!(saved_frames(dir.path()).is_empty());
}

#[test]
fn only_render_shortcut() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = Box::new(ProcessingContext::new(Arc::new(settings_in(dir.path()))));
    ctx.decoder = Some(MonoDecoderFactory::standard().create_decoder());
    ctx.raw_frame = Some(test_frame(detail_frame(1), 0));
    ctx.do_render = true;
    ctx.only_render = true;
    let ctx = stages::process(ctx);

    assert_eq!(ctx.completed_stages, vec![Stage::Decode, Stage::Render]);
    let preview = ctx.rendered.as_ref().expect("preview populated");
    assert_eq!((preview.width, preview.height), (FRAME_W, FRAME_H));
    assert_eq!(preview.pixels.len(), FRAME_W * FRAME_H * 4);
}

#[test]
fn render_fills_histograms_and_marks_clipping() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.mark_clipped = true;
    settings.compute_histograms = true;

    let mut bytes = flat_frame(10);
    bytes[0] = 255;
    let mut ctx = Box::new(ProcessingContext::new(Arc::new(settings)));
    ctx.decoder = Some(MonoDecoderFactory::standard().create_decoder());
    ctx.raw_frame = Some(test_frame(bytes, 0));
    ctx.do_render = true;
    ctx.only_render = true;
    let ctx = stages::process(ctx);

    let total: f32 = ctx.histograms.red.iter().sum();
    assert_eq!(total, (FRAME_W * FRAME_H) as f32);
    assert_eq!(ctx.histograms.red[10], (FRAME_W * FRAME_H - 1) as f32);
    assert_eq!(ctx.histograms.red[255], 1.0);

    let preview = ctx.rendered.as_ref().unwrap();
    // Clipped pixel painted magenta (BGRA), others neutral gray.
    assert_eq!(&preview.pixels[0..4], &[255, 0, 200, 255]);
    assert_eq!(&preview.pixels[4..8], &[10, 10, 10, 255]);
}

#[test]
fn logarithmic_histograms_transform_bins() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.compute_histograms = true;
    settings.logarithmic_histograms = true;

    let mut ctx = Box::new(ProcessingContext::new(Arc::new(settings)));
    ctx.decoder = Some(MonoDecoderFactory::standard().create_decoder());
    ctx.raw_frame = Some(test_frame(flat_frame(7), 0));
    ctx.do_render = true;
    ctx.only_render = true;
    let ctx = stages::process(ctx);

    let expected = ((FRAME_W * FRAME_H) as f32 + 1.0).log2();
    assert!((ctx.histograms.red[7] - expected).abs() < 1e-4);
    // Empty bins become log2(1) = 0.
    assert_eq!(ctx.histograms.red[200], 0.0);
}

#[test]
fn crop_disabled_selects_full_image() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = run_pipeline(settings_in(dir.path()), test_frame(flat_frame(50), 0));
    assert_eq!(ctx.crop_area, CropRect::full(FRAME_W, FRAME_H));
}

#[test]
fn crop_centers_on_bright_region() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.do_crop = true;
    settings.crop_width = 10;
    settings.threshold = 100.0;

    let mut bytes = flat_frame(0);
    bytes[20 * FRAME_W + 30] = 200;
    let ctx = run_pipeline(settings, test_frame(bytes, 0));

    assert!(ctx.stage_success, "{:?}", ctx.error);
    assert_eq!(ctx.crop_area, CropRect { x: 25, y: 15, width: 10, height: 10 });
}

#[test]
fn crop_out_of_bounds_fails_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.do_crop = true;
    settings.crop_width = 20;
    settings.threshold = 100.0;

    // Bright pixel in the corner: the centered square leaves the image.
    let mut bytes = flat_frame(0);
    bytes[0] = 200;
    let mut ctx = Box::new(ProcessingContext::new(Arc::new(settings)));
    ctx.decoder = Some(MonoDecoderFactory::standard().create_decoder());
    ctx.raw_frame = Some(test_frame(bytes, 0));
    ctx.do_render = true;
    let ctx = stages::process(ctx);

    assert!(!ctx.stage_success);
    assert_eq!(ctx.completed_stages.last(), Some(&Stage::Crop));
    let error = ctx.error.as_ref().unwrap();
    assert_eq!(error.message, "Crop rectangle out of image bounds");
    assert!(ctx
        .paint_objects
        .iter()
        .any(|p| matches!(p, PaintObject::Label { text } if text == "Out of bounds!")));
}

#[test]
fn crop_success_adds_concentric_outlines_when_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.do_crop = true;
    settings.crop_width = 10;
    settings.threshold = 100.0;

    let mut bytes = flat_frame(0);
    bytes[24 * FRAME_W + 32] = 200;
    let mut ctx = Box::new(ProcessingContext::new(Arc::new(settings)));
    ctx.decoder = Some(MonoDecoderFactory::standard().create_decoder());
    ctx.raw_frame = Some(test_frame(bytes, 0));
    ctx.do_render = true;
    let ctx = stages::process(ctx);

    assert!(ctx.stage_success, "{:?}", ctx.error);
    let rectangles = ctx
        .paint_objects
        .iter()
        .filter(|p| matches!(p, PaintObject::Rectangle { .. }))
        .count();
    assert_eq!(rectangles, 2);
}

#[test]
fn quality_skipped_when_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.estimate_quality = false;
    let ctx = run_pipeline(settings, test_frame(detail_frame(1), 0));
    assert_eq!(
        ctx.completed_stages,
        vec![Stage::Decode, Stage::Crop, Stage::Save]
    );
    assert_eq!(ctx.quality, 0.0);
}

#[test]
fn quality_of_flat_frame_is_zero() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = run_pipeline(settings_in(dir.path()), test_frame(flat_frame(128), 0));
    assert!(ctx.stage_success);
    // No high-band energy at all: the estimator reports zero.
    assert_eq!(ctx.quality, 0.0);
}

#[test]
fn quality_decreases_with_noise() {
    let dir = tempfile::tempdir().unwrap();
    let clean = run_pipeline(settings_in(dir.path()), test_frame(detail_frame(0), 0));
    let noisy = run_pipeline(settings_in(dir.path()), test_frame(detail_frame(5), 1));
    assert!(
        clean.quality > noisy.quality,
        "clean {} vs noisy {}",
        clean.quality,
        noisy.quality
    );
}

#[test]
fn save_writes_file_when_filter_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.save_images = true;
    let ctx = run_pipeline(settings, test_frame(detail_frame(1), 3));

    assert!(ctx.stage_success, "{:?}", ctx.error);
    let files = saved_frames(dir.path());
    assert_eq!(files, vec![ctx.filename.clone()]);
    let img = image::open(&files[0]).unwrap().to_luma8();
    assert_eq!(img.dimensions(), (FRAME_W as u32, FRAME_H as u32));
}

#[test]
fn save_respects_minimum_quality_gate() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.save_images = true;
    settings.filter_type = QualityFilterType::MinimumQuality;
    settings.minimum_quality = f64::MAX;
    let ctx = run_pipeline(settings, test_frame(detail_frame(1), 0));

    assert!(ctx.stage_success);
    assert!(!ctx.accepted);
    assert!(saved_frames(dir.path()).is_empty());
}

#[test]
fn acceptance_rate_defers_save_but_clones_crop() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.save_images = true;
    settings.filter_type = QualityFilterType::AcceptanceRate;
    settings.do_crop = true;
    settings.crop_width = 16;
    settings.threshold = 10.0;
    let ctx = run_pipeline(settings, test_frame(detail_frame(1), 0));

    assert!(ctx.stage_success, "{:?}", ctx.error);
    let cloned = ctx.cloned.as_ref().expect("cropped deep copy present");
    assert_eq!((cloned.width(), cloned.height()), (16, 16));
    assert!(saved_frames(dir.path()).is_empty(), "write is deferred");
}

#[test]
fn save_failure_is_recorded_not_thrown() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.save_images = true;
    settings.save_images_directory = dir.path().join("does-not-exist");
    let ctx = run_pipeline(settings, test_frame(detail_frame(1), 0));

    assert!(!ctx.stage_success);
    assert_eq!(ctx.completed_stages.last(), Some(&Stage::Save));
    assert_eq!(ctx.failed_stage(), Some(Stage::Save));
}
