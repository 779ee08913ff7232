//! End-to-end pipeline tests, on the CPU backend unless gated on `wgpu`.

use std::cell::RefCell;

use tone_core::{
    DuotoneParams, ExportFormat, ExportRequest, ExportedPixels, ImageEncoder, Rgb, Size, SourceImage, ToneConfig,
    ToneMode, ToneResult, TritoneParams,
};
use tone_gpu::{describe_backends, Backend, PipelineState, RenderPipeline};

fn cpu() -> RenderPipeline {
    RenderPipeline::with_backend(Backend::Cpu).unwrap()
}

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> SourceImage {
    SourceImage::from_fn(w, h, |_, _| rgba).unwrap()
}

#[test]
fn test_cpu_backend_listed() {
    assert!(Backend::Cpu.is_available());
    assert!(describe_backends().contains("CPU"));
    assert_eq!(cpu().backend_name(), "CPU");
}

#[test]
fn test_duotone_identity_black_white() {
    let mut p = cpu();
    let img = SourceImage::from_rgba8(2, 1, vec![0, 0, 0, 255, 255, 255, 255, 255]).unwrap();
    p.load_image(img).unwrap();
    p.set_config(ToneConfig::Duotone(DuotoneParams::identity()));
    assert!(p.on_frame().unwrap());

    let shown = p.read_surface().unwrap().unwrap();
    assert_eq!(shown.size(), Size::new(2, 1));
    assert_eq!(shown.pixel(0, 0), Some([0, 0, 0, 255]));
    assert_eq!(shown.pixel(1, 0), Some([255, 255, 255, 255]));

    let exported = p.export_pixels(&ExportRequest::default()).unwrap().unwrap();
    assert_eq!(exported, shown);
}

#[test]
fn test_tritone_midtone_band() {
    let mut p = cpu();
    p.load_image(solid(3, 3, [128, 128, 128, 255])).unwrap();
    p.set_config(ToneConfig::Tritone(TritoneParams {
        color_a: Rgb::X,
        color_b: Rgb::Y,
        color_c: Rgb::Z,
        threshold1: 0.3,
        threshold2: 0.7,
        softness: 0.0,
        ..Default::default()
    }));
    p.set_mode(ToneMode::Tritone);
    p.on_frame().unwrap();

    let out = p.export_pixels(&ExportRequest::max_side(3)).unwrap().unwrap();
    assert!(out.pixels.chunks_exact(4).all(|px| px == [0, 255, 0, 255]));
}

#[test]
fn test_mode_switch_keeps_other_params() {
    let mut p = cpu();
    p.load_image(solid(2, 2, [255, 255, 255, 255])).unwrap();
    p.set_config(ToneConfig::Duotone(DuotoneParams {
        shadow: Rgb::ZERO,
        highlight: Rgb::X,
        ..Default::default()
    }));
    p.set_mode(ToneMode::Tritone);
    p.set_mode(ToneMode::Duotone);
    p.on_frame().unwrap();

    let out = p.read_surface().unwrap().unwrap();
    assert_eq!(out.pixel(0, 0), Some([255, 0, 0, 255]));
}

#[test]
fn test_export_never_upscales() {
    let mut p = cpu();
    p.load_image(solid(30, 20, [10, 20, 30, 255])).unwrap();
    let out = p.export_pixels(&ExportRequest::max_side(2000)).unwrap().unwrap();
    assert_eq!(out.size(), Size::new(30, 20));

    let out = p.export_pixels(&ExportRequest::new(15, 100)).unwrap().unwrap();
    assert_eq!(out.size(), Size::new(15, 10));
}

#[test]
fn test_export_matches_display() {
    let mut p = cpu();
    let img = SourceImage::from_fn(20, 10, |x, y| [(x * 12) as u8, (y * 25) as u8, 90, 255]).unwrap();
    p.load_image(img).unwrap();
    p.set_config(ToneConfig::Duotone(DuotoneParams {
        shadow: Rgb::new(0.1, 0.2, 0.6),
        highlight: Rgb::new(1.0, 0.8, 0.3),
        strength: 0.75,
        brightness: 0.1,
        contrast: 0.2,
    }));
    p.on_frame().unwrap();

    let shown = p.read_surface().unwrap().unwrap();
    let exported = p.export_pixels(&ExportRequest::max_side(20)).unwrap().unwrap();
    assert_eq!(shown, exported);
}

#[test]
fn test_draw_is_idempotent() {
    let mut p = cpu();
    p.load_image(SourceImage::from_fn(8, 8, |x, y| [(x * 30) as u8, (y * 30) as u8, 0, 255]).unwrap())
        .unwrap();
    p.set_mode(ToneMode::Tritone);
    p.draw().unwrap();
    let first = p.read_surface().unwrap().unwrap();
    p.draw().unwrap();
    let second = p.read_surface().unwrap().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_rapid_changes_draw_once_with_latest() {
    let mut p = cpu();
    p.load_image(solid(2, 2, [255, 255, 255, 255])).unwrap();
    let draws = p.draw_count();

    for i in 0..=10 {
        let v = i as f32 / 10.0;
        p.set_config(ToneConfig::Duotone(DuotoneParams {
            shadow: Rgb::ZERO,
            highlight: Rgb::new(v, 0.0, 0.0),
            ..Default::default()
        }));
    }
    assert_eq!(p.draw_count(), draws);
    assert!(p.on_frame().unwrap());
    assert!(!p.on_frame().unwrap());
    assert_eq!(p.draw_count(), draws + 1);

    let out = p.read_surface().unwrap().unwrap();
    assert_eq!(out.pixel(1, 1), Some([255, 0, 0, 255]));
}

#[test]
fn test_superseded_decode_is_dropped() {
    let mut p = cpu();
    let slow = p.begin_load();
    let fast = p.begin_load();

    assert!(p.finish_load(fast, solid(6, 3, [0, 0, 0, 255])).unwrap());
    assert!(!p.finish_load(slow, solid(50, 50, [255, 255, 255, 255])).unwrap());

    assert_eq!(p.image().unwrap().size(), Size::new(6, 3));
    assert_eq!(p.draw_count(), 1);
}

#[test]
fn test_idle_operations_are_noops() {
    let mut p = cpu();
    p.draw().unwrap();
    p.resize(320.0).unwrap();
    p.set_mode(ToneMode::Tritone);
    assert!(!p.on_frame().unwrap());
    assert!(p.export_pixels(&ExportRequest::default()).unwrap().is_none());
    assert_eq!(p.draw_count(), 0);
}

#[test]
fn test_unload_returns_to_idle() {
    let mut p = cpu();
    p.load_image(solid(4, 4, [1, 2, 3, 255])).unwrap();
    assert_eq!(p.state(), PipelineState::Ready);
    p.unload_image();
    assert_eq!(p.state(), PipelineState::Idle);
    assert!(p.export_pixels(&ExportRequest::default()).unwrap().is_none());

    p.load_image(solid(2, 2, [1, 2, 3, 255])).unwrap();
    assert_eq!(p.state(), PipelineState::Ready);
    p.dispose();
}

#[test]
fn test_reload_replaces_image() {
    let mut p = cpu();
    p.load_image(solid(10, 10, [0, 0, 0, 255])).unwrap();
    p.load_image(solid(8, 4, [255, 255, 255, 255])).unwrap();
    let out = p.export_pixels(&ExportRequest::default()).unwrap().unwrap();
    assert_eq!(out.size(), Size::new(8, 4));
    assert_eq!(out.pixel(0, 0), Some([255, 255, 255, 255]));
}

#[cfg(feature = "wgpu")]
#[test]
fn test_wgpu_matches_cpu() {
    let available = Backend::Wgpu.is_available();
    println!("wgpu available: {}", available);
    if !available {
        return;
    }

    let img = SourceImage::from_fn(17, 9, |x, y| [(x * 15) as u8, (y * 28) as u8, ((x + y) * 9) as u8, 255]).unwrap();
    let config = ToneConfig::Tritone(TritoneParams {
        color_a: Rgb::new(0.05, 0.12, 0.42),
        color_b: Rgb::new(0.95, 0.35, 0.58),
        color_c: Rgb::new(0.0, 0.65, 0.25),
        orig_mix: 0.4,
        ..Default::default()
    });

    let mut exports = Vec::new();
    for backend in [Backend::Wgpu, Backend::Cpu] {
        let mut p = RenderPipeline::with_backend(backend).unwrap();
        p.load_image(img.clone()).unwrap();
        p.set_config(config);
        p.set_mode(ToneMode::Tritone);
        assert!(p.on_frame().unwrap());
        let shown = p.read_surface().unwrap().unwrap();
        let out = p.export_pixels(&ExportRequest::max_side(30)).unwrap().unwrap();
        assert_eq!(shown, out, "{} surface vs export", p.backend_name());
        exports.push(out);
    }

    let (gpu, cpu) = (&exports[0], &exports[1]);
    assert_eq!(gpu.size(), Size::new(17, 9));
    assert_eq!(gpu.size(), cpu.size());
    let differing = gpu.pixels.iter().zip(&cpu.pixels).filter(|(a, b)| a != b).count();
    assert_eq!(differing, 0);
}

/// Records what it was asked to encode.
#[derive(Default)]
struct RecordingEncoder {
    calls: RefCell<Vec<(Size, ExportFormat, f32)>>,
}

impl ImageEncoder for RecordingEncoder {
    fn encode(&self, pixels: &ExportedPixels, format: ExportFormat, quality: f32) -> ToneResult<Vec<u8>> {
        self.calls.borrow_mut().push((pixels.size(), format, quality));
        Ok(vec![0xAB; 3])
    }
}

#[test]
fn test_export_file_name_and_mime() {
    let mut p = cpu();
    let enc = RecordingEncoder::default();
    assert!(p.export_file(&ExportRequest::default(), None, &enc).unwrap().is_none());
    assert!(enc.calls.borrow().is_empty());

    p.load_image(solid(40, 10, [9, 9, 9, 255])).unwrap();
    p.set_mode(ToneMode::Tritone);
    let request = ExportRequest::max_side(20).with_format(ExportFormat::Jpeg).with_quality(0.8);
    let file = p.export_file(&request, Some("my photo"), &enc).unwrap().unwrap();

    assert_eq!(file.file_name, "my_photo_tritone.jpg");
    assert_eq!(file.mime, "image/jpeg");
    assert_eq!(file.bytes, vec![0xAB; 3]);
    assert_eq!(enc.calls.borrow()[0], (Size::new(20, 5), ExportFormat::Jpeg, 0.8));
}

#[cfg(feature = "codec")]
#[test]
fn test_export_png_decodes() {
    use tone_core::{decode_image, ImageCrateEncoder};

    let mut p = cpu();
    p.load_image(solid(12, 6, [255, 255, 255, 255])).unwrap();
    let request = ExportRequest::max_side(6).with_format(ExportFormat::Png);
    let file = p.export_file(&request, Some("out"), &ImageCrateEncoder).unwrap().unwrap();
    assert_eq!(file.file_name, "out_duotone.png");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(&file.file_name);
    std::fs::write(&path, &file.bytes).unwrap();

    let decoded = decode_image(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(decoded.size(), Size::new(6, 3));
    assert_eq!(decoded.pixel(0, 0), Some([255, 255, 255, 255]));
}
