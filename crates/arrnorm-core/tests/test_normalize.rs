mod common;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::Array2;

use arrnorm_core::error::{ArrnormError, Result};
use arrnorm_core::mask::{ExternalMask, MaskBuilder, NativeMask};
use arrnorm_core::pipeline::{
    run_normalization, ChangeDetector, NoOpReporter, NormalizeConfig, RadiometricCalibrator,
};
use arrnorm_core::raster::{sibling_path, PixelType, RasterDataset};

use common::{blob_pattern, write_raster};

/// Records calls and writes a placeholder iMAD raster.
#[derive(Default)]
struct StubImad {
    calls: RefCell<Vec<(PathBuf, PathBuf, u32)>>,
}

impl ChangeDetector for StubImad {
    fn detect(&self, reference: &Path, target: &Path, iterations: u32) -> Result<PathBuf> {
        self.calls
            .borrow_mut()
            .push((reference.to_path_buf(), target.to_path_buf(), iterations));
        let out = sibling_path(target, "_imad");
        let source = RasterDataset::open(target)?;
        source.save(&out)?;
        Ok(out)
    }
}

/// Writes `target * 2 + 1` as the "normalized" image.
#[derive(Default)]
struct StubRadcal {
    calls: RefCell<Vec<(PathBuf, f64)>>,
}

impl RadiometricCalibrator for StubRadcal {
    fn calibrate(&self, target: &Path, imad: &Path, threshold: f64) -> Result<PathBuf> {
        self.calls.borrow_mut().push((imad.to_path_buf(), threshold));
        let source = RasterDataset::open(target)?;
        let bands: Vec<Array2<f32>> = source.bands().iter().map(|b| b * 2.0 + 1.0).collect();
        let mut out = RasterDataset::from_bands(bands, PixelType::Float32)?;
        out.geo_transform = source.geo_transform;
        let path = sibling_path(target, "_norm");
        out.save(&path)?;
        Ok(path)
    }
}

/// Three bands with a zero strip on the left of band 1.
fn target_with_nodata_strip() -> Vec<Array2<f32>> {
    let band1 = Array2::from_shape_fn((20, 30), |(r, c)| if c < 6 { 0.0 } else { 10.0 + r as f32 });
    let band2 = Array2::from_shape_fn((20, 30), |(r, c)| 50.0 + (r + c) as f32);
    let band3 = Array2::from_elem((20, 30), 7.0);
    vec![band1, band2, band3]
}

fn strip_raster(dir: &Path, name: &str) -> PathBuf {
    write_raster(dir, name, target_with_nodata_strip(), PixelType::Int16)
}

fn config(reference: &Path, images: Vec<PathBuf>) -> NormalizeConfig {
    NormalizeConfig {
        reference: reference.to_path_buf(),
        images,
        ..NormalizeConfig::default()
    }
}

#[test]
fn test_mask_zeroes_nodata_in_every_band() {
    let dir = tempfile::tempdir().unwrap();
    let reference = strip_raster(dir.path(), "ref.tif");
    let target = strip_raster(dir.path(), "t1.tif");

    let (imad, radcal) = (StubImad::default(), StubRadcal::default());
    let results = run_normalization(
        &config(&reference, vec![target.clone()]),
        &imad,
        &radcal,
        &NativeMask,
        Arc::new(NoOpReporter),
    )
    .unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.mask.as_deref(), Some(dir.path().join("t1_mask.tif").as_path()));

    let normalized = RasterDataset::open(&result.normalized).unwrap();
    assert_eq!(normalized.pixel_type, PixelType::Float32);
    assert_eq!(normalized.nodata, Some(0.0));
    for band in normalized.bands() {
        for ((_, c), &v) in band.indexed_iter() {
            if c < 6 {
                assert_eq!(v, 0.0);
            } else {
                assert!(v > 0.0);
            }
        }
    }

    let mask = RasterDataset::open(result.mask.as_ref().unwrap()).unwrap();
    assert_eq!(mask.pixel_type, PixelType::UInt8);
    assert_eq!(mask.band_count(), 1);
    assert_eq!(mask.nodata, Some(0.0));
    assert_eq!(mask.band(1).unwrap()[[0, 0]], 0.0);
    assert_eq!(mask.band(1).unwrap()[[0, 6]], 1.0);
}

#[test]
fn test_images_processed_in_order_with_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let reference = strip_raster(dir.path(), "ref.tif");
    let a = strip_raster(dir.path(), "a.tif");
    let b = strip_raster(dir.path(), "b.tif");

    let mut cfg = config(&reference, vec![b.clone(), a.clone()]);
    cfg.iterations = 7;
    cfg.threshold = 0.9;
    cfg.mask = false;

    let (imad, radcal) = (StubImad::default(), StubRadcal::default());
    let results =
        run_normalization(&cfg, &imad, &radcal, &NativeMask, Arc::new(NoOpReporter)).unwrap();

    let imad_calls = imad.calls.borrow();
    assert_eq!(imad_calls.len(), 2);
    assert_eq!(imad_calls[0], (reference.clone(), b.clone(), 7));
    assert_eq!(imad_calls[1], (reference.clone(), a.clone(), 7));

    let radcal_calls = radcal.calls.borrow();
    assert_eq!(radcal_calls[0], (dir.path().join("b_imad.tif"), 0.9));
    assert_eq!(radcal_calls[1], (dir.path().join("a_imad.tif"), 0.9));

    assert!(results.iter().all(|r| r.mask.is_none()));
    assert!(!dir.path().join("a_mask.tif").exists());
}

#[test]
fn test_failing_stage_aborts_batch() {
    struct FailingImad;
    impl ChangeDetector for FailingImad {
        fn detect(&self, _reference: &Path, _target: &Path, _iterations: u32) -> Result<PathBuf> {
            Err(ArrnormError::ToolFailed {
                tool: "imad".into(),
                code: Some(2),
                stderr: "boom".into(),
            })
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let reference = strip_raster(dir.path(), "ref.tif");
    let a = strip_raster(dir.path(), "a.tif");
    let b = strip_raster(dir.path(), "b.tif");

    let radcal = StubRadcal::default();
    let err = run_normalization(
        &config(&reference, vec![a, b]),
        &FailingImad,
        &radcal,
        &NativeMask,
        Arc::new(NoOpReporter),
    )
    .unwrap_err();

    assert!(err.to_string().contains("return code 2"), "{err}");
    assert!(radcal.calls.borrow().is_empty());
}

#[test]
fn test_external_calculator_failure_reports_return_code() {
    let dir = tempfile::tempdir().unwrap();
    let reference = strip_raster(dir.path(), "ref.tif");
    let target = strip_raster(dir.path(), "t.tif");

    let masker = ExternalMask {
        program: "false".into(),
    };
    let (imad, radcal) = (StubImad::default(), StubRadcal::default());
    let err = run_normalization(
        &config(&reference, vec![target]),
        &imad,
        &radcal,
        &masker,
        Arc::new(NoOpReporter),
    )
    .unwrap_err();

    match &err {
        ArrnormError::ToolFailed { tool, code, .. } => {
            assert_eq!(tool, "false");
            assert_eq!(*code, Some(1));
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(err.to_string().contains("return code 1"), "{err}");
}

#[test]
fn test_registration_pre_step_feeds_warped_image() {
    let dir = tempfile::tempdir().unwrap();
    let base = blob_pattern(64, 64);
    let reference = write_raster(dir.path(), "ref.tif", vec![base.clone()], PixelType::Int16);
    let target = write_raster(dir.path(), "scene.tif", vec![base], PixelType::Int16);

    let mut cfg = config(&reference, vec![target.clone()]);
    cfg.register = true;

    let (imad, radcal) = (StubImad::default(), StubRadcal::default());
    let results =
        run_normalization(&cfg, &imad, &radcal, &NativeMask, Arc::new(NoOpReporter)).unwrap();

    let warped = dir.path().join("scene_warp.tif");
    assert_eq!(results[0].registered.as_deref(), Some(warped.as_path()));
    assert_eq!(imad.calls.borrow()[0].1, warped);
    assert_eq!(results[0].target, target);
}

#[test]
fn test_invalid_config_rejected_before_any_work() {
    let imad = StubImad::default();
    let radcal = StubRadcal::default();
    let empty = NormalizeConfig {
        reference: PathBuf::from("ref.tif"),
        ..NormalizeConfig::default()
    };
    let err = run_normalization(&empty, &imad, &radcal, &NativeMask, Arc::new(NoOpReporter))
        .unwrap_err();
    assert!(matches!(err, ArrnormError::Config(_)), "{err}");
    assert!(imad.calls.borrow().is_empty());
}

#[test]
fn test_native_mask_shape_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let small = write_raster(dir.path(), "small.tif", vec![Array2::ones((4, 4))], PixelType::UInt8);
    let large = write_raster(dir.path(), "large.tif", vec![Array2::ones((5, 5))], PixelType::UInt8);
    let mask = dir.path().join("small_mask.tif");

    NativeMask.create_mask(&small, &mask).unwrap();
    let err = NativeMask.apply_mask(&large, &mask).unwrap_err();
    assert!(matches!(err, ArrnormError::ShapeMismatch { .. }), "{err}");
}
