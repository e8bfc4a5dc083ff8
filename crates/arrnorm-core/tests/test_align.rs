mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use arrnorm_core::align::{compute_offset_array, estimate_similarity, resample, SimilarityTransform};
use arrnorm_core::error::ArrnormError;
use arrnorm_core::raster::Window;

use common::{blob_pattern, full_mae, mean_abs_diff, texture_pattern, translate};

#[test]
fn test_identical_bands_give_identity() {
    let band = blob_pattern(64, 64);
    let t = estimate_similarity(&band, &band).unwrap();
    assert_abs_diff_eq!(t.scale, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(t.angle, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(t.shift.0, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(t.shift.1, 0.0, epsilon = 1e-9);
}

#[test]
fn test_identical_non_square_bands_give_identity() {
    let band = blob_pattern(48, 80);
    let t = estimate_similarity(&band, &band).unwrap();
    assert_abs_diff_eq!(t.scale, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(t.angle, 0.0, epsilon = 1e-9);
}

#[test]
fn test_integer_translation_recovered() {
    let reference = blob_pattern(100, 100);
    let target = translate(&reference, 3, 5);

    let t = estimate_similarity(&reference, &target).unwrap();
    assert_abs_diff_eq!(t.scale, 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(t.angle, 0.0, epsilon = 1e-6);
    // Correction moves the target back by the applied shift
    assert_abs_diff_eq!(t.shift.0, -3.0, epsilon = 0.5);
    assert_abs_diff_eq!(t.shift.1, -5.0, epsilon = 0.5);
}

#[test]
fn test_estimated_transform_aligns_target() {
    let reference = blob_pattern(100, 100);
    let target = translate(&reference, 4, 2);

    let t = estimate_similarity(&reference, &target).unwrap();
    let aligned = resample(&target, &t, Window::full(100, 100));

    let mae = mean_abs_diff(&aligned, &reference, 90, 90);
    assert!(mae < 5.0, "mean abs error {mae}");
}

#[test]
fn test_offset_of_identical_arrays_is_zero() {
    let band = blob_pattern(32, 32);
    let offset = compute_offset_array(&band, &band).unwrap();
    assert_eq!(offset.dx, 0.0);
    assert_eq!(offset.dy, 0.0);
}

#[test]
fn test_shape_mismatch_rejected() {
    let a = blob_pattern(32, 32);
    let b = blob_pattern(32, 40);
    let err = estimate_similarity(&a, &b).unwrap_err();
    assert!(matches!(err, ArrnormError::ShapeMismatch { .. }), "{err}");
}

#[test]
fn test_constant_target_rejected() {
    let a = blob_pattern(32, 32);
    let b = Array2::<f32>::zeros((32, 32));
    let err = estimate_similarity(&a, &b).unwrap_err();
    assert!(matches!(err, ArrnormError::DegenerateBand(_)), "{err}");
}

#[test]
fn test_identity_transform_is_default() {
    assert_eq!(SimilarityTransform::default(), SimilarityTransform::identity());
    assert!(SimilarityTransform::identity().is_identity());
}

/// Warp `reference` by a pure rotation/zoom about its centre.
fn warped(reference: &Array2<f32>, scale: f64, angle: f64) -> Array2<f32> {
    let (rows, cols) = reference.dim();
    let t = SimilarityTransform {
        scale,
        angle,
        shift: (0.0, 0.0),
    };
    resample(reference, &t, Window::full(cols, rows))
}

/// Estimate the transform for `target`, apply it, and return
/// `(transform, error before, error after)` against `reference`.
fn align(reference: &Array2<f32>, target: &Array2<f32>) -> (SimilarityTransform, f64, f64) {
    let (rows, cols) = reference.dim();
    let t = estimate_similarity(reference, target).unwrap();
    let aligned = resample(target, &t, Window::full(cols, rows));
    (t, full_mae(target, reference), full_mae(&aligned, reference))
}

#[test]
fn test_rotation_recovered_both_directions() {
    let reference = texture_pattern(128);
    for applied in [10.0, -10.0] {
        let target = warped(&reference, 1.0, applied);
        let (t, before, after) = align(&reference, &target);

        // The correction undoes the applied rotation
        assert_abs_diff_eq!(t.angle, -applied, epsilon = 2.5);
        assert_abs_diff_eq!(t.scale, 1.0, epsilon = 0.05);
        assert!(after < 0.5 * before, "angle {applied}: error {before} -> {after}");
    }
}

#[test]
fn test_zoom_in_recovered() {
    let reference = texture_pattern(128);
    // Content magnified 1.2x about the centre
    let target = warped(&reference, 1.0 / 1.2, 0.0);
    let (t, before, after) = align(&reference, &target);

    assert_abs_diff_eq!(t.scale, 1.2, epsilon = 0.06);
    assert_abs_diff_eq!(t.angle, 0.0, epsilon = 2.5);
    assert!(after < 0.5 * before, "error {before} -> {after}");
}

#[test]
fn test_zoom_out_recovered() {
    let reference = texture_pattern(128);
    // Content shrunk to 0.85x about the centre
    let target = warped(&reference, 1.0 / 0.85, 0.0);
    let (t, before, after) = align(&reference, &target);

    assert_abs_diff_eq!(t.scale, 0.85, epsilon = 0.05);
    assert_abs_diff_eq!(t.angle, 0.0, epsilon = 2.5);
    assert!(after < 0.5 * before, "error {before} -> {after}");
}

#[test]
fn test_scale_change_beyond_limit_rejected() {
    let reference = texture_pattern(128);
    // Content shrunk to half size; undoing it needs a scale of about 0.5
    let target = warped(&reference, 2.0, 0.0);
    match estimate_similarity(&reference, &target) {
        Err(ArrnormError::IncompatibleScale(scale)) => {
            assert!(scale < 1.0 / 1.8, "scale {scale}");
        }
        other => panic!("expected IncompatibleScale, got {other:?}"),
    }
}
