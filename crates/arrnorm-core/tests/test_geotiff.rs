mod common;

use approx::assert_relative_eq;
use ndarray::Array2;

use arrnorm_core::error::ArrnormError;
use arrnorm_core::io::{read_geotiff, write_geotiff};
use arrnorm_core::raster::{GeoTransform, PixelType, RasterDataset};

use common::{three_bands, utm_projection, utm_transform, write_raster};

#[test]
fn test_multiband_int16_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let base = Array2::from_shape_fn((12, 17), |(r, c)| (r as f32 * 100.0) - (c as f32 * 7.0));
    let path = write_raster(dir.path(), "multi.tif", three_bands(&base), PixelType::Int16);

    let raster = read_geotiff(&path).unwrap();
    assert_eq!(raster.width, 17);
    assert_eq!(raster.height, 12);
    assert_eq!(raster.band_count(), 3);
    assert_eq!(raster.pixel_type, PixelType::Int16);
    assert_eq!(raster.band(1).unwrap(), &base);
    assert_eq!(raster.band(3).unwrap(), &(&base * 2.0));
    assert_eq!(raster.path.as_deref(), Some(path.as_path()));
}

#[test]
fn test_georeferencing_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let band = Array2::<f32>::ones((5, 6));
    let path = write_raster(dir.path(), "geo.tif", vec![band], PixelType::UInt8);

    let raster = RasterDataset::open(&path).unwrap();
    let gt = raster.geo_transform.unwrap();
    let expected = utm_transform();
    assert_relative_eq!(gt.origin_x, expected.origin_x);
    assert_relative_eq!(gt.origin_y, expected.origin_y);
    assert_relative_eq!(gt.pixel_width, expected.pixel_width);
    assert_relative_eq!(gt.pixel_height, expected.pixel_height);
    assert_eq!(raster.projection, Some(utm_projection()));
}

#[test]
fn test_rotated_transform_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let mut raster = RasterDataset::create(4, 3, 1, PixelType::Float32).unwrap();
    let rotated = GeoTransform::from_gdal([100.0, 2.0, 0.5, 200.0, 0.25, -2.0]);
    raster.geo_transform = Some(rotated);
    let path = dir.path().join("rotated.tif");
    write_geotiff(&raster, &path).unwrap();

    let back = read_geotiff(&path).unwrap();
    assert_eq!(back.geo_transform.unwrap().to_gdal(), rotated.to_gdal());
    assert!(back.projection.is_none());
}

#[test]
fn test_float32_and_nodata_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let band = Array2::from_shape_fn((3, 3), |(r, c)| r as f32 * 0.25 + c as f32);
    let mut raster = RasterDataset::from_bands(vec![band.clone()], PixelType::Float32).unwrap();
    raster.nodata = Some(-9999.0);
    let path = dir.path().join("float.tif");
    raster.save(&path).unwrap();

    let back = RasterDataset::open(&path).unwrap();
    assert_eq!(back.pixel_type, PixelType::Float32);
    assert_eq!(back.nodata, Some(-9999.0));
    assert_eq!(back.band(1).unwrap(), &band);
}

#[test]
fn test_int16_output_saturates_instead_of_wrapping() {
    let dir = tempfile::tempdir().unwrap();
    let band = Array2::from_shape_vec((1, 3), vec![40_000.0, -40_000.0, 12.6]).unwrap();
    let raster = RasterDataset::from_bands(vec![band], PixelType::Int16).unwrap();
    let path = dir.path().join("sat.tif");
    raster.save(&path).unwrap();

    let back = RasterDataset::open(&path).unwrap();
    let values: Vec<f32> = back.band(1).unwrap().iter().copied().collect();
    assert_eq!(values, vec![32767.0, -32768.0, 13.0]);
}

#[test]
fn test_missing_file_is_raster_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.tif");
    let err = RasterDataset::open(&path).unwrap_err();
    assert!(matches!(err, ArrnormError::RasterOpen { .. }));
    assert!(err.to_string().contains("could not be read in"));
}

#[test]
fn test_non_tiff_file_is_raster_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("text.tif");
    std::fs::write(&path, b"definitely not a tiff").unwrap();
    let err = RasterDataset::open(&path).unwrap_err();
    match err {
        ArrnormError::RasterOpen { path: p, .. } => assert_eq!(p, path),
        other => panic!("unexpected error {other}"),
    }
}
