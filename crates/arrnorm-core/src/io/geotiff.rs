//! GeoTIFF reading and writing on top of the `tiff` crate.
//!
//! Rasters are stored as a single image directory with interleaved
//! ("chunky") samples, one sample per band, so any band count and any of the
//! supported pixel types round-trip. Georeferencing is carried by the
//! standard GeoTIFF tags; the GeoKey directory is copied verbatim.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use ndarray::Array2;
use num_traits::ToPrimitive;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

use crate::error::{ArrnormError, Result};
use crate::raster::{GeoTransform, PixelType, Projection, RasterDataset};

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GEO_DOUBLE_PARAMS: u16 = 34736;
const TAG_GEO_ASCII_PARAMS: u16 = 34737;
const TAG_GDAL_NODATA: u16 = 42113;

const PHOTOMETRIC_BLACK_IS_ZERO: u16 = 1;
const COMPRESSION_NONE: u16 = 1;
const PLANAR_CHUNKY: u16 = 1;
const SAMPLE_FORMAT_UINT: u16 = 1;
const SAMPLE_FORMAT_INT: u16 = 2;
const SAMPLE_FORMAT_FLOAT: u16 = 3;

/// Read a GeoTIFF file into a `RasterDataset`.
pub fn read_geotiff(path: &Path) -> Result<RasterDataset> {
    let file = File::open(path).map_err(|e| ArrnormError::RasterOpen {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut raster = decode_geotiff(BufReader::new(file))?;
    raster.path = Some(path.to_path_buf());
    Ok(raster)
}

fn decode_geotiff<R: Read + Seek>(reader: R) -> Result<RasterDataset> {
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let samples = match decoder.find_tag(Tag::SamplesPerPixel)? {
        Some(v) => v.into_u16()? as usize,
        None => 1,
    };
    if samples > 1 {
        if let Some(planar) = decoder.find_tag(Tag::PlanarConfiguration)? {
            if planar.into_u16()? != PLANAR_CHUNKY {
                return Err(ArrnormError::UnsupportedRaster(
                    "band-sequential (planar) multi-band TIFF".to_string(),
                ));
            }
        }
    }

    let (values, pixel_type) = match decoder.read_image()? {
        DecodingResult::U8(buf) => (to_f32(&buf), PixelType::UInt8),
        DecodingResult::I8(buf) => (to_f32(&buf), PixelType::Int8),
        DecodingResult::U16(buf) => (to_f32(&buf), PixelType::UInt16),
        DecodingResult::I16(buf) => (to_f32(&buf), PixelType::Int16),
        DecodingResult::U32(buf) => (to_f32(&buf), PixelType::UInt32),
        DecodingResult::I32(buf) => (to_f32(&buf), PixelType::Int32),
        DecodingResult::F32(buf) => (buf, PixelType::Float32),
        DecodingResult::F64(buf) => (to_f32(&buf), PixelType::Float64),
        _ => {
            return Err(ArrnormError::UnsupportedRaster(
                "unsupported TIFF sample type".to_string(),
            ))
        }
    };

    if width == 0 || height == 0 || values.len() != width * height * samples {
        return Err(ArrnormError::InvalidDimensions { width, height });
    }

    let bands = deinterleave(&values, width, height, samples);
    let mut raster = RasterDataset::from_bands(bands, pixel_type)?;
    raster.geo_transform = read_geo_transform(&mut decoder)?;
    raster.projection = read_projection(&mut decoder)?;
    raster.nodata = match decoder.find_tag(Tag::Unknown(TAG_GDAL_NODATA))? {
        Some(v) => v.into_string()?.trim().trim_end_matches('\0').parse::<f64>().ok(),
        None => None,
    };
    Ok(raster)
}

fn to_f32<T: ToPrimitive>(buf: &[T]) -> Vec<f32> {
    buf.iter().map(|v| v.to_f32().unwrap_or(0.0)).collect()
}

fn deinterleave(
    values: &[f32],
    width: usize,
    height: usize,
    samples: usize,
) -> Vec<Array2<f32>> {
    (0..samples)
        .map(|b| {
            Array2::from_shape_fn((height, width), |(r, c)| {
                values[(r * width + c) * samples + b]
            })
        })
        .collect()
}

fn find_f64_vec<R: Read + Seek>(decoder: &mut Decoder<R>, tag: u16) -> Result<Option<Vec<f64>>> {
    match decoder.find_tag(Tag::Unknown(tag))? {
        Some(v) => Ok(Some(v.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn read_geo_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    if let Some(m) = find_f64_vec(decoder, TAG_MODEL_TRANSFORMATION)? {
        if m.len() >= 8 {
            return Ok(Some(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]])));
        }
    }

    let scale = find_f64_vec(decoder, TAG_MODEL_PIXEL_SCALE)?;
    let tiepoint = find_f64_vec(decoder, TAG_MODEL_TIEPOINT)?;
    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            // tiepoint: [I, J, K, X, Y, Z]
            let origin_x = tie[3] - tie[0] * scale[0];
            let origin_y = tie[4] + tie[1] * scale[1];
            Ok(Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1])))
        }
        _ => Ok(None),
    }
}

fn read_projection<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<Projection>> {
    let geo_keys = match decoder.find_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY))? {
        Some(v) => v.into_u16_vec()?,
        None => return Ok(None),
    };
    let double_params = find_f64_vec(decoder, TAG_GEO_DOUBLE_PARAMS)?.unwrap_or_default();
    let ascii_params = match decoder.find_tag(Tag::Unknown(TAG_GEO_ASCII_PARAMS))? {
        Some(v) => v.into_string()?,
        None => String::new(),
    };
    Ok(Some(Projection {
        geo_keys,
        double_params,
        ascii_params,
    }))
}

/// Write a `RasterDataset` to `path` as an uncompressed GeoTIFF.
///
/// Values are rounded and saturated into the raster's pixel type.
pub fn write_geotiff(raster: &RasterDataset, path: &Path) -> Result<()> {
    let buf = write_geotiff_to_buffer(raster)?;
    std::fs::write(path, buf)?;
    Ok(())
}

fn write_geotiff_to_buffer(raster: &RasterDataset) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor)?;
        encode_geotiff(raster, &mut encoder)?;
    }
    Ok(cursor.into_inner())
}

fn encode_geotiff<W: Write + Seek>(
    raster: &RasterDataset,
    encoder: &mut TiffEncoder<W>,
) -> Result<()> {
    let bands = raster.band_count();
    let pixel_type = raster.pixel_type;
    let mut dir = encoder.image_directory()?;

    dir.write_tag(Tag::ImageWidth, raster.width as u32)?;
    dir.write_tag(Tag::ImageLength, raster.height as u32)?;
    dir.write_tag(Tag::BitsPerSample, vec![pixel_type.bits(); bands].as_slice())?;
    dir.write_tag(Tag::Compression, COMPRESSION_NONE)?;
    dir.write_tag(Tag::PhotometricInterpretation, PHOTOMETRIC_BLACK_IS_ZERO)?;
    dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
    dir.write_tag(Tag::SampleFormat, vec![sample_format(pixel_type); bands].as_slice())?;
    dir.write_tag(Tag::PlanarConfiguration, PLANAR_CHUNKY)?;
    dir.write_tag(Tag::RowsPerStrip, raster.height as u32)?;
    if bands > 1 {
        // Extra samples are unspecified data, not alpha
        dir.write_tag(Tag::ExtraSamples, vec![0u16; bands - 1].as_slice())?;
    }

    write_geo_tags(raster, &mut dir)?;

    let values = interleave(raster);
    let (offset, byte_count) = match pixel_type {
        PixelType::UInt8 => write_samples(&mut dir, &quantize::<u8>(&values))?,
        PixelType::Int8 => write_samples(&mut dir, &quantize::<i8>(&values))?,
        PixelType::UInt16 => write_samples(&mut dir, &quantize::<u16>(&values))?,
        PixelType::Int16 => write_samples(&mut dir, &quantize::<i16>(&values))?,
        PixelType::UInt32 => write_samples(&mut dir, &quantize::<u32>(&values))?,
        PixelType::Int32 => write_samples(&mut dir, &quantize::<i32>(&values))?,
        PixelType::Float32 => write_samples(&mut dir, values.as_slice())?,
        PixelType::Float64 => {
            let wide: Vec<f64> = values.iter().map(|&v| v as f64).collect();
            write_samples(&mut dir, wide.as_slice())?
        }
    };

    let offset = classic_tiff_u32(offset)?;
    dir.write_tag(Tag::StripOffsets, offset)?;
    dir.write_tag(Tag::StripByteCounts, byte_count)?;
    dir.finish()?;
    Ok(())
}

fn sample_format(pixel_type: PixelType) -> u16 {
    match pixel_type {
        PixelType::UInt8 | PixelType::UInt16 | PixelType::UInt32 => SAMPLE_FORMAT_UINT,
        PixelType::Int8 | PixelType::Int16 | PixelType::Int32 => SAMPLE_FORMAT_INT,
        PixelType::Float32 | PixelType::Float64 => SAMPLE_FORMAT_FLOAT,
    }
}

fn interleave(raster: &RasterDataset) -> Vec<f32> {
    let bands = raster.bands();
    let mut values = Vec::with_capacity(raster.width * raster.height * bands.len());
    for row in 0..raster.height {
        for col in 0..raster.width {
            for band in bands {
                values.push(band[[row, col]]);
            }
        }
    }
    values
}

/// Round to nearest and saturate at the type bounds; NaN becomes 0.
fn quantize<T: num_traits::Bounded + num_traits::NumCast + Copy>(values: &[f32]) -> Vec<T> {
    let lo = T::min_value().to_f64().unwrap_or(f64::MIN);
    let hi = T::max_value().to_f64().unwrap_or(f64::MAX);
    values
        .iter()
        .map(|&v| {
            let v = if v.is_nan() { 0.0 } else { (v as f64).round().clamp(lo, hi) };
            T::from(v).unwrap_or_else(T::min_value)
        })
        .collect()
}

fn write_samples<W, K, T>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    samples: &[T],
) -> Result<(u64, u32)>
where
    W: Write + Seek,
    K: TiffKind,
    [T]: tiff::encoder::TiffValue,
{
    let byte_count = classic_tiff_u32(std::mem::size_of_val(samples) as u64)?;
    let offset = dir.write_data(samples)?;
    Ok((offset, byte_count))
}

/// Strip offsets and byte counts are 32-bit in classic TIFF.
fn classic_tiff_u32(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        ArrnormError::UnsupportedRaster("raster exceeds classic TIFF 4 GiB limit".to_string())
    })
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    raster: &RasterDataset,
    dir: &mut DirectoryEncoder<'_, W, K>,
) -> Result<()> {
    if let Some(gt) = raster.geo_transform {
        if gt.is_north_up() {
            let scale = [gt.pixel_width, -gt.pixel_height, 0.0];
            dir.write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), scale.as_slice())?;
            let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
            dir.write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), tiepoint.as_slice())?;
        } else {
            let mut m = [0.0; 16];
            m[0] = gt.pixel_width;
            m[1] = gt.row_rotation;
            m[3] = gt.origin_x;
            m[4] = gt.col_rotation;
            m[5] = gt.pixel_height;
            m[7] = gt.origin_y;
            m[15] = 1.0;
            dir.write_tag(Tag::Unknown(TAG_MODEL_TRANSFORMATION), m.as_slice())?;
        }
    }

    if let Some(proj) = raster.projection.as_ref().filter(|p| !p.is_empty()) {
        dir.write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), proj.geo_keys.as_slice())?;
        if !proj.double_params.is_empty() {
            dir.write_tag(Tag::Unknown(TAG_GEO_DOUBLE_PARAMS), proj.double_params.as_slice())?;
        }
        if !proj.ascii_params.is_empty() {
            dir.write_tag(Tag::Unknown(TAG_GEO_ASCII_PARAMS), proj.ascii_params.as_str())?;
        }
    }

    if let Some(nodata) = raster.nodata {
        dir.write_tag(Tag::Unknown(TAG_GDAL_NODATA), nodata.to_string().as_str())?;
    }
    Ok(())
}
