//! Native GeoTIFF reading/writing built on the `tiff` crate.
//!
//! Only the georeferencing the evaluator needs is handled: pixel scale and
//! tiepoint tags. The CRS is not parsed; callers attach it.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray64Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;

/// Read the first band of a GeoTIFF.
///
/// Cells equal to `nodata` (and NaN cells) come back masked.
pub fn read_geotiff<P: AsRef<Path>>(path: P, nodata: Option<f64>) -> Result<Raster> {
    let file = File::open(path.as_ref())?;
    decode_geotiff(file, nodata)
}

/// Same as [`read_geotiff`] for an in-memory buffer.
pub fn read_geotiff_from_buffer(data: &[u8], nodata: Option<f64>) -> Result<Raster> {
    decode_geotiff(Cursor::new(data), nodata)
}

fn decode_geotiff<R: Read + Seek>(reader: R, nodata: Option<f64>) -> Result<Raster> {
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let (rows, cols) = (height as usize, width as usize);

    let samples: Vec<f64> = match decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?
    {
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF pixel format".into())),
    };

    // Multi-sample images decode interleaved; keep the first sample.
    let per_pixel = samples.len() / (rows * cols).max(1);
    if per_pixel == 0 || samples.len() != rows * cols * per_pixel {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let data: Vec<f64> = samples
        .into_iter()
        .step_by(per_pixel)
        .map(|v| match nodata {
            Some(nd) if v == nd => f64::NAN,
            _ => v,
        })
        .collect();

    let mut raster = Raster::from_vec(data, rows, cols)?;
    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: [I, J, K, X, Y, Z]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Write a raster as a 64-bit float GeoTIFF; masked cells are written as NaN.
pub fn write_geotiff<P: AsRef<Path>>(raster: &Raster, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, file)
}

/// Same as [`write_geotiff`] into a byte buffer.
pub fn write_geotiff_to_buffer(raster: &Raster) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<W: Write + Seek>(raster: &Raster, writer: W) -> Result<()> {
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let data = raster.to_vec();

    let mut image = encoder
        .new_image::<Gray64Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    // Version 1.1.0 with GTModelType and GTRasterType (PixelIsArea).
    let model_type: u16 = if raster.crs().is_some_and(|c| c.is_geographic()) { 2 } else { 1 };
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, model_type, 1025, 0, 1, 1];

    let tag_err = |e: tiff::TiffError| Error::Other(format!("Cannot write GeoTIFF tag: {}", e));
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(tag_err)?;
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(tag_err)?;
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &geokeys[..])
        .map_err(tag_err)?;

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;
    Ok(())
}
