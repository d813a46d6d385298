use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tiff::decoder::Decoder;
use tiff::encoder::{colortype, DirectoryEncoder, TiffEncoder, TiffKindStandard};
use tiff::tags::Tag;
use tracing::debug;

use crate::consts::{COLOR_CHANNEL_COUNT, EPSG_WGS84};
use crate::error::{OrthoError, Result};
use crate::frame::{Composite, PixelDepth};
use crate::georef::AffineTransform;

const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GT_CITATION_GEO_KEY: u16 = 1026;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const GEOG_ANGULAR_UNITS_GEO_KEY: u16 = 2054;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const ANGULAR_DEGREE: u16 = 9102;
const GEO_ASCII_PARAMS_TAG: u16 = 34737;
const CITATION: &str = "WGS 84|";

/// What a reader needs to place a GeoTIFF on a map.
#[derive(Clone, Debug)]
pub struct GeoTiffInfo {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub epsg: Option<u16>,
    pub transform: AffineTransform,
}

/// GeoKey directory declaring EPSG:4326 geographic coordinates.
pub fn wgs84_geo_keys() -> Vec<u16> {
    let citation_len = CITATION.len() as u16;
    vec![
        1, 1, 0, 5, // version, revision, minor, key count
        GT_MODEL_TYPE_GEO_KEY, 0, 1, MODEL_TYPE_GEOGRAPHIC,
        GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA,
        GT_CITATION_GEO_KEY, GEO_ASCII_PARAMS_TAG, citation_len, 0,
        GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, EPSG_WGS84,
        GEOG_ANGULAR_UNITS_GEO_KEY, 0, 1, ANGULAR_DEGREE,
    ]
}

/// Write the composite as a GeoTIFF tagged with WGS84 and `transform`.
///
/// The raster is encoded into a temporary file next to `path` and renamed
/// into place only once complete, so a failed write never leaves a partial
/// file at the output path.
pub fn write_geotiff(composite: &Composite, transform: &AffineTransform, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let tmp = tempfile::Builder::new()
        .prefix(".ortho-")
        .suffix(".tif.partial")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        encode(composite, transform, &mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| OrthoError::Io(e.error))?;

    debug!(path = %path.display(), "GeoTIFF written");
    Ok(())
}

fn encode<W: Write + Seek>(
    composite: &Composite,
    transform: &AffineTransform,
    writer: &mut W,
) -> Result<()> {
    let (w, h) = (composite.width() as u32, composite.height() as u32);
    if w == 0 || h == 0 {
        return Err(OrthoError::InvalidDimensions {
            width: w,
            height: h,
        });
    }

    let mut encoder = TiffEncoder::new(writer)?;
    match (composite.channels(), composite.depth) {
        (1, PixelDepth::U8) => {
            let mut image = encoder.new_image::<colortype::Gray8>(w, h)?;
            write_geo_tags(image.encoder(), transform)?;
            image.write_data(&interleave_u8(composite))?;
        }
        (1, PixelDepth::U16) => {
            let mut image = encoder.new_image::<colortype::Gray16>(w, h)?;
            write_geo_tags(image.encoder(), transform)?;
            image.write_data(&interleave_u16(composite))?;
        }
        (COLOR_CHANNEL_COUNT, PixelDepth::U8) => {
            let mut image = encoder.new_image::<colortype::RGB8>(w, h)?;
            write_geo_tags(image.encoder(), transform)?;
            image.write_data(&interleave_u8(composite))?;
        }
        (COLOR_CHANNEL_COUNT, PixelDepth::U16) => {
            let mut image = encoder.new_image::<colortype::RGB16>(w, h)?;
            write_geo_tags(image.encoder(), transform)?;
            image.write_data(&interleave_u16(composite))?;
        }
        (n, depth) => {
            return Err(OrthoError::UnsupportedRaster(format!(
                "cannot write {n}-band {depth} GeoTIFF"
            )))
        }
    }
    Ok(())
}

fn write_geo_tags<W: Write + Seek>(
    dir: &mut DirectoryEncoder<'_, W, TiffKindStandard>,
    transform: &AffineTransform,
) -> Result<()> {
    if transform.is_north_up() {
        let scale = [transform.a, -transform.e, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, transform.c, transform.f, 0.0];
        dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
        dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    } else {
        let t = transform;
        let matrix = [
            t.a, t.b, 0.0, t.c, //
            t.d, t.e, 0.0, t.f, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        dir.write_tag(Tag::ModelTransformationTag, &matrix[..])?;
    }
    dir.write_tag(Tag::GeoKeyDirectoryTag, &wgs84_geo_keys()[..])?;
    dir.write_tag(Tag::GeoAsciiParamsTag, CITATION)?;
    Ok(())
}

fn interleave_u8(composite: &Composite) -> Vec<u8> {
    interleave(composite, |v| (v * 255.0).round() as u8)
}

fn interleave_u16(composite: &Composite) -> Vec<u16> {
    interleave(composite, |v| (v * 65535.0).round() as u16)
}

fn interleave<T>(composite: &Composite, convert: impl Fn(f32) -> T) -> Vec<T> {
    let (h, w, n) = (composite.height(), composite.width(), composite.channels());
    let mut out = Vec::with_capacity(h * w * n);
    for row in 0..h {
        for col in 0..w {
            for plane in &composite.planes {
                out.push(convert(plane[[row, col]].clamp(0.0, 1.0)));
            }
        }
    }
    out
}

/// Read size, band count, CRS and pixel→geo transform back from a GeoTIFF.
pub fn read_geotiff_info(path: &Path) -> Result<GeoTiffInfo> {
    let mut decoder = Decoder::new(std::io::BufReader::new(File::open(path)?))?;
    let (w, h) = decoder.dimensions()?;
    let bands = match decoder.colortype()? {
        tiff::ColorType::Gray(_) => 1,
        tiff::ColorType::RGB(_) => COLOR_CHANNEL_COUNT,
        tiff::ColorType::RGBA(_) => 4,
        other => {
            return Err(OrthoError::UnsupportedRaster(format!(
                "unexpected color type {other:?}"
            )))
        }
    };

    let transform = match decoder.find_tag(Tag::ModelTransformationTag)? {
        Some(value) => {
            let m = value.into_f64_vec()?;
            if m.len() < 8 {
                return Err(OrthoError::UnsupportedRaster(
                    "short ModelTransformationTag".into(),
                ));
            }
            AffineTransform {
                a: m[0],
                b: m[1],
                c: m[3],
                d: m[4],
                e: m[5],
                f: m[7],
            }
        }
        None => {
            let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag)?;
            let tie = decoder.get_tag_f64_vec(Tag::ModelTiepointTag)?;
            if scale.len() < 2 || tie.len() < 6 {
                return Err(OrthoError::UnsupportedRaster(
                    "short pixel scale or tiepoint tag".into(),
                ));
            }
            AffineTransform {
                a: scale[0],
                b: 0.0,
                c: tie[3] - tie[0] * scale[0],
                d: 0.0,
                e: -scale[1],
                f: tie[4] + tie[1] * scale[1],
            }
        }
    };

    let epsg = decoder
        .find_tag(Tag::GeoKeyDirectoryTag)?
        .map(|v| v.into_u16_vec())
        .transpose()?
        .and_then(|keys| {
            keys.chunks_exact(4)
                .skip(1)
                .find(|k| k[0] == GEOGRAPHIC_TYPE_GEO_KEY && k[1] == 0)
                .map(|k| k[3])
        });

    Ok(GeoTiffInfo {
        width: w as usize,
        height: h as usize,
        bands,
        epsg,
        transform,
    })
}
