use std::io::Cursor;

use chrono::NaiveDateTime;
use exif::{In, Tag, Value};

use crate::error::{PlinthError, PlinthResult};

/// Capture metadata pulled from a photo's embedded EXIF block. Every field
/// is required; a photo missing any of them cannot have a plaque.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureInfo {
    pub taken_at: NaiveDateTime,
    pub camera: String,
    pub focal_mm: f64,
    pub aperture: f64,
    pub exposure_secs: f64,
    pub iso: u32,
}

/// Narrow interface onto the EXIF reader so the swap pipeline can be driven
/// with canned capture info.
pub trait MetadataReader {
    fn capture_info(&self, photo: &[u8]) -> PlinthResult<CaptureInfo>;
}

/// Production reader over the photo's embedded EXIF block.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExifReader;

impl MetadataReader for ExifReader {
    fn capture_info(&self, photo: &[u8]) -> PlinthResult<CaptureInfo> {
        capture_info(photo)
    }
}

pub fn capture_info(photo: &[u8]) -> PlinthResult<CaptureInfo> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(photo))
        .map_err(|e| PlinthError::metadata(format!("photo has no readable EXIF block: {e}")))?;

    let taken_raw = ascii_field(&exif, Tag::DateTimeOriginal)?;
    let taken_at = NaiveDateTime::parse_from_str(&taken_raw, "%Y:%m:%d %H:%M:%S").map_err(|e| {
        PlinthError::metadata(format!("DateTimeOriginal '{taken_raw}' is malformed: {e}"))
    })?;

    let exposure_secs = rational_field(&exif, Tag::ExposureTime)?;
    if exposure_secs <= 0.0 {
        return Err(PlinthError::metadata("ExposureTime must be positive"));
    }

    Ok(CaptureInfo {
        taken_at,
        camera: ascii_field(&exif, Tag::Model)?,
        focal_mm: rational_field(&exif, Tag::FocalLength)?,
        aperture: rational_field(&exif, Tag::FNumber)?,
        exposure_secs,
        iso: uint_field(&exif, Tag::PhotographicSensitivity)?,
    })
}

fn required_field<'a>(exif: &'a exif::Exif, tag: Tag) -> PlinthResult<&'a exif::Field> {
    exif.get_field(tag, In::PRIMARY)
        .ok_or_else(|| PlinthError::metadata(format!("required EXIF tag {tag} is missing")))
}

fn ascii_field(exif: &exif::Exif, tag: Tag) -> PlinthResult<String> {
    let field = required_field(exif, tag)?;
    match &field.value {
        Value::Ascii(lines) if !lines.is_empty() => Ok(String::from_utf8_lossy(&lines[0])
            .trim_matches('\0')
            .trim()
            .to_string()),
        _ => Err(PlinthError::metadata(format!(
            "EXIF tag {tag} is not an ASCII value"
        ))),
    }
}

fn rational_field(exif: &exif::Exif, tag: Tag) -> PlinthResult<f64> {
    let field = required_field(exif, tag)?;
    match &field.value {
        Value::Rational(values) if !values.is_empty() => Ok(values[0].to_f64()),
        _ => Err(PlinthError::metadata(format!(
            "EXIF tag {tag} is not a rational value"
        ))),
    }
}

fn uint_field(exif: &exif::Exif, tag: Tag) -> PlinthResult<u32> {
    let field = required_field(exif, tag)?;
    field.value.get_uint(0).ok_or_else(|| {
        PlinthError::metadata(format!("EXIF tag {tag} is not an unsigned integer"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_without_exif_are_a_metadata_error() {
        // A plain PNG carries no EXIF block.
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([1, 2, 3, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let result = capture_info(&buf);
        assert!(matches!(result, Err(PlinthError::Metadata(_))));
    }

    #[test]
    fn garbage_bytes_are_a_metadata_error() {
        let result = capture_info(b"definitely not an image");
        assert!(matches!(result, Err(PlinthError::Metadata(_))));
    }
}
