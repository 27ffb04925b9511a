use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;
use image::RgbaImage;
use tracing::debug;

use crate::{
    error::{PlinthError, PlinthResult},
    metadata::CaptureInfo,
    model::{ImageEntry, SubjectRecord},
};

/// Build the named form fields for one plaque. The field names are fixed by
/// the templates; the formatting matches the printed plaques already in use.
pub fn plaque_fields(
    subject: &SubjectRecord,
    entry: &ImageEntry,
    capture: &CaptureInfo,
) -> BTreeMap<String, String> {
    let shutter = (1.0 / capture.exposure_secs).round() as i64;

    let mut fields = BTreeMap::new();
    fields.insert("Title".to_string(), subject.title_for(entry));
    fields.insert("Subtitle".to_string(), subject.species.clone());
    fields.insert(
        "Date".to_string(),
        capture.taken_at.format("%-I:%M %p %B %-d, %Y").to_string(),
    );
    fields.insert("Location".to_string(), entry.location.clone());
    fields.insert(
        "Body".to_string(),
        format!(
            "{} at {}mm",
            capture.camera,
            format_plain(capture.focal_mm)
        ),
    );
    fields.insert(
        "Exposure".to_string(),
        format!(
            "1/{}s at f/{}, {} ISO",
            shutter,
            format_plain(capture.aperture),
            capture.iso
        ),
    );
    fields
}

/// Format a rational EXIF value without a trailing `.0` on whole numbers.
fn format_plain(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// Produces the finished plaque image from a form template and field values.
pub trait PlaqueRenderer {
    fn render(
        &self,
        template: &[u8],
        fields: &BTreeMap<String, String>,
    ) -> PlinthResult<RgbaImage>;
}

/// Fills the template with an external `pdftk`-compatible binary and
/// rasterizes page 1 at the crop box with a `pdftoppm`-compatible binary.
/// System binaries are used deliberately: native PDF toolkits drag in heavy
/// build requirements the kiosk host does not have.
pub struct PdfFormRenderer {
    workdir: tempfile::TempDir,
    form_filler: PathBuf,
    rasterizer: PathBuf,
}

impl PdfFormRenderer {
    pub fn new(form_filler: PathBuf, rasterizer: PathBuf) -> PlinthResult<Self> {
        let workdir = tempfile::tempdir().context("create plaque working directory")?;
        Ok(Self {
            workdir,
            form_filler,
            rasterizer,
        })
    }
}

impl PlaqueRenderer for PdfFormRenderer {
    fn render(
        &self,
        template: &[u8],
        fields: &BTreeMap<String, String>,
    ) -> PlinthResult<RgbaImage> {
        let dir = self.workdir.path();
        let template_path = dir.join("template.pdf");
        let fdf_path = dir.join("fields.fdf");
        let filled_path = dir.join("plaque.pdf");
        let raster_stem = dir.join("plaque");
        let raster_path = dir.join("plaque.jpg");

        fs::write(&template_path, template).context("write plaque template")?;
        write_fdf(fields, &fdf_path)?;

        run_tool(
            Command::new(&self.form_filler)
                .arg(&template_path)
                .arg("fill_form")
                .arg(&fdf_path)
                .arg("output")
                .arg(&filled_path),
            "form filler",
        )?;

        run_tool(
            Command::new(&self.rasterizer)
                .args(["-jpeg", "-r", "150", "-cropbox", "-singlefile", "-f", "1", "-l", "1"])
                .arg(&filled_path)
                .arg(&raster_stem),
            "rasterizer",
        )?;

        let jpeg = fs::read(&raster_path).context("read rasterized plaque")?;
        let plaque = image::load_from_memory(&jpeg)
            .context("decode rasterized plaque")?
            .to_rgba8();
        debug!(
            width = plaque.width(),
            height = plaque.height(),
            "rendered plaque"
        );
        Ok(plaque)
    }
}

fn run_tool(command: &mut Command, what: &str) -> PlinthResult<()> {
    let program = command.get_program().to_os_string();
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            PlinthError::render(format!(
                "failed to spawn {what} '{}' (is it installed and on PATH?): {e}",
                program.to_string_lossy()
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PlinthError::render(format!(
            "{what} exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

/// Write the fields as an FDF document, the interchange format every
/// `pdftk`-compatible filler accepts.
fn write_fdf(fields: &BTreeMap<String, String>, out: &Path) -> PlinthResult<()> {
    let mut doc = String::from("%FDF-1.2\n1 0 obj\n<< /FDF << /Fields [\n");
    for (key, value) in fields {
        doc.push_str(&format!(
            "<< /T ({}) /V ({}) >>\n",
            escape_fdf(key),
            escape_fdf(value)
        ));
    }
    doc.push_str("] >> >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n");
    fs::write(out, doc).with_context(|| format!("write fdf '{}'", out.display()))?;
    Ok(())
}

fn escape_fdf(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            _ => escaped.push(c),
        }
    }
    escaped
}
