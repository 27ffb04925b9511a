use std::{thread, time::Duration};

use image::RgbaImage;

use crate::error::{PlinthError, PlinthResult};

/// One physical output. Created once at startup bound to its output index;
/// only the image content changes afterwards. `present` expects a frame
/// matching `bounds` exactly — `Surface` composes such frames.
pub trait DisplayTarget {
    fn bounds(&self) -> (u32, u32);
    fn present(&mut self, frame: &RgbaImage) -> PlinthResult<()>;
}

pub trait DisplayBackend {
    fn open(&mut self, output: usize) -> PlinthResult<Box<dyn DisplayTarget>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Fbdev,
    Headless,
}

pub fn create_backend(kind: BackendKind) -> PlinthResult<Box<dyn DisplayBackend>> {
    match kind {
        BackendKind::Fbdev => Ok(Box::new(crate::display_fbdev::FbdevBackend::new())),
        BackendKind::Headless => Ok(Box::new(crate::display_headless::HeadlessBackend::new())),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FadeDirection {
    Out,
    In,
}

/// Alpha levels for the five discrete fade steps. The final endpoint is not
/// in the sequence: the full-opacity present before (out) or after (in) the
/// fade supplies it.
pub fn fade_levels(direction: FadeDirection) -> [u8; 5] {
    match direction {
        FadeDirection::Out => [255, 205, 155, 105, 55],
        FadeDirection::In => [0, 50, 100, 150, 200],
    }
}

const FADE_STEP_PAUSE: Duration = Duration::from_millis(10);

/// Largest size at which `width x height` fits inside `bounds` preserving
/// aspect ratio. Never upscales: an image already within bounds keeps its
/// native size.
pub fn fit_within(width: u32, height: u32, bounds: (u32, u32)) -> (u32, u32) {
    let (bound_w, bound_h) = bounds;
    if width <= bound_w && height <= bound_h {
        return (width, height);
    }
    let ratio = (f64::from(bound_w) / f64::from(width)).min(f64::from(bound_h) / f64::from(height));
    let fit_w = ((f64::from(width) * ratio) as u32).max(1);
    let fit_h = ((f64::from(height) * ratio) as u32).max(1);
    (fit_w, fit_h)
}

/// Compose a full-bounds frame: downscale to fit, center on black, and
/// flatten alpha (scaled by `opacity`) over the black background.
pub fn compose(img: &RgbaImage, bounds: (u32, u32), opacity: u8) -> RgbaImage {
    let (bound_w, bound_h) = bounds;
    let (img_w, img_h) = img.dimensions();
    let (fit_w, fit_h) = fit_within(img_w, img_h, bounds);

    let scaled;
    let src = if (fit_w, fit_h) == (img_w, img_h) {
        img
    } else {
        scaled = image::imageops::resize(img, fit_w, fit_h, image::imageops::FilterType::Triangle);
        &scaled
    };

    let mut frame = RgbaImage::from_pixel(bound_w, bound_h, image::Rgba([0, 0, 0, 255]));
    let x0 = (bound_w - fit_w) / 2;
    let y0 = (bound_h - fit_h) / 2;
    for (x, y, px) in src.enumerate_pixels() {
        let alpha = mul_div255(u16::from(px[3]), u16::from(opacity));
        let flattened = image::Rgba([
            mul_div255(u16::from(px[0]), u16::from(alpha)),
            mul_div255(u16::from(px[1]), u16::from(alpha)),
            mul_div255(u16::from(px[2]), u16::from(alpha)),
            255,
        ]);
        frame.put_pixel(x0 + x, y0 + y, flattened);
    }
    frame
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[derive(Clone, Copy, Debug)]
pub struct SurfaceConfig {
    pub photo_output: usize,
    pub plaque_output: usize,
    pub fade: bool,
}

/// The pair of full-screen outputs. Owns both targets and the currently
/// shown image pair (kept so a fade-out can replay the outgoing images).
pub struct Surface {
    photo: Box<dyn DisplayTarget>,
    plaque: Box<dyn DisplayTarget>,
    fade: bool,
    shown: Option<(RgbaImage, RgbaImage)>,
}

impl Surface {
    pub fn create(backend: &mut dyn DisplayBackend, config: &SurfaceConfig) -> PlinthResult<Self> {
        let photo = backend.open(config.photo_output)?;
        let plaque = backend.open(config.plaque_output)?;
        Ok(Self {
            photo,
            plaque,
            fade: config.fade,
            shown: None,
        })
    }

    /// Replace both outputs with a new image pair, fading in first when
    /// fades are enabled.
    pub fn present_pair(&mut self, photo: &RgbaImage, plaque: &RgbaImage) -> PlinthResult<()> {
        if self.fade {
            self.fade_pair(photo, plaque, FadeDirection::In)?;
        }
        let photo_frame = compose(photo, self.photo.bounds(), 255);
        self.photo.present(&photo_frame)?;
        let plaque_frame = compose(plaque, self.plaque.bounds(), 255);
        self.plaque.present(&plaque_frame)?;
        self.shown = Some((photo.clone(), plaque.clone()));
        Ok(())
    }

    /// Fade the currently shown pair out ahead of a swap. A no-op when fades
    /// are disabled or nothing has been presented yet.
    pub fn fade_out(&mut self) -> PlinthResult<()> {
        if !self.fade {
            return Ok(());
        }
        let Some((photo, plaque)) = self.shown.take() else {
            return Ok(());
        };
        self.fade_pair(&photo, &plaque, FadeDirection::Out)
    }

    fn fade_pair(
        &mut self,
        photo: &RgbaImage,
        plaque: &RgbaImage,
        direction: FadeDirection,
    ) -> PlinthResult<()> {
        for level in fade_levels(direction) {
            let photo_frame = compose(photo, self.photo.bounds(), level);
            self.photo.present(&photo_frame)?;
            let plaque_frame = compose(plaque, self.plaque.bounds(), level);
            self.plaque.present(&plaque_frame)?;
            // Pause so the transition is observable rather than immediate.
            thread::sleep(FADE_STEP_PAUSE);
        }
        Ok(())
    }
}

pub(crate) fn ensure_frame_matches(
    frame: &RgbaImage,
    bounds: (u32, u32),
    what: &str,
) -> PlinthResult<()> {
    if frame.dimensions() != bounds {
        return Err(PlinthError::display(format!(
            "{what} frame is {}x{}, target is {}x{}",
            frame.width(),
            frame.height(),
            bounds.0,
            bounds.1
        )));
    }
    Ok(())
}
