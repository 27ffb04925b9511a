use std::{
    fs,
    io::{Seek, SeekFrom, Write},
    path::PathBuf,
};

use anyhow::Context as _;
use image::RgbaImage;
use tracing::info;

use crate::{
    display::{DisplayBackend, DisplayTarget, ensure_frame_matches},
    error::{PlinthError, PlinthResult},
};

/// Linux framebuffer outputs: output index N maps to `/dev/fbN`. A
/// framebuffer is borderless and full-bounds by construction, which is
/// exactly what the kiosk wants from a monitor.
#[derive(Clone, Copy, Debug, Default)]
pub struct FbdevBackend;

impl FbdevBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DisplayBackend for FbdevBackend {
    fn open(&mut self, output: usize) -> PlinthResult<Box<dyn DisplayTarget>> {
        Ok(Box::new(FbdevTarget::open(output)?))
    }
}

pub struct FbdevTarget {
    device: fs::File,
    width: u32,
    height: u32,
    stride: u32,
}

impl FbdevTarget {
    pub fn open(output: usize) -> PlinthResult<Self> {
        let sys = PathBuf::from(format!("/sys/class/graphics/fb{output}"));

        let virtual_size = read_sysfs(&sys.join("virtual_size"))?;
        let (width, height) = virtual_size
            .split_once(',')
            .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)))
            .ok_or_else(|| {
                PlinthError::display(format!(
                    "fb{output} reported unparseable virtual_size '{virtual_size}'"
                ))
            })?;

        let bits_per_pixel: u32 = read_sysfs(&sys.join("bits_per_pixel"))?
            .parse()
            .map_err(|e| {
                PlinthError::display(format!("fb{output} reported bad bits_per_pixel: {e}"))
            })?;
        if bits_per_pixel != 32 {
            return Err(PlinthError::display(format!(
                "fb{output} is {bits_per_pixel} bpp, only 32 bpp outputs are supported"
            )));
        }

        // Older kernels do not expose `stride`; assume tightly packed rows.
        let stride = match read_sysfs(&sys.join("stride")) {
            Ok(s) => s.parse().map_err(|e| {
                PlinthError::display(format!("fb{output} reported bad stride: {e}"))
            })?,
            Err(_) => width * 4,
        };

        let device_path = format!("/dev/fb{output}");
        let device = fs::OpenOptions::new()
            .write(true)
            .open(&device_path)
            .with_context(|| format!("open framebuffer device '{device_path}'"))?;

        info!(output, width, height, stride, "opened framebuffer output");
        Ok(Self {
            device,
            width,
            height,
            stride,
        })
    }
}

impl DisplayTarget for FbdevTarget {
    fn bounds(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn present(&mut self, frame: &RgbaImage) -> PlinthResult<()> {
        ensure_frame_matches(frame, self.bounds(), "framebuffer")?;

        // XRGB8888 little-endian: B, G, R, X per pixel, rows padded to the
        // device stride.
        let mut packed = vec![0u8; self.stride as usize * self.height as usize];
        for (y, row) in frame.rows().enumerate() {
            let row_start = y * self.stride as usize;
            for (x, px) in row.enumerate() {
                let at = row_start + x * 4;
                packed[at] = px[2];
                packed[at + 1] = px[1];
                packed[at + 2] = px[0];
                packed[at + 3] = 0xff;
            }
        }

        self.device
            .seek(SeekFrom::Start(0))
            .context("rewind framebuffer")?;
        self.device
            .write_all(&packed)
            .context("write frame to framebuffer")?;
        self.device.flush().context("flush framebuffer")?;
        Ok(())
    }
}

fn read_sysfs(path: &std::path::Path) -> PlinthResult<String> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read framebuffer attribute '{}'", path.display()))?;
    Ok(raw.trim().to_string())
}
