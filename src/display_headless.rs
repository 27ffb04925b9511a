use std::{cell::RefCell, rc::Rc};

use image::RgbaImage;

use crate::{
    display::{DisplayBackend, DisplayTarget, ensure_frame_matches},
    error::PlinthResult,
};

/// Shared journal of every presented frame, most recent last. The backend
/// and all targets it opens hold the same journal so a test (or a dry run)
/// can inspect what would have hit the monitors.
pub type PresentJournal = Rc<RefCell<Vec<(usize, RgbaImage)>>>;

/// In-memory outputs for tests and `--display headless` dry runs. All
/// opened targets share one configured bounds.
pub struct HeadlessBackend {
    bounds: (u32, u32),
    journal: PresentJournal,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_bounds((1920, 1080))
    }

    pub fn with_bounds(bounds: (u32, u32)) -> Self {
        Self {
            bounds,
            journal: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn journal(&self) -> PresentJournal {
        Rc::clone(&self.journal)
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayBackend for HeadlessBackend {
    fn open(&mut self, output: usize) -> PlinthResult<Box<dyn DisplayTarget>> {
        Ok(Box::new(HeadlessTarget {
            output,
            bounds: self.bounds,
            journal: Rc::clone(&self.journal),
        }))
    }
}

pub struct HeadlessTarget {
    output: usize,
    bounds: (u32, u32),
    journal: PresentJournal,
}

impl DisplayTarget for HeadlessTarget {
    fn bounds(&self) -> (u32, u32) {
        self.bounds
    }

    fn present(&mut self, frame: &RgbaImage) -> PlinthResult<()> {
        ensure_frame_matches(frame, self.bounds, "headless")?;
        self.journal.borrow_mut().push((self.output, frame.clone()));
        Ok(())
    }
}
