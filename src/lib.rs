#![forbid(unsafe_code)]

pub mod catalog;
pub mod display;
pub mod display_fbdev;
pub mod display_headless;
pub mod error;
pub mod freq;
pub mod history;
pub mod kiosk;
pub mod metadata;
pub mod model;
pub mod plaque;
pub mod remote;
pub mod schedule;
pub mod select;

pub use catalog::{Catalog, RetryPolicy, StaticCatalog};
pub use display::{
    BackendKind, DisplayBackend, DisplayTarget, FadeDirection, Surface, SurfaceConfig, compose,
    create_backend, fade_levels, fit_within,
};
pub use display_headless::HeadlessBackend;
pub use error::{PlinthError, PlinthResult};
pub use freq::FrequencyLog;
pub use history::History;
pub use kiosk::{Kiosk, KioskConfig};
pub use metadata::{CaptureInfo, ExifReader, MetadataReader};
pub use model::{ImageEntry, SubjectRecord};
pub use plaque::{PdfFormRenderer, PlaqueRenderer, plaque_fields};
pub use remote::{RemoteCatalog, RemoteConfig};
pub use schedule::Scheduler;
pub use select::select_subject_and_photo;
