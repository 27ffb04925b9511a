use rand::Rng;
use tracing::debug;

use crate::{
    catalog::Catalog,
    error::{PlinthError, PlinthResult},
    history::History,
    model::{ImageEntry, SubjectRecord},
};

/// Pick a random subject and a random photo within it, honoring both
/// no-repeat histories.
///
/// The record count is re-queried and the index re-picked on every rejected
/// attempt, so the sampling tracks the live listing rather than a snapshot.
/// A subject is acceptable only when it is absent from the subject history
/// and at least one of its photos is absent from the photo history; the
/// second guarantee is what lets the photo loop below terminate.
pub fn select_subject_and_photo(
    catalog: &dyn Catalog,
    subjects: &mut History,
    photos: &mut History,
    rng: &mut impl Rng,
) -> PlinthResult<(SubjectRecord, ImageEntry)> {
    let subject = loop {
        let count = catalog.count_records()?;
        if count == 0 {
            return Err(PlinthError::metadata("catalog has no subject records"));
        }
        let index = rng.random_range(1..=count);
        let record = catalog.record_at(index)?;

        if subjects.contains(&record.name) {
            debug!(subject = %record.name, "subject still in history, re-picking");
            continue;
        }
        if photos.is_enabled() && record.images.iter().all(|img| photos.contains(&img.photo)) {
            debug!(
                subject = %record.name,
                "every photo of subject still in history, re-picking"
            );
            continue;
        }

        subjects.remember(record.name.clone());
        break record;
    };

    let entry = loop {
        let candidate = &subject.images[rng.random_range(0..subject.images.len())];
        if photos.contains(&candidate.photo) {
            debug!(photo = %candidate.photo, "photo still in history, re-picking");
            continue;
        }
        photos.remember(candidate.photo.clone());
        break candidate.clone();
    };

    Ok((subject, entry))
}
