use plinth::{History, ImageEntry, StaticCatalog, SubjectRecord, select_subject_and_photo};
use rand::{SeedableRng, rngs::StdRng};

fn subject(name: &str, photos: &[&str]) -> SubjectRecord {
    SubjectRecord {
        name: name.to_string(),
        species: format!("{name} species"),
        images: photos
            .iter()
            .map(|p| ImageEntry {
                photo: (*p).to_string(),
                plaque_template: format!("{p}.pdf"),
                name_detail: String::new(),
                location: String::new(),
            })
            .collect(),
    }
}

fn menagerie() -> StaticCatalog {
    StaticCatalog::new(vec![
        subject("heron", &["/h1.jpg", "/h2.jpg", "/h3.jpg"]),
        subject("otter", &["/o1.jpg", "/o2.jpg", "/o3.jpg"]),
        subject("fox", &["/f1.jpg", "/f2.jpg", "/f3.jpg"]),
        subject("kestrel", &["/k1.jpg", "/k2.jpg", "/k3.jpg"]),
    ])
}

#[test]
fn photo_history_window_blocks_repeats() {
    let catalog = menagerie();
    let window = 4;
    let mut subjects = History::new(0);
    let mut photos = History::new(window);
    let mut rng = StdRng::seed_from_u64(42);

    let mut picked = Vec::new();
    for _ in 0..200 {
        let (_, entry) =
            select_subject_and_photo(&catalog, &mut subjects, &mut photos, &mut rng).unwrap();
        picked.push(entry.photo);
        assert!(photos.len() <= window);
    }

    for (i, photo) in picked.iter().enumerate() {
        let end = (i + 1 + window).min(picked.len());
        for later in &picked[i + 1..end] {
            assert_ne!(later, photo, "photo repeated inside the no-repeat window");
        }
    }
}

#[test]
fn subject_history_window_blocks_repeats() {
    let catalog = menagerie();
    let window = 2;
    let mut subjects = History::new(window);
    let mut photos = History::new(0);
    let mut rng = StdRng::seed_from_u64(9);

    let mut picked = Vec::new();
    for _ in 0..100 {
        let (record, _) =
            select_subject_and_photo(&catalog, &mut subjects, &mut photos, &mut rng).unwrap();
        picked.push(record.name);
        assert!(subjects.len() <= window);
    }

    for (i, name) in picked.iter().enumerate() {
        let end = (i + 1 + window).min(picked.len());
        for later in &picked[i + 1..end] {
            assert_ne!(later, name, "subject repeated inside the no-repeat window");
        }
    }
}

#[test]
fn disabled_histories_never_reject() {
    let catalog = StaticCatalog::new(vec![subject("solo", &["/s1.jpg"])]);
    let mut subjects = History::new(0);
    let mut photos = History::new(0);
    let mut rng = StdRng::seed_from_u64(1);

    for _ in 0..20 {
        let (record, entry) =
            select_subject_and_photo(&catalog, &mut subjects, &mut photos, &mut rng).unwrap();
        assert_eq!(record.name, "solo");
        assert_eq!(entry.photo, "/s1.jpg");
    }
}

#[test]
fn full_photo_history_steers_around_exhausted_subjects() {
    // With the photo history as large as one subject's whole image set, the
    // engine must keep terminating by falling through to other subjects.
    let catalog = StaticCatalog::new(vec![
        subject("small", &["/s1.jpg", "/s2.jpg"]),
        subject("large", &["/l1.jpg", "/l2.jpg", "/l3.jpg", "/l4.jpg"]),
    ]);
    let mut subjects = History::new(0);
    let mut photos = History::new(2);
    let mut rng = StdRng::seed_from_u64(27);

    for _ in 0..100 {
        select_subject_and_photo(&catalog, &mut subjects, &mut photos, &mut rng).unwrap();
    }
}
