use crate::error::{PlinthError, PlinthResult};

/// One photographic subject as stored in the catalog, fetched fresh on every
/// selection and never cached across selections.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SubjectRecord {
    pub name: String,
    pub species: String,
    pub images: Vec<ImageEntry>,
}

/// One candidate photo belonging to a subject. `photo` doubles as the
/// repeat-avoidance key, so it must be stable per visually distinct photo.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ImageEntry {
    pub photo: String,
    pub plaque_template: String,
    #[serde(default)]
    pub name_detail: String,
    #[serde(default)]
    pub location: String,
}

impl SubjectRecord {
    pub fn validate(&self) -> PlinthResult<()> {
        if self.name.trim().is_empty() {
            return Err(PlinthError::metadata("subject record has an empty name"));
        }
        if self.images.is_empty() {
            return Err(PlinthError::metadata(format!(
                "subject record '{}' has no images",
                self.name
            )));
        }
        for entry in &self.images {
            if entry.photo.trim().is_empty() {
                return Err(PlinthError::metadata(format!(
                    "subject record '{}' has an image entry with an empty photo path",
                    self.name
                )));
            }
            if entry.plaque_template.trim().is_empty() {
                return Err(PlinthError::metadata(format!(
                    "image '{}' of subject '{}' has no plaque template path",
                    entry.photo, self.name
                )));
            }
        }
        Ok(())
    }

    /// Display title for one of this subject's images: the subject name,
    /// qualified with the entry's detail in parentheses when present.
    pub fn title_for(&self, entry: &ImageEntry) -> String {
        if entry.name_detail.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, entry.name_detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_record() -> SubjectRecord {
        SubjectRecord {
            name: "Grey Heron".to_string(),
            species: "Ardea cinerea".to_string(),
            images: vec![ImageEntry {
                photo: "/photos/heron-01.jpg".to_string(),
                plaque_template: "/templates/heron.pdf".to_string(),
                name_detail: String::new(),
                location: "River Lea, London".to_string(),
            }],
        }
    }

    #[test]
    fn json_roundtrip() {
        let record = basic_record();
        let s = serde_json::to_string_pretty(&record).unwrap();
        let de: SubjectRecord = serde_json::from_str(&s).unwrap();
        assert_eq!(de.name, "Grey Heron");
        assert_eq!(de.images.len(), 1);
        assert_eq!(de.images[0].photo, "/photos/heron-01.jpg");
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let de: SubjectRecord = serde_json::from_str(
            r#"{
                "name": "Grey Heron",
                "species": "Ardea cinerea",
                "images": [{
                    "photo": "/photos/heron-01.jpg",
                    "plaque_template": "/templates/heron.pdf"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(de.images[0].name_detail, "");
        assert_eq!(de.images[0].location, "");
        de.validate().unwrap();
    }

    #[test]
    fn validate_rejects_empty_name() {
        let mut record = basic_record();
        record.name = "  ".to_string();
        assert!(record.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_images() {
        let mut record = basic_record();
        record.images.clear();
        assert!(record.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_photo_path() {
        let mut record = basic_record();
        record.images[0].photo = String::new();
        assert!(record.validate().is_err());
    }

    #[test]
    fn title_appends_detail_when_present() {
        let mut record = basic_record();
        let entry = record.images[0].clone();
        assert_eq!(record.title_for(&entry), "Grey Heron");
        record.images[0].name_detail = "juvenile".to_string();
        let entry = record.images[0].clone();
        assert_eq!(record.title_for(&entry), "Grey Heron (juvenile)");
    }
}
