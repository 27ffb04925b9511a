use std::io::{self, Write};

/// Per-subject, per-photo selection counts, printed once at shutdown.
/// Subjects and photos keep their first-appearance order.
#[derive(Debug, Default)]
pub struct FrequencyLog {
    subjects: Vec<SubjectCounts>,
    flushed: bool,
}

#[derive(Debug)]
struct SubjectCounts {
    name: String,
    photos: Vec<(String, u64)>,
}

impl SubjectCounts {
    fn subtotal(&self) -> u64 {
        self.photos.iter().map(|(_, count)| count).sum()
    }
}

impl FrequencyLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one selection of this exact (subject, photo) pair.
    pub fn record(&mut self, subject: &str, photo: &str) {
        let at = match self.subjects.iter().position(|s| s.name == subject) {
            Some(at) => at,
            None => {
                self.subjects.push(SubjectCounts {
                    name: subject.to_string(),
                    photos: Vec::new(),
                });
                self.subjects.len() - 1
            }
        };
        let counts = &mut self.subjects[at];
        match counts.photos.iter_mut().find(|(path, _)| path == photo) {
            Some((_, count)) => *count += 1,
            None => counts.photos.push((photo.to_string(), 1)),
        }
    }

    pub fn total(&self) -> u64 {
        self.subjects.iter().map(SubjectCounts::subtotal).sum()
    }

    pub fn subtotal(&self, subject: &str) -> u64 {
        self.subjects
            .iter()
            .find(|s| s.name == subject)
            .map(SubjectCounts::subtotal)
            .unwrap_or(0)
    }

    /// Print the summary to stdout. At most one summary is ever printed, no
    /// matter how many times shutdown is attempted.
    pub fn flush(&mut self) -> bool {
        if self.flushed {
            return false;
        }
        self.flushed = true;
        let mut stdout = io::stdout().lock();
        let _ = self.write_summary(&mut stdout);
        true
    }

    pub fn write_summary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "selection summary")?;
        for subject in &self.subjects {
            writeln!(out, "{}", subject.name)?;
            for (photo, count) in &subject.photos {
                writeln!(out, "  {photo}: {count}")?;
            }
            writeln!(out, "  subtotal: {}", subject.subtotal())?;
        }

        let mut ranked: Vec<&SubjectCounts> = self.subjects.iter().collect();
        ranked.sort_by(|a, b| b.subtotal().cmp(&a.subtotal()));
        writeln!(out, "subjects by selection count:")?;
        for subject in ranked {
            writeln!(
                out,
                "  {}: {} ({} photos)",
                subject.name,
                subject.subtotal(),
                subject.photos.len()
            )?;
        }

        writeln!(out, "grand total: {} swaps", self.total())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_sum_to_the_number_of_selections() {
        let mut log = FrequencyLog::new();
        log.record("heron", "/a.jpg");
        log.record("heron", "/a.jpg");
        log.record("heron", "/b.jpg");
        log.record("otter", "/c.jpg");

        assert_eq!(log.total(), 4);
        assert_eq!(log.subtotal("heron"), 3);
        assert_eq!(log.subtotal("otter"), 1);
    }

    #[test]
    fn summary_ranks_subjects_by_subtotal() {
        let mut log = FrequencyLog::new();
        log.record("rare", "/r.jpg");
        log.record("common", "/c1.jpg");
        log.record("common", "/c2.jpg");

        let mut buf = Vec::new();
        log.write_summary(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let common_at = text.find("  common: 2").unwrap();
        let rare_at = text.find("  rare: 1").unwrap();
        assert!(common_at < rare_at);
        assert!(text.contains("grand total: 3 swaps"));
    }

    #[test]
    fn subjects_keep_first_appearance_order() {
        let mut log = FrequencyLog::new();
        log.record("zebra", "/z.jpg");
        log.record("ant", "/a.jpg");

        let mut buf = Vec::new();
        log.write_summary(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.find("zebra").unwrap() < text.find("ant").unwrap());
    }

    #[test]
    fn flush_happens_at_most_once() {
        let mut log = FrequencyLog::new();
        log.record("heron", "/a.jpg");
        assert!(log.flush());
        assert!(!log.flush());
    }
}
