use std::{collections::BTreeMap, thread, time::Duration};

use tracing::warn;

use crate::{
    error::{PlinthError, PlinthResult},
    model::SubjectRecord,
};

/// Narrow interface onto the cloud file store holding subject records and
/// their binaries. Indices are 1-based and positional in the store's listing
/// order, which may shift between calls.
pub trait Catalog {
    fn count_records(&self) -> PlinthResult<usize>;
    fn record_at(&self, index: usize) -> PlinthResult<SubjectRecord>;
    fn fetch_bytes(&self, path: &str) -> PlinthResult<Vec<u8>>;
}

/// Constant-delay retry for transient transport failures. `Auth` and
/// `Metadata` errors pass through unretried; exhausting the budget escalates
/// to `CatalogUnavailable`.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

    pub fn new(max_attempts: u32, delay: Duration) -> PlinthResult<Self> {
        if max_attempts == 0 {
            return Err(PlinthError::config("max_attempts must be > 0"));
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> PlinthResult<T>) -> PlinthResult<T> {
        let mut attempt = 1u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    if attempt >= self.max_attempts {
                        return Err(PlinthError::catalog_unavailable(format!(
                            "{what} failed after {attempt} attempts: {err}"
                        )));
                    }
                    warn!(
                        what,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "catalog call failed, retrying"
                    );
                    thread::sleep(self.delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Self::DEFAULT_DELAY,
        }
    }
}

/// In-memory catalog over a fixed record list. The software stand-in for the
/// remote store: listing order is the record order given at construction.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    records: Vec<SubjectRecord>,
    files: BTreeMap<String, Vec<u8>>,
}

impl StaticCatalog {
    pub fn new(records: Vec<SubjectRecord>) -> Self {
        Self {
            records,
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(path.into(), bytes);
        self
    }
}

impl Catalog for StaticCatalog {
    fn count_records(&self) -> PlinthResult<usize> {
        Ok(self.records.len())
    }

    fn record_at(&self, index: usize) -> PlinthResult<SubjectRecord> {
        let record = index
            .checked_sub(1)
            .and_then(|i| self.records.get(i))
            .ok_or_else(|| {
                PlinthError::transport(format!(
                    "record index {index} out of range ({} records)",
                    self.records.len()
                ))
            })?;
        record.validate()?;
        Ok(record.clone())
    }

    fn fetch_bytes(&self, path: &str) -> PlinthResult<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| PlinthError::transport(format!("no such file '{path}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn zero_delay(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn returns_success_after_transient_failures() {
        let calls = Cell::new(0u32);
        let result = zero_delay(10).run("op", || {
            calls.set(calls.get() + 1);
            if calls.get() <= 3 {
                Err(PlinthError::transport("flaky"))
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn escalates_exactly_after_the_final_attempt() {
        let calls = Cell::new(0u32);
        let result: PlinthResult<()> = zero_delay(3).run("op", || {
            calls.set(calls.get() + 1);
            Err(PlinthError::transport("down"))
        });
        assert_eq!(calls.get(), 3);
        assert!(matches!(result, Err(PlinthError::CatalogUnavailable(_))));
    }

    #[test]
    fn auth_errors_pass_through_unretried() {
        let calls = Cell::new(0u32);
        let result: PlinthResult<()> = zero_delay(5).run("op", || {
            calls.set(calls.get() + 1);
            Err(PlinthError::auth("bad token"))
        });
        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(PlinthError::Auth(_))));
    }

    #[test]
    fn metadata_errors_pass_through_unretried() {
        let calls = Cell::new(0u32);
        let result: PlinthResult<()> = zero_delay(5).run("op", || {
            calls.set(calls.get() + 1);
            Err(PlinthError::metadata("not json"))
        });
        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(PlinthError::Metadata(_))));
    }

    #[test]
    fn policy_rejects_zero_attempts() {
        assert!(RetryPolicy::new(0, Duration::ZERO).is_err());
    }
}
