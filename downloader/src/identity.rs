use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Unique name of one run, used for its output directory and as a prefix of its output files.
///
/// Made of an optional label followed by a token combining the start time, a random part and a process-wide sequence
/// number, e.g. `nightly-20261016T101530-3fa9c1d20000`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunIdentity(String);

impl RunIdentity {
    /// Generate a fresh identity.
    ///
    /// Blank labels are ignored and path separators within a label are replaced, so the identity is always a single
    /// path component.
    pub fn generate(label: Option<&str>) -> Self {
        static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

        let token = format!(
            "{}-{:08x}{:04x}",
            chrono::Utc::now().format("%Y%m%dT%H%M%S"),
            rand::random::<u32>(),
            SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xffff,
        );

        match label.map(str::trim).filter(|label| !label.is_empty()) {
            Some(label) => {
                let label: String = label
                    .chars()
                    .map(|c| if std::path::is_separator(c) || c == '\0' { '_' } else { c })
                    .collect();
                Self(format!("{label}-{token}"))
            }
            None => Self(token),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the file holding the content of the job at `index`.
    #[inline]
    pub fn file_name(&self, index: usize) -> String {
        format!("{}-{index}", self.0)
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<std::path::Path> for RunIdentity {
    #[inline]
    fn as_ref(&self) -> &std::path::Path {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_same_label_never_collides() {
        let ids: HashSet<_> = (0..1_000).map(|_| RunIdentity::generate(Some("dummy"))).collect();

        assert_eq!(ids.len(), 1_000);
        assert!(ids.iter().all(|id| id.as_str().starts_with("dummy-")));
    }

    #[test]
    fn test_without_label() {
        let id = RunIdentity::generate(None);
        let blank = RunIdentity::generate(Some("  "));

        assert!(!id.as_str().starts_with('-'));
        assert!(!blank.as_str().starts_with('-'));
        assert_eq!(id.as_str().len(), blank.as_str().len());
    }

    #[test]
    fn test_label_is_single_component() {
        let id = RunIdentity::generate(Some("a/b"));

        assert!(id.as_str().starts_with("a_b-"));
        assert_eq!(std::path::Path::new(id.as_str()).components().count(), 1);
    }

    #[test]
    fn test_file_name() {
        let id = RunIdentity::generate(Some("run"));

        assert_eq!(id.file_name(7), format!("{id}-7"));
    }
}
