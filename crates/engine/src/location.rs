//! Storage root resolution

use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory name of the storage root under a working directory
pub const STORAGE_DIR_NAME: &str = "spatial-index";

/// Resolve the storage root
///
/// First match wins:
/// 1. the explicit location
/// 2. `<work_dir>/spatial-index`
/// 3. `<current dir>/spatial-index`
pub fn resolve_location(explicit: Option<&str>, work_dir: Option<&Path>) -> PathBuf {
    if let Some(location) = explicit {
        return PathBuf::from(location);
    }
    match work_dir {
        Some(dir) => dir.join(STORAGE_DIR_NAME),
        None => current_dir_or_relative(std::env::current_dir()).join(STORAGE_DIR_NAME),
    }
}

/// Current directory, or `.` when it cannot be determined
fn current_dir_or_relative(current: io::Result<PathBuf>) -> PathBuf {
    current.unwrap_or_else(|e| {
        warn!(
            target: "spatia::config",
            error = %e,
            "Failed to resolve current directory, spatial index location is relative to '.'"
        );
        PathBuf::from(".")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_explicit_location_wins() {
        let resolved = resolve_location(Some("/tmp/custom"), Some(Path::new("/work")));
        assert_eq!(resolved, PathBuf::from("/tmp/custom"));
    }

    #[test]
    fn test_work_dir() {
        let resolved = resolve_location(None, Some(Path::new("/work")));
        assert_eq!(resolved, PathBuf::from("/work").join(STORAGE_DIR_NAME));
    }

    #[test]
    fn test_current_dir_fallback() {
        let resolved = resolve_location(None, None);
        let expected = std::env::current_dir().unwrap().join(STORAGE_DIR_NAME);
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_unknown_current_dir_warns() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let resolved = tracing::subscriber::with_default(subscriber, || {
            current_dir_or_relative(Err(io::Error::new(io::ErrorKind::NotFound, "cwd removed")))
        });
        assert_eq!(resolved, PathBuf::from("."));

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "{}", output);
        assert!(output.contains("spatia::config"), "{}", output);
        assert!(output.contains("cwd removed"), "{}", output);

        let present = PathBuf::from("/srv/app");
        assert_eq!(current_dir_or_relative(Ok(present.clone())), present);
    }
}
