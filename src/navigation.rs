use std::sync::{Arc, Mutex};

/// The host's notion of "where the user is", plus a way to move them.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    /// Replaces the current location; no history entry is kept.
    fn replace(&self, path: &str);
}

/// `entry` covers the path itself and everything beneath it. The root entry
/// only covers the root.
pub fn matches_public_path(path: &str, entry: &str) -> bool {
    let path = strip_query(path);
    let entry = entry.trim_end_matches('/');
    if entry.is_empty() {
        return path.is_empty() || path == "/";
    }
    match path.strip_prefix(entry) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn is_public_path<S: AsRef<str>>(path: &str, public_paths: &[S]) -> bool {
    public_paths
        .iter()
        .any(|entry| matches_public_path(path, entry.as_ref()))
}

fn strip_query(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// In-memory location that records every forced navigation.
#[derive(Clone)]
pub struct HistoryNavigator {
    inner: Arc<Mutex<History>>,
}

struct History {
    current: String,
    replaced: Vec<String>,
}

impl HistoryNavigator {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(History {
                current: current.into(),
                replaced: Vec::new(),
            })),
        }
    }

    pub fn set_current(&self, path: impl Into<String>) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.current = path.into();
    }

    pub fn replacements(&self) -> Vec<String> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.replaced.clone()
    }
}

impl Navigator for HistoryNavigator {
    fn current_path(&self) -> String {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.current.clone()
    }

    fn replace(&self, path: &str) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.current = path.to_string();
        guard.replaced.push(path.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PUBLIC_PATHS;

    #[test]
    fn root_entry_only_matches_root() {
        assert!(matches_public_path("/", "/"));
        assert!(matches_public_path("/?ref=mail", "/"));
        assert!(!matches_public_path("/dashboard", "/"));
    }

    #[test]
    fn entries_match_by_segment() {
        assert!(matches_public_path("/browse", "/browse"));
        assert!(matches_public_path("/browse/math", "/browse"));
        assert!(!matches_public_path("/browsers", "/browse"));
        assert!(matches_public_path("/quiz/preview/42", "/quiz/preview"));
        assert!(!matches_public_path("/quiz/42/play", "/quiz/preview"));
    }

    #[test]
    fn default_public_list_protects_dashboard() {
        assert!(is_public_path("/browse", &PUBLIC_PATHS));
        assert!(is_public_path("/auth/forgot", &PUBLIC_PATHS));
        assert!(!is_public_path("/dashboard", &PUBLIC_PATHS));
        assert!(!is_public_path("/favorites", &PUBLIC_PATHS));
    }

    #[test]
    fn set_current_moves_without_recording_a_redirect() {
        let nav = HistoryNavigator::new("/browse");
        nav.set_current("/dashboard?tab=recent");
        assert_eq!(nav.current_path(), "/dashboard?tab=recent");
        assert!(nav.replacements().is_empty());
        assert!(!is_public_path(&nav.current_path(), &PUBLIC_PATHS));
    }

    #[test]
    fn replace_records_and_moves() {
        let nav = HistoryNavigator::new("/dashboard");
        nav.replace("/auth/login");
        assert_eq!(nav.current_path(), "/auth/login");
        assert_eq!(nav.replacements(), vec!["/auth/login".to_string()]);
    }
}
