use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-session state kept between test events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// Last group a header was printed for.
    pub group: Option<String>,
}

/// Session state keyed by session id. An entry is created by the first event
/// of a session and removed after its last one.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionInfo>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Records `group` as the session's current group, creating the session
    /// if needed. Returns whether a header should be printed, i.e. the group
    /// is set and differs from the previous one.
    pub fn enter_group(&self, id: &str, group: Option<&str>) -> bool {
        let mut sessions = self.lock();
        let info = sessions.entry(id.to_string()).or_default();
        if info.group.as_deref() == group {
            return false;
        }
        info.group = group.map(str::to_string);
        group.is_some()
    }

    pub fn get(&self, id: &str) -> Option<SessionInfo> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn remove(&self, id: &str) -> Option<SessionInfo> {
        self.lock().remove(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionInfo>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_only_on_group_change() {
        let registry = SessionRegistry::new();

        assert!(registry.enter_group("s1", Some("Users")));
        assert!(!registry.enter_group("s1", Some("Users")));
        assert!(registry.enter_group("s1", Some("Orders")));
        assert!(!registry.enter_group("s1", None));
        assert_eq!(registry.get("s1"), Some(SessionInfo { group: None }));
        assert!(registry.enter_group("s1", Some("Orders")));
    }

    #[test]
    fn sessions_are_independent() {
        let registry = SessionRegistry::new();
        assert!(registry.enter_group("a", Some("Users")));
        assert!(registry.enter_group("b", Some("Users")));
        assert_eq!(registry.len(), 2);

        assert!(registry.remove("a").is_some());
        assert!(!registry.contains("a"));
        assert!(registry.enter_group("a", Some("Users")));
    }

    #[test]
    fn ungrouped_first_event_creates_the_session() {
        let registry = SessionRegistry::new();
        assert!(!registry.enter_group("s", None));
        assert!(registry.contains("s"));
        assert!(!registry.is_empty());
    }
}
