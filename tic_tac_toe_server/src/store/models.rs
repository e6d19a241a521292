use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::SystemTime};
use tracing::debug;

use super::message::{Change, ServerMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Public,
    Protected,
}

/// Property maps shared by everyone who joined the space.
#[derive(Debug, Clone)]
pub struct Space {
    pub public: HashMap<String, String>,
    pub protected: HashMap<String, String>,
    pub last_activity: SystemTime,
    pub watchers: usize,
}

impl Default for Space {
    fn default() -> Self {
        Space {
            public: HashMap::new(),
            protected: HashMap::new(),
            last_activity: SystemTime::now(),
            watchers: 0,
        }
    }
}

impl Space {
    /// Overwrites every given property. Returns the applied changes sorted by
    /// property name.
    pub fn upsert(&mut self, scope: Scope, props: HashMap<String, String>) -> Vec<Change> {
        let target = match scope {
            Scope::Public => &mut self.public,
            Scope::Protected => &mut self.protected,
        };

        let mut changes: Vec<Change> = props
            .into_iter()
            .map(|(property, value)| {
                target.insert(property.clone(), value.clone());
                Change { property, value }
            })
            .collect();
        changes.sort_by(|a, b| a.property.cmp(&b.property));

        self.last_activity = SystemTime::now();
        debug!("Upserted {} {:?} properties.", changes.len(), scope);
        changes
    }

    pub fn snapshot(&self, space: &str) -> ServerMessage {
        ServerMessage::SpaceState {
            space: space.to_string(),
            public: self.public.clone(),
            protected: self.protected.clone(),
        }
    }

    pub fn is_idle(&self, timeout: std::time::Duration) -> bool {
        self.watchers == 0 && self.last_activity.elapsed().unwrap_or(timeout) >= timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn upsert_overwrites_and_reports_sorted_changes() {
        let mut space = Space::default();
        space.upsert(Scope::Public, HashMap::from([("b".to_string(), "1".to_string())]));

        let changes = space.upsert(
            Scope::Public,
            HashMap::from([
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "3".to_string()),
            ]),
        );

        assert_eq!(
            changes.iter().map(|c| c.property.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(space.public["b"], "2");
        assert!(space.protected.is_empty());
    }

    #[test]
    fn protected_scope_is_separate() {
        let mut space = Space::default();
        space.upsert(Scope::Protected, HashMap::from([("k".to_string(), "v".to_string())]));

        assert!(space.public.is_empty());
        assert_eq!(space.protected["k"], "v");
    }

    #[test]
    fn watched_spaces_are_never_idle() {
        let mut space = Space {
            last_activity: SystemTime::now() - Duration::from_secs(3600),
            ..Space::default()
        };
        assert!(space.is_idle(Duration::from_secs(60)));

        space.watchers = 1;
        assert!(!space.is_idle(Duration::from_secs(60)));
    }
}
