use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::models::Scope;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    JoinSpace {
        space: String,
    },
    SetProps {
        space: String,
        #[serde(default)]
        scope: Scope,
        props: HashMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub property: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    SpaceState {
        space: String,
        public: HashMap<String, String>,
        protected: HashMap<String, String>,
    },
    StateChanged {
        space: String,
        scope: Scope,
        changes: Vec<Change>,
    },
    Error {
        message: String,
    },
}
