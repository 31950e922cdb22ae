//! Who is on the board, and where their pointers are.

mod cursor;

pub use cursor::{CursorMessage, CursorThrottle, RemoteCursor, RemoteCursors};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identity a client announces when it joins a board channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMeta {
    /// Stable user id, shared by every tab the user has open.
    pub user_id: String,
    pub display_name: String,
}

impl PresenceMeta {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// The channel's presence registry: connection key to announced metas.
pub type PresenceState = HashMap<String, Vec<PresenceMeta>>;

/// Online users, rebuilt from the registry on every presence event.
#[derive(Debug, Clone, Default)]
pub struct PresenceRoster {
    users: Vec<PresenceMeta>,
}

impl PresenceRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users currently online, sorted by display name. One entry per user
    /// even if they are connected more than once.
    pub fn users(&self) -> &[PresenceMeta] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u.user_id == user_id)
    }

    /// Replace the roster from the full registry.
    ///
    /// Returns the ids of users who were online before and are not now.
    pub fn recompute(&mut self, state: &PresenceState) -> Vec<String> {
        let mut keys: Vec<&String> = state.keys().collect();
        keys.sort();

        let mut users: Vec<PresenceMeta> = Vec::new();
        for meta in keys.into_iter().flat_map(|k| &state[k]) {
            if !users.iter().any(|u| u.user_id == meta.user_id) {
                users.push(meta.clone());
            }
        }
        users.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        let left = self
            .users
            .iter()
            .filter(|old| !users.iter().any(|u| u.user_id == old.user_id))
            .map(|old| old.user_id.clone())
            .collect();
        self.users = users;
        left
    }
}
