//! Owner display names supplied by the external identity service

use std::collections::HashMap;

use roadwatch_core::UserId;

/// Resolves user ids to the names shown next to their obstacle reports
pub trait IdentityProvider: Send + Sync {
    fn display_name(&self, user: &str) -> Option<String>;

    /// Display name, falling back to the raw id for unknown users
    fn name_or_id(&self, user: &str) -> String {
        self.display_name(user).unwrap_or_else(|| user.to_string())
    }
}

/// Fixed user directory read from the `[identity.users]` config table
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: HashMap<UserId, String>,
}

impl StaticDirectory {
    pub fn new(users: impl IntoIterator<Item = (UserId, String)>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }
}

impl IdentityProvider for StaticDirectory {
    fn display_name(&self, user: &str) -> Option<String> {
        self.users.get(user).cloned()
    }
}
