// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Mutex;

use uuid::Uuid;

/// Process-wide bearer token slot.
///
/// Holds at most one valid token at a time; issuing a new one invalidates
/// whatever was there before, so only the most recent login stays usable.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    slot: Mutex<Option<String>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token, replacing any previously issued one.
    pub fn issue(&self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        *self.slot.lock().expect("token slot lock poisoned") = Some(token.clone());
        token
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.slot
            .lock()
            .expect("token slot lock poisoned")
            .as_deref()
            == Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_token_is_valid_before_the_first_issue() {
        let registry = TokenRegistry::new();
        assert!(!registry.is_valid(""));
        assert!(!registry.is_valid("anything"));
    }

    #[test]
    fn issuing_a_new_token_invalidates_the_previous_one() {
        let registry = TokenRegistry::new();
        let first = registry.issue();
        assert!(registry.is_valid(&first));

        let second = registry.issue();
        assert!(registry.is_valid(&second));
        assert!(!registry.is_valid(&first));
    }
}
