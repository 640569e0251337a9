// SPDX-License-Identifier: AGPL-3.0-or-later

//! Authentication against the wallet password.
//!
//! The wallet password is the only credential. A successful login turns it
//! into a short-lived bearer token held in the [`TokenRegistry`]; protected
//! routes check that token in [`middleware`].

pub mod middleware;
mod token;

pub use token::TokenRegistry;

use crate::engine::WalletService;
use crate::error::CoreError;

/// Exchange the wallet password for a bearer token.
pub fn authenticate(
    wallet: &dyn WalletService,
    tokens: &TokenRegistry,
    password: &str,
) -> Result<String, CoreError> {
    if !wallet.is_wallet_ready() {
        return Err(CoreError::WalletNotReady("Wallet is not ready".to_string()));
    }
    if !wallet.is_encrypted() {
        return Err(CoreError::Unauthorized(
            "Wallet is not encrypted, authentication is disabled".to_string(),
        ));
    }
    if !wallet.check_password(password) {
        return Err(CoreError::Unauthorized("Invalid password".to_string()));
    }
    tracing::info!("password accepted, issuing api token");
    Ok(tokens.issue())
}

/// Change (or set) the wallet password. A fresh token replaces the current
/// one, so the caller stays authenticated while any other holder is cut off.
pub fn change_password(
    wallet: &dyn WalletService,
    tokens: &TokenRegistry,
    old_password: Option<&str>,
    new_password: &str,
) -> Result<String, CoreError> {
    if !wallet.is_wallet_ready() {
        return Err(CoreError::WalletNotReady("Wallet is not ready".to_string()));
    }
    if new_password.is_empty() {
        return Err(CoreError::validation("New password must not be empty"));
    }
    wallet
        .set_password(old_password, new_password)
        .map_err(CoreError::Unauthorized)?;
    Ok(tokens.issue())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryEngine;

    #[test]
    fn authentication_against_an_unencrypted_wallet_is_unauthorized() {
        let engine = MemoryEngine::new();
        let tokens = TokenRegistry::new();
        assert!(matches!(
            authenticate(&engine, &tokens, "pw"),
            Err(CoreError::Unauthorized(_))
        ));
    }

    #[test]
    fn wrong_password_is_unauthorized() {
        let engine = MemoryEngine::new();
        engine.set_encrypted_password("correct");
        let tokens = TokenRegistry::new();
        assert!(matches!(
            authenticate(&engine, &tokens, "wrong"),
            Err(CoreError::Unauthorized(_))
        ));
        assert!(!tokens.is_valid(""));
    }

    #[test]
    fn a_second_login_invalidates_the_first_token() {
        let engine = MemoryEngine::new();
        engine.set_encrypted_password("pw");
        let tokens = TokenRegistry::new();

        let first = authenticate(&engine, &tokens, "pw").unwrap();
        let second = authenticate(&engine, &tokens, "pw").unwrap();
        assert!(tokens.is_valid(&second));
        assert!(!tokens.is_valid(&first));
    }

    #[test]
    fn authentication_waits_for_wallet_readiness() {
        let engine = MemoryEngine::new();
        engine.set_wallet_ready(false);
        let tokens = TokenRegistry::new();
        assert!(matches!(
            authenticate(&engine, &tokens, "pw"),
            Err(CoreError::WalletNotReady(_))
        ));
    }

    #[test]
    fn changing_the_password_swaps_in_a_replacement_token() {
        let engine = MemoryEngine::new();
        engine.set_encrypted_password("old");
        let tokens = TokenRegistry::new();

        let token = authenticate(&engine, &tokens, "old").unwrap();
        let replacement = change_password(&engine, &tokens, Some("old"), "new").unwrap();
        // The caller keeps a valid session without re-authenticating; the
        // previous token is dead.
        assert!(tokens.is_valid(&replacement));
        assert!(!tokens.is_valid(&token));

        assert!(matches!(
            authenticate(&engine, &tokens, "old"),
            Err(CoreError::Unauthorized(_))
        ));
        let fresh = authenticate(&engine, &tokens, "new").unwrap();
        assert!(tokens.is_valid(&fresh));
    }

    #[test]
    fn change_password_rejects_a_wrong_old_password() {
        let engine = MemoryEngine::new();
        engine.set_encrypted_password("old");
        let tokens = TokenRegistry::new();
        assert!(matches!(
            change_password(&engine, &tokens, Some("bogus"), "new"),
            Err(CoreError::Unauthorized(_))
        ));
    }

    #[test]
    fn an_unencrypted_wallet_can_set_an_initial_password() {
        let engine = MemoryEngine::new();
        let tokens = TokenRegistry::new();
        let issued = change_password(&engine, &tokens, None, "first").unwrap();
        assert!(tokens.is_valid(&issued));
        let token = authenticate(&engine, &tokens, "first").unwrap();
        assert!(tokens.is_valid(&token));
    }
}
