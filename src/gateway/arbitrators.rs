// SPDX-License-Identifier: AGPL-3.0-or-later

//! Arbitrator registration and selection.

use chrono::Utc;

use crate::bridge::completion;
use crate::engine::{AddressContext, Arbitrator};
use crate::error::CoreError;

use super::TradeGateway;

impl TradeGateway {
    /// Known arbitrators, optionally restricted to the ones this node has
    /// accepted for its trades.
    pub fn arbitrators(&self, accepted_only: bool) -> Vec<Arbitrator> {
        if accepted_only {
            self.engine.arbitrators.accepted_arbitrators()
        } else {
            self.engine.arbitrators.arbitrators()
        }
    }

    /// Register this node as an arbitrator for the given languages.
    pub async fn register_arbitrator(
        &self,
        language_codes: Vec<String>,
        registration_key: &str,
    ) -> Result<Arbitrator, CoreError> {
        if language_codes.is_empty() {
            return Err(CoreError::validation(
                "At least one language code is required",
            ));
        }
        let node_address = self.engine.node.own_address().ok_or_else(|| {
            CoreError::WalletNotReady("Node address not yet available".to_string())
        })?;
        let registration_signature = self
            .engine
            .arbitrators
            .sign_registration_key(registration_key)
            .ok_or_else(|| CoreError::validation("Invalid arbitrator registration key"))?;
        let deposit_address = self
            .engine
            .wallet
            .get_or_create_address_entry(AddressContext::Arbitrator)
            .address;

        let arbitrator = Arbitrator {
            node_address,
            language_codes,
            deposit_address,
            registration_signature,
            registered_at: Utc::now().timestamp_millis(),
        };
        tracing::info!(node_address = %arbitrator.node_address, "registering arbitrator");

        let (completer, done) = completion();
        self.engine
            .arbitrators
            .add_arbitrator(arbitrator.clone(), completer);
        done.resolve().await.map_err(CoreError::from_engine)?;
        Ok(arbitrator)
    }

    /// Accept an arbitrator for our trades. Returns the accepted set.
    pub fn select_arbitrator(&self, node_address: &str) -> Result<Vec<Arbitrator>, CoreError> {
        let arbitrator = self
            .engine
            .arbitrators
            .arbitrator_by_address(node_address)
            .ok_or_else(|| CoreError::not_found(format!("Arbitrator not found: {node_address}")))?;
        if self.engine.arbitrators.is_own_registration(&arbitrator) {
            return Err(CoreError::validation(
                "You cannot select yourself as an arbitrator",
            ));
        }
        self.engine.arbitrators.accept_arbitrator(node_address);
        Ok(self.engine.arbitrators.accepted_arbitrators())
    }

    /// Stop using an arbitrator for our trades. Returns the accepted set.
    pub fn deselect_arbitrator(&self, node_address: &str) -> Result<Vec<Arbitrator>, CoreError> {
        if self
            .engine
            .arbitrators
            .arbitrator_by_address(node_address)
            .is_none()
        {
            return Err(CoreError::not_found(format!(
                "Arbitrator not found: {node_address}"
            )));
        }
        self.engine.arbitrators.reject_arbitrator(node_address);
        Ok(self.engine.arbitrators.accepted_arbitrators())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::gateway;
    use super::*;
    use crate::engine::memory::EngineCall;

    fn sample_arbitrator(node_address: &str) -> Arbitrator {
        Arbitrator {
            node_address: node_address.to_string(),
            language_codes: vec!["en".to_string()],
            deposit_address: "arb-deposit".to_string(),
            registration_signature: "sig:test".to_string(),
            registered_at: 0,
        }
    }

    #[tokio::test]
    async fn registration_signs_the_key_and_reaches_the_engine() {
        let (engine, gateway) = gateway();
        let arbitrator = gateway
            .register_arbitrator(vec!["en".into(), "de".into()], "regkey")
            .await
            .unwrap();
        assert_eq!(arbitrator.node_address, "gw.onion:9999");
        assert_eq!(arbitrator.registration_signature, "sig:regkey");
        assert!(!arbitrator.deposit_address.is_empty());
        assert_eq!(
            engine.recorded_calls(),
            vec![EngineCall::AddArbitrator {
                node_address: "gw.onion:9999".into()
            }]
        );
        assert_eq!(gateway.arbitrators(false).len(), 1);
    }

    #[tokio::test]
    async fn registration_requires_languages_and_a_valid_key() {
        let (engine, gateway) = gateway();
        assert!(matches!(
            gateway.register_arbitrator(Vec::new(), "regkey").await,
            Err(CoreError::ValidationFailed(_))
        ));
        assert!(matches!(
            gateway.register_arbitrator(vec!["en".into()], "").await,
            Err(CoreError::ValidationFailed(_))
        ));
        assert!(engine.recorded_calls().is_empty());
    }

    #[test]
    fn selecting_an_unknown_arbitrator_is_not_found() {
        let (_engine, gateway) = gateway();
        assert!(matches!(
            gateway.select_arbitrator("nobody.onion:9999"),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn selecting_yourself_is_rejected() {
        let (engine, gateway) = gateway();
        engine.insert_arbitrator(sample_arbitrator("gw.onion:9999"));
        assert!(matches!(
            gateway.select_arbitrator("gw.onion:9999"),
            Err(CoreError::ValidationFailed(_))
        ));
        assert!(gateway.arbitrators(true).is_empty());
    }

    #[test]
    fn select_and_deselect_round_trip() {
        let (engine, gateway) = gateway();
        engine.insert_arbitrator(sample_arbitrator("other.onion:9999"));

        let accepted = gateway.select_arbitrator("other.onion:9999").unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].node_address, "other.onion:9999");

        let accepted = gateway.deselect_arbitrator("other.onion:9999").unwrap();
        assert!(accepted.is_empty());
    }
}
