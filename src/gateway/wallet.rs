// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wallet read path: balance aggregation, address listing and allocation,
//! plus the withdraw operation.
//!
//! Balances are classified by walking the three independent trade
//! collections (open offers, active trades, closed/failed trades) and the
//! wallet's address bookkeeping. Summation is commutative; an entry with no
//! resolvable balance contributes zero.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bridge::completion;
use crate::engine::{AddressContext, AddressEntry};
use crate::error::CoreError;

use super::TradeGateway;

/// Wallet balance split by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct WalletDetails {
    /// Spendable balance reported by the wallet.
    pub available_balance: u64,
    /// On-chain balance of addresses reserved for still-open offers.
    pub reserved_balance: u64,
    /// Coin value locked in multi-sig escrow across active, closed and
    /// failed trades.
    pub locked_balance: u64,
}

/// Externally-consumable view of one address entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WalletAddressRecord {
    pub address: String,
    /// On-chain balance, except multi-sig entries which report the amount
    /// locked in escrow.
    pub balance: u64,
    /// Confirmation depth; 0 when no confidence data exists yet.
    pub confirmations: u32,
    pub context: AddressContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,
}

/// Address listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressPurpose {
    ReceiveFunds,
    ReservedFunds,
    LockedFunds,
    SendFunds,
}

/// Plain-data withdraw request.
#[derive(Debug, Clone)]
pub struct WithdrawSpec {
    pub source_addresses: Vec<String>,
    pub amount: u64,
    /// When true the mining fee is added on top of `amount`; otherwise it is
    /// taken out of it.
    pub fee_excluded: bool,
    pub target_address: String,
}

impl TradeGateway {
    /// Aggregate wallet balances into available / reserved / locked.
    pub fn wallet_details(&self) -> Result<WalletDetails, CoreError> {
        if !self.engine.wallet.is_wallet_ready() {
            return Err(CoreError::WalletNotReady("Wallet is not ready".to_string()));
        }
        Ok(WalletDetails {
            available_balance: self.engine.wallet.available_balance(),
            reserved_balance: self.reserved_balance(),
            locked_balance: self.locked_balance(),
        })
    }

    /// Sum of multi-sig escrow values across the three trade collections.
    fn locked_balance(&self) -> u64 {
        let active = self.engine.trades.locked_trade_ids();
        let closed = self.engine.closed_trades.locked_trade_ids();
        let failed = self.engine.failed_trades.locked_trade_ids();
        closed
            .into_iter()
            .chain(failed)
            .chain(active)
            .map(|trade_id| {
                self.engine
                    .wallet
                    .address_entry(&trade_id, AddressContext::MultiSig)
                    .map(|entry| entry.coin_locked_in_multi_sig)
                    .unwrap_or(0)
            })
            .sum()
    }

    /// Sum of on-chain balances of reserved-for-offer addresses, one per
    /// still-open offer.
    fn reserved_balance(&self) -> u64 {
        self.engine
            .open_offers
            .open_offers()
            .into_iter()
            .filter_map(|open_offer| {
                self.engine
                    .wallet
                    .address_entry(&open_offer.id, AddressContext::ReservedForTrade)
            })
            .map(|entry| self.engine.wallet.balance_for_address(&entry.address))
            .sum()
    }

    /// List address entries for a purpose; all entries when no purpose is
    /// given.
    pub fn wallet_addresses(&self, purpose: Option<AddressPurpose>) -> Vec<WalletAddressRecord> {
        let entries: Vec<AddressEntry> = match purpose {
            Some(AddressPurpose::ReceiveFunds) => self.engine.wallet.available_address_entries(),
            Some(AddressPurpose::ReservedFunds) => self
                .engine
                .open_offers
                .open_offers()
                .into_iter()
                .filter_map(|open_offer| {
                    self.engine
                        .wallet
                        .address_entry(&open_offer.id, AddressContext::ReservedForTrade)
                })
                .collect(),
            Some(AddressPurpose::LockedFunds) => self
                .engine
                .trades
                .locked_trade_ids()
                .into_iter()
                .filter_map(|trade_id| {
                    self.engine
                        .wallet
                        .address_entry(&trade_id, AddressContext::MultiSig)
                })
                .collect(),
            Some(AddressPurpose::SendFunds) => self
                .engine
                .wallet
                .address_entries()
                .into_iter()
                .filter(|entry| is_withdrawable_context(entry.context))
                .collect(),
            None => self.engine.wallet.address_entries(),
        };
        entries
            .into_iter()
            .map(|entry| self.to_address_record(entry))
            .collect()
    }

    /// Obtain or create an address for a purpose. With `reuse_unused` an
    /// existing unused entry of that context is preferred; otherwise the
    /// canonical entry for the context is returned.
    pub fn get_or_create_address(
        &self,
        context: AddressContext,
        reuse_unused: bool,
    ) -> WalletAddressRecord {
        let entry = if reuse_unused {
            self.engine.wallet.get_or_create_unused_address_entry(context)
        } else {
            self.engine.wallet.get_or_create_address_entry(context)
        };
        self.to_address_record(entry)
    }

    fn to_address_record(&self, entry: AddressEntry) -> WalletAddressRecord {
        let balance = if entry.context == AddressContext::MultiSig {
            entry.coin_locked_in_multi_sig
        } else {
            self.engine.wallet.balance_for_address(&entry.address)
        };
        WalletAddressRecord {
            balance,
            confirmations: self.engine.wallet.confirmations_for_address(&entry.address),
            address: entry.address,
            context: entry.context,
            offer_id: entry.offer_id,
        }
    }

    /// Send funds from a set of our addresses to a target address. Only
    /// available and trade-payout addresses may be spent from. Returns the
    /// transaction id.
    pub async fn withdraw_funds(&self, spec: WithdrawSpec) -> Result<String, CoreError> {
        if spec.source_addresses.is_empty() {
            return Err(CoreError::validation(
                "List of source addresses must not be empty",
            ));
        }
        if spec.amount == 0 {
            return Err(CoreError::validation("Senders amount must be positive"));
        }
        if spec.target_address.trim().is_empty() {
            return Err(CoreError::validation("Invalid target address"));
        }

        let all_entries = self.engine.wallet.address_entries();
        let selected: Vec<AddressEntry> = spec
            .source_addresses
            .iter()
            .filter_map(|address| {
                all_entries
                    .iter()
                    .find(|entry| &entry.address == address)
                    .cloned()
            })
            .collect();
        let offenders: Vec<&str> = selected
            .iter()
            .filter(|entry| !is_withdrawable_context(entry.context))
            .map(|entry| entry.address.as_str())
            .collect();
        if !offenders.is_empty() {
            return Err(CoreError::validation(format!(
                "Only addresses with context AVAILABLE and TRADE_PAYOUT can be used: {}",
                offenders.join(", ")
            )));
        }

        let fee = self.estimate_withdraw_fee(&spec.source_addresses, spec.amount)?;
        let (senders_amount, receiver_amount, fee) = if spec.fee_excluded {
            // The sender pays the fee on top, which changes the spend and so
            // the fee itself; estimate once more against the grossed-up
            // amount.
            let grossed_up = spec.amount.checked_add(fee).ok_or_else(|| {
                CoreError::AmountTooHigh("Amount plus fee overflows".to_string())
            })?;
            let fee = self.estimate_withdraw_fee(&spec.source_addresses, grossed_up)?;
            let senders_amount = spec.amount.checked_add(fee).ok_or_else(|| {
                CoreError::AmountTooHigh("Amount plus fee overflows".to_string())
            })?;
            (senders_amount, spec.amount, fee)
        } else {
            if fee >= spec.amount {
                return Err(CoreError::AmountTooLow(format!(
                    "Amount {} does not cover the mining fee {fee}",
                    spec.amount
                )));
            }
            (spec.amount, spec.amount - fee, fee)
        };

        let total_selected: u64 = selected
            .iter()
            .map(|entry| self.engine.wallet.balance_for_address(&entry.address))
            .sum();
        if senders_amount > total_selected {
            return Err(CoreError::InsufficientFunds(
                "Not enough funds in selected addresses".to_string(),
            ));
        }

        tracing::info!(
            target_address = %spec.target_address,
            amount = receiver_amount,
            fee,
            "withdrawing funds"
        );
        let (completer, done) = completion();
        self.engine.wallet.send_funds(
            spec.source_addresses,
            &spec.target_address,
            receiver_amount,
            fee,
            completer,
        );
        let tx_id = done.resolve().await.map_err(CoreError::from_engine)?;

        // A withdrawal may drain payout addresses of completed trades; those
        // trades are finished and belong in the closed collection.
        for trade in self.engine.trades.trades() {
            if !trade.state.is_payout_published() {
                continue;
            }
            let drained = self
                .engine
                .wallet
                .address_entry(&trade.id, AddressContext::TradePayout)
                .map(|entry| self.engine.wallet.balance_for_address(&entry.address) == 0)
                .unwrap_or(false);
            if drained {
                self.engine.trades.move_trade_to_closed(&trade.id);
            }
        }
        Ok(tx_id)
    }

    fn estimate_withdraw_fee(&self, sources: &[String], amount: u64) -> Result<u64, CoreError> {
        self.engine
            .wallet
            .estimate_tx_fee(sources, amount)
            .map_err(|message| {
                if message.to_lowercase().contains("dust") {
                    CoreError::AmountTooLow(message)
                } else {
                    CoreError::Unexpected(message)
                }
            })
    }
}

fn is_withdrawable_context(context: AddressContext) -> bool {
    matches!(
        context,
        AddressContext::Available | AddressContext::TradePayout
    )
}

#[cfg(test)]
mod tests {
    use super::super::tests::{gateway, sample_offer};
    use super::*;
    use crate::engine::memory::{EngineCall, TradeRoleSeed};
    use crate::engine::{Direction, TradeState};

    #[test]
    fn wallet_details_requires_a_ready_wallet() {
        let (engine, gateway) = gateway();
        engine.set_wallet_ready(false);
        assert!(matches!(
            gateway.wallet_details(),
            Err(CoreError::WalletNotReady(_))
        ));
    }

    #[test]
    fn balances_are_classified_across_the_three_collections() {
        let (engine, gateway) = gateway();
        engine.set_available_balance(1_000);

        // One open offer reserving address A with balance 50.
        engine.insert_open_offer(sample_offer("offer-a", Direction::Sell), "addr-a");
        engine.set_address_balance("addr-a", 50);

        // One active trade locking 30 in multi-sig.
        engine.insert_trade(
            "trade-b",
            sample_offer("trade-b", Direction::Sell),
            TradeState::DepositConfirmedInBlockchain,
            TradeRoleSeed::TakerAsBuyer,
        );
        engine.lock_trade_funds("trade-b", "addr-b", 30);

        let details = gateway.wallet_details().unwrap();
        assert_eq!(details.available_balance, 1_000);
        assert_eq!(details.reserved_balance, 50);
        assert_eq!(details.locked_balance, 30);
    }

    #[test]
    fn locked_balance_sums_active_closed_and_failed_sources() {
        let (engine, gateway) = gateway();
        engine.set_available_balance(0);

        engine.insert_trade(
            "t-active",
            sample_offer("t-active", Direction::Sell),
            TradeState::FiatPaymentInitiated,
            TradeRoleSeed::TakerAsBuyer,
        );
        engine.lock_trade_funds("t-active", "addr-1", 10);

        engine.insert_closed_locked_trade("t-closed");
        engine.lock_trade_funds("t-closed", "addr-2", 20);

        engine.insert_failed_locked_trade("t-failed");
        engine.lock_trade_funds("t-failed", "addr-3", 40);

        // A locked trade id with no multi-sig entry contributes zero.
        engine.insert_failed_locked_trade("t-unresolvable");

        let details = gateway.wallet_details().unwrap();
        assert_eq!(details.locked_balance, 70);
    }

    #[test]
    fn multi_sig_records_report_escrow_value_not_chain_balance() {
        let (engine, gateway) = gateway();
        engine.insert_trade(
            "t1",
            sample_offer("t1", Direction::Sell),
            TradeState::FiatPaymentInitiated,
            TradeRoleSeed::TakerAsBuyer,
        );
        engine.lock_trade_funds("t1", "addr-ms", 77);
        engine.set_address_balance("addr-ms", 9_999);
        engine.set_confirmations("addr-ms", 3);

        let records = gateway.wallet_addresses(Some(AddressPurpose::LockedFunds));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].balance, 77);
        assert_eq!(records[0].confirmations, 3);
        assert_eq!(records[0].offer_id.as_deref(), Some("t1"));
    }

    #[test]
    fn unconfirmed_addresses_report_zero_depth() {
        let (_engine, gateway) = gateway();
        let record = gateway.get_or_create_address(AddressContext::Available, true);
        assert_eq!(record.confirmations, 0);
        assert_eq!(record.balance, 0);
    }

    #[test]
    fn canonical_allocation_is_a_singleton_per_context() {
        let (_engine, gateway) = gateway();
        let first = gateway.get_or_create_address(AddressContext::Arbitrator, false);
        let second = gateway.get_or_create_address(AddressContext::Arbitrator, false);
        assert_eq!(first.address, second.address);
    }

    #[test]
    fn unused_allocation_skips_funded_addresses() {
        let (engine, gateway) = gateway();
        let funded = gateway.get_or_create_address(AddressContext::Available, true);
        engine.set_address_balance(&funded.address, 500);
        let fresh = gateway.get_or_create_address(AddressContext::Available, true);
        assert_ne!(funded.address, fresh.address);
    }

    #[tokio::test]
    async fn withdraw_rejects_non_withdrawable_contexts() {
        let (engine, gateway) = gateway();
        engine.insert_trade(
            "t1",
            sample_offer("t1", Direction::Sell),
            TradeState::FiatPaymentInitiated,
            TradeRoleSeed::TakerAsBuyer,
        );
        engine.lock_trade_funds("t1", "addr-ms", 30);

        let err = gateway
            .withdraw_funds(WithdrawSpec {
                source_addresses: vec!["addr-ms".into()],
                amount: 10_000,
                fee_excluded: false,
                target_address: "target".into(),
            })
            .await
            .unwrap_err();
        match err {
            CoreError::ValidationFailed(message) => assert!(message.contains("addr-ms")),
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert!(engine.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn withdraw_classifies_dust_as_amount_too_low() {
        let (engine, gateway) = gateway();
        let funded = gateway.get_or_create_address(AddressContext::Available, true);
        engine.set_address_balance(&funded.address, 100_000);

        let err = gateway
            .withdraw_funds(WithdrawSpec {
                source_addresses: vec![funded.address],
                amount: 100,
                fee_excluded: false,
                target_address: "target".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountTooLow(_)));
    }

    #[tokio::test]
    async fn fee_excluded_withdraw_rejects_amounts_that_overflow_with_the_fee() {
        let (engine, gateway) = gateway();
        let funded = gateway.get_or_create_address(AddressContext::Available, true);
        engine.set_address_balance(&funded.address, 100_000);
        engine.set_tx_fee(1_000);

        let err = gateway
            .withdraw_funds(WithdrawSpec {
                source_addresses: vec![funded.address],
                amount: u64::MAX,
                fee_excluded: true,
                target_address: "target".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountTooHigh(_)));
        assert!(engine.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn withdraw_requires_funds_in_the_selected_addresses() {
        let (engine, gateway) = gateway();
        let funded = gateway.get_or_create_address(AddressContext::Available, true);
        engine.set_address_balance(&funded.address, 5_000);
        engine.set_tx_fee(1_000);

        let err = gateway
            .withdraw_funds(WithdrawSpec {
                source_addresses: vec![funded.address],
                amount: 10_000,
                fee_excluded: false,
                target_address: "target".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientFunds(_)));
        assert!(engine.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn withdraw_sends_and_sweeps_drained_payout_trades() {
        let (engine, gateway) = gateway();
        let funded = gateway.get_or_create_address(AddressContext::Available, true);
        engine.set_address_balance(&funded.address, 100_000);
        engine.set_tx_fee(1_000);

        // A completed trade whose payout address is already drained.
        engine.insert_trade(
            "t-done",
            sample_offer("t-done", Direction::Sell),
            TradeState::BuyerReceivedPayoutTxPublishedMsg,
            TradeRoleSeed::TakerAsBuyer,
        );
        engine.insert_address_entry(AddressEntry {
            address: "addr-payout".into(),
            context: AddressContext::TradePayout,
            offer_id: Some("t-done".into()),
            coin_locked_in_multi_sig: 0,
        });

        let tx_id = gateway
            .withdraw_funds(WithdrawSpec {
                source_addresses: vec![funded.address],
                amount: 50_000,
                fee_excluded: true,
                target_address: "target".into(),
            })
            .await
            .unwrap();
        assert!(!tx_id.is_empty());
        let calls = engine.recorded_calls();
        assert_eq!(
            calls,
            vec![
                EngineCall::SendFunds {
                    target_address: "target".into()
                },
                EngineCall::MoveTradeToClosed {
                    trade_id: "t-done".into()
                },
            ]
        );
    }
}
