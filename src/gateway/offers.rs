// SPDX-License-Identifier: AGPL-3.0-or-later

//! Offer operations: make, cancel, take.
//!
//! Every precondition is checked before the engine is called, so a guard
//! failure leaves no partial mutation behind. The engine's completion is
//! adapted once through the bridge and classified on failure.

use uuid::Uuid;

use crate::bridge::completion;
use crate::engine::{Direction, Offer, PriceSpec, TakeOfferParams, Trade};
use crate::error::CoreError;
use crate::fees;

use super::TradeGateway;

/// Plain-data description of an offer to publish.
#[derive(Debug, Clone)]
pub struct NewOffer {
    pub direction: Direction,
    pub amount: u64,
    pub min_amount: u64,
    pub price: PriceSpec,
    pub currency_code: String,
    pub payment_account_id: String,
    /// Maker-chosen buyer deposit; falls back to the configured default.
    pub buyer_security_deposit: Option<u64>,
    pub fund_from_wallet: bool,
}

impl TradeGateway {
    /// Build and publish an offer, reserving the maker-side funds.
    pub async fn make_offer(&self, spec: NewOffer) -> Result<Offer, CoreError> {
        if spec.min_amount > spec.amount {
            return Err(CoreError::validation(
                "Minimum amount must not exceed the offer amount",
            ));
        }
        let account = self
            .engine
            .accounts
            .account(&spec.payment_account_id)
            .ok_or_else(|| {
                CoreError::not_found(format!(
                    "Payment account not found: {}",
                    spec.payment_account_id
                ))
            })?;
        if !account.supports_currency(&spec.currency_code) {
            return Err(CoreError::validation(format!(
                "Payment account cannot settle {}",
                spec.currency_code
            )));
        }
        let maker_node_address = self.engine.node.own_address().ok_or_else(|| {
            CoreError::WalletNotReady("Node address not yet published".to_string())
        })?;

        let buyer_security_deposit = spec
            .buyer_security_deposit
            .unwrap_or_else(|| self.engine.preferences.buyer_security_deposit());
        let seller_security_deposit = self.engine.preferences.seller_security_deposit();
        let reserved_funds = fees::funds_needed_to_make_offer(
            spec.direction,
            spec.amount,
            buyer_security_deposit,
            seller_security_deposit,
        )?;

        let offer = Offer {
            id: Uuid::new_v4().to_string(),
            direction: spec.direction,
            amount: spec.amount,
            min_amount: spec.min_amount,
            price: spec.price,
            currency_code: spec.currency_code,
            maker_node_address,
            buyer_security_deposit,
            seller_security_deposit,
        };

        tracing::info!(offer_id = %offer.id, reserved_funds, "placing offer");
        let (completer, done) = completion();
        self.engine
            .open_offers
            .place_offer(offer, reserved_funds, spec.fund_from_wallet, completer);
        done.resolve().await.map_err(CoreError::from_engine)
    }

    /// Cancel one of our own open offers.
    pub async fn cancel_offer(&self, offer_id: &str) -> Result<(), CoreError> {
        if self.engine.open_offers.open_offer(offer_id).is_none() {
            return Err(CoreError::not_found(format!("Offer not found: {offer_id}")));
        }
        let (completer, done) = completion();
        self.engine.open_offers.cancel_offer(offer_id, completer);
        done.resolve().await.map_err(CoreError::from_engine)
    }

    /// Take an offer. All admissibility checks run before the engine call:
    /// the offer exists, is not our own, the payment account exists and can
    /// settle the offer currency, and the spendable balance covers the
    /// computed funds needed.
    pub async fn take_offer(
        &self,
        offer_id: &str,
        payment_account_id: &str,
        amount: u64,
        fund_from_wallet: bool,
    ) -> Result<Trade, CoreError> {
        let offer = self.offer(offer_id)?;

        let own_address = self.engine.node.own_address().ok_or_else(|| {
            CoreError::WalletNotReady("Node address not yet published".to_string())
        })?;
        if own_address == offer.maker_node_address {
            return Err(CoreError::validation(
                "Taker's address same as maker's",
            ));
        }

        let account = self
            .engine
            .accounts
            .account(payment_account_id)
            .ok_or_else(|| {
                CoreError::not_found(format!(
                    "Payment account not found: {payment_account_id}"
                ))
            })?;
        if !account.supports_currency(&offer.currency_code) {
            return Err(CoreError::validation(format!(
                "Payment account is not valid for offer, needs {}",
                offer.currency_code
            )));
        }

        let fee_in_base_coin = fees::taker_fee_in_base_coin(
            self.engine.preferences.pay_fee_in_base_coin(),
            amount,
            self.engine.fees.taker_fee_schedule(false),
            self.engine.fee_token_wallet.available_balance(),
        );
        let taker_fee =
            fees::required_taker_fee(amount, self.engine.fees.taker_fee_schedule(fee_in_base_coin))?;
        // Quote for the standard trade transaction size.
        let tx_fee = self.engine.fees.tx_fee(600);
        let funds_needed = fees::funds_needed_to_take_offer(&offer, amount, tx_fee)?;

        let available = self.engine.wallet.available_balance();
        if available < funds_needed {
            return Err(CoreError::InsufficientFunds(format!(
                "Available balance {available} is less than needed amount: {funds_needed}"
            )));
        }

        // Market-priced offers are re-priced by the engine at execution.
        let trade_price = match offer.price {
            PriceSpec::Fixed(price) => price,
            PriceSpec::MarketMargin(_) => 0,
        };

        tracing::info!(offer_id, amount, funds_needed, taker_fee, "taking offer");
        let (completer, done) = completion();
        self.engine.trades.take_offer(
            TakeOfferParams {
                offer,
                amount,
                tx_fee,
                taker_fee,
                fee_in_base_coin,
                trade_price,
                funds_needed,
                payment_account_id: payment_account_id.to_string(),
                fund_from_wallet,
            },
            completer,
        );
        done.resolve().await.map_err(CoreError::from_engine)
    }
}
