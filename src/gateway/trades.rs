// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trade lifecycle guard.
//!
//! Each mutating trade action is admissible only in exactly the protocol
//! state that precedes it, and only for the role variants that own the
//! capability. State is re-read from the engine on every call; the check and
//! the marshalled execution are not atomic as a pair, the engine re-validates
//! internally before acting.

use crate::bridge::completion;
use crate::engine::{AddressContext, TradeState};
use crate::error::CoreError;

use super::TradeGateway;

impl TradeGateway {
    /// Buyer announces the fiat payment has been started. Admissible only in
    /// `DepositConfirmedInBlockchain`, and only for buyer role variants.
    pub async fn start_payment(&self, trade_id: &str) -> Result<(), CoreError> {
        let trade = self.trade(trade_id)?;
        if trade.state != TradeState::DepositConfirmedInBlockchain {
            return Err(CoreError::validation(format!(
                "Trade is not in the correct state to start payment: {:?}",
                trade.state
            )));
        }
        let Some(buyer) = trade.driver.buyer() else {
            return Err(CoreError::validation(format!(
                "Only the buyer can start the payment, this trade's role is {}",
                trade.driver.label()
            )));
        };
        let (completer, done) = completion();
        buyer.start_fiat_payment(completer);
        done.resolve().await.map_err(CoreError::from_engine)
    }

    /// Seller acknowledges receipt of the fiat payment. Admissible only in
    /// `SellerReceivedFiatPaymentInitiatedMsg`, and only for seller role
    /// variants.
    pub async fn confirm_payment_received(&self, trade_id: &str) -> Result<(), CoreError> {
        let trade = self.trade(trade_id)?;
        if trade.state != TradeState::SellerReceivedFiatPaymentInitiatedMsg {
            return Err(CoreError::validation(format!(
                "Trade is not in the correct state to receive payment: {:?}",
                trade.state
            )));
        }
        let Some(seller) = trade.driver.seller() else {
            return Err(CoreError::validation(format!(
                "Only the seller can confirm payment received, this trade's role is {}",
                trade.driver.label()
            )));
        };
        let (completer, done) = completion();
        seller.confirm_fiat_payment_received(completer);
        done.resolve().await.map_err(CoreError::from_engine)
    }

    /// Sweep a completed trade's payout into the main wallet: reclassify the
    /// trade-payout address entry back to available and move the trade into
    /// the closed collection. Admissible only once the payout transaction is
    /// observed published, from either side.
    pub fn sweep_to_main_wallet(&self, trade_id: &str) -> Result<(), CoreError> {
        let trade = self.trade(trade_id)?;
        if !trade.state.is_payout_published() {
            return Err(CoreError::validation(format!(
                "Trade is not in the correct state to transfer funds out: {:?}",
                trade.state
            )));
        }
        self.engine
            .wallet
            .swap_trade_entry_to_available(&trade.id, AddressContext::TradePayout);
        self.engine.trades.move_trade_to_closed(&trade.id);
        Ok(())
    }
}
