// SPDX-License-Identifier: AGPL-3.0-or-later

//! The trade gateway core.
//!
//! [`TradeGateway`] is the single entry point the HTTP layer talks to. It
//! owns the engine capability handles and carries the non-trivial logic of
//! this service: lifecycle guards, fee/funding computation, balance
//! aggregation and callback bridging. No transport types cross this
//! boundary; operations take plain data and return domain values or
//! [`CoreError`].

use crate::engine::{ClosedTrade, Engine, Offer, Trade};
use crate::error::CoreError;

mod arbitrators;
mod offers;
mod trades;
mod wallet;

pub use offers::NewOffer;
pub use wallet::{AddressPurpose, WalletAddressRecord, WalletDetails, WithdrawSpec};

pub struct TradeGateway {
    engine: Engine,
}

impl TradeGateway {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    /// All offers currently in the shared offer book.
    pub fn offers(&self) -> Vec<Offer> {
        self.engine.offer_book.offers()
    }

    /// Look up an offer by id.
    pub fn offer(&self, offer_id: &str) -> Result<Offer, CoreError> {
        self.engine
            .offer_book
            .offers()
            .into_iter()
            .find(|offer| offer.id == offer_id)
            .ok_or_else(|| CoreError::not_found(format!("Offer not found: {offer_id}")))
    }

    /// All active trades.
    pub fn trades(&self) -> Vec<Trade> {
        self.engine.trades.trades()
    }

    /// Fresh snapshot of one trade. Re-read on every guarded call; the
    /// engine advances trade state asynchronously.
    pub fn trade(&self, trade_id: &str) -> Result<Trade, CoreError> {
        self.engine
            .trades
            .trades()
            .into_iter()
            .find(|trade| trade.id == trade_id)
            .ok_or_else(|| CoreError::not_found(format!("Trade not found: {trade_id}")))
    }

    /// Terminal trades from the closed collection.
    pub fn closed_trades(&self) -> Vec<ClosedTrade> {
        self.engine.closed_trades.trades()
    }
}
