// SPDX-License-Identifier: AGPL-3.0-or-later

//! # API Data Models
//!
//! Request and response structures of the REST surface. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and OpenAPI
//! documentation. Amounts cross this boundary as integer smallest-unit
//! (satoshi) values.
//!
//! Response bodies reuse the domain types where they serialize cleanly
//! ([`Offer`], [`Arbitrator`], `WalletAddressRecord`); trades carry protocol
//! drivers and are flattened into [`TradeDetail`] instead. Collections are
//! wrapped in `{items, total}` envelopes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::{
    AddressContext, Arbitrator, ClosedTrade, Direction, Offer, PriceSpec, Trade, TradeState,
};
use crate::gateway::{NewOffer, WalletAddressRecord, WithdrawSpec};

// =============================================================================
// Authentication
// =============================================================================

/// Login request carrying the wallet password.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AuthRequest {
    pub password: String,
}

/// Issued bearer token.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResult {
    pub token: String,
}

/// Request to set or change the wallet password.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    /// Current password; omit when the wallet is not yet encrypted.
    pub old_password: Option<String>,
    pub new_password: String,
}

// =============================================================================
// Offers
// =============================================================================

/// Request to publish a new offer.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MakeOfferRequest {
    pub direction: Direction,
    pub amount: u64,
    pub min_amount: u64,
    pub price: PriceSpec,
    pub currency_code: String,
    pub payment_account_id: String,
    /// Maker-chosen buyer deposit; defaults to the configured value.
    pub buyer_security_deposit: Option<u64>,
    #[serde(default)]
    pub fund_from_wallet: bool,
}

impl From<MakeOfferRequest> for NewOffer {
    fn from(request: MakeOfferRequest) -> Self {
        NewOffer {
            direction: request.direction,
            amount: request.amount,
            min_amount: request.min_amount,
            price: request.price,
            currency_code: request.currency_code,
            payment_account_id: request.payment_account_id,
            buyer_security_deposit: request.buyer_security_deposit,
            fund_from_wallet: request.fund_from_wallet,
        }
    }
}

/// Request to take an existing offer.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TakeOfferRequest {
    pub payment_account_id: String,
    pub amount: u64,
    #[serde(default)]
    pub fund_from_wallet: bool,
}

/// Offer collection envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OfferList {
    pub items: Vec<Offer>,
    pub total: usize,
}

impl From<Vec<Offer>> for OfferList {
    fn from(items: Vec<Offer>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

// =============================================================================
// Trades
// =============================================================================

/// One trade, flattened for transport: the protocol driver is reduced to its
/// role label.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TradeDetail {
    pub id: String,
    pub offer: Offer,
    pub state: TradeState,
    /// Our role in the trade, e.g. `MAKER_AS_BUYER`.
    pub role: String,
}

impl From<&Trade> for TradeDetail {
    fn from(trade: &Trade) -> Self {
        Self {
            id: trade.id.clone(),
            offer: trade.offer.clone(),
            state: trade.state,
            role: trade.driver.label().to_string(),
        }
    }
}

/// Trade collection envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TradeList {
    pub items: Vec<TradeDetail>,
    pub total: usize,
}

impl From<Vec<TradeDetail>> for TradeList {
    fn from(items: Vec<TradeDetail>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

/// Closed-trade collection envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClosedTradeList {
    pub items: Vec<ClosedTrade>,
    pub total: usize,
}

impl From<Vec<ClosedTrade>> for ClosedTradeList {
    fn from(items: Vec<ClosedTrade>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

// =============================================================================
// Wallet
// =============================================================================

/// Address collection envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletAddressList {
    pub items: Vec<WalletAddressRecord>,
    pub total: usize,
}

impl From<Vec<WalletAddressRecord>> for WalletAddressList {
    fn from(items: Vec<WalletAddressRecord>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

/// Request to allocate (or look up) a wallet address.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAddressRequest {
    pub context: AddressContext,
    /// Prefer an existing unused address of the context over the canonical
    /// one.
    #[serde(default)]
    pub unused: bool,
}

/// Request to send funds out of the wallet.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    pub source_addresses: Vec<String>,
    pub amount: u64,
    /// When true the mining fee is added on top of `amount` instead of being
    /// deducted from it.
    #[serde(default)]
    pub fee_excluded: bool,
    pub target_address: String,
}

impl From<WithdrawRequest> for WithdrawSpec {
    fn from(request: WithdrawRequest) -> Self {
        WithdrawSpec {
            source_addresses: request.source_addresses,
            amount: request.amount,
            fee_excluded: request.fee_excluded,
            target_address: request.target_address,
        }
    }
}

// =============================================================================
// Arbitrators
// =============================================================================

/// Request to register this node as an arbitrator.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterArbitratorRequest {
    pub language_codes: Vec<String>,
    pub registration_key: String,
}

/// Arbitrator collection envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArbitratorList {
    pub items: Vec<Arbitrator>,
    pub total: usize,
}

impl From<Vec<Arbitrator>> for ArbitratorList {
    fn from(items: Vec<Arbitrator>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}
