// SPDX-License-Identifier: AGPL-3.0-or-later

//! Interface contracts of the external trading engine.
//!
//! The engine (offer book, multi-party trade protocol, deterministic wallet,
//! P2P transport) is owned and driven elsewhere; this module only names the
//! narrow capabilities the gateway consumes. Implementations are responsible
//! for marshalling mutating calls onto the engine's single internal execution
//! context — the gateway never mutates engine state from the caller's thread,
//! it hands a [`Completer`] in and consumes the matching completion.
//!
//! Collection reads (`offers`, `trades`, address entries) return owned
//! snapshots so aggregation can run on the caller's thread without racing
//! the engine's own iteration.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bridge::Completer;

pub mod memory;

/// Smallest-unit value of one whole coin.
pub const COIN: u64 = 100_000_000;

/// Offer direction as published by the maker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

/// Offer price: fixed, or a percentage distance from the market price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriceSpec {
    Fixed(u64),
    MarketMargin(f64),
}

/// A published offer. Immutable once placed in the offer book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Offer {
    pub id: String,
    pub direction: Direction,
    /// Trade amount in smallest units.
    pub amount: u64,
    pub min_amount: u64,
    pub price: PriceSpec,
    /// Counter currency of the pair, e.g. "EUR".
    pub currency_code: String,
    /// Network address of the maker node that owns the offer.
    pub maker_node_address: String,
    pub buyer_security_deposit: u64,
    pub seller_security_deposit: u64,
}

impl Offer {
    /// Security deposit the taker has to lock, determined by the side the
    /// taker ends up on.
    pub fn taker_security_deposit(&self) -> u64 {
        match self.direction {
            // Taking a SELL offer makes the taker the buyer.
            Direction::Sell => self.buyer_security_deposit,
            Direction::Buy => self.seller_security_deposit,
        }
    }

    pub fn is_buy_offer(&self) -> bool {
        self.direction == Direction::Buy
    }
}

/// An offer of our own that is still open, reserving funds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOffer {
    pub id: String,
}

/// Trade protocol states, in protocol order. The engine advances these
/// asynchronously in response to peer messages; the gateway only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeState {
    DepositPublished,
    DepositConfirmedInBlockchain,
    FiatPaymentInitiated,
    SellerReceivedFiatPaymentInitiatedMsg,
    FiatPaymentReceived,
    BuyerReceivedPayoutTxPublishedMsg,
    SellerSawArrivedPayoutTxPublishedMsg,
    WithdrawCompleted,
}

impl TradeState {
    /// Every protocol state, for exhaustive admissibility checks.
    pub const ALL: [TradeState; 8] = [
        TradeState::DepositPublished,
        TradeState::DepositConfirmedInBlockchain,
        TradeState::FiatPaymentInitiated,
        TradeState::SellerReceivedFiatPaymentInitiatedMsg,
        TradeState::FiatPaymentReceived,
        TradeState::BuyerReceivedPayoutTxPublishedMsg,
        TradeState::SellerSawArrivedPayoutTxPublishedMsg,
        TradeState::WithdrawCompleted,
    ];

    /// True in either payout-observed state, buyer-side or seller-side.
    pub fn is_payout_published(self) -> bool {
        matches!(
            self,
            TradeState::BuyerReceivedPayoutTxPublishedMsg
                | TradeState::SellerSawArrivedPayoutTxPublishedMsg
        )
    }
}

/// Buyer-side protocol operations. Implemented by the engine for the two
/// buyer role variants.
pub trait BuyerProtocol: Send + Sync {
    /// Announce that the fiat payment has been started.
    fn start_fiat_payment(&self, done: Completer<()>);
}

/// Seller-side protocol operations. Implemented by the engine for the two
/// seller role variants.
pub trait SellerProtocol: Send + Sync {
    /// Acknowledge receipt of the buyer's fiat payment.
    fn confirm_fiat_payment_received(&self, done: Completer<()>);
}

/// Role-specific protocol driver attached to a trade.
///
/// Each variant carries only the operations valid for that role, so the
/// lifecycle guard dispatches on the tag instead of downcasting.
#[derive(Clone)]
pub enum RoleDriver {
    MakerAsBuyer(Arc<dyn BuyerProtocol>),
    TakerAsBuyer(Arc<dyn BuyerProtocol>),
    MakerAsSeller(Arc<dyn SellerProtocol>),
    TakerAsSeller(Arc<dyn SellerProtocol>),
}

impl RoleDriver {
    /// The buyer-side protocol, if this trade's role is a buyer variant.
    pub fn buyer(&self) -> Option<&dyn BuyerProtocol> {
        match self {
            RoleDriver::MakerAsBuyer(protocol) | RoleDriver::TakerAsBuyer(protocol) => {
                Some(protocol.as_ref())
            }
            _ => None,
        }
    }

    /// The seller-side protocol, if this trade's role is a seller variant.
    pub fn seller(&self) -> Option<&dyn SellerProtocol> {
        match self {
            RoleDriver::MakerAsSeller(protocol) | RoleDriver::TakerAsSeller(protocol) => {
                Some(protocol.as_ref())
            }
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RoleDriver::MakerAsBuyer(_) => "MAKER_AS_BUYER",
            RoleDriver::TakerAsBuyer(_) => "TAKER_AS_BUYER",
            RoleDriver::MakerAsSeller(_) => "MAKER_AS_SELLER",
            RoleDriver::TakerAsSeller(_) => "TAKER_AS_SELLER",
        }
    }
}

impl fmt::Debug for RoleDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of an active trade. State must be re-read through
/// [`TradeManager::trades`] on every guarded call, it can change between
/// calls.
#[derive(Debug, Clone)]
pub struct Trade {
    pub id: String,
    pub offer: Offer,
    pub state: TradeState,
    pub driver: RoleDriver,
}

/// A terminal (closed or failed) trade.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClosedTrade {
    pub id: String,
    pub state: TradeState,
    /// Unix millis of the close.
    pub closed_at: i64,
}

/// Reason a wallet address exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressContext {
    Available,
    ReservedForTrade,
    TradePayout,
    MultiSig,
    Arbitrator,
}

/// Wallet bookkeeping record for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    pub address: String,
    pub context: AddressContext,
    /// Owning offer/trade id for trade-bound contexts.
    pub offer_id: Option<String>,
    /// Escrow value for multi-sig entries, distinct from on-chain balance.
    pub coin_locked_in_multi_sig: u64,
}

/// Taker fee schedule for one fee currency: a rate per whole coin of trade
/// amount plus an absolute floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakerFeeSchedule {
    pub fee_per_coin: u64,
    pub min_fee: u64,
}

/// A payment account the user can settle fiat with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAccount {
    pub id: String,
    /// Currency codes this account can settle.
    pub currency_codes: Vec<String>,
}

impl PaymentAccount {
    pub fn supports_currency(&self, code: &str) -> bool {
        self.currency_codes.iter().any(|c| c == code)
    }
}

/// A dispute arbitrator known to the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Arbitrator {
    pub node_address: String,
    pub language_codes: Vec<String>,
    /// Deposit address allocated from the arbitrator address context.
    pub deposit_address: String,
    pub registration_signature: String,
    /// Unix millis of registration.
    pub registered_at: i64,
}

/// Parameters handed to the engine when taking an offer. All checks in the
/// lifecycle guard have already passed when this is built.
#[derive(Debug, Clone)]
pub struct TakeOfferParams {
    pub offer: Offer,
    pub amount: u64,
    pub tx_fee: u64,
    pub taker_fee: u64,
    /// Whether the taker fee is paid in the base coin rather than the fee
    /// token.
    pub fee_in_base_coin: bool,
    pub trade_price: u64,
    pub funds_needed: u64,
    pub payment_account_id: String,
    pub fund_from_wallet: bool,
}

/// Read access to the shared offer book.
pub trait OfferBook: Send + Sync {
    fn offers(&self) -> Vec<Offer>;
}

/// Our own open offers and the operations that mutate them.
pub trait OpenOfferManager: Send + Sync {
    fn open_offers(&self) -> Vec<OpenOffer>;
    fn open_offer(&self, offer_id: &str) -> Option<OpenOffer>;
    /// Publish an offer, reserving `reserved_funds` for it.
    fn place_offer(&self, offer: Offer, reserved_funds: u64, fund_from_wallet: bool, done: Completer<Offer>);
    fn cancel_offer(&self, offer_id: &str, done: Completer<()>);
}

/// Active trades and the take-offer entry point.
pub trait TradeManager: Send + Sync {
    fn trades(&self) -> Vec<Trade>;
    /// Ids of active trades holding funds in multi-sig escrow.
    fn locked_trade_ids(&self) -> Vec<String>;
    fn take_offer(&self, params: TakeOfferParams, done: Completer<Trade>);
    fn move_trade_to_closed(&self, trade_id: &str);
}

/// Closed-trades collection.
pub trait ClosedTrades: Send + Sync {
    fn trades(&self) -> Vec<ClosedTrade>;
    fn locked_trade_ids(&self) -> Vec<String>;
}

/// Failed-trades collection.
pub trait FailedTrades: Send + Sync {
    fn locked_trade_ids(&self) -> Vec<String>;
}

/// Base-coin wallet capabilities.
pub trait WalletService: Send + Sync {
    fn is_wallet_ready(&self) -> bool;
    fn is_encrypted(&self) -> bool;
    /// Check a password against the wallet's key-derivation check.
    fn check_password(&self, password: &str) -> bool;
    /// Re-encrypt the wallet under `new_password`, decrypting with
    /// `old_password` first when one is supplied.
    fn set_password(&self, old_password: Option<&str>, new_password: &str) -> Result<(), String>;
    fn available_balance(&self) -> u64;
    fn balance_for_address(&self, address: &str) -> u64;
    /// Confirmation depth; 0 when no confidence data exists yet.
    fn confirmations_for_address(&self, address: &str) -> u32;
    /// Bookkeeping entry owned by an offer/trade id in a given context.
    fn address_entry(&self, owner_id: &str, context: AddressContext) -> Option<AddressEntry>;
    /// Canonical entry for a context, created lazily on first use.
    fn get_or_create_address_entry(&self, context: AddressContext) -> AddressEntry;
    /// An unused entry for a context, allocating a fresh one if none exists.
    fn get_or_create_unused_address_entry(&self, context: AddressContext) -> AddressEntry;
    fn address_entries(&self) -> Vec<AddressEntry>;
    fn available_address_entries(&self) -> Vec<AddressEntry>;
    /// Reclassify a trade-bound entry back to the available context.
    fn swap_trade_entry_to_available(&self, owner_id: &str, context: AddressContext);
    /// Mining fee for spending `amount` from the given addresses. Errors are
    /// free text; dust violations mention "dust".
    fn estimate_tx_fee(&self, source_addresses: &[String], amount: u64) -> Result<u64, String>;
    fn send_funds(
        &self,
        source_addresses: Vec<String>,
        target_address: &str,
        amount: u64,
        fee: u64,
        done: Completer<String>,
    );
}

/// Balance of the fee-token wallet, used only to decide which currency the
/// taker fee is payable in.
pub trait FeeTokenWallet: Send + Sync {
    fn available_balance(&self) -> u64;
}

/// Engine-reported fee quotes.
pub trait FeeService: Send + Sync {
    /// Mining fee for a transaction of the given virtual size.
    fn tx_fee(&self, vsize: u64) -> u64;
    fn taker_fee_schedule(&self, in_base_coin: bool) -> TakerFeeSchedule;
}

/// User trading preferences consulted by the calculators.
pub trait TradingPreferences: Send + Sync {
    fn pay_fee_in_base_coin(&self) -> bool;
    fn buyer_security_deposit(&self) -> u64;
    fn seller_security_deposit(&self) -> u64;
}

/// Payment accounts configured by this user.
pub trait PaymentAccounts: Send + Sync {
    fn account(&self, account_id: &str) -> Option<PaymentAccount>;
    fn accounts(&self) -> Vec<PaymentAccount>;
}

/// This node's own P2P identity.
pub trait NodeIdentity: Send + Sync {
    /// None until the P2P layer has published an address.
    fn own_address(&self) -> Option<String>;
}

/// Arbitrator registry and the user's accepted-arbitrator selection.
pub trait ArbitratorRegistry: Send + Sync {
    fn arbitrators(&self) -> Vec<Arbitrator>;
    fn accepted_arbitrators(&self) -> Vec<Arbitrator>;
    fn arbitrator_by_address(&self, node_address: &str) -> Option<Arbitrator>;
    /// True when the arbitrator's keys are this node's own.
    fn is_own_registration(&self, arbitrator: &Arbitrator) -> bool;
    /// Sign the registration key; None when the private key is unknown.
    fn sign_registration_key(&self, private_key: &str) -> Option<String>;
    fn add_arbitrator(&self, arbitrator: Arbitrator, done: Completer<()>);
    fn accept_arbitrator(&self, node_address: &str);
    fn reject_arbitrator(&self, node_address: &str);
}

/// Bundle of engine capability handles the gateway is wired with.
#[derive(Clone)]
pub struct Engine {
    pub offer_book: Arc<dyn OfferBook>,
    pub open_offers: Arc<dyn OpenOfferManager>,
    pub trades: Arc<dyn TradeManager>,
    pub closed_trades: Arc<dyn ClosedTrades>,
    pub failed_trades: Arc<dyn FailedTrades>,
    pub wallet: Arc<dyn WalletService>,
    pub fee_token_wallet: Arc<dyn FeeTokenWallet>,
    pub fees: Arc<dyn FeeService>,
    pub preferences: Arc<dyn TradingPreferences>,
    pub accounts: Arc<dyn PaymentAccounts>,
    pub node: Arc<dyn NodeIdentity>,
    pub arbitrators: Arc<dyn ArbitratorRegistry>,
}
