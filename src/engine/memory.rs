// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory sandbox engine.
//!
//! Implements every capability trait of [`crate::engine`] against plain
//! in-process state. Used by `main` when no real engine is wired up, and by
//! the test suites as their engine double: every mutating call is recorded
//! so tests can assert both presence and absence of engine side effects.
//!
//! The sandbox executes calls inline. The real engine marshals them onto its
//! own single-threaded context; nothing in the gateway depends on which of
//! the two happens.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::bridge::Completer;
use crate::engine::{
    AddressContext, AddressEntry, Arbitrator, ArbitratorRegistry, BuyerProtocol, ClosedTrade,
    ClosedTrades, Direction, Engine, FailedTrades, FeeService, FeeTokenWallet, NodeIdentity, Offer,
    OfferBook, OpenOffer, OpenOfferManager, PaymentAccount, PaymentAccounts, RoleDriver,
    SellerProtocol, TakeOfferParams, TakerFeeSchedule, Trade, TradeManager, TradeState,
    TradingPreferences, WalletService,
};

/// Dust threshold applied by the sandbox fee estimator.
const DUST_LIMIT: u64 = 546;

/// Mutating engine calls, recorded in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    PlaceOffer { offer_id: String },
    CancelOffer { offer_id: String },
    TakeOffer { offer_id: String },
    StartFiatPayment { trade_id: String },
    ConfirmFiatPaymentReceived { trade_id: String },
    SendFunds { target_address: String },
    MoveTradeToClosed { trade_id: String },
    SwapTradeEntryToAvailable { owner_id: String },
    AddArbitrator { node_address: String },
}

#[derive(Default)]
struct WalletState {
    encrypted: bool,
    password: Option<String>,
    available_balance: u64,
    entries: Vec<AddressEntry>,
    balances: Vec<(String, u64)>,
    confirmations: Vec<(String, u32)>,
}

#[derive(Default)]
struct TradeBook {
    offers: Vec<Offer>,
    open_offers: Vec<OpenOffer>,
    trades: Vec<Trade>,
    closed: Vec<ClosedTrade>,
    closed_locked_ids: Vec<String>,
    failed_locked_ids: Vec<String>,
}

struct Quotes {
    tx_fee: u64,
    base_schedule: TakerFeeSchedule,
    token_schedule: TakerFeeSchedule,
    pay_fee_in_base_coin: bool,
    buyer_security_deposit: u64,
    seller_security_deposit: u64,
}

struct ArbitratorState {
    known: Vec<Arbitrator>,
    accepted: Vec<String>,
}

/// The sandbox engine. Obtain capability handles via [`MemoryEngine::handles`].
pub struct MemoryEngine {
    wallet: Mutex<WalletState>,
    book: Mutex<TradeBook>,
    quotes: Mutex<Quotes>,
    arbitrators: Mutex<ArbitratorState>,
    accounts_state: Mutex<Vec<PaymentAccount>>,
    fee_token_balance: AtomicU64,
    wallet_ready: AtomicBool,
    own_address: Mutex<Option<String>>,
    next_address: AtomicU64,
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            wallet: Mutex::new(WalletState::default()),
            book: Mutex::new(TradeBook::default()),
            quotes: Mutex::new(Quotes {
                tx_fee: 1_000,
                base_schedule: TakerFeeSchedule {
                    fee_per_coin: 200_000,
                    min_fee: 5_000,
                },
                token_schedule: TakerFeeSchedule {
                    fee_per_coin: 100_000,
                    min_fee: 3_000,
                },
                pay_fee_in_base_coin: true,
                buyer_security_deposit: 1_000_000,
                seller_security_deposit: 300_000,
            }),
            arbitrators: Mutex::new(ArbitratorState {
                known: Vec::new(),
                accepted: Vec::new(),
            }),
            accounts_state: Mutex::new(Vec::new()),
            fee_token_balance: AtomicU64::new(0),
            wallet_ready: AtomicBool::new(true),
            own_address: Mutex::new(Some("gw.onion:9999".to_string())),
            next_address: AtomicU64::new(0),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Capability handle bundle for wiring the gateway.
    pub fn handles(self: &Arc<Self>) -> Engine {
        Engine {
            offer_book: self.clone(),
            open_offers: self.clone(),
            trades: self.clone(),
            closed_trades: self.clone(),
            failed_trades: self.clone(),
            wallet: self.clone(),
            fee_token_wallet: self.clone(),
            fees: self.clone(),
            preferences: self.clone(),
            accounts: self.clone(),
            node: self.clone(),
            arbitrators: self.clone(),
        }
    }

    fn lock_wallet(&self) -> MutexGuard<'_, WalletState> {
        self.wallet.lock().expect("wallet state lock poisoned")
    }

    fn lock_book(&self) -> MutexGuard<'_, TradeBook> {
        self.book.lock().expect("trade book lock poisoned")
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().expect("call log lock poisoned").push(call);
    }

    /// Mutating calls observed so far, in order.
    pub fn recorded_calls(&self) -> Vec<EngineCall> {
        self.calls.lock().expect("call log lock poisoned").clone()
    }

    fn fresh_address(&self) -> String {
        let index = self.next_address.fetch_add(1, Ordering::Relaxed);
        format!("mem1q{index:08x}")
    }

    // ------------------------------------------------------------------
    // Seeding helpers, used by main and the test suites.
    // ------------------------------------------------------------------

    pub fn set_wallet_ready(&self, ready: bool) {
        self.wallet_ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_encrypted_password(&self, password: &str) {
        let mut wallet = self.lock_wallet();
        wallet.encrypted = true;
        wallet.password = Some(password.to_string());
    }

    pub fn set_available_balance(&self, balance: u64) {
        self.lock_wallet().available_balance = balance;
    }

    pub fn set_fee_token_balance(&self, balance: u64) {
        self.fee_token_balance.store(balance, Ordering::SeqCst);
    }

    pub fn set_address_balance(&self, address: &str, balance: u64) {
        let mut wallet = self.lock_wallet();
        wallet.balances.retain(|(a, _)| a != address);
        wallet.balances.push((address.to_string(), balance));
    }

    pub fn set_confirmations(&self, address: &str, depth: u32) {
        let mut wallet = self.lock_wallet();
        wallet.confirmations.retain(|(a, _)| a != address);
        wallet.confirmations.push((address.to_string(), depth));
    }

    pub fn insert_address_entry(&self, entry: AddressEntry) {
        self.lock_wallet().entries.push(entry);
    }

    pub fn set_own_address(&self, address: &str) {
        *self.own_address.lock().expect("own address lock poisoned") = Some(address.to_string());
    }

    pub fn clear_own_address(&self) {
        *self.own_address.lock().expect("own address lock poisoned") = None;
    }

    pub fn set_tx_fee(&self, fee: u64) {
        self.quotes.lock().expect("quotes lock poisoned").tx_fee = fee;
    }

    pub fn set_taker_fee_schedules(&self, base: TakerFeeSchedule, token: TakerFeeSchedule) {
        let mut quotes = self.quotes.lock().expect("quotes lock poisoned");
        quotes.base_schedule = base;
        quotes.token_schedule = token;
    }

    pub fn set_pay_fee_in_base_coin(&self, prefer_base: bool) {
        self.quotes
            .lock()
            .expect("quotes lock poisoned")
            .pay_fee_in_base_coin = prefer_base;
    }

    pub fn set_security_deposits(&self, buyer: u64, seller: u64) {
        let mut quotes = self.quotes.lock().expect("quotes lock poisoned");
        quotes.buyer_security_deposit = buyer;
        quotes.seller_security_deposit = seller;
    }

    pub fn insert_offer(&self, offer: Offer) {
        self.lock_book().offers.push(offer);
    }

    /// Insert one of our own open offers, with its book entry and a
    /// reserved-funds address entry.
    pub fn insert_open_offer(&self, offer: Offer, reserved_address: &str) {
        self.insert_address_entry(AddressEntry {
            address: reserved_address.to_string(),
            context: AddressContext::ReservedForTrade,
            offer_id: Some(offer.id.clone()),
            coin_locked_in_multi_sig: 0,
        });
        let mut book = self.lock_book();
        book.open_offers.push(OpenOffer {
            id: offer.id.clone(),
        });
        book.offers.push(offer);
    }

    /// Insert an active trade wired to recording protocol drivers.
    pub fn insert_trade(&self, id: &str, offer: Offer, state: TradeState, role: TradeRoleSeed) {
        let protocol = Arc::new(RecordingProtocol {
            trade_id: id.to_string(),
            calls: Arc::clone(&self.calls),
        });
        let driver = match role {
            TradeRoleSeed::MakerAsBuyer => RoleDriver::MakerAsBuyer(protocol),
            TradeRoleSeed::TakerAsBuyer => RoleDriver::TakerAsBuyer(protocol),
            TradeRoleSeed::MakerAsSeller => RoleDriver::MakerAsSeller(protocol),
            TradeRoleSeed::TakerAsSeller => RoleDriver::TakerAsSeller(protocol),
        };
        self.lock_book().trades.push(Trade {
            id: id.to_string(),
            offer,
            state,
            driver,
        });
    }

    pub fn set_trade_state(&self, trade_id: &str, state: TradeState) {
        let mut book = self.lock_book();
        if let Some(trade) = book.trades.iter_mut().find(|t| t.id == trade_id) {
            trade.state = state;
        }
    }

    /// Mark an active trade as holding `locked` in multi-sig escrow.
    pub fn lock_trade_funds(&self, trade_id: &str, address: &str, locked: u64) {
        self.insert_address_entry(AddressEntry {
            address: address.to_string(),
            context: AddressContext::MultiSig,
            offer_id: Some(trade_id.to_string()),
            coin_locked_in_multi_sig: locked,
        });
    }

    pub fn insert_closed_locked_trade(&self, trade_id: &str) {
        self.lock_book().closed_locked_ids.push(trade_id.to_string());
    }

    pub fn insert_failed_locked_trade(&self, trade_id: &str) {
        self.lock_book().failed_locked_ids.push(trade_id.to_string());
    }

    pub fn insert_arbitrator(&self, arbitrator: Arbitrator) {
        self.arbitrators
            .lock()
            .expect("arbitrator state lock poisoned")
            .known
            .push(arbitrator);
    }

    pub fn insert_payment_account(&self, account: PaymentAccount) {
        self.accounts_state
            .lock()
            .expect("accounts lock poisoned")
            .push(account);
    }
}

/// Role selector for [`MemoryEngine::insert_trade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeRoleSeed {
    MakerAsBuyer,
    TakerAsBuyer,
    MakerAsSeller,
    TakerAsSeller,
}

/// Protocol driver that records the invocation and completes immediately.
struct RecordingProtocol {
    trade_id: String,
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl BuyerProtocol for RecordingProtocol {
    fn start_fiat_payment(&self, done: Completer<()>) {
        self.calls
            .lock()
            .expect("call log lock poisoned")
            .push(EngineCall::StartFiatPayment {
                trade_id: self.trade_id.clone(),
            });
        done.succeed(());
    }
}

impl SellerProtocol for RecordingProtocol {
    fn confirm_fiat_payment_received(&self, done: Completer<()>) {
        self.calls
            .lock()
            .expect("call log lock poisoned")
            .push(EngineCall::ConfirmFiatPaymentReceived {
                trade_id: self.trade_id.clone(),
            });
        done.succeed(());
    }
}

impl OfferBook for MemoryEngine {
    fn offers(&self) -> Vec<Offer> {
        self.lock_book().offers.clone()
    }
}

impl OpenOfferManager for MemoryEngine {
    fn open_offers(&self) -> Vec<OpenOffer> {
        self.lock_book().open_offers.clone()
    }

    fn open_offer(&self, offer_id: &str) -> Option<OpenOffer> {
        self.lock_book()
            .open_offers
            .iter()
            .find(|o| o.id == offer_id)
            .cloned()
    }

    fn place_offer(
        &self,
        offer: Offer,
        reserved_funds: u64,
        _fund_from_wallet: bool,
        done: Completer<Offer>,
    ) {
        self.record(EngineCall::PlaceOffer {
            offer_id: offer.id.clone(),
        });
        let available = self.lock_wallet().available_balance;
        if reserved_funds > available {
            done.fail(format!(
                "Insufficient money, missing {} satoshi",
                reserved_funds - available
            ));
            return;
        }
        let reserved_address = self.fresh_address();
        self.insert_address_entry(AddressEntry {
            address: reserved_address,
            context: AddressContext::ReservedForTrade,
            offer_id: Some(offer.id.clone()),
            coin_locked_in_multi_sig: 0,
        });
        let mut book = self.lock_book();
        book.open_offers.push(OpenOffer {
            id: offer.id.clone(),
        });
        book.offers.push(offer.clone());
        drop(book);
        done.succeed(offer);
    }

    fn cancel_offer(&self, offer_id: &str, done: Completer<()>) {
        self.record(EngineCall::CancelOffer {
            offer_id: offer_id.to_string(),
        });
        let mut book = self.lock_book();
        let before = book.open_offers.len();
        book.open_offers.retain(|o| o.id != offer_id);
        book.offers.retain(|o| o.id != offer_id);
        let removed = book.open_offers.len() < before;
        drop(book);
        if removed {
            done.succeed(());
        } else {
            done.fail(format!("No open offer with id {offer_id}"));
        }
    }
}

impl TradeManager for MemoryEngine {
    fn trades(&self) -> Vec<Trade> {
        self.lock_book().trades.clone()
    }

    fn locked_trade_ids(&self) -> Vec<String> {
        let entries = self.lock_wallet().entries.clone();
        self.lock_book()
            .trades
            .iter()
            .filter(|trade| {
                entries.iter().any(|entry| {
                    entry.context == AddressContext::MultiSig
                        && entry.offer_id.as_deref() == Some(trade.id.as_str())
                })
            })
            .map(|trade| trade.id.clone())
            .collect()
    }

    fn take_offer(&self, params: TakeOfferParams, done: Completer<Trade>) {
        self.record(EngineCall::TakeOffer {
            offer_id: params.offer.id.clone(),
        });
        let protocol = Arc::new(RecordingProtocol {
            trade_id: params.offer.id.clone(),
            calls: Arc::clone(&self.calls),
        });
        // The taker ends up on the opposite side of the offer direction.
        let driver = match params.offer.direction {
            Direction::Sell => RoleDriver::TakerAsBuyer(protocol),
            Direction::Buy => RoleDriver::TakerAsSeller(protocol),
        };
        let trade = Trade {
            id: params.offer.id.clone(),
            offer: params.offer.clone(),
            state: TradeState::DepositPublished,
            driver,
        };
        self.lock_book().trades.push(trade.clone());
        done.succeed(trade);
    }

    fn move_trade_to_closed(&self, trade_id: &str) {
        self.record(EngineCall::MoveTradeToClosed {
            trade_id: trade_id.to_string(),
        });
        let mut book = self.lock_book();
        if let Some(position) = book.trades.iter().position(|t| t.id == trade_id) {
            let trade = book.trades.remove(position);
            book.closed.push(ClosedTrade {
                id: trade.id,
                state: trade.state,
                closed_at: Utc::now().timestamp_millis(),
            });
        }
    }
}

impl ClosedTrades for MemoryEngine {
    fn trades(&self) -> Vec<ClosedTrade> {
        self.lock_book().closed.clone()
    }

    fn locked_trade_ids(&self) -> Vec<String> {
        self.lock_book().closed_locked_ids.clone()
    }
}

impl FailedTrades for MemoryEngine {
    fn locked_trade_ids(&self) -> Vec<String> {
        self.lock_book().failed_locked_ids.clone()
    }
}

impl WalletService for MemoryEngine {
    fn is_wallet_ready(&self) -> bool {
        self.wallet_ready.load(Ordering::SeqCst)
    }

    fn is_encrypted(&self) -> bool {
        self.lock_wallet().encrypted
    }

    fn check_password(&self, password: &str) -> bool {
        self.lock_wallet().password.as_deref() == Some(password)
    }

    fn set_password(&self, old_password: Option<&str>, new_password: &str) -> Result<(), String> {
        let mut wallet = self.lock_wallet();
        if wallet.encrypted && wallet.password.as_deref() != old_password {
            return Err("old password does not match".to_string());
        }
        wallet.encrypted = true;
        wallet.password = Some(new_password.to_string());
        Ok(())
    }

    fn available_balance(&self) -> u64 {
        self.lock_wallet().available_balance
    }

    fn balance_for_address(&self, address: &str) -> u64 {
        self.lock_wallet()
            .balances
            .iter()
            .find(|(a, _)| a == address)
            .map(|(_, balance)| *balance)
            .unwrap_or(0)
    }

    fn confirmations_for_address(&self, address: &str) -> u32 {
        self.lock_wallet()
            .confirmations
            .iter()
            .find(|(a, _)| a == address)
            .map(|(_, depth)| *depth)
            .unwrap_or(0)
    }

    fn address_entry(&self, owner_id: &str, context: AddressContext) -> Option<AddressEntry> {
        self.lock_wallet()
            .entries
            .iter()
            .find(|entry| {
                entry.context == context && entry.offer_id.as_deref() == Some(owner_id)
            })
            .cloned()
    }

    fn get_or_create_address_entry(&self, context: AddressContext) -> AddressEntry {
        let mut wallet = self.lock_wallet();
        if let Some(entry) = wallet
            .entries
            .iter()
            .find(|entry| entry.context == context && entry.offer_id.is_none())
        {
            return entry.clone();
        }
        drop(wallet);
        let entry = AddressEntry {
            address: self.fresh_address(),
            context,
            offer_id: None,
            coin_locked_in_multi_sig: 0,
        };
        self.lock_wallet().entries.push(entry.clone());
        entry
    }

    fn get_or_create_unused_address_entry(&self, context: AddressContext) -> AddressEntry {
        let unused = {
            let wallet = self.lock_wallet();
            wallet
                .entries
                .iter()
                .find(|entry| {
                    entry.context == context
                        && entry.offer_id.is_none()
                        && wallet
                            .balances
                            .iter()
                            .all(|(a, balance)| a != &entry.address || *balance == 0)
                })
                .cloned()
        };
        if let Some(entry) = unused {
            return entry;
        }
        let entry = AddressEntry {
            address: self.fresh_address(),
            context,
            offer_id: None,
            coin_locked_in_multi_sig: 0,
        };
        self.lock_wallet().entries.push(entry.clone());
        entry
    }

    fn address_entries(&self) -> Vec<AddressEntry> {
        self.lock_wallet().entries.clone()
    }

    fn available_address_entries(&self) -> Vec<AddressEntry> {
        self.lock_wallet()
            .entries
            .iter()
            .filter(|entry| entry.context == AddressContext::Available)
            .cloned()
            .collect()
    }

    fn swap_trade_entry_to_available(&self, owner_id: &str, context: AddressContext) {
        self.record(EngineCall::SwapTradeEntryToAvailable {
            owner_id: owner_id.to_string(),
        });
        let mut wallet = self.lock_wallet();
        for entry in wallet.entries.iter_mut() {
            if entry.context == context && entry.offer_id.as_deref() == Some(owner_id) {
                entry.context = AddressContext::Available;
                entry.offer_id = None;
                entry.coin_locked_in_multi_sig = 0;
            }
        }
    }

    fn estimate_tx_fee(&self, _source_addresses: &[String], amount: u64) -> Result<u64, String> {
        if amount < DUST_LIMIT {
            return Err(format!("amount of {amount} is below the dust limit"));
        }
        Ok(self.quotes.lock().expect("quotes lock poisoned").tx_fee)
    }

    fn send_funds(
        &self,
        _source_addresses: Vec<String>,
        target_address: &str,
        _amount: u64,
        _fee: u64,
        done: Completer<String>,
    ) {
        self.record(EngineCall::SendFunds {
            target_address: target_address.to_string(),
        });
        done.succeed(Uuid::new_v4().simple().to_string());
    }
}

impl FeeTokenWallet for MemoryEngine {
    fn available_balance(&self) -> u64 {
        self.fee_token_balance.load(Ordering::SeqCst)
    }
}

impl FeeService for MemoryEngine {
    fn tx_fee(&self, _vsize: u64) -> u64 {
        // Flat quote for the standard trade transaction size.
        self.quotes.lock().expect("quotes lock poisoned").tx_fee
    }

    fn taker_fee_schedule(&self, in_base_coin: bool) -> TakerFeeSchedule {
        let quotes = self.quotes.lock().expect("quotes lock poisoned");
        if in_base_coin {
            quotes.base_schedule
        } else {
            quotes.token_schedule
        }
    }
}

impl TradingPreferences for MemoryEngine {
    fn pay_fee_in_base_coin(&self) -> bool {
        self.quotes
            .lock()
            .expect("quotes lock poisoned")
            .pay_fee_in_base_coin
    }

    fn buyer_security_deposit(&self) -> u64 {
        self.quotes
            .lock()
            .expect("quotes lock poisoned")
            .buyer_security_deposit
    }

    fn seller_security_deposit(&self) -> u64 {
        self.quotes
            .lock()
            .expect("quotes lock poisoned")
            .seller_security_deposit
    }
}

impl PaymentAccounts for MemoryEngine {
    fn account(&self, account_id: &str) -> Option<PaymentAccount> {
        self.accounts_state
            .lock()
            .expect("accounts lock poisoned")
            .iter()
            .find(|account| account.id == account_id)
            .cloned()
    }

    fn accounts(&self) -> Vec<PaymentAccount> {
        self.accounts_state
            .lock()
            .expect("accounts lock poisoned")
            .clone()
    }
}

impl NodeIdentity for MemoryEngine {
    fn own_address(&self) -> Option<String> {
        self.own_address
            .lock()
            .expect("own address lock poisoned")
            .clone()
    }
}

impl ArbitratorRegistry for MemoryEngine {
    fn arbitrators(&self) -> Vec<Arbitrator> {
        self.arbitrators
            .lock()
            .expect("arbitrator state lock poisoned")
            .known
            .clone()
    }

    fn accepted_arbitrators(&self) -> Vec<Arbitrator> {
        let state = self
            .arbitrators
            .lock()
            .expect("arbitrator state lock poisoned");
        state
            .known
            .iter()
            .filter(|arbitrator| state.accepted.contains(&arbitrator.node_address))
            .cloned()
            .collect()
    }

    fn arbitrator_by_address(&self, node_address: &str) -> Option<Arbitrator> {
        self.arbitrators
            .lock()
            .expect("arbitrator state lock poisoned")
            .known
            .iter()
            .find(|arbitrator| arbitrator.node_address == node_address)
            .cloned()
    }

    fn is_own_registration(&self, arbitrator: &Arbitrator) -> bool {
        self.own_address
            .lock()
            .expect("own address lock poisoned")
            .as_deref()
            == Some(arbitrator.node_address.as_str())
    }

    fn sign_registration_key(&self, private_key: &str) -> Option<String> {
        if private_key.is_empty() {
            return None;
        }
        Some(format!("sig:{private_key}"))
    }

    fn add_arbitrator(&self, arbitrator: Arbitrator, done: Completer<()>) {
        self.record(EngineCall::AddArbitrator {
            node_address: arbitrator.node_address.clone(),
        });
        self.arbitrators
            .lock()
            .expect("arbitrator state lock poisoned")
            .known
            .push(arbitrator);
        done.succeed(());
    }

    fn accept_arbitrator(&self, node_address: &str) {
        let mut state = self
            .arbitrators
            .lock()
            .expect("arbitrator state lock poisoned");
        if !state.accepted.iter().any(|a| a == node_address) {
            state.accepted.push(node_address.to_string());
        }
    }

    fn reject_arbitrator(&self, node_address: &str) {
        self.arbitrators
            .lock()
            .expect("arbitrator state lock poisoned")
            .accepted
            .retain(|a| a != node_address);
    }
}
