// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use crate::auth::TokenRegistry;
use crate::engine::{Engine, WalletService};
use crate::gateway::TradeGateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<TradeGateway>,
    pub tokens: Arc<TokenRegistry>,
    pub wallet: Arc<dyn WalletService>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            wallet: engine.wallet.clone(),
            gateway: Arc::new(TradeGateway::new(engine)),
            tokens: Arc::new(TokenRegistry::new()),
        }
    }
}
