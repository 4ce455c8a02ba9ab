//! Test helpers: deterministic wallets and an in-memory `ContextResolver`.

use crate::context::TrxContext;
use crate::domain::codec::encode_trx;
use crate::domain::crypto::{address_from_pubkey, sign_trx};
use crate::domain::entities::Trx;
use crate::ports::{ContextResolver, TrxHandler, TrxHandlers};
use k256::ecdsa::SigningKey;
use shared_types::{keccak256, Account, Address, AppResult, ExecMode, GovParams};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A key pair derived deterministically from a seed.
#[derive(Clone)]
pub struct TestWallet {
    pub key: SigningKey,
    pub address: Address,
}

impl TestWallet {
    pub fn from_seed(seed: u64) -> Self {
        let secret = keccak256(format!("test-wallet-{seed}").as_bytes());
        let key = SigningKey::from_slice(&secret).expect("keccak output is a valid scalar");
        let address = address_from_pubkey(key.verifying_key());
        Self { key, address }
    }

    /// Sign `trx` in place and return its wire bytes.
    pub fn sign(&self, trx: &mut Trx) -> Vec<u8> {
        sign_trx(trx, &self.key).expect("signing");
        encode_trx(trx).expect("encoding")
    }

    pub fn signed_transfer(&self, to: Address, nonce: u64, amount: u128, gas: u64) -> Vec<u8> {
        let mut trx = Trx::transfer(self.address, to, nonce, amount, gas);
        self.sign(&mut trx)
    }

    /// Compressed SEC1 public key.
    pub fn pubkey(&self) -> Vec<u8> {
        self.key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }
}

/// Handler that accepts everything and changes nothing.
pub struct NoopHandler;

impl TrxHandler for NoopHandler {
    fn validate_trx(&self, _ctx: &mut TrxContext) -> AppResult<()> {
        Ok(())
    }

    fn execute_trx(&self, _ctx: &mut TrxContext) -> AppResult<()> {
        Ok(())
    }
}

/// Resolver over a plain account map. Both views share the same map.
pub struct MockResolver {
    accounts: Mutex<HashMap<Address, Account>>,
    params: GovParams,
    handlers: TrxHandlers,
}

impl MockResolver {
    pub fn new() -> Self {
        let noop: Arc<dyn TrxHandler> = Arc::new(NoopHandler);
        Self::with_handlers(TrxHandlers {
            gov: noop.clone(),
            account: noop.clone(),
            stake: noop,
        })
    }

    pub fn with_handlers(handlers: TrxHandlers) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            params: GovParams::devnet(),
            handlers,
        }
    }

    pub fn put(&self, account: Account) {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.address, account);
    }

    pub fn get(&self, addr: &Address) -> Option<Account> {
        self.accounts.lock().unwrap().get(addr).cloned()
    }
}

impl Default for MockResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextResolver for MockResolver {
    fn find_account(&self, addr: &Address, _mode: ExecMode) -> AppResult<Option<Account>> {
        Ok(self.get(addr))
    }

    fn gov_params(&self, _mode: ExecMode) -> AppResult<GovParams> {
        Ok(self.params.clone())
    }

    fn handlers(&self) -> TrxHandlers {
        self.handlers.clone()
    }
}
