//! Player balances.
//!
//! Rooms only ever call [`Ledger`]. Whatever sits behind it (a wallet
//! service, a database) serializes the read-modify-write per player.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use bingohall_protocol::{Amount, Username};
use tokio::sync::Mutex;

use crate::LedgerError;

/// Balance operations a room needs.
pub trait Ledger: Send + Sync + 'static {
    /// Adds `amount` and returns the new balance.
    fn credit(
        &self,
        user: &Username,
        amount: Amount,
    ) -> impl Future<Output = Result<Amount, LedgerError>> + Send;

    /// Subtracts `amount` if the balance covers it. `Ok(false)` means
    /// insufficient funds and nothing changed.
    fn debit(
        &self,
        user: &Username,
        amount: Amount,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;

    fn balance(&self, user: &Username)
    -> impl Future<Output = Result<Amount, LedgerError>> + Send;
}

/// Balances held in process memory. Unknown users start at zero.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<Username, Amount>>,
    unavailable: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances<I>(balances: I) -> Self
    where
        I: IntoIterator<Item = (Username, Amount)>,
    {
        Self {
            balances: Mutex::new(balances.into_iter().collect()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub async fn set_balance(&self, user: Username, amount: Amount) {
        self.balances.lock().await.insert(user, amount);
    }

    /// Makes every call fail with [`LedgerError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(LedgerError::Unavailable("in-memory ledger switched off".into()))
        } else {
            Ok(())
        }
    }
}

impl Ledger for InMemoryLedger {
    async fn credit(&self, user: &Username, amount: Amount) -> Result<Amount, LedgerError> {
        self.check_available()?;
        let mut balances = self.balances.lock().await;
        let balance = balances.entry(user.clone()).or_insert(Amount::ZERO);
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(*balance)
    }

    async fn debit(&self, user: &Username, amount: Amount) -> Result<bool, LedgerError> {
        self.check_available()?;
        let mut balances = self.balances.lock().await;
        let balance = balances.entry(user.clone()).or_insert(Amount::ZERO);
        match balance.checked_sub(amount) {
            Some(rest) if !rest.is_negative() => {
                *balance = rest;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn balance(&self, user: &Username) -> Result<Amount, LedgerError> {
        self.check_available()?;
        Ok(self
            .balances
            .lock()
            .await
            .get(user)
            .copied()
            .unwrap_or(Amount::ZERO))
    }
}
