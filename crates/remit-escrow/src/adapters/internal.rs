use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use remit_core::{AccountId, Amount, Commitment, EscrowConfig, Factor, PaymentId};
use std::sync::{Arc, RwLock};

use crate::error::EscrowError;
use crate::gateway::SettlementGateway;
use crate::traits::ValueTransfer;
use crate::types::{CallContext, EscrowEntry, Payout};

/// In-memory account book standing in for the host ledger.
///
/// Holds the escrow's own account; outbound payouts are debited from it.
pub struct InMemoryBank {
    balances: DashMap<AccountId, Amount>,
    escrow_account: AccountId,
}

impl InMemoryBank {
    pub fn new(escrow_account: AccountId) -> Self {
        Self {
            balances: DashMap::new(),
            escrow_account,
        }
    }

    /// The account that holds escrowed value.
    pub fn escrow_account(&self) -> &AccountId {
        &self.escrow_account
    }

    /// Credit new value to `account`.
    pub fn mint(&self, account: &AccountId, amount: Amount) -> Result<(), EscrowError> {
        self.credit(account, amount)?;
        tracing::debug!(account = %account, amount, "minted");
        Ok(())
    }

    pub fn balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).map(|b| *b).unwrap_or(0)
    }

    /// Move `amount` from `from` to `to`.
    pub fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), EscrowError> {
        if from == to {
            let available = self.balance(from);
            if available < amount {
                return Err(EscrowError::InsufficientBalance {
                    available,
                    required: amount,
                });
            }
            return Ok(());
        }

        self.debit(from, amount)?;
        if let Err(err) = self.credit(to, amount) {
            // Revert the debit; the amount was just held by `from`.
            if let Some(mut balance) = self.balances.get_mut(from) {
                *balance = balance.saturating_add(amount);
            }
            return Err(err);
        }

        tracing::debug!(from = %from, to = %to, amount, "bank transfer");
        Ok(())
    }

    /// Sum of all account balances.
    pub fn total_supply(&self) -> Amount {
        self.balances
            .iter()
            .fold(0, |acc: Amount, b| acc.saturating_add(*b))
    }

    fn debit(&self, account: &AccountId, amount: Amount) -> Result<(), EscrowError> {
        if amount == 0 {
            return Ok(());
        }
        let mut balance = self
            .balances
            .get_mut(account)
            .ok_or(EscrowError::InsufficientBalance {
                available: 0,
                required: amount,
            })?;
        if *balance < amount {
            return Err(EscrowError::InsufficientBalance {
                available: *balance,
                required: amount,
            });
        }
        *balance -= amount;
        Ok(())
    }

    fn credit(&self, account: &AccountId, amount: Amount) -> Result<(), EscrowError> {
        let mut balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or_else(|| {
            EscrowError::TransferFailed(format!("balance of {} would overflow", account))
        })?;
        Ok(())
    }
}

impl ValueTransfer for InMemoryBank {
    fn pay(&self, to: &AccountId, amount: Amount) -> Result<(), EscrowError> {
        self.transfer(&self.escrow_account, to, amount)
            .map_err(|err| EscrowError::TransferFailed(err.to_string()))
    }
}

/// A self-contained host: bank, gateway and a manually advanced clock.
///
/// Each call moves attached value the way a real host would before invoking
/// the gateway, and reverses it if the gateway rejects the call.
pub struct LocalHost {
    bank: Arc<InMemoryBank>,
    gateway: SettlementGateway,
    now: RwLock<DateTime<Utc>>,
}

impl LocalHost {
    pub fn new(
        operator: AccountId,
        escrow_account: AccountId,
        config: &EscrowConfig,
    ) -> Result<Self, EscrowError> {
        let bank = Arc::new(InMemoryBank::new(escrow_account));
        let gateway = SettlementGateway::new(operator, config, bank.clone())?;
        Ok(Self {
            bank,
            gateway,
            now: RwLock::new(Utc::now()),
        })
    }

    pub fn bank(&self) -> &InMemoryBank {
        &self.bank
    }

    pub fn gateway(&self) -> &SettlementGateway {
        &self.gateway
    }

    /// Current host time.
    pub fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move the clock by `secs` seconds, saturating at the representable range.
    pub fn advance(&self, secs: i64) {
        let mut now = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let bound = if secs >= 0 {
            DateTime::<Utc>::MAX_UTC
        } else {
            DateTime::<Utc>::MIN_UTC
        };
        let next = Duration::try_seconds(secs)
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(bound);
        *now = next;
    }

    /// Balance held by the escrow account.
    pub fn escrow_balance(&self) -> Amount {
        self.bank.balance(self.bank.escrow_account())
    }

    fn ctx(&self, caller: &AccountId) -> CallContext {
        CallContext::new(caller.clone(), self.now())
    }

    /// Send `value` from `caller` into escrow against `commitment`.
    pub fn deposit(
        &self,
        caller: &AccountId,
        commitment: Commitment,
        value: Amount,
    ) -> Result<EscrowEntry, EscrowError> {
        let escrow = self.bank.escrow_account();
        if caller == escrow {
            tracing::debug!(caller = %caller, "deposit rejected: escrow account cannot fund itself");
            return Err(EscrowError::NotAuthorized(caller.clone()));
        }
        self.bank.transfer(caller, escrow, value)?;

        let ctx = self.ctx(caller).with_value(value);
        match self.gateway.deposit(&ctx, commitment, value) {
            Ok(entry) => Ok(entry),
            Err(err) => {
                if let Err(revert) = self.bank.transfer(escrow, caller, value) {
                    tracing::error!(
                        caller = %caller,
                        value,
                        error = %revert,
                        "failed to return attached value"
                    );
                }
                Err(err)
            }
        }
    }

    pub fn claim(
        &self,
        caller: &AccountId,
        recipient: &AccountId,
        factors: &[Factor],
        payment_id: &PaymentId,
    ) -> Result<Payout, EscrowError> {
        self.gateway
            .claim(&self.ctx(caller), recipient, factors, payment_id)
    }

    pub fn refund(&self, caller: &AccountId, commitment: &Commitment) -> Result<Payout, EscrowError> {
        self.gateway.refund(&self.ctx(caller), commitment)
    }

    pub fn pause(&self, caller: &AccountId) -> Result<(), EscrowError> {
        self.gateway.pause(&self.ctx(caller))
    }

    pub fn unpause(&self, caller: &AccountId) -> Result<(), EscrowError> {
        self.gateway.unpause(&self.ctx(caller))
    }

    pub fn set_refund_window(&self, caller: &AccountId, secs: u64) -> Result<(), EscrowError> {
        self.gateway.set_refund_window(&self.ctx(caller), secs)
    }
}
