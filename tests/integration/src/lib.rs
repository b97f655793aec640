//! Shared fixtures for cross-crate escrow scenarios.

use remit_core::{AccountId, Commitment, EscrowConfig, Factor, LoggingConfig, PaymentId};
use remit_escrow::{EscrowEntry, EscrowError, LocalHost, Payout};

pub const OPERATOR: &str = "exchange-operator";
pub const ESCROW: &str = "remit-escrow";

/// Starting balance minted to every named party.
pub const STARTING_BALANCE: u128 = 10_000;

pub fn account(name: &str) -> AccountId {
    AccountId::new(name).expect("fixture account names are valid")
}

/// A host with Alice, Bob and Carol funded and default settings.
pub fn funded_host() -> anyhow::Result<LocalHost> {
    funded_host_with(&EscrowConfig::default())
}

pub fn funded_host_with(config: &EscrowConfig) -> anyhow::Result<LocalHost> {
    remit_core::telemetry::init_tracing(&LoggingConfig {
        level: "warn".into(),
        format: "text".into(),
    });

    let host = LocalHost::new(account(OPERATOR), account(ESCROW), config)?;
    for name in ["alice", "bob", "carol"] {
        host.bank().mint(&account(name), STARTING_BALANCE)?;
    }
    Ok(host)
}

/// The pair of one-time codes Alice shares with Bob out of band.
pub fn one_time_codes() -> Vec<Factor> {
    vec![Factor::from("731904"), Factor::from("228561")]
}

/// A remittance puzzle: recipient, factors, payment id and the resulting commitment.
pub struct Puzzle {
    pub recipient: AccountId,
    pub factors: Vec<Factor>,
    pub payment_id: PaymentId,
    pub commitment: Commitment,
}

impl Puzzle {
    pub fn new(recipient: &str, factors: Vec<Factor>) -> anyhow::Result<Self> {
        let recipient = account(recipient);
        let payment_id = remit_crypto::generate_payment_id();
        let commitment = remit_crypto::build_commitment(&recipient, &factors, &payment_id)?;
        Ok(Self {
            recipient,
            factors,
            payment_id,
            commitment,
        })
    }

    /// Lock `amount` from `depositor` against this puzzle.
    pub fn fund(
        &self,
        host: &LocalHost,
        depositor: &str,
        amount: u128,
    ) -> Result<EscrowEntry, EscrowError> {
        host.deposit(&account(depositor), self.commitment, amount)
    }

    /// Reveal the puzzle's factors as `caller`.
    pub fn claim(&self, host: &LocalHost, caller: &str) -> Result<Payout, EscrowError> {
        host.claim(&account(caller), &self.recipient, &self.factors, &self.payment_id)
    }
}
