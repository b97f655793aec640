//! Integration test: persisting the ledger and restarting the engine.

use std::sync::Arc;

use remit_core::{EscrowConfig, EscrowStatus};
use remit_escrow::{
    ErrorKind, EscrowLedger, EventLog, InMemoryBank, LedgerSnapshot, SettlementGateway,
};
use remit_integration_tests::{account, funded_host, one_time_codes, Puzzle, ESCROW, OPERATOR};

#[test]
fn test_restart_preserves_escrows() -> anyhow::Result<()> {
    let host = funded_host()?;
    let settled = Puzzle::new("bob", one_time_codes())?;
    let pending = Puzzle::new("carol", one_time_codes())?;
    settled.fund(&host, "alice", 500)?;
    pending.fund(&host, "alice", 250)?;
    settled.claim(&host, "bob")?;

    let json = serde_json::to_string_pretty(&host.gateway().ledger().snapshot())?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&json)?;
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.contract_balance, 250);

    // Fresh process: the bank is rebuilt with the escrow's custody intact.
    let bank = Arc::new(InMemoryBank::new(account(ESCROW)));
    bank.mint(&account(ESCROW), host.escrow_balance())?;
    let events = Arc::new(EventLog::new(16));
    let ledger = EscrowLedger::from_snapshot(snapshot, bank.clone(), events)?;
    let gateway = SettlementGateway::with_ledger(account(OPERATOR), &EscrowConfig::default(), ledger)?;

    assert_eq!(gateway.contract_balance(), 250);
    assert_eq!(
        gateway.inspect(&settled.commitment)?.status,
        EscrowStatus::Claimed
    );

    let ctx = remit_escrow::CallContext::new(account("bob"), host.now());
    let replay = gateway
        .claim(&ctx, &settled.recipient, &settled.factors, &settled.payment_id)
        .unwrap_err();
    assert_eq!(replay.kind(), ErrorKind::AlreadySettled);

    let ctx = remit_escrow::CallContext::new(account("carol"), host.now());
    let payout = gateway.claim(&ctx, &pending.recipient, &pending.factors, &pending.payment_id)?;
    assert_eq!(payout.amount, 250);
    assert_eq!(bank.balance(&account("carol")), 250);
    assert_eq!(bank.balance(&account(ESCROW)), 0);
    Ok(())
}

#[test]
fn test_tampered_snapshot_rejected() -> anyhow::Result<()> {
    let host = funded_host()?;
    let puzzle = Puzzle::new("bob", one_time_codes())?;
    puzzle.fund(&host, "alice", 500)?;

    let mut snapshot = host.gateway().ledger().snapshot();
    snapshot.entries.push(snapshot.entries[0].clone());
    snapshot.contract_balance = 1_000;

    let result = EscrowLedger::from_snapshot(
        snapshot,
        Arc::new(InMemoryBank::new(account(ESCROW))),
        Arc::new(EventLog::new(16)),
    );
    let err = result.err().expect("duplicate entries must be rejected");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    Ok(())
}
