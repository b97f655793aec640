//! Integration test: end-to-end remittances through the local host.
//!
//! Alice locks funds for Bob behind one-time codes, Bob collects them, and
//! the bank, the ledger and the event log all agree on what happened.

use remit_core::{ClaimPolicy, EscrowConfig, EscrowStatus, Factor};
use remit_escrow::{EscrowError, EscrowEvent, ErrorKind};
use remit_integration_tests::{account, funded_host, funded_host_with, one_time_codes, Puzzle, STARTING_BALANCE};

#[test]
fn test_alice_pays_bob() -> anyhow::Result<()> {
    let host = funded_host()?;
    let puzzle = Puzzle::new("bob", one_time_codes())?;
    let before = host.gateway().contract_balance();

    let entry = puzzle.fund(&host, "alice", 500)?;
    assert_eq!(entry.status, EscrowStatus::Open);
    assert_eq!(host.gateway().contract_balance(), before + 500);
    assert_eq!(host.bank().balance(&account("alice")), STARTING_BALANCE - 500);

    let payout = puzzle.claim(&host, "bob")?;
    assert_eq!(payout.amount, 500);
    assert_eq!(payout.payee, account("bob"));
    assert_eq!(host.bank().balance(&account("bob")), STARTING_BALANCE + 500);
    assert_eq!(host.gateway().contract_balance(), before);
    assert_eq!(host.escrow_balance(), 0);

    let view = host.gateway().inspect(&puzzle.commitment)?;
    assert_eq!(view.status, EscrowStatus::Claimed);
    assert_eq!(view.depositor, account("alice"));
    assert_eq!(view.amount, 500);

    let repeat = puzzle.claim(&host, "bob").unwrap_err();
    assert_eq!(repeat.kind(), ErrorKind::AlreadySettled);
    assert_eq!(host.bank().balance(&account("bob")), STARTING_BALANCE + 500);
    Ok(())
}

#[test]
fn test_duplicate_commitment_leaves_first_entry() -> anyhow::Result<()> {
    let host = funded_host()?;
    let puzzle = Puzzle::new("bob", one_time_codes())?;

    puzzle.fund(&host, "alice", 500)?;
    let err = puzzle.fund(&host, "carol", 700).unwrap_err();
    assert!(matches!(err, EscrowError::DuplicateCommitment(_)));

    let view = host.gateway().inspect(&puzzle.commitment)?;
    assert_eq!(view.depositor, account("alice"));
    assert_eq!(view.amount, 500);
    assert_eq!(host.bank().balance(&account("carol")), STARTING_BALANCE);
    assert_eq!(host.escrow_balance(), 500);
    Ok(())
}

#[test]
fn test_wrong_codes_cannot_claim() -> anyhow::Result<()> {
    let host = funded_host()?;
    let puzzle = Puzzle::new("bob", one_time_codes())?;
    puzzle.fund(&host, "alice", 500)?;

    let guessed = vec![Factor::from("731904"), Factor::from("000000")];
    let err = host
        .claim(&account("carol"), &puzzle.recipient, &guessed, &puzzle.payment_id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownCommitment);

    let swapped = vec![Factor::from("228561"), Factor::from("731904")];
    let err = host
        .claim(&account("bob"), &puzzle.recipient, &swapped, &puzzle.payment_id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownCommitment);

    assert_eq!(host.escrow_balance(), 500);
    Ok(())
}

#[test]
fn test_refund_after_window() -> anyhow::Result<()> {
    let host = funded_host()?;
    let puzzle = Puzzle::new("bob", one_time_codes())?;
    puzzle.fund(&host, "alice", 500)?;

    let early = host.refund(&account("alice"), &puzzle.commitment).unwrap_err();
    assert_eq!(early.kind(), ErrorKind::NotExpired);

    host.advance(86_400);
    let stranger = host.refund(&account("carol"), &puzzle.commitment).unwrap_err();
    assert_eq!(stranger.kind(), ErrorKind::NotAuthorized);

    let payout = host.refund(&account("alice"), &puzzle.commitment)?;
    assert_eq!(payout.status, EscrowStatus::Refunded);
    assert_eq!(host.bank().balance(&account("alice")), STARTING_BALANCE);

    // Bob is too late.
    let late = puzzle.claim(&host, "bob").unwrap_err();
    assert_eq!(late.kind(), ErrorKind::AlreadySettled);
    Ok(())
}

#[test]
fn test_claim_still_possible_after_expiry() -> anyhow::Result<()> {
    let host = funded_host()?;
    let puzzle = Puzzle::new("bob", one_time_codes())?;
    puzzle.fund(&host, "alice", 500)?;

    host.advance(2 * 86_400);
    puzzle.claim(&host, "bob")?;

    let refund = host.refund(&account("alice"), &puzzle.commitment).unwrap_err();
    assert_eq!(refund.kind(), ErrorKind::AlreadySettled);
    Ok(())
}

#[test]
fn test_recipient_only_policy() -> anyhow::Result<()> {
    let host = funded_host_with(&EscrowConfig {
        claim_policy: ClaimPolicy::RecipientOnly,
        ..EscrowConfig::default()
    })?;
    let puzzle = Puzzle::new("bob", one_time_codes())?;
    puzzle.fund(&host, "alice", 500)?;

    let err = puzzle.claim(&host, "carol").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthorized);

    puzzle.claim(&host, "bob")?;
    assert_eq!(host.bank().balance(&account("bob")), STARTING_BALANCE + 500);
    Ok(())
}

#[test]
fn test_operator_pause_and_window() -> anyhow::Result<()> {
    let host = funded_host()?;
    let open = Puzzle::new("bob", one_time_codes())?;
    open.fund(&host, "alice", 100)?;

    let denied = host.pause(&account("alice")).unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::NotAuthorized);

    host.pause(&account("exchange-operator"))?;
    let blocked = Puzzle::new("carol", one_time_codes())?;
    let err = blocked.fund(&host, "alice", 100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Paused);
    assert_eq!(host.bank().balance(&account("alice")), STARTING_BALANCE - 100);

    // Claims are never paused.
    open.claim(&host, "bob")?;

    host.unpause(&account("exchange-operator"))?;
    host.set_refund_window(&account("exchange-operator"), 600)?;
    let entry = blocked.fund(&host, "alice", 100)?;
    assert_eq!((entry.expires_at - entry.created_at).num_seconds(), 600);
    Ok(())
}

#[test]
fn test_event_audit_trail() -> anyhow::Result<()> {
    let host = funded_host()?;
    let mut feed = host.gateway().subscribe();
    let puzzle = Puzzle::new("bob", one_time_codes())?;
    puzzle.fund(&host, "alice", 500)?;
    puzzle.claim(&host, "bob")?;

    let history = host.gateway().events().for_commitment(&puzzle.commitment);
    assert_eq!(history.len(), 2);
    assert!(history[0].sequence < history[1].sequence);
    assert!(matches!(
        &history[0].event,
        EscrowEvent::Deposited { depositor, amount: 500, .. } if *depositor == account("alice")
    ));
    assert!(matches!(
        &history[1].event,
        EscrowEvent::Claimed { depositor, claimant, amount: 500, .. }
            if *depositor == account("alice") && *claimant == account("bob")
    ));

    assert_eq!(feed.try_recv()?.event, history[0].event);
    assert_eq!(feed.try_recv()?.event, history[1].event);
    Ok(())
}
