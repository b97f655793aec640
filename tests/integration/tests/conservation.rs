//! Property test: value is conserved across arbitrary operation sequences.
//!
//! After every step the escrow account at the bank, the ledger's contract
//! balance and the sum of open entries are equal, and no value is created or
//! destroyed across all accounts.

use proptest::prelude::*;
use remit_core::{EscrowStatus, Factor};
use remit_integration_tests::{account, funded_host, Puzzle, STARTING_BALANCE};

const PARTIES: [&str; 3] = ["alice", "bob", "carol"];

#[derive(Debug, Clone)]
enum Op {
    Deposit { depositor: usize, slot: usize, amount: u128 },
    Claim { caller: usize, slot: usize },
    Refund { caller: usize, slot: usize },
    Advance { secs: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize, 0..6usize, 0..700u128).prop_map(|(depositor, slot, amount)| Op::Deposit {
            depositor,
            slot,
            amount
        }),
        (0..3usize, 0..6usize).prop_map(|(caller, slot)| Op::Claim { caller, slot }),
        (0..3usize, 0..6usize).prop_map(|(caller, slot)| Op::Refund { caller, slot }),
        (0..50_000i64).prop_map(|secs| Op::Advance { secs }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_balances_conserved(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let host = funded_host().unwrap();
        let puzzles: Vec<Puzzle> = (0..6)
            .map(|i| {
                let recipient = PARTIES[i % PARTIES.len()];
                Puzzle::new(recipient, vec![Factor::new(vec![i as u8; 6])]).unwrap()
            })
            .collect();
        let supply = host.bank().total_supply();
        prop_assert_eq!(supply, STARTING_BALANCE * 3);

        for op in ops {
            match op {
                Op::Deposit { depositor, slot, amount } => {
                    let _ = puzzles[slot].fund(&host, PARTIES[depositor], amount);
                }
                Op::Claim { caller, slot } => {
                    let _ = puzzles[slot].claim(&host, PARTIES[caller]);
                }
                Op::Refund { caller, slot } => {
                    let _ = host.refund(&account(PARTIES[caller]), &puzzles[slot].commitment);
                }
                Op::Advance { secs } => host.advance(secs),
            }

            let ledger = host.gateway().ledger();
            prop_assert_eq!(ledger.contract_balance(), ledger.open_total());
            prop_assert_eq!(host.escrow_balance(), ledger.contract_balance());
            prop_assert_eq!(host.bank().total_supply(), supply);
        }

        // Every settled entry stays settled.
        for puzzle in &puzzles {
            if let Ok(view) = host.gateway().inspect(&puzzle.commitment) {
                prop_assert!(view.amount > 0);
                if view.status != EscrowStatus::Open {
                    prop_assert!(puzzle.claim(&host, "bob").is_err());
                }
            }
        }
    }
}
