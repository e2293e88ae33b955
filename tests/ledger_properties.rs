//! Property tests for the ledger core: validation, arithmetic, reset and
//! persistence round trips.

use atm_simulator::{
    KeyValueStore, Ledger, LedgerError, MemoryStore, Persistence, ResetOutcome, SqliteStore,
    Transaction, TransactionKind,
};
use proptest::prelude::*;

fn invalid_amount() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        Just(-0.0),
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        -1.0e12..=0.0f64,
    ]
}

fn valid_amount() -> impl Strategy<Value = f64> {
    0.01..1.0e9f64
}

#[derive(Debug, Clone)]
enum Op {
    Deposit(f64),
    Withdraw(f64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        valid_amount().prop_map(Op::Deposit),
        valid_amount().prop_map(Op::Withdraw),
    ]
}

fn ledger_after(ops: &[Op]) -> Ledger<MemoryStore> {
    let mut ledger = Ledger::open(MemoryStore::new());
    for op in ops {
        let _ = match op {
            Op::Deposit(a) => ledger.deposit(*a),
            Op::Withdraw(a) => ledger.withdraw(*a),
        };
    }
    ledger
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Property: non-positive or non-finite amounts are rejected and nothing changes.
    #[test]
    fn invalid_amounts_leave_state_unchanged(
        ops in prop::collection::vec(op(), 0..10),
        amount in invalid_amount(),
    ) {
        let mut ledger = ledger_after(&ops);
        let balance = ledger.balance();
        let history = ledger.history().to_vec();

        prop_assert!(matches!(ledger.deposit(amount), Err(LedgerError::InvalidAmount(_))));
        prop_assert!(matches!(ledger.withdraw(amount), Err(LedgerError::InvalidAmount(_))));

        prop_assert_eq!(ledger.balance().to_bits(), balance.to_bits());
        prop_assert_eq!(ledger.history(), history.as_slice());
    }

    /// Property: a valid deposit adds exactly d and appends Deposit(d).
    #[test]
    fn deposit_adds_amount(
        ops in prop::collection::vec(op(), 0..10),
        d in valid_amount(),
    ) {
        let mut ledger = ledger_after(&ops);
        let before = ledger.balance();
        let len = ledger.history().len();

        let tx = ledger.deposit(d).unwrap();

        prop_assert_eq!(ledger.balance(), before + d);
        prop_assert_eq!(ledger.history().len(), len + 1);
        prop_assert_eq!(tx.kind, TransactionKind::Deposit);
        prop_assert_eq!(tx.amount, d);
        prop_assert_eq!(ledger.history().last(), Some(&tx));
    }

    /// Property: withdrawals within the balance subtract exactly; larger ones fail untouched.
    #[test]
    fn withdraw_respects_balance(
        ops in prop::collection::vec(op(), 0..10),
        w in valid_amount(),
    ) {
        let mut ledger = ledger_after(&ops);
        let before = ledger.balance();
        let history = ledger.history().to_vec();

        match ledger.withdraw(w) {
            Ok(tx) => {
                prop_assert!(w <= before);
                prop_assert_eq!(ledger.balance(), before - w);
                prop_assert_eq!(tx.kind, TransactionKind::Withdrawal);
                prop_assert_eq!(ledger.history().len(), history.len() + 1);
            }
            Err(LedgerError::InsufficientFunds { requested, available }) => {
                prop_assert!(w > before);
                prop_assert_eq!(requested, w);
                prop_assert_eq!(available, before);
                prop_assert_eq!(ledger.balance(), before);
                prop_assert_eq!(ledger.history(), history.as_slice());
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// Property: the balance never goes negative, whatever the sequence.
    #[test]
    fn balance_never_negative(ops in prop::collection::vec(op(), 0..30)) {
        let ledger = ledger_after(&ops);

        prop_assert!(ledger.balance() >= 0.0);

        let replayed: f64 = ledger.history().iter().map(Transaction::signed_amount).sum();
        prop_assert!((replayed - ledger.balance()).abs() <= 1e-6 * ledger.balance().max(1.0));
    }

    /// Property: reset only applies after confirmation.
    #[test]
    fn reset_only_when_confirmed(
        ops in prop::collection::vec(op(), 0..10),
        confirmed in any::<bool>(),
    ) {
        let mut ledger = ledger_after(&ops);
        let balance = ledger.balance();
        let len = ledger.history().len();

        let outcome = ledger.reset(|| confirmed).unwrap();

        if confirmed {
            prop_assert_eq!(outcome, ResetOutcome::Reset);
            prop_assert_eq!(ledger.balance(), 0.0);
            prop_assert!(ledger.history().is_empty());
        } else {
            prop_assert_eq!(outcome, ResetOutcome::Cancelled);
            prop_assert_eq!(ledger.balance(), balance);
            prop_assert_eq!(ledger.history().len(), len);
        }
    }

    /// Property: reopening the store reproduces the exact in-memory state.
    #[test]
    fn persisted_state_round_trips(ops in prop::collection::vec(op(), 0..15)) {
        let ledger = ledger_after(&ops);

        let reopened = Ledger::open(ledger.store().clone());

        prop_assert_eq!(reopened.balance().to_bits(), ledger.balance().to_bits());
        prop_assert_eq!(reopened.history(), ledger.history());
        prop_assert!(reopened.load_failure().is_none());
    }
}

#[test]
fn save_load_is_stable_on_sqlite() {
    let mut persistence = Persistence::new(SqliteStore::open_in_memory().unwrap());
    let history = vec![
        Transaction::deposit(0.1),
        Transaction::deposit(0.2),
        Transaction::withdrawal(0.3),
    ];
    let balance = 0.1 + 0.2 - 0.3;

    persistence.save(balance, &history).unwrap();
    let first = persistence.load();
    persistence.save(first.balance, &first.history).unwrap();
    let second = persistence.load();

    assert_eq!(first, second);
    assert_eq!(second.balance.to_bits(), balance.to_bits());
    assert_eq!(second.history, history);
}

#[test]
fn example_session_from_empty_account() {
    let mut ledger = Ledger::open(SqliteStore::open_in_memory().unwrap());
    assert_eq!(ledger.balance(), 0.0);

    ledger.deposit(100.0).unwrap();
    assert_eq!(ledger.balance(), 100.0);

    assert!(matches!(
        ledger.withdraw(150.0),
        Err(LedgerError::InsufficientFunds { .. })
    ));
    assert_eq!(ledger.balance(), 100.0);

    ledger.withdraw(40.0).unwrap();
    assert_eq!(ledger.balance(), 60.0);

    let summary: Vec<(TransactionKind, f64)> =
        ledger.history().iter().map(|tx| (tx.kind, tx.amount)).collect();
    assert_eq!(
        summary,
        vec![
            (TransactionKind::Deposit, 100.0),
            (TransactionKind::Withdrawal, 40.0)
        ]
    );

    assert_eq!(ledger.store().get("atm_balance").unwrap().as_deref(), Some("60"));
}
