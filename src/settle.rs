use serde::Serialize;

use crate::balance::{compute_balances, Balances};
use crate::schemas::{Group, Member, Settlement};

/// Anything within a cent of zero counts as settled; repeated equal
/// splits leave about this much floating-point drift behind.
pub const TOLERANCE: f64 = 0.01;

/// A pairwise transfer that, once carried out, nets the two members'
/// balances against each other. Recomputed on every request, never stored.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Debt {
    pub debtor: Member,
    pub creditor: Member,
    pub amount: f64,
}

/// Reduces the balances to pairwise transfers, matching the largest
/// deficit against the largest surplus first. The greedy pairing keeps
/// the transaction count low but is not guaranteed minimal for every
/// balance distribution.
pub fn simplify(balances: &Balances) -> Vec<Debt> {
    let mut debtors: Vec<(&Member, f64)> = Vec::new();
    let mut creditors: Vec<(&Member, f64)> = Vec::new();
    for (member, &balance) in balances {
        if balance < -TOLERANCE {
            debtors.push((member, balance));
        } else if balance > TOLERANCE {
            creditors.push((member, balance));
        }
    }

    // Names break ties so equal balances always pair up the same way.
    debtors.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then_with(|| a.0.cmp(b.0)));
    creditors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then_with(|| a.0.cmp(b.0)));

    let mut debts = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < debtors.len() && j < creditors.len() {
        let amount = debtors[i].1.abs().min(creditors[j].1);
        debts.push(Debt {
            debtor: debtors[i].0.clone(),
            creditor: creditors[j].0.clone(),
            amount,
        });
        debtors[i].1 += amount;
        creditors[j].1 -= amount;
        if debtors[i].1.abs() < TOLERANCE {
            i += 1;
        }
        if creditors[j].1 < TOLERANCE {
            j += 1;
        }
    }
    debts
}

/// Deducts recorded payments from the computed debts. A payment only
/// offsets the first debt running in the same direction; one that matches
/// nothing (already applied, or the direction has since reversed) is
/// ignored. Whatever ends up within the tolerance band is dropped.
pub fn reconcile(mut debts: Vec<Debt>, settlements: &[Settlement]) -> Vec<Debt> {
    for settlement in settlements {
        let paid_off = debts.iter_mut().find(|debt| {
            debt.debtor == settlement.from_user && debt.creditor == settlement.to_user
        });
        if let Some(debt) = paid_off {
            debt.amount -= settlement.amount;
        }
        debts.retain(|debt| debt.amount > 0.0);
    }
    debts.retain(|debt| debt.amount > TOLERANCE);
    debts
}

/// What is still owed in a group: balances, simplified, with recorded
/// settlements already deducted.
pub fn outstanding_debts(group: &Group) -> Vec<Debt> {
    let balances = compute_balances(&group.expenses, &group.members);
    reconcile(simplify(&balances), &group.settlements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn balances(entries: &[(&str, f64)]) -> Balances {
        entries.iter().map(|(m, b)| (m.to_string(), *b)).collect()
    }

    fn debt(debtor: &str, creditor: &str, amount: f64) -> Debt {
        Debt {
            debtor: debtor.to_string(),
            creditor: creditor.to_string(),
            amount,
        }
    }

    fn payment(from: &str, to: &str, amount: f64) -> Settlement {
        Settlement {
            from_user: from.to_string(),
            to_user: to.to_string(),
            amount,
            date: NaiveDate::from_ymd_opt(2026, 7, 2).unwrap(),
            notes: String::new(),
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
        }
    }

    fn sorted(mut debts: Vec<Debt>) -> Vec<Debt> {
        debts.sort_by(|a, b| (&a.debtor, &a.creditor).cmp(&(&b.debtor, &b.creditor)));
        debts
    }

    #[rstest]
    #[case::one_creditor_two_debtors(
        &[("Alice", 60.0), ("Bob", -30.0), ("Carol", -30.0)],
        &[("Bob", "Alice", 30.0), ("Carol", "Alice", 30.0)]
    )]
    #[case::single_pair(
        &[("Alice", 30.0), ("Bob", -30.0)],
        &[("Bob", "Alice", 30.0)]
    )]
    #[case::chain_collapses_to_two_transfers(
        &[("Alice", 50.0), ("Bob", 20.0), ("Carol", -70.0)],
        &[("Carol", "Alice", 50.0), ("Carol", "Bob", 20.0)]
    )]
    #[case::everyone_even(
        &[("Alice", 0.0), ("Bob", 0.0)],
        &[]
    )]
    #[case::drift_inside_the_band_is_ignored(
        &[("Alice", 0.009), ("Bob", -0.009)],
        &[]
    )]
    fn simplify_pairs_balances(
        #[case] input: &[(&str, f64)],
        #[case] expected: &[(&str, &str, f64)],
    ) {
        let debts = simplify(&balances(input));
        let expected: Vec<Debt> = expected.iter().map(|&(d, c, a)| debt(d, c, a)).collect();
        assert_eq!(sorted(debts), sorted(expected));
    }

    #[test]
    fn applying_the_debts_settles_everyone() {
        let mut remaining = balances(&[
            ("Alice", 77.25),
            ("Bob", -12.5),
            ("Carol", -41.0),
            ("Dave", -23.75),
            ("Eve", 0.0),
        ]);
        let debts = simplify(&remaining);
        for d in &debts {
            *remaining.get_mut(&d.debtor).unwrap() += d.amount;
            *remaining.get_mut(&d.creditor).unwrap() -= d.amount;
        }
        for (member, balance) in remaining {
            assert!(balance.abs() <= TOLERANCE, "{member} left at {balance}");
        }
    }

    #[test]
    fn simplifying_a_settled_ledger_is_empty() {
        let mut remaining = balances(&[("Alice", 18.0), ("Bob", -7.0), ("Carol", -11.0)]);
        for d in simplify(&remaining) {
            *remaining.get_mut(&d.debtor).unwrap() += d.amount;
            *remaining.get_mut(&d.creditor).unwrap() -= d.amount;
        }
        assert!(simplify(&remaining).is_empty());
    }

    #[test]
    fn transfer_count_stays_below_the_pair_bound() {
        let input = balances(&[
            ("Alice", 40.0),
            ("Bob", 25.0),
            ("Carol", -15.0),
            ("Dave", -20.0),
            ("Eve", -30.0),
        ]);
        // 2 creditors + 3 debtors can always settle in at most 4 transfers.
        assert!(simplify(&input).len() <= 4);
    }

    #[test]
    fn nobody_appears_on_both_sides() {
        let debts = simplify(&balances(&[
            ("Alice", 55.0),
            ("Bob", -20.0),
            ("Carol", -35.0),
        ]));
        for d in &debts {
            assert!(debts.iter().all(|other| other.creditor != d.debtor));
        }
    }

    #[rstest]
    #[case::exact_payment_clears_the_debt(
        vec![("Bob", "Alice", 30.0)],
        vec![("Bob", "Alice", 30.0)],
        vec![]
    )]
    #[case::partial_payment_shrinks_it(
        vec![("Bob", "Alice", 30.0)],
        vec![("Bob", "Alice", 10.0)],
        vec![("Bob", "Alice", 20.0)]
    )]
    #[case::overpayment_just_clears_it(
        vec![("Bob", "Alice", 30.0)],
        vec![("Bob", "Alice", 45.0)],
        vec![]
    )]
    #[case::reversed_direction_is_ignored(
        vec![("Bob", "Alice", 30.0)],
        vec![("Alice", "Bob", 30.0)],
        vec![("Bob", "Alice", 30.0)]
    )]
    #[case::unmatched_pair_is_ignored(
        vec![("Bob", "Alice", 30.0)],
        vec![("Carol", "Dave", 30.0)],
        vec![("Bob", "Alice", 30.0)]
    )]
    #[case::near_full_payment_drops_the_dust(
        vec![("Bob", "Alice", 30.0)],
        vec![("Bob", "Alice", 29.995)],
        vec![]
    )]
    #[case::payments_apply_one_after_another(
        vec![("Bob", "Alice", 30.0), ("Carol", "Alice", 12.0)],
        vec![("Bob", "Alice", 18.0), ("Carol", "Alice", 12.0)],
        vec![("Bob", "Alice", 12.0)]
    )]
    fn reconcile_offsets_recorded_payments(
        #[case] debts: Vec<(&str, &str, f64)>,
        #[case] payments: Vec<(&str, &str, f64)>,
        #[case] expected: Vec<(&str, &str, f64)>,
    ) {
        let debts: Vec<Debt> = debts.iter().map(|&(d, c, a)| debt(d, c, a)).collect();
        let payments: Vec<Settlement> =
            payments.iter().map(|&(f, t, a)| payment(f, t, a)).collect();
        let expected: Vec<Debt> = expected.iter().map(|&(d, c, a)| debt(d, c, a)).collect();
        assert_eq!(sorted(reconcile(debts, &payments)), sorted(expected));
    }

    #[test]
    fn reconcile_never_grows_a_debt_or_invents_a_pair() {
        let debts = vec![debt("Bob", "Alice", 30.0), debt("Carol", "Alice", 15.0)];
        let payments = vec![
            payment("Bob", "Alice", 5.0),
            payment("Dave", "Alice", 100.0),
            payment("Alice", "Carol", 50.0),
        ];
        let result = reconcile(debts.clone(), &payments);
        for after in &result {
            let before = debts
                .iter()
                .find(|d| d.debtor == after.debtor && d.creditor == after.creditor)
                .expect("reconcile introduced a new pair");
            assert!(after.amount <= before.amount);
        }
    }

    #[test]
    fn a_fully_paid_debt_ignores_later_payments() {
        let debts = vec![debt("Bob", "Alice", 30.0)];
        let payments = vec![payment("Bob", "Alice", 30.0), payment("Bob", "Alice", 30.0)];
        assert!(reconcile(debts, &payments).is_empty());
    }
}
