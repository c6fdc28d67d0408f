use std::collections::HashMap;

use crate::schemas::{Expense, Member};

pub type Balances = HashMap<Member, f64>;

/// Net position per member: positive means the group owes them money,
/// negative means they owe the group.
///
/// Settled expenses are skipped. An expense naming someone outside the
/// member list neither credits nor debits that name; the rest of the
/// split still applies. An expense with nobody involved (and no members
/// to fall back on) changes nothing.
pub fn compute_balances(expenses: &[Expense], members: &[Member]) -> Balances {
    let mut balances: Balances = members.iter().map(|m| (m.clone(), 0.0)).collect();
    for expense in expenses {
        if expense.settled {
            continue;
        }
        let involved: &[Member] = if expense.involved.is_empty() {
            members
        } else {
            &expense.involved
        };
        if involved.is_empty() {
            continue;
        }
        let share = expense.amount / involved.len() as f64;
        if let Some(paid) = balances.get_mut(&expense.payer) {
            *paid += expense.amount;
        }
        for person in involved {
            if let Some(balance) = balances.get_mut(person) {
                *balance -= share;
            }
        }
    }
    balances
}
