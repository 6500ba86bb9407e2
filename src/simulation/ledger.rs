//! Currency ledger
//!
//! The simulation core never owns money directly. It credits and debits an
//! external ledger through the [`Ledger`] trait; [`Wallet`] is the plain
//! in-memory implementation used by [`super::SimWorld`].

use log::debug;

/// The currency collaborator the station pays into and buys from
pub trait Ledger {
    /// Credit an amount. Fire-and-forget: callers do not roll back on failure.
    fn add_funds(&mut self, amount: f32);

    /// Debit an amount if the balance covers it
    /// Returns true if successful, false if insufficient funds
    fn try_spend(&mut self, amount: f32) -> bool;

    fn balance(&self) -> f32;

    /// Check if the balance covers a purchase
    fn can_afford(&self, amount: f32) -> bool {
        self.balance() >= amount
    }
}

/// In-memory ledger tracking the player's money
#[derive(Debug, Clone, Default)]
pub struct Wallet {
    money: f32,
    /// Everything ever credited
    pub total_earned: f32,
    /// Everything ever debited
    pub total_spent: f32,
}

impl Wallet {
    pub fn new(starting_balance: f32) -> Self {
        Self {
            money: starting_balance,
            total_earned: 0.0,
            total_spent: 0.0,
        }
    }

    /// Get a summary string for display
    pub fn summary(&self) -> String {
        format!(
            "Balance: {} | Earned: {} | Spent: {}",
            format_money(self.money),
            format_money(self.total_earned),
            format_money(self.total_spent)
        )
    }
}

impl Ledger for Wallet {
    fn add_funds(&mut self, amount: f32) {
        self.money += amount;
        self.total_earned += amount;
        debug!("+{} | balance {}", format_money(amount), format_money(self.money));
    }

    fn try_spend(&mut self, amount: f32) -> bool {
        if self.can_afford(amount) {
            self.money -= amount;
            self.total_spent += amount;
            debug!("-{} | balance {}", format_money(amount), format_money(self.money));
            true
        } else {
            debug!(
                "Insufficient funds: need {}, have {}",
                format_money(amount),
                format_money(self.money)
            );
            false
        }
    }

    fn balance(&self) -> f32 {
        self.money
    }
}

/// Format an amount for display: `$950`, `$1.5K`, `$2.30M`, `$1.20B`
pub fn format_money(amount: f32) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let amount = amount.abs();
    if amount < 1_000.0 {
        format!("{}${}", sign, amount.floor() as i64)
    } else if amount < 1_000_000.0 {
        format!("{}${:.1}K", sign, amount / 1_000.0)
    } else if amount < 1_000_000_000.0 {
        format!("{}${:.2}M", sign, amount / 1_000_000.0)
    } else {
        format!("{}${:.2}B", sign, amount / 1_000_000_000.0)
    }
}
