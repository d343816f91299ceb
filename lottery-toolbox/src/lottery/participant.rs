use super::{LotteryConfig, Tier};
use balance_snapshot::{normalize, Address, Balance};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use std::cmp::Ordering;

/// A holder taking part in a draw, with its chances derived from its balance.
///
/// Derivations are computed once, on construction. They are total: a missing or
/// negative balance is worth no tickets rather than an error, exports are full of
/// dust and stale entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    address: Address,
    normalized_address: String,
    balance: Option<Balance>,
    recently_participated: bool,
    tickets: u64,
    tier: Tier,
    weight: Decimal,
}

fn tickets(balance: Option<Balance>, ticket_price: Balance) -> u64 {
    match balance {
        Some(balance) if ticket_price > Decimal::ZERO && balance >= ticket_price => balance
            .checked_div(ticket_price)
            .map(|tickets| tickets.floor().to_u64().unwrap_or(u64::MAX))
            .unwrap_or(u64::MAX),
        _ => 0,
    }
}

impl Participant {
    pub fn new(
        address: impl Into<Address>,
        balance: Option<Balance>,
        recently_participated: bool,
        config: &LotteryConfig,
    ) -> Self {
        let address = address.into();
        let tickets = tickets(balance, config.ticket_price);
        let tier = config.tier_for(balance);

        // large holders are exempt from the cooldown
        let cooldown = match balance {
            Some(balance)
                if recently_participated && balance < config.no_cooldown_minimum_balance =>
            {
                config.cooldown_factor
            }
            _ => Decimal::ONE,
        };
        let weight = Decimal::from(tickets)
            .checked_mul(tier.multiplier)
            .and_then(|weight| weight.checked_mul(cooldown))
            .unwrap_or(Decimal::MAX);

        Self {
            normalized_address: normalize(&address),
            address,
            balance,
            recently_participated,
            tickets,
            tier,
            weight,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn normalized_address(&self) -> &str {
        &self.normalized_address
    }

    pub fn balance(&self) -> Option<Balance> {
        self.balance
    }

    pub fn recently_participated(&self) -> bool {
        self.recently_participated
    }

    pub fn tickets(&self) -> u64 {
        self.tickets
    }

    /// Threshold of the tier this participant falls in.
    pub fn tier(&self) -> Balance {
        self.tier.threshold
    }

    pub fn multiplier(&self) -> Decimal {
        self.tier.multiplier
    }

    pub fn weight(&self) -> Decimal {
        self.weight
    }

    pub fn is_eligible(&self) -> bool {
        self.tickets > 0
    }

    /// Largest balance first, missing balances last, ties by address.
    pub fn by_balance_desc(a: &Self, b: &Self) -> Ordering {
        b.balance
            .cmp(&a.balance)
            .then_with(|| a.normalized_address.cmp(&b.normalized_address))
    }
}
