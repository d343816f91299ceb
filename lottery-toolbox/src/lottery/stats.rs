use super::{Draw, Tier};
use balance_snapshot::{normalize, Address, Balance};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TierStats {
    /// Holders that could have won: top holders and eligible participants.
    pub participants: u64,
    pub winners: u64,
}

impl TierStats {
    /// Percentage of the tier's participants that won, `None` for an empty tier.
    pub fn win_rate(&self) -> Option<Decimal> {
        (self.participants > 0).then(|| {
            Decimal::from(self.winners) * Decimal::ONE_HUNDRED / Decimal::from(self.participants)
        })
    }
}

impl AddAssign for TierStats {
    fn add_assign(&mut self, other: Self) {
        self.participants += other.participants;
        self.winners += other.winners;
    }
}

/// Stats keyed by tier threshold. Every configured tier is present, even when empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TiersStats(BTreeMap<Balance, TierStats>);

impl TiersStats {
    pub fn new(tiers: &[Tier]) -> Self {
        Self(
            tiers
                .iter()
                .map(|tier| (tier.threshold, TierStats::default()))
                .collect(),
        )
    }

    pub(crate) fn add_participant(&mut self, tier: Balance) {
        self.0.entry(tier).or_default().participants += 1;
    }

    pub(crate) fn add_winner(&mut self, tier: Balance) {
        self.0.entry(tier).or_default().winners += 1;
    }

    pub fn get(&self, tier: Balance) -> Option<&TierStats> {
        self.0.get(&tier)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Balance, &TierStats)> {
        self.0.iter()
    }

    pub fn merge(&mut self, other: &TiersStats) {
        for (tier, stats) in &other.0 {
            *self.0.entry(*tier).or_default() += *stats;
        }
    }
}

/// Aggregated outcome of repeated draws over the same population.
#[derive(Clone, Debug, Default)]
pub struct ExperimentsSummary {
    experiments: u64,
    wins: HashMap<String, (Address, u64)>,
    tiers: TiersStats,
}

impl ExperimentsSummary {
    pub fn new(tiers: &[Tier]) -> Self {
        Self {
            experiments: 0,
            wins: HashMap::new(),
            tiers: TiersStats::new(tiers),
        }
    }

    pub fn record(&mut self, draw: &Draw) {
        self.experiments += 1;
        for winner in draw.winners() {
            self.wins
                .entry(winner.normalized_address().to_owned())
                .or_insert_with(|| (winner.address().to_owned(), 0))
                .1 += 1;
        }
        self.tiers.merge(&draw.stats_by_tier());
    }

    pub fn merge(&mut self, other: ExperimentsSummary) {
        self.experiments += other.experiments;
        for (key, (address, wins)) in other.wins {
            self.wins.entry(key).or_insert((address, 0)).1 += wins;
        }
        self.tiers.merge(&other.tiers);
    }

    pub fn experiments(&self) -> u64 {
        self.experiments
    }

    pub fn wins(&self, address: &str) -> u64 {
        self.wins
            .get(&normalize(address))
            .map(|(_, wins)| *wins)
            .unwrap_or_default()
    }

    /// Share of the experiments `address` won, `None` before any experiment ran.
    pub fn probability(&self, address: &str) -> Option<Decimal> {
        (self.experiments > 0)
            .then(|| Decimal::from(self.wins(address)) / Decimal::from(self.experiments))
    }

    /// Every address that won at least once, most frequent winners first.
    pub fn probabilities(&self) -> Vec<(&str, Decimal)> {
        let mut probabilities = self
            .wins
            .values()
            .map(|(address, wins)| {
                (
                    address.as_str(),
                    Decimal::from(*wins) / Decimal::from(self.experiments.max(1)),
                )
            })
            .collect::<Vec<_>>();
        probabilities.sort_by(|(a_address, a), (b_address, b)| {
            b.cmp(a).then_with(|| a_address.cmp(b_address))
        });
        probabilities
    }

    pub fn tiers(&self) -> &TiersStats {
        &self.tiers
    }
}
