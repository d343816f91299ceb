use balance_snapshot::Balance;
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ticket price must be positive, got {0}")]
    NonPositiveTicketPrice(Decimal),

    #[error("tier table is empty")]
    EmptyTierTable,

    #[error("tier thresholds must be strictly ascending, found {current} after {previous}")]
    UnsortedTiers { previous: Balance, current: Balance },

    #[error("tier {threshold} has a negative multiplier ({multiplier})")]
    NegativeMultiplier { threshold: Balance, multiplier: Decimal },

    #[error("tier {threshold} covers balances worth a ticket but has a zero multiplier")]
    WeightlessTier { threshold: Balance },

    #[error("cooldown factor must be within (0, 1), got {0}")]
    InvalidCooldownFactor(Decimal),

    #[error("privileged never winning ratio must be within [0, 1], got {0}")]
    InvalidPrivilegedRatio(Decimal),

    #[error("at least one winner must be drawn")]
    NoWinners,
}

/// A balance bracket: every balance at or above `threshold` (and below the next
/// threshold) gets its tickets multiplied by `multiplier`.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tier {
    pub threshold: Balance,
    pub multiplier: Decimal,
}

impl Tier {
    pub const fn new(threshold: Balance, multiplier: Decimal) -> Self {
        Self {
            threshold,
            multiplier,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LotteryConfig {
    pub ticket_price: Balance,
    /// Ascending by threshold.
    pub tiers: Vec<Tier>,
    /// Holders at or above this balance don't get their weight reduced after a win.
    pub no_cooldown_minimum_balance: Balance,
    /// Applied to the weight of recent winners.
    pub cooldown_factor: Decimal,
    pub max_winners: usize,
    pub top_n_holders: usize,
    /// Share of `max_winners` drawn uniformly among holders that never won.
    pub privileged_never_winning_ratio: Decimal,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            ticket_price: dec!(250),
            tiers: vec![
                Tier::new(dec!(0), dec!(0.00)),
                Tier::new(dec!(250), dec!(1.00)),
                Tier::new(dec!(1_000), dec!(1.10)),
                Tier::new(dec!(3_000), dec!(1.15)),
                Tier::new(dec!(10_000), dec!(1.20)),
                Tier::new(dec!(30_000), dec!(1.25)),
            ],
            no_cooldown_minimum_balance: dec!(30_000),
            cooldown_factor: dec!(0.5),
            max_winners: 500,
            top_n_holders: 10,
            privileged_never_winning_ratio: dec!(0.10),
        }
    }
}

impl LotteryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticket_price <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveTicketPrice(self.ticket_price));
        }
        if self.tiers.is_empty() {
            return Err(ConfigError::EmptyTierTable);
        }
        if let Some(tier) = self.tiers.iter().find(|t| t.multiplier < Decimal::ZERO) {
            return Err(ConfigError::NegativeMultiplier {
                threshold: tier.threshold,
                multiplier: tier.multiplier,
            });
        }
        if let Some(pair) = self
            .tiers
            .windows(2)
            .find(|pair| pair[0].threshold >= pair[1].threshold)
        {
            return Err(ConfigError::UnsortedTiers {
                previous: pair[0].threshold,
                current: pair[1].threshold,
            });
        }
        // holders with a ticket must keep a non zero weight
        let upper_bounds = self
            .tiers
            .iter()
            .skip(1)
            .map(|tier| Some(tier.threshold))
            .chain(std::iter::once(None));
        if let Some((tier, _)) = self
            .tiers
            .iter()
            .zip(upper_bounds)
            .find(|(tier, upper)| {
                tier.multiplier == Decimal::ZERO
                    && upper.map_or(true, |upper| upper > self.ticket_price)
            })
        {
            return Err(ConfigError::WeightlessTier {
                threshold: tier.threshold,
            });
        }
        if self.cooldown_factor <= Decimal::ZERO || self.cooldown_factor >= Decimal::ONE {
            return Err(ConfigError::InvalidCooldownFactor(self.cooldown_factor));
        }
        if self.privileged_never_winning_ratio < Decimal::ZERO
            || self.privileged_never_winning_ratio > Decimal::ONE
        {
            return Err(ConfigError::InvalidPrivilegedRatio(
                self.privileged_never_winning_ratio,
            ));
        }
        if self.max_winners == 0 {
            return Err(ConfigError::NoWinners);
        }
        Ok(())
    }

    /// The tier a balance falls in: the greatest threshold not above it.
    ///
    /// Missing, negative and below-the-table balances land in the lowest tier.
    pub fn tier_for(&self, balance: Option<Balance>) -> Tier {
        const NO_TIER: Tier = Tier::new(Decimal::ZERO, Decimal::ZERO);

        let lowest = self.tiers.first().copied().unwrap_or(NO_TIER);
        match balance {
            Some(balance) if balance >= Decimal::ZERO => self
                .tiers
                .iter()
                .rev()
                .find(|tier| tier.threshold <= balance)
                .copied()
                .unwrap_or(lowest),
            _ => lowest,
        }
    }

    /// Number of slots reserved to holders that never won, rounded half away from zero.
    pub fn privileged_sample_size(&self) -> usize {
        (Decimal::from(self.max_winners) * self.privileged_never_winning_ratio)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_usize()
            .unwrap_or(self.max_winners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(LotteryConfig::default().validate(), Ok(()));
    }

    fn rejection(tweak: impl FnOnce(&mut LotteryConfig)) -> ConfigError {
        let mut config = LotteryConfig::default();
        tweak(&mut config);
        config.validate().unwrap_err()
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert_eq!(
            rejection(|c| c.ticket_price = Decimal::ZERO),
            ConfigError::NonPositiveTicketPrice(Decimal::ZERO)
        );
        assert_eq!(rejection(|c| c.tiers.clear()), ConfigError::EmptyTierTable);
        assert_eq!(
            rejection(|c| c.tiers.swap(1, 2)),
            ConfigError::UnsortedTiers {
                previous: dec!(1_000),
                current: dec!(250),
            }
        );
        assert_eq!(
            rejection(|c| c.tiers.push(Tier::new(dec!(30_000), dec!(2)))),
            ConfigError::UnsortedTiers {
                previous: dec!(30_000),
                current: dec!(30_000),
            }
        );
        assert_eq!(
            rejection(|c| c.tiers[3].multiplier = dec!(-1)),
            ConfigError::NegativeMultiplier {
                threshold: dec!(3_000),
                multiplier: dec!(-1),
            }
        );
        assert_eq!(
            rejection(|c| c.cooldown_factor = Decimal::ONE),
            ConfigError::InvalidCooldownFactor(Decimal::ONE)
        );
        assert_eq!(
            rejection(|c| c.cooldown_factor = Decimal::ZERO),
            ConfigError::InvalidCooldownFactor(Decimal::ZERO)
        );
        assert_eq!(
            rejection(|c| c.privileged_never_winning_ratio = dec!(1.01)),
            ConfigError::InvalidPrivilegedRatio(dec!(1.01))
        );
        assert_eq!(rejection(|c| c.max_winners = 0), ConfigError::NoWinners);
    }

    #[test]
    fn ticket_holders_cannot_be_weightless() {
        assert_eq!(
            rejection(|c| c.tiers[2].multiplier = Decimal::ZERO),
            ConfigError::WeightlessTier {
                threshold: dec!(1_000)
            }
        );
        assert_eq!(
            rejection(|c| c.tiers[5].multiplier = Decimal::ZERO),
            ConfigError::WeightlessTier {
                threshold: dec!(30_000)
            }
        );
        // the zero tier would now cover balances between 100 and 250
        assert_eq!(
            rejection(|c| c.ticket_price = dec!(100)),
            ConfigError::WeightlessTier {
                threshold: dec!(0)
            }
        );

        let config = LotteryConfig {
            ticket_price: dec!(1_000),
            tiers: vec![
                Tier::new(dec!(0), dec!(0)),
                Tier::new(dec!(250), dec!(0)),
                Tier::new(dec!(1_000), dec!(1)),
            ],
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn tier_lookup() {
        let config = LotteryConfig::default();
        let threshold = |balance| config.tier_for(balance).threshold;

        assert_eq!(threshold(None), dec!(0));
        assert_eq!(threshold(Some(dec!(-5))), dec!(0));
        assert_eq!(threshold(Some(dec!(249.99))), dec!(0));
        assert_eq!(threshold(Some(dec!(250))), dec!(250));
        assert_eq!(threshold(Some(dec!(2_999))), dec!(1_000));
        assert_eq!(threshold(Some(dec!(10_000))), dec!(10_000));
        assert_eq!(threshold(Some(dec!(1_000_000))), dec!(30_000));
    }

    #[test]
    fn balance_below_table_uses_lowest_tier() {
        let config = LotteryConfig {
            tiers: vec![Tier::new(dec!(100), dec!(0.5)), Tier::new(dec!(500), dec!(1))],
            ..Default::default()
        };
        assert_eq!(config.tier_for(Some(dec!(10))), Tier::new(dec!(100), dec!(0.5)));
    }

    #[test]
    fn privileged_sample_size_rounds_half_up() {
        let mut config = LotteryConfig::default();
        assert_eq!(config.privileged_sample_size(), 50);

        config.max_winners = 5;
        assert_eq!(config.privileged_sample_size(), 1);

        config.max_winners = 15;
        assert_eq!(config.privileged_sample_size(), 2);

        config.privileged_never_winning_ratio = Decimal::ZERO;
        assert_eq!(config.privileged_sample_size(), 0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: LotteryConfig =
            serde_json::from_str(r#"{"max_winners": 1000, "cooldown_factor": "0.25"}"#).unwrap();
        assert_eq!(config.max_winners, 1000);
        assert_eq!(config.cooldown_factor, dec!(0.25));
        assert_eq!(config.tiers, LotteryConfig::default().tiers);
    }
}
