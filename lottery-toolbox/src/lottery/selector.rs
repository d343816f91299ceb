use super::{ConfigError, LotteryConfig, Participant, Tier, TiersStats};
use balance_snapshot::{AddressSet, Snapshot};
use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use tracing::debug;

pub type Seed = <ChaCha8Rng as SeedableRng>::Seed;

/// Everything a draw depends on besides the configuration and the randomness.
#[derive(Clone, Debug, Default)]
pub struct DrawInput {
    pub snapshot: Snapshot,
    /// Winners of the previous round, subject to the cooldown.
    pub recent_winners: AddressSet,
    /// Everyone who ever won.
    pub past_winners: AddressSet,
    pub blacklist: AddressSet,
}

/// Outcome of a single draw, along with the populations it was drawn from.
#[derive(Clone, Debug)]
pub struct Draw {
    all_participants: Vec<Participant>,
    top_holders: usize,
    participants: Vec<Participant>,
    winners: Vec<Participant>,
    tiers: Vec<Tier>,
}

impl Draw {
    /// Every non blacklisted holder, largest balance first.
    pub fn all_participants(&self) -> &[Participant] {
        &self.all_participants
    }

    pub fn top_holders(&self) -> &[Participant] {
        &self.all_participants[..self.top_holders]
    }

    /// Holders with at least one ticket, top holders excluded.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn winners(&self) -> &[Participant] {
        &self.winners
    }

    pub fn winner_addresses(&self) -> Vec<&str> {
        self.winners.iter().map(Participant::address).collect()
    }

    pub fn stats_by_tier(&self) -> TiersStats {
        let mut stats = TiersStats::new(&self.tiers);
        for contender in self.top_holders().iter().chain(&self.participants) {
            stats.add_participant(contender.tier());
        }
        for winner in &self.winners {
            stats.add_winner(winner.tier());
        }
        stats
    }
}

#[derive(Clone, Debug)]
pub struct LotterySelector {
    config: LotteryConfig,
}

impl LotterySelector {
    pub fn new(config: LotteryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LotteryConfig {
        &self.config
    }

    /// Reproducible draw: the same input and seed always yield the same winners.
    pub fn draw(&self, input: &DrawInput, seed: Seed) -> Draw {
        self.run(input, &mut ChaCha8Rng::from_seed(seed))
    }

    /// Like [`draw`](Self::draw), on one of the independent streams of `seed`.
    ///
    /// Used to run batches of experiments from a single seed, in any order or in
    /// parallel, while keeping each of them replayable on its own.
    pub fn draw_stream(&self, input: &DrawInput, seed: Seed, stream: u64) -> Draw {
        let mut rng = ChaCha8Rng::from_seed(seed);
        rng.set_stream(stream);
        self.run(input, &mut rng)
    }

    pub fn run<R: Rng + ?Sized>(&self, input: &DrawInput, rng: &mut R) -> Draw {
        let all_participants = self.build_participants(input);

        // top holders always win, so they don't take part in the random draws
        let top_holders = self.config.top_n_holders.min(all_participants.len());
        let participants = all_participants[top_holders..]
            .iter()
            .filter(|participant| participant.is_eligible())
            .cloned()
            .collect::<Vec<_>>();

        let privileged = self.privileged_participants(&participants, &input.past_winners, rng);
        let shuffled = weighted_shuffle(&participants, rng);

        let winners = all_participants[..top_holders]
            .iter()
            .chain(privileged)
            .chain(shuffled)
            .unique_by(|participant| participant.normalized_address().to_owned())
            .take(self.config.max_winners)
            .cloned()
            .collect::<Vec<_>>();

        debug!(
            all_participants = all_participants.len(),
            top_holders,
            eligible = participants.len(),
            winners = winners.len(),
            "lottery draw completed"
        );

        Draw {
            all_participants,
            top_holders,
            participants,
            winners,
            tiers: self.config.tiers.clone(),
        }
    }

    /// Holders that win every draw over `input`, no randomness involved.
    pub fn top_holders(&self, input: &DrawInput) -> Vec<Participant> {
        let mut participants = self.build_participants(input);
        participants.truncate(self.config.top_n_holders);
        participants
    }

    fn build_participants(&self, input: &DrawInput) -> Vec<Participant> {
        let mut participants = input
            .snapshot
            .iter()
            .filter(|record| !input.blacklist.contains(&record.address))
            .map(|record| {
                Participant::new(
                    record.address.clone(),
                    record.balance,
                    input.recent_winners.contains(&record.address),
                    &self.config,
                )
            })
            .collect::<Vec<_>>();
        participants.sort_by(Participant::by_balance_desc);
        participants
    }

    /// Uniform sample, regardless of weight, among the eligible holders that never won.
    fn privileged_participants<'a, R: Rng + ?Sized>(
        &self,
        participants: &'a [Participant],
        past_winners: &AddressSet,
        rng: &mut R,
    ) -> Vec<&'a Participant> {
        let never_winning = participants
            .iter()
            .filter(|participant| !past_winners.contains(participant.address()))
            .collect::<Vec<_>>();
        let amount = self
            .config
            .privileged_sample_size()
            .min(never_winning.len());

        rand::seq::index::sample(rng, never_winning.len(), amount)
            .into_iter()
            .map(|index| never_winning[index])
            .collect()
    }
}

/// Random permutation of the participants where heavier ones tend to come first.
///
/// Each participant is keyed by `-weight * u`, with `u` uniform in `(0, 1]`, and the
/// keys are sorted ascending. Participants without weight are left out.
fn weighted_shuffle<'a, R: Rng + ?Sized>(
    participants: &'a [Participant],
    rng: &mut R,
) -> Vec<&'a Participant> {
    let mut keyed = participants
        .iter()
        .filter(|participant| participant.weight() > Decimal::ZERO)
        .map(|participant| {
            let weight = participant.weight().to_f64().unwrap_or(f64::MAX);
            // gen() is in [0, 1)
            let u = 1.0 - rng.gen::<f64>();
            (-weight * u, participant)
        })
        .collect::<Vec<_>>();
    // stable, equal keys keep the balance order
    keyed.sort_by(|(a, _), (b, _)| a.total_cmp(b));
    keyed.into_iter().map(|(_, participant)| participant).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use balance_snapshot::BalanceRecord;
    use proptest::{prop_assert, prop_assert_eq};
    use rand::RngCore;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use test_strategy::proptest;

    const SEED: Seed = [7u8; 32];

    fn snapshot<'a>(balances: impl IntoIterator<Item = (&'a str, Option<Decimal>)>) -> Snapshot {
        balances
            .into_iter()
            .map(|(address, balance)| BalanceRecord::new(address, balance))
            .collect()
    }

    fn selector(max_winners: usize, top_n_holders: usize) -> LotterySelector {
        LotterySelector::new(LotteryConfig {
            max_winners,
            top_n_holders,
            ..Default::default()
        })
        .unwrap()
    }

    fn seeds(n: u64) -> impl Iterator<Item = Seed> {
        let mut rng = ChaCha8Rng::seed_from_u64(n);
        (0..n).map(move |_| {
            let mut seed = Seed::default();
            rng.fill_bytes(&mut seed);
            seed
        })
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = LotteryConfig {
            ticket_price: dec!(-250),
            ..Default::default()
        };
        assert!(matches!(
            LotterySelector::new(config),
            Err(ConfigError::NonPositiveTicketPrice(_))
        ));
    }

    #[test]
    fn small_population_scenario() {
        let input = DrawInput {
            snapshot: snapshot([
                ("A", Some(dec!(10_000))),
                ("B", Some(dec!(3_000))),
                ("C", Some(dec!(0))),
                ("D", Some(dec!(-5))),
            ]),
            ..Default::default()
        };
        let selector = selector(2, 1);

        for seed in seeds(20) {
            let draw = selector.draw(&input, seed);
            assert_eq!(draw.all_participants().len(), 4);
            assert_eq!(draw.winner_addresses(), vec!["A", "B"]);
            assert_eq!(
                draw.participants()
                    .iter()
                    .map(Participant::address)
                    .collect::<Vec<_>>(),
                vec!["B"]
            );
        }
    }

    #[test]
    fn top_holders_win_even_without_tickets() {
        let input = DrawInput {
            snapshot: snapshot([("A", Some(dec!(100))), ("B", None), ("C", Some(dec!(50)))]),
            ..Default::default()
        };
        let draw = selector(10, 2).draw(&input, SEED);
        assert_eq!(draw.winner_addresses(), vec!["A", "C"]);
        assert!(draw.participants().is_empty());
    }

    #[test]
    fn top_holders_larger_than_population() {
        let input = DrawInput {
            snapshot: snapshot([("A", Some(dec!(500))), ("B", Some(dec!(300)))]),
            ..Default::default()
        };
        let selector = selector(10, 50);
        let draw = selector.draw(&input, SEED);
        assert_eq!(draw.top_holders().len(), 2);
        assert_eq!(selector.top_holders(&input), draw.top_holders());
        assert_eq!(draw.winner_addresses(), vec!["A", "B"]);
    }

    #[test]
    fn blacklist_is_case_insensitive() {
        let input = DrawInput {
            snapshot: snapshot([
                ("0xWHALE", Some(dec!(5_000_000))),
                ("0xa", Some(dec!(1_000))),
                ("0xb", Some(dec!(800))),
            ]),
            blacklist: AddressSet::from_iter(["0xwhale"]),
            ..Default::default()
        };
        let draw = selector(10, 1).draw(&input, SEED);
        assert_eq!(draw.top_holders()[0].address(), "0xa");
        assert!(draw
            .all_participants()
            .iter()
            .all(|participant| participant.address() != "0xWHALE"));
        assert_eq!(draw.winners().len(), 2);
    }

    #[test]
    fn recent_winners_get_the_cooldown() {
        let input = DrawInput {
            snapshot: snapshot([("0xAb", Some(dec!(10_000))), ("0xcd", Some(dec!(10_000)))]),
            recent_winners: AddressSet::from_iter(["0xab"]),
            ..Default::default()
        };
        let draw = selector(10, 0).draw(&input, SEED);
        let weights = draw
            .participants()
            .iter()
            .map(|participant| (participant.address(), participant.recently_participated()))
            .collect::<Vec<_>>();
        assert_eq!(weights, vec![("0xAb", true), ("0xcd", false)]);
    }

    #[test]
    fn privileged_quota_goes_to_never_winning_holders() {
        // one heavy past winner, many small holders that never won
        let mut balances = vec![("heavy".to_owned(), Some(dec!(29_999)))];
        balances.extend((0..20).map(|i| (format!("small{i:02}"), Some(dec!(250)))));
        let input = DrawInput {
            snapshot: balances
                .into_iter()
                .map(|(address, balance)| BalanceRecord::new(address, balance))
                .collect(),
            past_winners: AddressSet::from_iter(["HEAVY"]),
            ..Default::default()
        };
        let config = LotteryConfig {
            max_winners: 4,
            top_n_holders: 0,
            privileged_never_winning_ratio: dec!(0.5),
            ..Default::default()
        };
        let selector = LotterySelector::new(config).unwrap();

        for seed in seeds(50) {
            let draw = selector.draw(&input, seed);
            let winners = draw.winner_addresses();
            assert_eq!(winners.len(), 4);
            assert!(winners[..2].iter().all(|address| address.starts_with("small")));
        }
    }

    #[test]
    fn same_seed_same_winners() {
        let input = DrawInput {
            snapshot: (0..200)
                .map(|i| BalanceRecord::new(format!("0x{i:04x}"), Some(Decimal::from(i * 137))))
                .collect(),
            ..Default::default()
        };
        let selector = selector(25, 3);
        assert_eq!(
            selector.draw(&input, SEED).winner_addresses(),
            selector.draw(&input, SEED).winner_addresses()
        );
        assert_eq!(
            selector.draw_stream(&input, SEED, 3).winner_addresses(),
            selector.draw_stream(&input, SEED, 3).winner_addresses()
        );
        assert_ne!(
            selector.draw_stream(&input, SEED, 1).winner_addresses(),
            selector.draw_stream(&input, SEED, 2).winner_addresses()
        );
    }

    #[test]
    fn weighted_shuffle_skips_weightless() {
        let config = LotteryConfig::default();
        let participants = vec![
            Participant::new("a", Some(dec!(1_000)), false, &config),
            Participant::new("b", Some(dec!(100)), false, &config),
            Participant::new("c", Some(dec!(250)), false, &config),
        ];
        let shuffled = weighted_shuffle(&participants, &mut ChaCha8Rng::from_seed(SEED));
        let mut addresses = shuffled.iter().map(|p| p.address()).collect::<Vec<_>>();
        addresses.sort_unstable();
        assert_eq!(addresses, vec!["a", "c"]);
    }

    #[test]
    fn heavier_participants_come_first_more_often() {
        let config = LotteryConfig::default();
        let mut participants = (0..50)
            .map(|i| Participant::new(format!("p{i}"), Some(dec!(1_000)), false, &config))
            .collect::<Vec<_>>();
        let light = Participant::new("light", Some(dec!(1_000)), false, &config);
        let heavy = Participant::new("heavy", Some(dec!(20_000)), false, &config);

        let mut prefix_hits = |candidate: &Participant| {
            participants.push(candidate.clone());
            let hits = seeds(400)
                .filter(|seed| {
                    weighted_shuffle(&participants, &mut ChaCha8Rng::from_seed(*seed))
                        .iter()
                        .take(10)
                        .any(|p| p.address() == candidate.address())
                })
                .count();
            participants.pop();
            hits
        };

        assert!(prefix_hits(&heavy) > prefix_hits(&light));
    }

    #[proptest]
    fn winners_are_unique_and_bounded(
        snapshot: Snapshot,
        #[strategy(1usize..40)] max_winners: usize,
        #[strategy(0usize..10)] top_n_holders: usize,
        seed: [u8; 32],
    ) {
        let blacklist = snapshot
            .iter()
            .step_by(5)
            .map(|record| record.address.clone())
            .collect::<AddressSet>();
        let input = DrawInput {
            snapshot,
            blacklist: blacklist.clone(),
            ..Default::default()
        };
        let selector = selector(max_winners, top_n_holders);
        let draw = selector.draw(&input, seed);
        let winners = draw.winners();

        prop_assert!(winners.len() <= max_winners);
        let unique = winners
            .iter()
            .map(Participant::normalized_address)
            .collect::<HashSet<_>>();
        prop_assert_eq!(unique.len(), winners.len());

        // top holders always make it in, the tier order puts them first
        let top = draw.top_holders().len().min(max_winners);
        prop_assert_eq!(&winners[..top], &draw.top_holders()[..top]);

        let candidates = draw.top_holders().len() + draw.participants().len();
        prop_assert_eq!(winners.len(), candidates.min(max_winners));

        for participant in draw.all_participants().iter().chain(winners) {
            prop_assert!(!blacklist.contains(participant.address()));
        }
        prop_assert!(draw.participants().iter().all(Participant::is_eligible));
    }
}
