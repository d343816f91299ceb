use super::input::LotteryInput;
use balance_snapshot::{Address, Balance};
use color_eyre::Report;
use lottery_toolbox::lottery::{DrawInput, ExperimentsSummary, LotterySelector, Participant};
use lottery_toolbox::utils::csv;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use structopt::StructOpt;
use tracing::{debug, info};

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct RunExperiments {
    #[structopt(flatten)]
    input: LotteryInput,

    /// Number of draws to run. Draw `n` uses stream `n` of the seed, so it can be
    /// replayed on its own.
    #[structopt(long, default_value = "50")]
    count: usize,

    /// Csv output path for the winners of every experiment
    #[structopt(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct ExperimentRecord {
    experiment: usize,
    address: Address,
    balance: Option<Balance>,
    weight: Decimal,
    tier: Balance,
    tickets: u64,
}

impl ExperimentRecord {
    fn new(experiment: usize, winner: &Participant) -> Self {
        Self {
            experiment,
            address: winner.address().to_owned(),
            balance: winner.balance(),
            weight: winner.weight(),
            tier: winner.tier(),
            tickets: winner.tickets(),
        }
    }
}

impl RunExperiments {
    pub fn exec(self) -> Result<(), Report> {
        let Self {
            input,
            count,
            output,
        } = self;
        let (selector, draw_input) = input.load()?;
        let seed = input.seed();
        let tiers = &selector.config().tiers;

        let started = Instant::now();
        let results = (0..count)
            .into_par_iter()
            .map(|experiment| {
                let draw = selector.draw_stream(&draw_input, seed, experiment as u64);
                debug!(experiment, winners = draw.winners().len(), "experiment completed");

                let records = draw
                    .winners()
                    .iter()
                    .map(|winner| ExperimentRecord::new(experiment, winner))
                    .collect::<Vec<_>>();
                let mut summary = ExperimentsSummary::new(tiers);
                summary.record(&draw);
                (records, summary)
            })
            .collect::<Vec<_>>();

        let mut records = Vec::new();
        let mut summary = ExperimentsSummary::new(tiers);
        for (experiment_records, experiment_summary) in results {
            records.extend(experiment_records);
            summary.merge(experiment_summary);
        }
        info!(experiments = count, elapsed = ?started.elapsed(), "experiments completed");

        if let Some(output) = output {
            csv::dump_data_to_csv(&records, &output)?;
        }
        print_report(&selector, &draw_input, &summary);
        Ok(())
    }
}

fn print_report(selector: &LotterySelector, input: &DrawInput, summary: &ExperimentsSummary) {
    let config = selector.config();
    println!(
        "Probabilities for {} experiments ({} winners on each) over a total of {} holders with a ticket price of {}:",
        summary.experiments(),
        config.max_winners,
        input.snapshot.len(),
        config.ticket_price,
    );

    println!("Top {} holders:", config.top_n_holders);
    for holder in selector.top_holders(input) {
        let probability = summary
            .probability(holder.address())
            .unwrap_or_default();
        println!(" * {}: {}%", holder.address(), percentage(probability));
    }

    println!("Tier probabilities:");
    for (tier, stats) in summary.tiers().iter() {
        let win_rate = stats
            .win_rate()
            .map(|rate| format!("{}%", rate.round_dp(2)))
            .unwrap_or_else(|| "n/a".to_owned());
        println!(
            " * {}+: {} ({} wins of a total of {} participants in all experiments)",
            tier, win_rate, stats.winners, stats.participants
        );
    }
}

fn percentage(probability: Decimal) -> Decimal {
    (probability * Decimal::ONE_HUNDRED).round_dp(2)
}
