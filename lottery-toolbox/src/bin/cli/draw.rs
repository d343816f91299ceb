use super::input::{open_output, LotteryInput};
use balance_snapshot::Balance;
use color_eyre::Report;
use lottery_toolbox::lottery::Participant;
use lottery_toolbox::utils::csv;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use structopt::StructOpt;
use tracing::info;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct DrawWinners {
    #[structopt(flatten)]
    input: LotteryInput,

    /// Winners csv output path, stdout if missing
    #[structopt(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct WinnerRecord<'a> {
    address: &'a str,
    balance: Option<Balance>,
    tickets: u64,
    tier: Balance,
    weight: Decimal,
}

impl<'a> From<&'a Participant> for WinnerRecord<'a> {
    fn from(winner: &'a Participant) -> Self {
        Self {
            address: winner.address(),
            balance: winner.balance(),
            tickets: winner.tickets(),
            tier: winner.tier(),
            weight: winner.weight(),
        }
    }
}

impl DrawWinners {
    pub fn exec(self) -> Result<(), Report> {
        let Self { input, output } = self;
        let (selector, draw_input) = input.load()?;
        let draw = selector.draw(&draw_input, input.seed());

        info!(
            participants = draw.all_participants().len(),
            eligible = draw.participants().len(),
            winners = draw.winners().len(),
            "winners drawn"
        );

        let records = draw
            .winners()
            .iter()
            .map(WinnerRecord::from)
            .collect::<Vec<_>>();
        csv::dump_data_to_writer(&records, open_output(output.as_deref())?)?;
        Ok(())
    }
}
