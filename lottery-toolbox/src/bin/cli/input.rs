use balance_snapshot::{AddressRecord, AddressSet, BalanceRecord, Snapshot};
use color_eyre::Report;
use lottery_toolbox::lottery::{DrawInput, LotteryConfig, LotterySelector, Seed};
use lottery_toolbox::utils::csv;
use rand::Rng;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use tracing::info;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct LotteryInput {
    /// Holders csv file path, with `address` and `balance` columns
    #[structopt(long)]
    balances: PathBuf,

    /// Csv file path listing, in an `address` column, the winners of the previous round.
    /// Their chances are reduced unless they hold more than the no-cooldown balance.
    #[structopt(long)]
    recent_winners: Option<PathBuf>,

    /// Csv file path listing, in an `address` column, everyone who ever won.
    /// Only the others are eligible to the privileged quota.
    #[structopt(long)]
    past_winners: Option<PathBuf>,

    /// Csv file path listing, in an `address` column, holders excluded from the lottery
    #[structopt(long)]
    blacklist: Option<PathBuf>,

    /// Path to a json encoded lottery configuration, missing fields take their default
    #[structopt(long)]
    config: Option<PathBuf>,

    /// Overrides the configured number of winners
    #[structopt(long)]
    max_winners: Option<usize>,

    /// Overrides the configured number of top holders that always win
    #[structopt(long)]
    top_n_holders: Option<usize>,

    /// Hex encoded 32 bytes seed. A random one is generated, and logged, if missing
    #[structopt(long, parse(try_from_str = parse_seed))]
    seed: Option<Seed>,
}

fn parse_seed(seed: &str) -> Result<Seed, hex::FromHexError> {
    let mut buffer = Seed::default();
    hex::decode_to_slice(seed.trim_start_matches("0x"), &mut buffer)?;
    Ok(buffer)
}

fn load_addresses(path: Option<&Path>) -> Result<AddressSet, Report> {
    Ok(match path {
        Some(path) => csv::load_data_from_csv::<AddressRecord, b','>(path)?
            .into_iter()
            .collect(),
        None => AddressSet::new(),
    })
}

impl LotteryInput {
    pub fn load(&self) -> Result<(LotterySelector, DrawInput), Report> {
        let mut config: LotteryConfig = match &self.config {
            Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
            None => LotteryConfig::default(),
        };
        if let Some(max_winners) = self.max_winners {
            config.max_winners = max_winners;
        }
        if let Some(top_n_holders) = self.top_n_holders {
            config.top_n_holders = top_n_holders;
        }
        // refuse bad settings before touching any data
        let selector = LotterySelector::new(config)?;

        let snapshot = Snapshot::from_records(csv::load_data_from_csv::<BalanceRecord, b','>(
            &self.balances,
        )?);
        let input = DrawInput {
            snapshot,
            recent_winners: load_addresses(self.recent_winners.as_deref())?,
            past_winners: load_addresses(self.past_winners.as_deref())?,
            blacklist: load_addresses(self.blacklist.as_deref())?,
        };
        info!(
            holders = input.snapshot.len(),
            recent_winners = input.recent_winners.len(),
            past_winners = input.past_winners.len(),
            blacklisted = input.blacklist.len(),
            "lottery input loaded"
        );

        Ok((selector, input))
    }

    pub fn seed(&self) -> Seed {
        self.seed.unwrap_or_else(|| {
            let mut seed = Seed::default();
            rand::thread_rng().fill(&mut seed);
            info!(seed = %hex::encode(seed), "no seed provided, using a random one");
            seed
        })
    }
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, std::io::Error> {
    Ok(match path {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout()),
    })
}
