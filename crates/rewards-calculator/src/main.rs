// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relay_rewards::{
    monthly_rewards_response, BlockTimesResponse, HeightResponse, NodeResponse, ParamsResponse,
    PocketProvider, RewardsConfig, RewardsService, SnapshotProvider, SortOrder,
    TransactionResponse, TxType, HISTORY_PAGE_SIZE, LISTING_PAGE_SIZE,
    REWARD_SCALING_ACTIVATION_HEIGHT,
};
use serde_json::Value;

/// Arguments for the rewards calculator.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct MainArgs {
    /// Path to the JSON chain snapshot to read from.
    #[clap(long, env = "SNAPSHOT_PATH")]
    snapshot: PathBuf,

    /// Height at which the stake-weighted reward formula activates.
    #[clap(long, env, default_value_t = REWARD_SCALING_ACTIVATION_HEIGHT)]
    activation_height: u64,

    /// Page size used when walking an account's complete history.
    #[clap(long, env, default_value_t = HISTORY_PAGE_SIZE)]
    history_page_size: u32,

    /// Page size used when listing an account's transactions.
    #[clap(long, env, default_value_t = LISTING_PAGE_SIZE)]
    listing_page_size: u32,

    /// Whether to log in JSON format.
    #[clap(long, env, default_value_t = false)]
    log_json: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
enum Command {
    /// Print the current chain height.
    Height,
    /// Print a transaction with its block time and reward.
    Tx { hash: String },
    /// Print the block times of the given heights.
    BlockTimes {
        #[clap(required = true)]
        heights: Vec<u64>,
    },
    /// Print the reward parameters in effect at a height.
    Params {
        height: u64,

        /// Bypass any cached parameter snapshot.
        #[clap(long)]
        force_refresh: bool,
    },
    /// List the transactions of an account.
    AccountTxs {
        address: String,

        /// Listing page to start from, 1-based.
        #[clap(long, default_value_t = 1)]
        page: u32,

        /// Maximum number of transactions to print.
        #[clap(long, default_value_t = 50)]
        per_page: u32,

        /// `asc` or `desc` by height.
        #[clap(long, default_value_t = SortOrder::Desc)]
        sort: SortOrder,

        /// Only print transactions of this type, e.g. `claim` or `proof`.
        #[clap(long = "type")]
        tx_type: Option<TxType>,
    },
    /// Print the confirmed rewards of an account by month, newest first.
    Monthly { address: String },
    /// Print the state and balance of a node.
    Node { address: String },
}

impl MainArgs {
    fn config(&self) -> RewardsConfig {
        RewardsConfig {
            activation_height: self.activation_height,
            history_page_size: self.history_page_size,
            listing_page_size: self.listing_page_size,
        }
    }
}

async fn execute<P: PocketProvider>(
    service: &RewardsService<P>,
    command: &Command,
) -> Result<Value> {
    let value = match command {
        Command::Height => {
            let height = service.height().await?;
            serde_json::to_value(HeightResponse { height })?
        }
        Command::Tx { hash } => {
            let tx = service.transaction(hash).await?;
            serde_json::to_value(TransactionResponse::from(&tx))?
        }
        Command::BlockTimes { heights } => {
            let times = service.block_times(heights).await?;
            serde_json::to_value(BlockTimesResponse::from(&times))?
        }
        Command::Params { height, force_refresh } => {
            let params = service.params_at_height(*height, *force_refresh).await?;
            serde_json::to_value(ParamsResponse::try_from(&params)?)?
        }
        Command::AccountTxs { address, page, per_page, sort, tx_type } => {
            let txs = service
                .account_transactions(address, *page, *per_page, *sort, tx_type.as_ref())
                .await?;
            serde_json::to_value(txs.iter().map(TransactionResponse::from).collect::<Vec<_>>())?
        }
        Command::Monthly { address } => {
            let months = service.rewards_by_month(address).await?;
            serde_json::to_value(monthly_rewards_response(&months))?
        }
        Command::Node { address } => {
            let node = service.node(address).await?;
            serde_json::to_value(NodeResponse::from(&node))?
        }
    };
    Ok(value)
}

async fn run(args: &MainArgs) -> Result<()> {
    let provider = SnapshotProvider::from_path(&args.snapshot).await?;
    let service = RewardsService::new(provider, args.config());

    tracing::debug!("Running {:?}", args.command);
    let value = execute(&service, &args.command)
        .await
        .with_context(|| format!("Failed to run {:?}", args.command))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = MainArgs::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    // Logs go to stderr so stdout only carries the JSON output.
    if args.log_json {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    run(&args).await
}
