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

//! Relay reward calculation for Pocket servicers.
//!
//! Resolves the protocol parameters in effect at a height, computes per-claim rewards under the
//! legacy or stake-weighted formula, matches claims with their proofs and aggregates confirmed
//! rewards by calendar month. Chain data is read through a [PocketProvider].

pub mod error;
pub mod history;
pub mod models;
pub mod monthly;
pub mod numeric;
pub mod params;
pub mod provider;
pub mod reward;
pub mod service;
pub mod snapshot;
pub mod transaction;

pub use error::RewardsError;

pub use history::{ClaimsAndProofs, TransactionPager, HISTORY_PAGE_SIZE, LISTING_PAGE_SIZE};

pub use models::{
    monthly_rewards_response, BlockTimesResponse, HeightResponse, MonthlyRewardsResponse,
    NodeResponse, ParamsResponse, RewardResponse, TransactionResponse,
};

pub use monthly::{aggregate_monthly, MonthKey, MonthlyReward};

pub use numeric::{Dec, NumericError};

pub use params::{
    FormulaKind, ParamBatch, ParamKey, ParamResolver, ParameterSet, StakeScaling,
    REWARD_SCALING_ACTIVATION_HEIGHT,
};

pub use provider::{NodeInfo, PocketProvider, SortOrder};

pub use reward::{
    compute_reward, stake_bin, stake_weight, ProviderStakeLookup, Reward, StakeLookup,
};

pub use service::{RewardsConfig, RewardsService};

pub use snapshot::SnapshotProvider;

pub use transaction::{RawTransaction, SessionKey, Transaction, TxType};
