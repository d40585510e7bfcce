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

//! Serializable views of the rewards data. Token amounts and relay counts are decimal strings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    monthly::{MonthKey, MonthlyReward, WEEKDAY_NAMES},
    numeric::NumericError,
    params::{FormulaKind, ParameterSet},
    provider::NodeInfo,
    reward::Reward,
    transaction::Transaction,
};

/// Current chain height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightResponse {
    pub height: u64,
}

/// Reward of a single claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardResponse {
    /// Tokens minted for the claim before the DAO and proposer cuts
    pub gross: String,

    /// Tokens kept by the servicer
    pub net: String,

    /// Stake weight applied to the claim
    pub stake_weight: String,

    /// Effective gross tokens per relay
    pub tokens_per_relay: String,
}

impl From<&Reward> for RewardResponse {
    fn from(reward: &Reward) -> Self {
        Self {
            gross: reward.gross.to_string(),
            net: reward.net.to_string(),
            stake_weight: reward.stake_weight.to_string(),
            tokens_per_relay: reward.tokens_per_relay.to_string(),
        }
    }
}

/// A claim, proof or other transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub hash: String,

    pub height: u64,

    /// Block time, when resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,

    /// Servicer address
    pub address: String,

    /// Message type, e.g. `pocketcore/claim`
    #[serde(rename = "type")]
    pub tx_type: String,

    pub chain_id: String,

    pub session_height: u64,

    pub expire_height: u64,

    pub app_pubkey: String,

    /// Relays committed by a claim
    pub num_relays: String,

    pub tokens_per_relay: String,

    pub result_code: i64,

    pub is_confirmed: bool,

    pub reward: RewardResponse,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            hash: tx.hash.clone(),
            height: tx.height,
            time: tx.time,
            address: tx.address.clone(),
            tx_type: tx.tx_type.to_string(),
            chain_id: tx.chain_id.clone(),
            session_height: tx.session_height,
            expire_height: tx.expire_height,
            app_pubkey: tx.app_pubkey.clone(),
            num_relays: tx.num_relays.to_string(),
            tokens_per_relay: tx.tokens_per_relay.to_string(),
            result_code: tx.result_code,
            is_confirmed: tx.is_confirmed,
            reward: RewardResponse::from(&tx.reward),
        }
    }
}

/// Confirmed relays on one day of the week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOfWeekResponse {
    /// Day index, Sunday = 0
    pub day: u32,

    pub name: String,

    pub num_relays: String,
}

/// Relays served for one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaysByChain {
    pub chain: String,

    pub num_relays: String,
}

/// Rewards of one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRewardsResponse {
    pub year: i32,

    pub month: u32,

    /// Relays of the confirmed claims
    pub num_relays: String,

    /// Number of claims in the month
    pub num_transactions: usize,

    /// Number of confirmed claims in the month
    pub num_confirmed: usize,

    /// Gross tokens of the confirmed claims
    pub gross_tokens: String,

    /// Net tokens of the confirmed claims
    pub net_tokens: String,

    /// Average seconds between consecutive claims of the month
    pub avg_secs_between_rewards: f64,

    /// Total seconds between consecutive claims of the month
    pub total_secs_between_rewards: f64,

    pub days_of_week: Vec<DayOfWeekResponse>,

    pub relays_by_chain: Vec<RelaysByChain>,

    pub transactions: Vec<TransactionResponse>,
}

impl From<&MonthlyReward> for MonthlyRewardsResponse {
    fn from(month: &MonthlyReward) -> Self {
        let days_of_week = month
            .relays_by_weekday
            .iter()
            .zip(WEEKDAY_NAMES)
            .enumerate()
            .map(|(day, (relays, name))| DayOfWeekResponse {
                day: day as u32,
                name: name.to_string(),
                num_relays: relays.to_string(),
            })
            .collect();
        let relays_by_chain = month
            .relays_by_chain()
            .into_iter()
            .map(|(chain, relays)| RelaysByChain { chain, num_relays: relays.to_string() })
            .collect();

        Self {
            year: month.key.year,
            month: month.key.month,
            num_relays: month.total_relays.to_string(),
            num_transactions: month.transactions.len(),
            num_confirmed: month.confirmed_count(),
            gross_tokens: month.token_amount().to_string(),
            net_tokens: month.net_token_amount().to_string(),
            avg_secs_between_rewards: month.avg_secs_between_rewards,
            total_secs_between_rewards: month.total_secs_between_rewards,
            days_of_week,
            relays_by_chain,
            transactions: month.transactions.iter().map(TransactionResponse::from).collect(),
        }
    }
}

/// Monthly responses, newest month first.
pub fn monthly_rewards_response(
    months: &BTreeMap<MonthKey, MonthlyReward>,
) -> Vec<MonthlyRewardsResponse> {
    months.values().rev().map(MonthlyRewardsResponse::from).collect()
}

/// Servicer node state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub address: String,

    pub pubkey: String,

    /// Liquid balance in micro-units
    pub balance: String,

    /// Staked balance in micro-units
    pub staked_balance: String,

    pub is_jailed: bool,

    pub chains: Vec<String>,

    pub service_url: String,

    pub output_address: String,
}

impl From<&NodeInfo> for NodeResponse {
    fn from(node: &NodeInfo) -> Self {
        Self {
            address: node.address.clone(),
            pubkey: node.public_key.clone(),
            balance: node.balance.to_string(),
            staked_balance: node.staked_balance.clone(),
            is_jailed: node.is_jailed,
            chains: node.chains.clone(),
            service_url: node.service_url.clone(),
            output_address: node.output_address.clone(),
        }
    }
}

/// Stake-weighted formula parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeScalingResponse {
    pub stake_weight_multiplier: String,
    pub stake_floor_multiplier: String,
    pub stake_floor_multiplier_exponent: String,
    pub stake_weight_ceiling: String,
}

/// Parameters in effect at a height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsResponse {
    pub height: u64,

    pub formula: FormulaKind,

    /// Micro-units minted per relay
    pub relays_to_tokens_multiplier: String,

    /// Percentage of the reward allocated to the DAO
    pub dao_allocation: String,

    /// Percentage of the reward allocated to the block proposer
    pub proposer_percentage: String,

    /// Share of the reward kept by the servicer
    pub percentage_to_keep: String,

    pub claim_expiration_blocks: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stake_scaling: Option<StakeScalingResponse>,
}

impl TryFrom<&ParameterSet> for ParamsResponse {
    type Error = NumericError;

    fn try_from(params: &ParameterSet) -> Result<Self, Self::Error> {
        Ok(Self {
            height: params.height,
            formula: params.formula(),
            relays_to_tokens_multiplier: params.relays_to_tokens_multiplier.to_string(),
            dao_allocation: params.dao_allocation.to_string(),
            proposer_percentage: params.proposer_percentage.to_string(),
            percentage_to_keep: params.percentage_to_keep()?.to_string(),
            claim_expiration_blocks: params.claim_expiration_blocks.to_string(),
            stake_scaling: params.stake_scaling.as_ref().map(|s| StakeScalingResponse {
                stake_weight_multiplier: s.stake_weight_multiplier.to_string(),
                stake_floor_multiplier: s.stake_floor_multiplier.to_string(),
                stake_floor_multiplier_exponent: s.stake_floor_multiplier_exponent.to_string(),
                stake_weight_ceiling: s.stake_weight_ceiling.to_string(),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTimeResponse {
    pub height: u64,
    pub time: DateTime<Utc>,
}

/// Block times ordered by height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTimesResponse {
    pub block_times: Vec<BlockTimeResponse>,
}

impl From<&BTreeMap<u64, DateTime<Utc>>> for BlockTimesResponse {
    fn from(times: &BTreeMap<u64, DateTime<Utc>>) -> Self {
        Self {
            block_times: times
                .iter()
                .map(|(&height, &time)| BlockTimeResponse { height, time })
                .collect(),
        }
    }
}
