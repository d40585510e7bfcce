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

//! Resolution of the protocol parameters in effect at a block height.

use std::fmt;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ProviderResultExt, RewardsError},
    numeric::{parse_int, Dec, NumericError},
    provider::PocketProvider,
};

/// Height at which the stake-weighted reward formula replaces the legacy formula.
pub const REWARD_SCALING_ACTIVATION_HEIGHT: u64 = 69243;

/// Relays-to-tokens multiplier is expressed in micro-units per relay.
pub const TOKEN_MICRO_UNITS: u64 = 1_000_000;

/// Fixed denominator applied to the stake floor multiplier exponent.
pub const STAKE_WEIGHT_EXPONENT_DENOMINATOR: u32 = 100;

/// Parameters needed for the reward computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    RelaysToTokensMultiplier,
    DaoAllocation,
    ProposerPercentage,
    ClaimExpiration,
    ServicerStakeWeightMultiplier,
    ServicerStakeFloorMultiplier,
    ServicerStakeFloorMultiplierExponent,
    ServicerStakeWeightCeiling,
}

/// Parameter groups of a [ParamBatch].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamGroup {
    Node,
    Pocket,
}

impl ParamKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKey::RelaysToTokensMultiplier => "pos/RelaysToTokensMultiplier",
            ParamKey::DaoAllocation => "pos/DAOAllocation",
            ParamKey::ProposerPercentage => "pos/ProposerPercentage",
            ParamKey::ClaimExpiration => "pocketcore/ClaimExpiration",
            ParamKey::ServicerStakeWeightMultiplier => "pos/ServicerStakeWeightMultiplier",
            ParamKey::ServicerStakeFloorMultiplier => "pos/ServicerStakeFloorMultiplier",
            ParamKey::ServicerStakeFloorMultiplierExponent => {
                "pos/ServicerStakeFloorMultiplierExponent"
            }
            ParamKey::ServicerStakeWeightCeiling => "pos/ServicerStakeWeightCeiling",
        }
    }

    pub fn group(&self) -> ParamGroup {
        match self {
            ParamKey::ClaimExpiration => ParamGroup::Pocket,
            _ => ParamGroup::Node,
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    #[serde(rename = "param_key")]
    pub key: String,
    #[serde(rename = "param_value")]
    pub value: String,
}

/// Snapshot of every parameter group at a height, as returned by the chain's bulk query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamBatch {
    #[serde(default)]
    pub app_params: Vec<Param>,
    #[serde(default)]
    pub auth_params: Vec<Param>,
    #[serde(default)]
    pub gov_params: Vec<Param>,
    #[serde(default)]
    pub node_params: Vec<Param>,
    #[serde(default)]
    pub pocket_params: Vec<Param>,
}

impl ParamBatch {
    fn group(&self, group: ParamGroup) -> &[Param] {
        match group {
            ParamGroup::Node => &self.node_params,
            ParamGroup::Pocket => &self.pocket_params,
        }
    }

    /// Non-empty value of `key` in its group, if present.
    pub fn get(&self, key: ParamKey) -> Option<&str> {
        self.group(key.group())
            .iter()
            .find(|p| p.key == key.as_str())
            .map(|p| p.value.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn with_param(mut self, key: ParamKey, value: impl Into<String>) -> Self {
        let param = Param { key: key.as_str().to_string(), value: value.into() };
        match key.group() {
            ParamGroup::Node => self.node_params.push(param),
            ParamGroup::Pocket => self.pocket_params.push(param),
        }
        self
    }
}

/// Reward formula in effect at a height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaKind {
    /// Flat rate per relay.
    Legacy,
    /// Rate scaled by the servicer's stake.
    StakeWeighted,
}

impl FormulaKind {
    pub fn at_height(height: u64, activation_height: u64) -> Self {
        if height >= activation_height {
            FormulaKind::StakeWeighted
        } else {
            FormulaKind::Legacy
        }
    }
}

/// Parameters of the stake-weighted formula. Only resolved at or above the activation height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeScaling {
    pub stake_weight_multiplier: Dec,
    pub stake_floor_multiplier: BigInt,
    pub stake_floor_multiplier_exponent: Dec,
    pub stake_weight_ceiling: BigInt,
}

/// Protocol parameters in effect at [ParameterSet::height].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    pub height: u64,
    pub activation_height: u64,
    pub relays_to_tokens_multiplier: BigInt,
    pub dao_allocation: BigInt,
    pub proposer_percentage: BigInt,
    pub claim_expiration_blocks: BigInt,
    pub stake_scaling: Option<StakeScaling>,
}

impl ParameterSet {
    pub fn formula(&self) -> FormulaKind {
        FormulaKind::at_height(self.height, self.activation_height)
    }

    /// Share of the gross reward kept by the servicer after the DAO and proposer cuts.
    pub fn percentage_to_keep(&self) -> Result<Dec, NumericError> {
        let kept = BigInt::from(100) - &self.proposer_percentage - &self.dao_allocation;
        Dec::from_int(&kept)
            .checked_div_int(&BigInt::from(100))
            .ok_or(NumericError::DivisionByZero("percentage to keep"))
    }

    /// Flat per-relay rate of the legacy formula.
    pub fn legacy_tokens_per_relay(&self) -> Result<Dec, NumericError> {
        let rate = Dec::from_int(&self.relays_to_tokens_multiplier)
            .checked_div_int(&BigInt::from(TOKEN_MICRO_UNITS))
            .ok_or(NumericError::DivisionByZero("legacy tokens per relay"))?;
        Ok(&rate * &self.percentage_to_keep()?)
    }

    /// Height at which a claim submitted at `height` expires.
    pub fn expire_height(&self, height: u64) -> Option<u64> {
        self.claim_expiration_blocks.to_u64().and_then(|blocks| height.checked_add(blocks))
    }
}

/// Resolves [ParameterSet]s, preferring the provider's batch snapshot and falling back to
/// individual queries per key.
pub struct ParamResolver<'a, P: ?Sized> {
    provider: &'a P,
    activation_height: u64,
}

impl<'a, P: PocketProvider + ?Sized> ParamResolver<'a, P> {
    pub fn new(provider: &'a P, activation_height: u64) -> Self {
        Self { provider, activation_height }
    }

    pub async fn resolve(
        &self,
        height: u64,
        force_refresh: bool,
    ) -> Result<ParameterSet, RewardsError> {
        let batch =
            self.provider.all_params(height, force_refresh).await.during("params_at_height")?;
        let scaled = FormulaKind::at_height(height, self.activation_height)
            == FormulaKind::StakeWeighted;

        let relays_to_tokens_multiplier = parse_int_param(
            ParamKey::RelaysToTokensMultiplier,
            self.lookup(&batch, ParamKey::RelaysToTokensMultiplier, height).await?,
        )?;
        let dao_allocation = parse_int_param(
            ParamKey::DaoAllocation,
            self.lookup(&batch, ParamKey::DaoAllocation, height).await?,
        )?;
        let proposer_percentage = parse_int_param(
            ParamKey::ProposerPercentage,
            self.lookup(&batch, ParamKey::ProposerPercentage, height).await?,
        )?;
        let claim_expiration_blocks = parse_int_param(
            ParamKey::ClaimExpiration,
            self.lookup(&batch, ParamKey::ClaimExpiration, height).await?,
        )?;

        // Scaling keys are not fetched below the activation height.
        let stake_scaling = if scaled {
            Some(StakeScaling {
                stake_weight_multiplier: parse_dec_param(
                    ParamKey::ServicerStakeWeightMultiplier,
                    self.lookup(&batch, ParamKey::ServicerStakeWeightMultiplier, height).await?,
                )?,
                stake_floor_multiplier: parse_int_param(
                    ParamKey::ServicerStakeFloorMultiplier,
                    self.lookup(&batch, ParamKey::ServicerStakeFloorMultiplier, height).await?,
                )?,
                stake_floor_multiplier_exponent: parse_dec_param(
                    ParamKey::ServicerStakeFloorMultiplierExponent,
                    self.lookup(&batch, ParamKey::ServicerStakeFloorMultiplierExponent, height)
                        .await?,
                )?,
                stake_weight_ceiling: parse_int_param(
                    ParamKey::ServicerStakeWeightCeiling,
                    self.lookup(&batch, ParamKey::ServicerStakeWeightCeiling, height).await?,
                )?,
            })
        } else {
            None
        };

        Ok(ParameterSet {
            height,
            activation_height: self.activation_height,
            relays_to_tokens_multiplier,
            dao_allocation,
            proposer_percentage,
            claim_expiration_blocks,
            stake_scaling,
        })
    }

    /// Batch value first, then an individual query at `height`.
    async fn lookup(
        &self,
        batch: &ParamBatch,
        key: ParamKey,
        height: u64,
    ) -> Result<String, RewardsError> {
        if let Some(value) = batch.get(key) {
            return Ok(value.to_string());
        }

        tracing::debug!("Parameter {} not in batch at height {}, querying directly", key, height);
        let value = self.provider.param(key.as_str(), height).await.during("params_at_height")?;
        if value.is_empty() {
            return Err(RewardsError::MissingParameter { key, height });
        }
        Ok(value)
    }
}

fn parse_int_param(key: ParamKey, value: String) -> Result<BigInt, RewardsError> {
    parse_int(&value).ok_or(RewardsError::ParameterFormat { key, value })
}

fn parse_dec_param(key: ParamKey, value: String) -> Result<Dec, RewardsError> {
    value.parse::<Dec>().map_err(|_| RewardsError::ParameterFormat { key, value })
}
