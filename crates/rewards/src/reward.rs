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

//! Per-transaction reward computation.

use async_trait::async_trait;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};
use serde::Serialize;

use crate::{
    error::RewardsError,
    numeric::{Dec, NumericError},
    params::{
        FormulaKind, ParameterSet, StakeScaling, STAKE_WEIGHT_EXPONENT_DENOMINATOR,
        TOKEN_MICRO_UNITS,
    },
    provider::PocketProvider,
    transaction::Transaction,
};

/// Reward earned by a single claim, in whole tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reward {
    /// Tokens minted for the relays, before the DAO and proposer cuts
    pub gross: Dec,
    /// Tokens kept by the servicer
    pub net: Dec,
    /// Stake weight factor; 1 under the legacy formula
    pub stake_weight: Dec,
    /// Effective gross tokens per relay
    pub tokens_per_relay: Dec,
}

impl Reward {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Source of a servicer's staked balance at a height.
#[async_trait]
pub trait StakeLookup: Send + Sync {
    async fn staked_balance(&self, address: &str, height: u64) -> anyhow::Result<BigInt>;
}

/// [StakeLookup] backed by the node state of a [PocketProvider].
pub struct ProviderStakeLookup<'a, P: ?Sized>(pub &'a P);

#[async_trait]
impl<P: PocketProvider + ?Sized> StakeLookup for ProviderStakeLookup<'_, P> {
    async fn staked_balance(&self, address: &str, height: u64) -> anyhow::Result<BigInt> {
        let node = self.0.node_at_height(address, height).await?;
        node.staked_balance().ok_or_else(|| {
            anyhow::anyhow!("invalid staked balance {:?} for node {}", node.staked_balance, address)
        })
    }
}

/// Compute the reward of `tx` under the formula in effect at its height.
///
/// The stake lookup is only consulted by the stake-weighted formula.
pub async fn compute_reward<S: StakeLookup + ?Sized>(
    tx: &Transaction,
    params: &ParameterSet,
    stake_lookup: &S,
) -> Result<Reward, RewardsError> {
    if tx.num_relays.is_zero() {
        return Ok(Reward::zero());
    }

    let (gross, weight, tokens_per_relay) =
        match FormulaKind::at_height(tx.height, params.activation_height) {
            FormulaKind::Legacy => {
                let rate = params.legacy_tokens_per_relay()?;
                (rate.mul_int(&tx.num_relays), Dec::one(), rate)
            }
            FormulaKind::StakeWeighted => {
                let scaling = params
                    .stake_scaling
                    .as_ref()
                    .ok_or(RewardsError::MissingStakeScaling { height: tx.height })?;
                if !scaling.stake_floor_multiplier.is_positive() {
                    return Err(RewardsError::ZeroFloorMultiplier { height: tx.height });
                }
                let stake = stake_lookup
                    .staked_balance(&tx.address, tx.height)
                    .await
                    .map_err(|source| RewardsError::StakeLookup {
                        address: tx.address.clone(),
                        height: tx.height,
                        source,
                    })?;
                let weight = stake_weight(&stake, scaling, tx.height)?;
                let minted =
                    Dec::from_int(&(&tx.num_relays * &params.relays_to_tokens_multiplier));
                let gross = (&minted * &weight)
                    .checked_div_int(&BigInt::from(TOKEN_MICRO_UNITS))
                    .ok_or(NumericError::DivisionByZero("gross tokens"))?;
                let rate = gross
                    .checked_div_int(&tx.num_relays)
                    .ok_or(NumericError::DivisionByZero("tokens per relay"))?;
                (gross, weight, rate)
            }
        };

    let net = &gross * &params.percentage_to_keep()?;
    tracing::trace!(
        "Reward for {} at height {}: gross {} net {} weight {}",
        tx.hash,
        tx.height,
        gross,
        net,
        weight
    );

    Ok(Reward { gross, net, stake_weight: weight, tokens_per_relay })
}

/// Stake bin of a servicer: the stake and the ceiling are both floored to a multiple of the
/// floor multiplier, the smaller one is divided by it.
pub fn stake_bin(stake: &BigInt, ceiling: &BigInt, floor_multiplier: &BigInt) -> BigInt {
    let floored_stake = stake - stake.mod_floor(floor_multiplier);
    let floored_ceiling = ceiling - ceiling.mod_floor(floor_multiplier);
    floored_stake.min(floored_ceiling) / floor_multiplier
}

/// Stake weight factor: `bin^(exponent) / stake_weight_multiplier`.
pub fn stake_weight(
    stake: &BigInt,
    scaling: &StakeScaling,
    height: u64,
) -> Result<Dec, RewardsError> {
    if !scaling.stake_floor_multiplier.is_positive() {
        return Err(RewardsError::ZeroFloorMultiplier { height });
    }
    let bin = stake_bin(stake, &scaling.stake_weight_ceiling, &scaling.stake_floor_multiplier);
    let weight = Dec::from_int(&bin)
        .frac_pow(&scaling.stake_floor_multiplier_exponent, STAKE_WEIGHT_EXPONENT_DENOMINATOR)?
        .checked_div(&scaling.stake_weight_multiplier)
        .ok_or(NumericError::DivisionByZero("stake weight multiplier"))?;
    Ok(weight)
}
