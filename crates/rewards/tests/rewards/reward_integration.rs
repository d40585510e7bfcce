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

use num_bigint::BigInt;
use relay_rewards::{
    compute_reward, Dec, ParamResolver, ParameterSet, ProviderStakeLookup, RawTransaction,
    RewardsError, SnapshotProvider, StakeScaling, Transaction, REWARD_SCALING_ACTIVATION_HEIGHT,
};

use super::common::{
    self, CountingProvider, FixedStakeLookup, PanickingStakeLookup, CHAIN, SERVICER,
    SERVICER_STAKE,
};

const ACTIVATION: u64 = REWARD_SCALING_ACTIVATION_HEIGHT;

fn params_at(height: u64) -> ParameterSet {
    ParameterSet {
        height,
        activation_height: ACTIVATION,
        relays_to_tokens_multiplier: BigInt::from(8461),
        dao_allocation: BigInt::from(10),
        proposer_percentage: BigInt::from(1),
        claim_expiration_blocks: BigInt::from(120),
        stake_scaling: Some(StakeScaling {
            stake_weight_multiplier: Dec::from(1),
            stake_floor_multiplier: BigInt::from(15_000_000_000u64),
            stake_floor_multiplier_exponent: Dec::from(1),
            stake_weight_ceiling: BigInt::from(60_000_000_000u64),
        }),
    }
}

fn claim(height: u64, relays: u64) -> Transaction {
    let raw = RawTransaction::claim("c", height, SERVICER, height, "app", CHAIN, relays);
    Transaction::try_from(raw).unwrap()
}

fn dec(s: &str) -> Dec {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_legacy_formula_ignores_stake() {
    let height = ACTIVATION - 1;
    // Scaling parameters are present but must not be used below the activation height.
    let reward = compute_reward(&claim(height, 1000), &params_at(height), &PanickingStakeLookup)
        .await
        .unwrap();

    assert_eq!(reward.tokens_per_relay, dec("0.00753029"));
    assert_eq!(reward.gross, dec("7.53029"));
    assert_eq!(reward.net, dec("6.7019581"));
    assert_eq!(reward.stake_weight, Dec::one());
}

#[tokio::test]
async fn test_legacy_formula_without_scaling_parameters() {
    let height = 100;
    let mut params = params_at(height);
    params.stake_scaling = None;

    let reward = compute_reward(&claim(height, 1), &params, &PanickingStakeLookup).await.unwrap();
    assert_eq!(reward.gross, dec("0.00753029"));
}

#[tokio::test]
async fn test_zero_relays_earn_nothing() {
    let params = params_at(ACTIVATION);
    let reward =
        compute_reward(&claim(ACTIVATION, 0), &params, &PanickingStakeLookup).await.unwrap();
    assert!(reward.gross.is_zero());
    assert!(reward.net.is_zero());
    assert!(reward.tokens_per_relay.is_zero());
}

#[tokio::test]
async fn test_stake_weighted_formula() {
    let params = params_at(ACTIVATION);

    // One bin: weight 1.
    let lookup = FixedStakeLookup(BigInt::from(15_000_000_000u64));
    let reward = compute_reward(&claim(ACTIVATION, 1000), &params, &lookup).await.unwrap();
    assert_eq!(reward.stake_weight, Dec::one());
    assert_eq!(reward.gross, dec("8.461"));
    assert_eq!(reward.net, dec("7.53029"));
    assert_eq!(reward.tokens_per_relay, dec("0.008461"));

    // Stake above the ceiling is clamped to four bins.
    let lookup = FixedStakeLookup(BigInt::from(1_000_000_000_000u64));
    let reward = compute_reward(&claim(ACTIVATION, 1000), &params, &lookup).await.unwrap();
    assert_eq!(reward.stake_weight, Dec::from(4));
    assert_eq!(reward.gross, dec("33.844"));
    assert_eq!(reward.tokens_per_relay, dec("0.033844"));
}

#[tokio::test]
async fn test_stake_weighted_fractional_exponent() {
    let mut params = params_at(ACTIVATION);
    if let Some(scaling) = params.stake_scaling.as_mut() {
        scaling.stake_floor_multiplier_exponent = dec("0.5");
        scaling.stake_weight_multiplier = dec("2");
    }
    let lookup = FixedStakeLookup(BigInt::from(SERVICER_STAKE));

    // sqrt(4 bins) / 2
    let reward = compute_reward(&claim(ACTIVATION, 1000), &params, &lookup).await.unwrap();
    assert_eq!(reward.stake_weight, Dec::one());
    assert_eq!(reward.gross, dec("8.461"));
}

#[tokio::test]
async fn test_stake_weighted_errors() {
    let mut params = params_at(ACTIVATION);
    params.stake_scaling = None;
    let err = compute_reward(&claim(ACTIVATION, 10), &params, &PanickingStakeLookup)
        .await
        .unwrap_err();
    assert!(matches!(err, RewardsError::MissingStakeScaling { height: ACTIVATION }));
    assert_eq!(err.to_string(), "stake scaling parameters were not resolved for height 69243");

    let mut params = params_at(ACTIVATION);
    if let Some(scaling) = params.stake_scaling.as_mut() {
        scaling.stake_floor_multiplier = BigInt::from(0);
    }
    let err = compute_reward(&claim(ACTIVATION, 10), &params, &PanickingStakeLookup)
        .await
        .unwrap_err();
    assert!(matches!(err, RewardsError::ZeroFloorMultiplier { height: ACTIVATION }));
}

#[tokio::test]
async fn test_stake_is_read_from_node_state() {
    let provider = CountingProvider::new(common::servicer_snapshot());
    let lookup = ProviderStakeLookup(&provider);

    let below = ParamResolver::new(&provider, ACTIVATION).resolve(69000, false).await.unwrap();
    compute_reward(&claim(69000, 1000), &below, &lookup).await.unwrap();
    assert_eq!(provider.node_calls(), 0);

    let above = ParamResolver::new(&provider, ACTIVATION).resolve(69300, false).await.unwrap();
    let reward = compute_reward(&claim(69300, 1000), &above, &lookup).await.unwrap();
    assert_eq!(provider.node_calls(), 1);
    assert_eq!(reward.stake_weight, Dec::from(4));

    let unknown = Transaction::try_from(RawTransaction::claim(
        "u", 69300, "nobody", 69290, "app", CHAIN, 10,
    ))
    .unwrap();
    let err = compute_reward(&unknown, &above, &lookup).await.unwrap_err();
    assert!(matches!(err, RewardsError::StakeLookup { height: 69300, .. }));
}

#[tokio::test]
async fn test_malformed_stake_is_a_lookup_error() {
    let provider = SnapshotProvider::default().with_node(relay_rewards::NodeInfo {
        address: SERVICER.to_string(),
        staked_balance: "not a number".to_string(),
        ..Default::default()
    });
    let err = compute_reward(
        &claim(ACTIVATION, 10),
        &params_at(ACTIVATION),
        &ProviderStakeLookup(&provider),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RewardsError::StakeLookup { .. }));
}
