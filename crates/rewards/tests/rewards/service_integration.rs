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
    monthly_rewards_response, Dec, MonthKey, RewardsConfig, RewardsError, RewardsService,
    SnapshotProvider, SortOrder, TxType,
};
use tracing_test::traced_test;

use super::common::{self, utc, CountingProvider, SERVICER};

fn service() -> RewardsService<SnapshotProvider> {
    RewardsService::new(common::servicer_snapshot(), RewardsConfig::default())
}

fn dec(s: &str) -> Dec {
    s.parse().unwrap()
}

#[tokio::test]
#[traced_test]
async fn test_rewards_by_month() {
    let months = service().rewards_by_month(SERVICER).await.unwrap();
    assert_eq!(months.len(), 2);

    let march = &months[&MonthKey { year: 2023, month: 3 }];
    let hashes: Vec<_> =
        march.transactions.iter().map(|tx| (tx.hash.as_str(), tx.is_confirmed)).collect();
    assert_eq!(hashes, vec![("c1", true), ("c2", false), ("c3", true)]);
    assert_eq!(march.total_relays, BigInt::from(2000));
    assert_eq!(march.relays_by_weekday[0], BigInt::from(2000));
    assert_eq!(march.total_secs_between_rewards, 180.0);
    assert_eq!(march.avg_secs_between_rewards, 90.0);
    // c1 under the legacy formula, c3 stake-weighted with four bins.
    assert_eq!(march.token_amount(), dec("41.37429"));
    assert_eq!(march.net_token_amount(), dec("36.8231181"));

    let april = &months[&MonthKey { year: 2023, month: 4 }];
    assert_eq!(april.total_relays, BigInt::from(200));
    assert_eq!(april.token_amount(), dec("6.7688"));
    assert_eq!(april.avg_secs_between_rewards, 0.0);
    assert_eq!(april.relays_by_chain()["0001"], BigInt::from(200));

    let response = monthly_rewards_response(&months);
    assert_eq!((response[0].year, response[0].month), (2023, 4));
    assert_eq!(response[1].num_relays, "2000");
    assert_eq!(response[1].num_transactions, 3);
    assert_eq!(response[1].num_confirmed, 2);

    assert!(logs_contain("Skipping undecodable transaction"));
}

#[tokio::test]
async fn test_monthly_timing_spans_unconfirmed_claims() {
    // c1 confirmed at 12:00, c2 unconfirmed at 12:01, c3 confirmed at 12:03.
    let months = service().rewards_by_month(SERVICER).await.unwrap();
    let march = &months[&MonthKey { year: 2023, month: 3 }];
    assert_eq!(march.total_secs_between_rewards, 180.0);
    assert_eq!(march.avg_secs_between_rewards, 90.0);
    // Weekday buckets only count confirmed relays.
    let weekday_total: BigInt = march.relays_by_weekday.iter().sum();
    assert_eq!(weekday_total, march.total_relays);

    // Once c2's proof succeeds every pair is between confirmed claims and timing is unchanged.
    let mut snapshot = common::servicer_snapshot();
    let proofs = snapshot.account_transactions.get_mut(SERVICER).unwrap();
    for raw in proofs.iter_mut().filter(|raw| raw.hash == "p2") {
        raw.tx_result.code = 0;
    }
    let months = RewardsService::new(snapshot, RewardsConfig::default())
        .rewards_by_month(SERVICER)
        .await
        .unwrap();
    let march = &months[&MonthKey { year: 2023, month: 3 }];
    assert_eq!(march.confirmed_count(), 3);
    assert_eq!(march.total_relays, BigInt::from(2500));
    assert_eq!(march.total_secs_between_rewards, 180.0);
    assert_eq!(march.avg_secs_between_rewards, 90.0);

    let response = monthly_rewards_response(&months);
    assert_eq!(response[1].avg_secs_between_rewards, 90.0);
}

#[tokio::test]
async fn test_rewards_by_month_of_unknown_account() {
    let months = service().rewards_by_month("nobody").await.unwrap();
    assert!(months.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_claims_without_block_time_are_skipped() {
    let mut snapshot = common::servicer_snapshot();
    snapshot.block_times.remove(&69300);
    let service = RewardsService::new(snapshot, RewardsConfig::default());

    let sessions = service.account_claims_and_proofs(SERVICER).await.unwrap();
    assert_eq!(sessions.claims.len(), 3);
    assert_eq!(sessions.proofs.len(), 4);
    assert!(logs_contain("Skipping claim c3"));
    for proof in sessions.proofs.values() {
        assert!(proof.time.is_some(), "proof {} has no block time", proof.hash);
        assert_eq!(proof.address, SERVICER);
        assert_eq!(proof.expire_height, proof.height + 120);
        assert!(proof.reward.gross.is_zero());
    }

    // A proof without a block time is skipped the same way, leaving its claim unconfirmed.
    let mut snapshot = common::servicer_snapshot();
    snapshot.block_times.remove(&69004);
    let service = RewardsService::new(snapshot, RewardsConfig::default());
    let sessions = service.account_claims_and_proofs(SERVICER).await.unwrap();
    assert_eq!(sessions.proofs.len(), 3);
    assert!(logs_contain("Skipping proof p1"));
    let months = service.rewards_by_month(SERVICER).await.unwrap();
    let march = &months[&MonthKey { year: 2023, month: 3 }];
    assert_eq!(march.total_relays, BigInt::from(1000));

    let months = service.rewards_by_month(SERVICER).await.unwrap();
    let march = &months[&MonthKey { year: 2023, month: 3 }];
    assert_eq!(march.total_relays, BigInt::from(1000));
}

#[tokio::test]
async fn test_history_fetch_failure_aborts() {
    let mut provider = CountingProvider::new(common::servicer_snapshot());
    provider.fail_account_transactions = true;
    let service = RewardsService::new(provider, RewardsConfig::default());

    let err = service.rewards_by_month(SERVICER).await.unwrap_err();
    assert!(matches!(err, RewardsError::Provider { operation: "account_claims_and_proofs", .. }));
}

#[tokio::test]
async fn test_transaction_is_enriched() {
    let service = service();

    let tx = service.transaction("c3").await.unwrap();
    assert_eq!(tx.time, Some(utc(2023, 3, 5, 12, 3, 0)));
    assert_eq!(tx.expire_height, 69420);
    assert_eq!(tx.tx_type, TxType::Claim);
    assert_eq!(tx.tokens_per_relay, dec("0.033844"));
    assert_eq!(tx.reward.net, dec("30.12116"));

    let tx = service.transaction("c1").await.unwrap();
    assert_eq!(tx.tokens_per_relay, dec("0.00753029"));
    assert_eq!(service.tx_reward(&tx).await.unwrap(), tx.reward);

    let err = service.transaction("bad").await.unwrap_err();
    assert!(matches!(err, RewardsError::Decode { .. }));

    let err = service.transaction("missing").await.unwrap_err();
    assert!(matches!(err, RewardsError::Provider { operation: "transaction", .. }));
}

#[tokio::test]
async fn test_account_transactions_listing() {
    let config = RewardsConfig { listing_page_size: 2, ..Default::default() };
    let service = RewardsService::new(common::servicer_snapshot(), config);

    // Stops after three claims, in the middle of the second listing page.
    let claims = service
        .account_transactions(SERVICER, 1, 3, SortOrder::Asc, Some(&TxType::Claim))
        .await
        .unwrap();
    let hashes: Vec<_> = claims.iter().map(|tx| tx.hash.as_str()).collect();
    assert_eq!(hashes, vec!["c1", "c2", "c3"]);
    assert!(claims.iter().all(|tx| tx.time.is_some()));

    let page = service.account_transactions(SERVICER, 2, 2, SortOrder::Asc, None).await.unwrap();
    let hashes: Vec<_> = page.iter().map(|tx| tx.hash.as_str()).collect();
    assert_eq!(hashes, vec!["c2", "p2"]);
    assert!(page[1].reward.gross.is_zero());

    let none = service.account_transactions(SERVICER, 1, 0, SortOrder::Asc, None).await.unwrap();
    assert!(none.is_empty());

    // The newest transaction does not decode, so a descending listing fails.
    let err = service
        .account_transactions(SERVICER, 1, 5, SortOrder::Desc, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RewardsError::Decode { .. }));
}

#[tokio::test]
async fn test_node_block_times_and_params() {
    let service = service();

    let node = service.node(SERVICER).await.unwrap();
    assert_eq!(node.balance, 1_234_567);
    assert_eq!(node.staked_balance(), Some(BigInt::from(common::SERVICER_STAKE)));

    let times = service.block_times(&[69100, 69000, 69100]).await.unwrap();
    assert_eq!(times.keys().copied().collect::<Vec<_>>(), vec![69000, 69100]);
    assert_eq!(times[&69000], utc(2023, 3, 5, 12, 0, 0));

    let err = service.block_times(&[1]).await.unwrap_err();
    assert!(matches!(err, RewardsError::Provider { operation: "block_times", .. }));

    let params = service.params_at_height(69300, true).await.unwrap();
    assert!(params.stake_scaling.is_some());
    assert_eq!(service.height().await.unwrap(), 70000);
}
