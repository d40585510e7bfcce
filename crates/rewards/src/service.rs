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

//! Rewards queries over a [PocketProvider].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
    error::{ProviderResultExt, RewardsError},
    history::{ClaimsAndProofs, TransactionPager, HISTORY_PAGE_SIZE, LISTING_PAGE_SIZE},
    monthly::{aggregate_monthly, MonthKey, MonthlyReward},
    params::{ParamResolver, ParameterSet, REWARD_SCALING_ACTIVATION_HEIGHT},
    provider::{NodeInfo, PocketProvider, SortOrder},
    reward::{compute_reward, ProviderStakeLookup, Reward},
    transaction::{Transaction, TxType},
};

/// Configuration of a [RewardsService].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardsConfig {
    /// Height from which the stake-weighted formula applies.
    pub activation_height: u64,
    /// Page size used when walking an account's complete history.
    pub history_page_size: u32,
    /// Page size used by bounded transaction listings.
    pub listing_page_size: u32,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            activation_height: REWARD_SCALING_ACTIVATION_HEIGHT,
            history_page_size: HISTORY_PAGE_SIZE,
            listing_page_size: LISTING_PAGE_SIZE,
        }
    }
}

/// Entry point for reward queries. Holds no mutable state; every call reads through the
/// provider.
pub struct RewardsService<P> {
    provider: P,
    config: RewardsConfig,
}

impl<P: PocketProvider> RewardsService<P> {
    pub fn new(provider: P, config: RewardsConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &RewardsConfig {
        &self.config
    }

    pub async fn height(&self) -> Result<u64, RewardsError> {
        self.provider.height().await.during("height")
    }

    /// A single transaction with its block time and reward.
    pub async fn transaction(&self, hash: &str) -> Result<Transaction, RewardsError> {
        let raw = self.provider.transaction(hash).await.during("transaction")?;
        let tx = Transaction::try_from(raw)?;
        self.enrich(tx, None, "transaction").await
    }

    pub async fn block_times(
        &self,
        heights: &[u64],
    ) -> Result<BTreeMap<u64, DateTime<Utc>>, RewardsError> {
        let mut times = BTreeMap::new();
        for &height in heights {
            if times.contains_key(&height) {
                continue;
            }
            let time = self.provider.block_time(height).await.during("block_times")?;
            times.insert(height, time);
        }
        Ok(times)
    }

    pub async fn params_at_height(
        &self,
        height: u64,
        force_refresh: bool,
    ) -> Result<ParameterSet, RewardsError> {
        ParamResolver::new(&self.provider, self.config.activation_height)
            .resolve(height, force_refresh)
            .await
    }

    /// Reward of `tx` under the parameters in effect at its height.
    pub async fn tx_reward(&self, tx: &Transaction) -> Result<Reward, RewardsError> {
        let params = self.params_at_height(tx.height, false).await?;
        compute_reward(tx, &params, &ProviderStakeLookup(&self.provider)).await
    }

    /// Up to `per_page` enriched transactions of `address`, starting at listing page `page`,
    /// optionally restricted to one transaction type. Any failure aborts the listing.
    pub async fn account_transactions(
        &self,
        address: &str,
        page: u32,
        per_page: u32,
        sort: SortOrder,
        type_filter: Option<&TxType>,
    ) -> Result<Vec<Transaction>, RewardsError> {
        let limit = per_page as usize;
        let mut pager =
            TransactionPager::new(&self.provider, address, self.config.listing_page_size, sort)
                .starting_at(page);
        let mut txs = Vec::new();

        'pages: while txs.len() < limit {
            let Some(raws) = pager.next_page().await.during("account_transactions")? else {
                break;
            };
            for raw in raws {
                let tx = Transaction::try_from(raw)?;
                if type_filter.is_some_and(|filter| *filter != tx.tx_type) {
                    continue;
                }
                txs.push(self.enrich(tx, Some(address), "account_transactions").await?);
                if txs.len() >= limit {
                    break 'pages;
                }
            }
        }

        tracing::debug!("Listed {} transactions for {}", txs.len(), address);
        Ok(txs)
    }

    /// Every claim and proof in the history of `address`, keyed by session. Claims are enriched;
    /// transactions that fail to decode or enrich are skipped.
    pub async fn account_claims_and_proofs(
        &self,
        address: &str,
    ) -> Result<ClaimsAndProofs, RewardsError> {
        let mut pager = TransactionPager::new(
            &self.provider,
            address,
            self.config.history_page_size,
            SortOrder::Desc,
        );
        let mut sessions = ClaimsAndProofs::default();
        let mut skipped = 0usize;

        while let Some(raws) = pager.next_page().await.during("account_claims_and_proofs")? {
            for raw in raws {
                let tx = match Transaction::try_from(raw) {
                    Ok(tx) => tx,
                    Err(err) => {
                        tracing::warn!("Skipping undecodable transaction: {err}");
                        skipped += 1;
                        continue;
                    }
                };
                if matches!(tx.tx_type, TxType::Other(_)) {
                    continue;
                }
                let kind = if tx.tx_type == TxType::Claim { "claim" } else { "proof" };
                let hash = tx.hash.clone();
                let tx = match self.enrich(tx, Some(address), "account_claims_and_proofs").await {
                    Ok(enriched) => enriched,
                    Err(err) => {
                        tracing::warn!("Skipping {kind} {hash}: {err}");
                        skipped += 1;
                        continue;
                    }
                };
                sessions.insert(tx);
            }
        }

        tracing::info!(
            "Loaded {} claims and {} proofs for {} ({} skipped)",
            sessions.claims.len(),
            sessions.proofs.len(),
            address,
            skipped
        );
        Ok(sessions)
    }

    /// Monthly reward summary over the complete history of `address`.
    pub async fn rewards_by_month(
        &self,
        address: &str,
    ) -> Result<BTreeMap<MonthKey, MonthlyReward>, RewardsError> {
        let sessions = self.account_claims_and_proofs(address).await?;
        let months = aggregate_monthly(sessions.into_confirmed_claims());
        tracing::info!("Aggregated rewards of {} over {} months", address, months.len());
        Ok(months)
    }

    /// Node state of `address`, including its liquid balance.
    pub async fn node(&self, address: &str) -> Result<NodeInfo, RewardsError> {
        let mut node = self.provider.node(address).await.during("node")?;
        node.balance = self.provider.balance(address).await.during("node")?;
        Ok(node)
    }

    async fn enrich(
        &self,
        mut tx: Transaction,
        address: Option<&str>,
        operation: &'static str,
    ) -> Result<Transaction, RewardsError> {
        if tx.address.is_empty() {
            if let Some(address) = address {
                tx.address = address.to_string();
            }
        }

        let params = self.params_at_height(tx.height, false).await?;
        tx.time = Some(self.provider.block_time(tx.height).await.during(operation)?);
        tx.reward = compute_reward(&tx, &params, &ProviderStakeLookup(&self.provider)).await?;
        tx.tokens_per_relay = tx.reward.tokens_per_relay.clone();
        if let Some(expire_height) = params.expire_height(tx.height) {
            tx.expire_height = expire_height;
        }
        Ok(tx)
    }
}
