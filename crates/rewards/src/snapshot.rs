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

//! [PocketProvider] serving chain data from a JSON snapshot.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    params::{ParamBatch, ParamKey},
    provider::{NodeInfo, PocketProvider, SortOrder},
    transaction::RawTransaction,
};

/// Recorded chain state.
///
/// Height-indexed entries (`node_history`, `params`, `param_batches`) hold the value that took
/// effect at their height; a query at height `h` sees the latest entry at or below `h`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotProvider {
    pub height: u64,
    pub block_times: BTreeMap<u64, DateTime<Utc>>,
    /// Raw transactions per account, ascending by height.
    pub account_transactions: HashMap<String, Vec<RawTransaction>>,
    pub transactions: HashMap<String, RawTransaction>,
    pub nodes: HashMap<String, NodeInfo>,
    pub node_history: HashMap<String, BTreeMap<u64, NodeInfo>>,
    pub balances: HashMap<String, u64>,
    /// Parameter key to `{from_height: value}`.
    pub params: HashMap<String, BTreeMap<u64, String>>,
    pub param_batches: BTreeMap<u64, ParamBatch>,
}

fn at_or_below<V>(entries: &BTreeMap<u64, V>, height: u64) -> Option<&V> {
    entries.range(..=height).next_back().map(|(_, v)| v)
}

impl SnapshotProvider {
    pub async fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
        let snapshot = Self::from_json(&data)
            .with_context(|| format!("Failed to decode snapshot from: {}", path.display()))?;
        tracing::debug!(
            "Loaded snapshot {} at height {} ({} accounts)",
            path.display(),
            snapshot.height,
            snapshot.account_transactions.len()
        );
        Ok(snapshot)
    }

    /// Decode a snapshot. Account histories are sorted by height and every transaction in them
    /// is retrievable by hash; entries under `transactions` take precedence.
    pub fn from_json(data: &[u8]) -> anyhow::Result<Self> {
        let mut snapshot: Self = serde_json::from_slice(data)?;
        for txs in snapshot.account_transactions.values_mut() {
            txs.sort_by_key(|tx| tx.height);
            for tx in txs.iter() {
                snapshot.transactions.entry(tx.hash.clone()).or_insert_with(|| tx.clone());
            }
        }
        Ok(snapshot)
    }

    pub fn with_height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    pub fn with_block_time(mut self, height: u64, time: DateTime<Utc>) -> Self {
        self.block_times.insert(height, time);
        self
    }

    /// Append transactions to the history of `address`. They are also retrievable by hash.
    pub fn with_account_transactions(
        mut self,
        address: &str,
        txs: impl IntoIterator<Item = RawTransaction>,
    ) -> Self {
        let history = self.account_transactions.entry(address.to_string()).or_default();
        for tx in txs {
            self.transactions.insert(tx.hash.clone(), tx.clone());
            history.push(tx);
        }
        history.sort_by_key(|tx| tx.height);
        self
    }

    pub fn with_node(mut self, node: NodeInfo) -> Self {
        self.nodes.insert(node.address.clone(), node);
        self
    }

    /// Node state taking effect at `height`.
    pub fn with_node_at(mut self, height: u64, node: NodeInfo) -> Self {
        self.node_history.entry(node.address.clone()).or_default().insert(height, node);
        self
    }

    pub fn with_balance(mut self, address: &str, balance: u64) -> Self {
        self.balances.insert(address.to_string(), balance);
        self
    }

    /// Parameter value taking effect at `height`.
    pub fn with_param(mut self, key: ParamKey, height: u64, value: impl Into<String>) -> Self {
        self.params.entry(key.as_str().to_string()).or_default().insert(height, value.into());
        self
    }

    /// Parameter batch taking effect at `height`.
    pub fn with_param_batch(mut self, height: u64, batch: ParamBatch) -> Self {
        self.param_batches.insert(height, batch);
        self
    }
}

#[async_trait]
impl PocketProvider for SnapshotProvider {
    async fn height(&self) -> anyhow::Result<u64> {
        Ok(self.height)
    }

    async fn block_time(&self, height: u64) -> anyhow::Result<DateTime<Utc>> {
        match self.block_times.get(&height) {
            Some(time) => Ok(*time),
            None => bail!("no block time recorded for height {height}"),
        }
    }

    async fn account_transactions(
        &self,
        address: &str,
        page: u32,
        per_page: u32,
        sort: SortOrder,
    ) -> anyhow::Result<Vec<RawTransaction>> {
        let Some(history) = self.account_transactions.get(address) else {
            return Ok(Vec::new());
        };
        let skip = (page.max(1) as usize - 1).saturating_mul(per_page as usize);
        let page: Vec<RawTransaction> = match sort {
            SortOrder::Asc => history.iter().skip(skip).take(per_page as usize).cloned().collect(),
            SortOrder::Desc => {
                history.iter().rev().skip(skip).take(per_page as usize).cloned().collect()
            }
        };
        Ok(page)
    }

    async fn transaction(&self, hash: &str) -> anyhow::Result<RawTransaction> {
        self.transactions
            .get(hash)
            .cloned()
            .with_context(|| format!("transaction {hash} not found"))
    }

    async fn node(&self, address: &str) -> anyhow::Result<NodeInfo> {
        self.nodes.get(address).cloned().with_context(|| format!("node {address} not found"))
    }

    /// Falls back to the current node state when no history is recorded for `address`.
    async fn node_at_height(&self, address: &str, height: u64) -> anyhow::Result<NodeInfo> {
        if let Some(history) = self.node_history.get(address) {
            return at_or_below(history, height)
                .cloned()
                .with_context(|| format!("node {address} not found at height {height}"));
        }
        self.node(address).await
    }

    async fn balance(&self, address: &str) -> anyhow::Result<u64> {
        self.balances
            .get(address)
            .copied()
            .with_context(|| format!("balance of {address} not found"))
    }

    async fn param(&self, key: &str, height: u64) -> anyhow::Result<String> {
        Ok(self
            .params
            .get(key)
            .and_then(|history| at_or_below(history, height))
            .cloned()
            .unwrap_or_default())
    }

    /// An empty batch when none is recorded at or below `height`.
    async fn all_params(&self, height: u64, _force_refresh: bool) -> anyhow::Result<ParamBatch> {
        Ok(at_or_below(&self.param_batches, height).cloned().unwrap_or_default())
    }
}
