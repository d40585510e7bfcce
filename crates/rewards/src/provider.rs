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

//! Chain data access used by the rewards computations.

use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::{numeric::parse_int, params::ParamBatch, transaction::RawTransaction};

/// Ordering of an account's transaction history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => anyhow::bail!("unknown sort order '{other}', expected 'asc' or 'desc'"),
        }
    }
}

/// Servicer node state as reported by the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub address: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(rename = "jailed", default)]
    pub is_jailed: bool,
    #[serde(default)]
    pub output_address: String,
    #[serde(default)]
    pub service_url: String,
    /// Staked balance in micro-units, as an integer string.
    #[serde(rename = "tokens", default)]
    pub staked_balance: String,
    /// Liquid balance in micro-units. Not part of the node query; filled in by the service.
    #[serde(default)]
    pub balance: u64,
}

impl NodeInfo {
    pub fn staked_balance(&self) -> Option<BigInt> {
        parse_int(&self.staked_balance)
    }
}

/// Access to chain state. Implementations own transport, caching and retries; every method may
/// fail with a transport or decoding error.
#[async_trait]
pub trait PocketProvider: Send + Sync {
    /// Current chain height.
    async fn height(&self) -> anyhow::Result<u64>;

    /// Timestamp of the block at `height`.
    async fn block_time(&self, height: u64) -> anyhow::Result<DateTime<Utc>>;

    /// One page of an account's transactions. Pages are 1-based.
    async fn account_transactions(
        &self,
        address: &str,
        page: u32,
        per_page: u32,
        sort: SortOrder,
    ) -> anyhow::Result<Vec<RawTransaction>>;

    async fn transaction(&self, hash: &str) -> anyhow::Result<RawTransaction>;

    async fn node(&self, address: &str) -> anyhow::Result<NodeInfo>;

    async fn node_at_height(&self, address: &str, height: u64) -> anyhow::Result<NodeInfo>;

    async fn balance(&self, address: &str) -> anyhow::Result<u64>;

    /// Value of a single parameter at `height`. An empty string means the key is unknown.
    async fn param(&self, key: &str, height: u64) -> anyhow::Result<String>;

    /// Snapshot of all parameter groups at `height`. May be served from a stale cache unless
    /// `force_refresh` is set.
    async fn all_params(&self, height: u64, force_refresh: bool) -> anyhow::Result<ParamBatch>;
}

#[async_trait]
impl<P: PocketProvider + ?Sized> PocketProvider for Arc<P> {
    async fn height(&self) -> anyhow::Result<u64> {
        (**self).height().await
    }

    async fn block_time(&self, height: u64) -> anyhow::Result<DateTime<Utc>> {
        (**self).block_time(height).await
    }

    async fn account_transactions(
        &self,
        address: &str,
        page: u32,
        per_page: u32,
        sort: SortOrder,
    ) -> anyhow::Result<Vec<RawTransaction>> {
        (**self).account_transactions(address, page, per_page, sort).await
    }

    async fn transaction(&self, hash: &str) -> anyhow::Result<RawTransaction> {
        (**self).transaction(hash).await
    }

    async fn node(&self, address: &str) -> anyhow::Result<NodeInfo> {
        (**self).node(address).await
    }

    async fn node_at_height(&self, address: &str, height: u64) -> anyhow::Result<NodeInfo> {
        (**self).node_at_height(address, height).await
    }

    async fn balance(&self, address: &str) -> anyhow::Result<u64> {
        (**self).balance(address).await
    }

    async fn param(&self, key: &str, height: u64) -> anyhow::Result<String> {
        (**self).param(key, height).await
    }

    async fn all_params(&self, height: u64, force_refresh: bool) -> anyhow::Result<ParamBatch> {
        (**self).all_params(height, force_refresh).await
    }
}
