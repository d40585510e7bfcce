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

//! Month-by-month aggregation of a servicer's claims.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Datelike, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::{numeric::Dec, transaction::Transaction};

/// Day names indexed by `Weekday::num_days_from_sunday`.
pub const WEEKDAY_NAMES: [&str; 7] =
    ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"];

/// Calendar month in UTC. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(time: &DateTime<Utc>) -> Self {
        Self { year: time.year(), month: time.month() }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Claims of one month and the statistics derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReward {
    pub key: MonthKey,
    /// Relays of the confirmed claims.
    pub total_relays: BigInt,
    /// Every claim of the month, ascending by time once aggregated.
    pub transactions: Vec<Transaction>,
    /// Relays of the confirmed claims per weekday, Sunday first.
    pub relays_by_weekday: [BigInt; 7],
    pub avg_secs_between_rewards: f64,
    pub total_secs_between_rewards: f64,
}

impl MonthlyReward {
    pub fn new(key: MonthKey) -> Self {
        Self {
            key,
            total_relays: BigInt::default(),
            transactions: Vec::new(),
            relays_by_weekday: Default::default(),
            avg_secs_between_rewards: 0.0,
            total_secs_between_rewards: 0.0,
        }
    }

    fn confirmed(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|tx| tx.is_confirmed)
    }

    /// Gross tokens of the confirmed claims.
    pub fn token_amount(&self) -> Dec {
        self.confirmed().map(|tx| &tx.reward.gross).sum()
    }

    /// Net tokens of the confirmed claims.
    pub fn net_token_amount(&self) -> Dec {
        self.confirmed().map(|tx| &tx.reward.net).sum()
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed().count()
    }

    /// Relays per chain over every claim of the month.
    pub fn relays_by_chain(&self) -> BTreeMap<String, BigInt> {
        let mut by_chain: BTreeMap<String, BigInt> = BTreeMap::new();
        for tx in &self.transactions {
            *by_chain.entry(tx.chain_id.clone()).or_default() += &tx.num_relays;
        }
        by_chain
    }

    fn finalize(&mut self) {
        self.transactions.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.hash.cmp(&b.hash)));

        let mut previous: Option<DateTime<Utc>> = None;
        let mut pairs = 0u32;
        let mut total_secs = 0.0;
        for tx in &self.transactions {
            let Some(time) = tx.time else { continue };
            if tx.is_confirmed {
                let day = time.weekday().num_days_from_sunday() as usize;
                self.relays_by_weekday[day] += &tx.num_relays;
            }

            // Timing spans every claim of the month, confirmed or not.
            if let Some(prev) = previous {
                total_secs += (time - prev).num_milliseconds() as f64 / 1000.0;
                pairs += 1;
            }
            previous = Some(time);
        }

        self.total_secs_between_rewards = total_secs;
        self.avg_secs_between_rewards = if pairs == 0 { 0.0 } else { total_secs / pairs as f64 };
    }
}

/// Group claims by the UTC month of their block time.
pub fn aggregate_monthly(
    claims: impl IntoIterator<Item = Transaction>,
) -> BTreeMap<MonthKey, MonthlyReward> {
    let mut months: BTreeMap<MonthKey, MonthlyReward> = BTreeMap::new();

    for tx in claims {
        let Some(time) = tx.time else {
            tracing::warn!(
                "Skipping transaction {} at height {} without a block time",
                tx.hash,
                tx.height
            );
            continue;
        };
        let key = MonthKey::of(&time);
        let month = months.entry(key).or_insert_with(|| MonthlyReward::new(key));
        if tx.is_confirmed {
            month.total_relays += &tx.num_relays;
        }
        month.transactions.push(tx);
    }

    for month in months.values_mut() {
        month.finalize();
    }
    months
}
