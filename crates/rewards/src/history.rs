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

//! Account history pagination and claim/proof session matching.

use std::collections::HashMap;

use crate::{
    provider::{PocketProvider, SortOrder},
    transaction::{RawTransaction, SessionKey, Transaction, TxType},
};

/// Page size used when listing a bounded number of an account's transactions.
pub const LISTING_PAGE_SIZE: u32 = 1_000;
/// Page size used when walking an account's complete history.
pub const HISTORY_PAGE_SIZE: u32 = 10_000;

/// Walks the pages of an account's transactions in increasing page order.
///
/// A page holding fewer records than the page size is the last one; it is still yielded.
pub struct TransactionPager<'a, P: ?Sized> {
    provider: &'a P,
    address: &'a str,
    page: u32,
    page_size: u32,
    sort: SortOrder,
    exhausted: bool,
}

impl<'a, P: PocketProvider + ?Sized> TransactionPager<'a, P> {
    pub fn new(provider: &'a P, address: &'a str, page_size: u32, sort: SortOrder) -> Self {
        Self { provider, address, page: 1, page_size: page_size.max(1), sort, exhausted: false }
    }

    /// Start at `page` instead of the first page. Pages are 1-based.
    pub fn starting_at(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch the next page, or `None` once the last page was returned.
    pub async fn next_page(&mut self) -> anyhow::Result<Option<Vec<RawTransaction>>> {
        if self.exhausted {
            return Ok(None);
        }

        let txs = self
            .provider
            .account_transactions(self.address, self.page, self.page_size, self.sort)
            .await?;
        tracing::debug!(
            "Fetched page {} of transactions for {} ({} records)",
            self.page,
            self.address,
            txs.len()
        );

        if txs.len() < self.page_size as usize {
            self.exhausted = true;
        }
        self.page += 1;
        Ok(Some(txs))
    }

    /// Fetch every remaining page.
    pub async fn collect_all(mut self) -> anyhow::Result<Vec<RawTransaction>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }
}

/// Claims and proofs of an account, keyed by session.
#[derive(Debug, Clone, Default)]
pub struct ClaimsAndProofs {
    pub claims: HashMap<SessionKey, Transaction>,
    pub proofs: HashMap<SessionKey, Transaction>,
}

impl ClaimsAndProofs {
    /// Record a transaction under its session key. A later transaction for the same session
    /// replaces the earlier one. Returns `false` for transactions that are neither claims nor
    /// proofs.
    pub fn insert(&mut self, tx: Transaction) -> bool {
        let map = match tx.tx_type {
            TxType::Claim => &mut self.claims,
            TxType::Proof => &mut self.proofs,
            TxType::Other(_) => return false,
        };
        map.insert(tx.session_key(), tx);
        true
    }

    /// A session is confirmed when its proof exists and succeeded.
    pub fn is_confirmed(&self, key: &SessionKey) -> bool {
        self.proofs.get(key).is_some_and(|proof| proof.result_code == 0)
    }

    /// All claims, with their confirmation flag resolved.
    pub fn into_confirmed_claims(mut self) -> Vec<Transaction> {
        let claims = std::mem::take(&mut self.claims);
        claims
            .into_iter()
            .map(|(key, mut claim)| {
                claim.is_confirmed = self.is_confirmed(&key);
                claim
            })
            .collect()
    }
}
