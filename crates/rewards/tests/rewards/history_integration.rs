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

use relay_rewards::{SortOrder, TransactionPager, LISTING_PAGE_SIZE};

use super::common::{PagedProvider, SERVICER};

#[tokio::test]
async fn test_short_page_ends_pagination() {
    let provider = PagedProvider::new(vec![1000, 1000, 437, 1000]);
    let all = TransactionPager::new(&provider, SERVICER, LISTING_PAGE_SIZE, SortOrder::Desc)
        .collect_all()
        .await
        .unwrap();

    assert_eq!(all.len(), 2437);
    assert_eq!(provider.calls(), 3);
    assert_eq!(all.last().map(|tx| tx.height), Some(3));
}

#[tokio::test]
async fn test_full_last_page_needs_one_more_fetch() {
    let provider = PagedProvider::new(vec![1000, 1000]);
    let all = TransactionPager::new(&provider, SERVICER, LISTING_PAGE_SIZE, SortOrder::Desc)
        .collect_all()
        .await
        .unwrap();

    assert_eq!(all.len(), 2000);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_pages_are_fetched_in_order_from_start() {
    let provider = PagedProvider::new(vec![10, 10, 10, 4]);
    let mut pager =
        TransactionPager::new(&provider, SERVICER, 10, SortOrder::Asc).starting_at(2);

    let mut heights = Vec::new();
    while let Some(page) = pager.next_page().await.unwrap() {
        heights.push(page.first().map(|tx| tx.height));
    }
    assert_eq!(heights, vec![Some(2), Some(3), Some(4)]);
    assert!(pager.is_exhausted());
    assert!(pager.next_page().await.unwrap().is_none());
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_zero_page_size_is_clamped() {
    let provider = PagedProvider::new(vec![1, 1, 0]);
    let all =
        TransactionPager::new(&provider, SERVICER, 0, SortOrder::Desc).collect_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(provider.calls(), 3);
}
