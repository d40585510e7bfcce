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

//! Relay claim and proof transactions.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::{
    error::RewardsError,
    numeric::{parse_int, Dec},
    reward::Reward,
};

pub const TYPE_CLAIM: &str = "pocketcore/claim";
pub const TYPE_PROOF: &str = "pocketcore/proof";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TxType {
    Claim,
    Proof,
    Other(String),
}

impl TxType {
    pub fn as_str(&self) -> &str {
        match self {
            TxType::Claim => TYPE_CLAIM,
            TxType::Proof => TYPE_PROOF,
            TxType::Other(other) => other,
        }
    }
}

impl From<&str> for TxType {
    fn from(value: &str) -> Self {
        match value {
            TYPE_CLAIM => TxType::Claim,
            TYPE_PROOF => TxType::Proof,
            other => TxType::Other(other.to_string()),
        }
    }
}

impl FromStr for TxType {
    type Err = std::convert::Infallible;

    /// Accepts the full message type or the short `claim` / `proof` forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "claim" => TxType::Claim,
            "proof" => TxType::Proof,
            other => TxType::from(other),
        })
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a relay session. A claim and the proof that substantiates it share a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey {
    pub session_height: u64,
    pub app_pubkey: String,
    pub chain_id: String,
}

/// A decoded transaction, enriched with its block time and reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: String,
    pub height: u64,
    pub time: Option<DateTime<Utc>>,
    /// Servicer that submitted the transaction.
    pub address: String,
    pub tx_type: TxType,
    pub chain_id: String,
    pub num_relays: BigInt,
    pub tokens_per_relay: Dec,
    pub session_height: u64,
    pub expire_height: u64,
    pub app_pubkey: String,
    pub result_code: i64,
    pub is_confirmed: bool,
    pub reward: Reward,
}

impl Transaction {
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            session_height: self.session_height,
            app_pubkey: self.app_pubkey.clone(),
            chain_id: self.chain_id.clone(),
        }
    }
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = RewardsError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        let decode_err =
            |reason: String| RewardsError::Decode { hash: raw.hash.clone(), reason };
        let value = &raw.std_tx.msg.value;

        let num_relays = if value.total_proofs.is_empty() {
            BigInt::default()
        } else {
            parse_int(&value.total_proofs).ok_or_else(|| {
                decode_err(format!("invalid total_proofs {:?}", value.total_proofs))
            })?
        };
        let parse_session_height = |s: &str| {
            s.parse::<u64>().map_err(|e| decode_err(format!("invalid session height {s:?}: {e}")))
        };

        let tx_type = TxType::from(raw.std_tx.msg.msg_type.as_str());
        let (session_height, app_pubkey, chain_id) = match tx_type {
            TxType::Claim => (
                parse_session_height(&value.header.session_height)?,
                value.header.app_public_key.clone(),
                value.header.chain.clone(),
            ),
            TxType::Proof => {
                let leaf = &value.leaf.value;
                (
                    parse_session_height(&leaf.session_block_height)?,
                    leaf.aat.app_pub_key.clone(),
                    leaf.blockchain.clone(),
                )
            }
            TxType::Other(_) => (0, String::new(), value.header.chain.clone()),
        };

        Ok(Transaction {
            address: value.from_address.clone(),
            tx_type,
            chain_id,
            num_relays,
            tokens_per_relay: Dec::zero(),
            session_height,
            expire_height: 0,
            app_pubkey,
            result_code: raw.tx_result.code,
            is_confirmed: false,
            reward: Reward::zero(),
            time: None,
            height: raw.height,
            hash: raw.hash,
        })
    }
}

/// Transaction as returned by the chain's account and transaction queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub height: u64,
    #[serde(rename = "stdTx", default)]
    pub std_tx: RawStdTx,
    #[serde(default)]
    pub tx_result: RawTxResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStdTx {
    #[serde(default)]
    pub msg: RawMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type", default)]
    pub msg_type: String,
    #[serde(default)]
    pub value: RawMessageValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessageValue {
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub header: RawSessionHeader,
    #[serde(default)]
    pub total_proofs: String,
    #[serde(default)]
    pub leaf: RawLeaf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSessionHeader {
    #[serde(default)]
    pub app_public_key: String,
    #[serde(default)]
    pub chain: String,
    #[serde(default)]
    pub session_height: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLeaf {
    #[serde(default)]
    pub value: RawLeafValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLeafValue {
    #[serde(default)]
    pub blockchain: String,
    #[serde(default)]
    pub session_block_height: String,
    #[serde(default)]
    pub aat: RawAat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAat {
    #[serde(default)]
    pub app_pub_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTxResult {
    #[serde(default)]
    pub code: i64,
}

impl RawTransaction {
    /// Claim for `total_proofs` relays in the session at `session_height`.
    pub fn claim(
        hash: &str,
        height: u64,
        from_address: &str,
        session_height: u64,
        app_pubkey: &str,
        chain: &str,
        total_proofs: u64,
    ) -> Self {
        let mut raw = Self::with_type(hash, height, from_address, TYPE_CLAIM);
        raw.std_tx.msg.value.total_proofs = total_proofs.to_string();
        raw.std_tx.msg.value.header = RawSessionHeader {
            app_public_key: app_pubkey.to_string(),
            chain: chain.to_string(),
            session_height: session_height.to_string(),
        };
        raw
    }

    /// Proof for the session at `session_height`, with result `code`.
    pub fn proof(
        hash: &str,
        height: u64,
        from_address: &str,
        session_height: u64,
        app_pubkey: &str,
        chain: &str,
        code: i64,
    ) -> Self {
        let mut raw = Self::with_type(hash, height, from_address, TYPE_PROOF);
        raw.std_tx.msg.value.leaf.value = RawLeafValue {
            blockchain: chain.to_string(),
            session_block_height: session_height.to_string(),
            aat: RawAat { app_pub_key: app_pubkey.to_string() },
        };
        raw.tx_result.code = code;
        raw
    }

    fn with_type(hash: &str, height: u64, from_address: &str, msg_type: &str) -> Self {
        let mut raw = RawTransaction { hash: hash.to_string(), height, ..Default::default() };
        raw.std_tx.msg.msg_type = msg_type.to_string();
        raw.std_tx.msg.value.from_address = from_address.to_string();
        raw
    }
}
