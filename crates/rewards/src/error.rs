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

use thiserror::Error;

use crate::{numeric::NumericError, params::ParamKey};

#[derive(Error, Debug)]
pub enum RewardsError {
    #[error("parameter '{key}' not found at height {height}")]
    MissingParameter { key: ParamKey, height: u64 },

    #[error("failed to parse parameter '{key}' from value {value:?}")]
    ParameterFormat { key: ParamKey, value: String },

    #[error("{operation}: provider error: {source:#}")]
    Provider {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to look up stake of {address} at height {height}: {source:#}")]
    StakeLookup {
        address: String,
        height: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("stake scaling parameters were not resolved for height {height}")]
    MissingStakeScaling { height: u64 },

    #[error("stake floor multiplier is zero at height {height}")]
    ZeroFloorMultiplier { height: u64 },

    #[error("failed to decode transaction {hash}: {reason}")]
    Decode { hash: String, reason: String },

    #[error("numeric error: {0}")]
    Numeric(#[from] NumericError),
}

/// Attach the name of the running operation to a provider failure.
pub(crate) trait ProviderResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T, RewardsError>;
}

impl<T> ProviderResultExt<T> for anyhow::Result<T> {
    fn during(self, operation: &'static str) -> Result<T, RewardsError> {
        self.map_err(|source| RewardsError::Provider { operation, source })
    }
}
