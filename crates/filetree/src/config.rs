// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bounds of the preload queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreloadConfig {
    /// Loads running at once
    pub max_concurrent: usize,
    /// Loads waiting to start; the oldest is dropped beyond this
    pub max_enqueued: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            max_enqueued: 10,
        }
    }
}

impl PreloadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::validation("max_concurrent must be at least 1"));
        }
        if self.max_enqueued == 0 {
            return Err(Error::validation("max_enqueued must be at least 1"));
        }
        Ok(())
    }
}

/// How remote structural operations reach the local tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPolicy {
    /// Only watch events change the tree
    #[default]
    WatchDriven,
    /// Successful remote calls are also applied locally right away
    Optimistic,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    pub enable_preload: bool,
    pub preload: PreloadConfig,
    pub mutation_policy: MutationPolicy,
}
