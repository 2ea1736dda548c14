use std::{fmt, path::Path, str::FromStr};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{hash::hex_u256, Compact, ParamsError, U256};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Testnet,
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Network::Main => "main",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(format!("Unknown network: {}", other)),
        }
    }
}

/// One step of the post-fork timespan schedule. Applies to tips fewer than
/// `until` blocks past the activation height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimespanStep {
    pub until: u64,
    pub timespan: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkParams {
    pub activation_height: u64,

    /// Number of blocks after activation during which `timespan_schedule` replaces
    /// the regular timespan.
    #[serde(default)]
    pub retarget_window: u64,

    #[serde(default)]
    pub timespan_schedule: Vec<TimespanStep>,
}

impl ForkParams {
    pub fn retarget_period_end(&self) -> u64 {
        self.activation_height.saturating_add(self.retarget_window)
    }
}

/// Network-wide difficulty rules. Built once and passed by reference to every
/// consensus call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    #[serde(with = "hex_u256")]
    pub pow_limit: U256,

    pub target_spacing: i64,
    pub target_timespan: i64,

    #[serde(default)]
    pub allow_min_difficulty_blocks: bool,

    #[serde(default)]
    pub no_retargeting: bool,

    /// Operator override: ignore the min-difficulty and no-retargeting relaxations.
    #[serde(default)]
    pub force_retarget: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork: Option<ForkParams>,
}

impl ConsensusParams {
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Main => ConsensusParams {
                pow_limit: crate::MAIN_POW_LIMIT,
                target_spacing: crate::MAIN_TARGET_SPACING,
                target_timespan: crate::MAIN_TARGET_TIMESPAN,
                allow_min_difficulty_blocks: false,
                no_retargeting: false,
                force_retarget: false,
                fork: None,
            },
            Network::Testnet => ConsensusParams {
                allow_min_difficulty_blocks: true,
                ..Self::for_network(Network::Main)
            },
            Network::Regtest => ConsensusParams {
                pow_limit: crate::REGTEST_POW_LIMIT,
                allow_min_difficulty_blocks: true,
                no_retargeting: true,
                ..Self::for_network(Network::Main)
            },
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read consensus params from {}", path.display()))?;
        let params: ConsensusParams = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse consensus params in {}", path.display()))?;
        params
            .validate()
            .with_context(|| format!("Invalid consensus params in {}", path.display()))?;
        Ok(params)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize consensus params")
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.pow_limit.is_zero() {
            return Err(ParamsError::ZeroPowLimit);
        }
        if self.target_spacing <= 0 {
            return Err(ParamsError::NonPositiveSpacing(self.target_spacing));
        }

        // Retargeting clamps the measured window to four timespans.
        let max_timespan = i64::MAX / 4;
        let check_timespan = |timespan: i64| {
            if timespan < self.target_spacing {
                Err(ParamsError::TimespanBelowSpacing {
                    timespan,
                    spacing: self.target_spacing,
                })
            } else if timespan > max_timespan {
                Err(ParamsError::TimespanTooLong {
                    timespan,
                    max: max_timespan,
                })
            } else {
                Ok(())
            }
        };

        check_timespan(self.target_timespan)?;

        if let Some(fork) = &self.fork {
            let mut previous_bound: Option<u64> = None;
            for step in &fork.timespan_schedule {
                check_timespan(step.timespan)?;
                if previous_bound.is_some_and(|bound| step.until <= bound) {
                    return Err(ParamsError::UnorderedSchedule);
                }
                previous_bound = Some(step.until);
            }
        }

        Ok(())
    }

    pub fn pow_limit_compact(&self) -> Compact {
        Compact::from_target(&self.pow_limit)
    }

    /// Blocks between retargets under the regular timespan.
    pub fn retarget_interval(&self) -> u64 {
        (self.target_timespan / self.target_spacing) as u64
    }

    pub fn is_fork_activation(&self, height: u64) -> bool {
        self.fork
            .as_ref()
            .is_some_and(|fork| fork.activation_height == height)
    }

    pub fn is_past_fork(&self, height: u64) -> bool {
        self.fork
            .as_ref()
            .is_some_and(|fork| height >= fork.activation_height)
    }

    pub fn in_fork_retarget_window(&self, height: u64) -> bool {
        self.fork.as_ref().is_some_and(|fork| {
            height >= fork.activation_height && height < fork.retarget_period_end()
        })
    }

    /// Timespan a retarget measured from a tip at `height` is scaled against.
    pub fn target_timespan_at(&self, height: u64) -> i64 {
        let Some(fork) = &self.fork else {
            return self.target_timespan;
        };
        if !self.in_fork_retarget_window(height) {
            return self.target_timespan;
        }

        let since_activation = height - fork.activation_height;
        fork.timespan_schedule
            .iter()
            .find(|step| since_activation < step.until)
            .map_or(self.target_timespan, |step| step.timespan)
    }

    pub fn retarget_interval_at(&self, height: u64) -> u64 {
        (self.target_timespan_at(height) / self.target_spacing) as u64
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::for_network(Network::Main)
    }
}
