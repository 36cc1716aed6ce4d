use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::Duration;

pub const SHARING_OVERRIDE_VAR: &str = "TIERGUARD_SHARING_OVERRIDE";
pub const MAX_ROLE_DEPTH_VAR: &str = "TIERGUARD_MAX_ROLE_DEPTH";
pub const TOKEN_LEEWAY_VAR: &str = "TIERGUARD_TOKEN_LEEWAY_SECS";

/// Largest accepted token leeway: one day.
pub const MAX_TOKEN_LEEWAY_SECS: i64 = 86_400;

/// Tunables of the policy decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Let a resource's sharing settings stand in for failed containment.
    pub sharing_override: bool,
    /// Longest accepted role inheritance chain.
    pub max_role_depth: usize,
    /// Clock-skew allowance for token time windows, in seconds.
    pub token_leeway_secs: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            sharing_override: true,
            max_role_depth: 16,
            token_leeway_secs: 0,
        }
    }
}

impl PolicyConfig {
    /// Read from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through `lookup`; unset keys keep their default and unparsable
    /// values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            sharing_override: parse_or(&lookup, SHARING_OVERRIDE_VAR, defaults.sharing_override),
            max_role_depth: parse_or(&lookup, MAX_ROLE_DEPTH_VAR, defaults.max_role_depth),
            token_leeway_secs: parse_within(
                &lookup,
                TOKEN_LEEWAY_VAR,
                defaults.token_leeway_secs,
                0..=MAX_TOKEN_LEEWAY_SECS,
            ),
        }
    }

    /// The leeway as a duration, clamped to `0..=MAX_TOKEN_LEEWAY_SECS`.
    pub fn token_leeway(&self) -> Duration {
        Duration::seconds(self.token_leeway_secs.clamp(0, MAX_TOKEN_LEEWAY_SECS))
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + core::fmt::Debug,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, ?default, "invalid policy setting; using default");
        default
    })
}

fn parse_within<T, F>(lookup: &F, key: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: FromStr + PartialOrd + Copy + core::fmt::Debug,
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default);
    if range.contains(&value) {
        return value;
    }
    tracing::warn!(key, ?value, ?range, ?default, "policy setting out of range; using default");
    default
}
