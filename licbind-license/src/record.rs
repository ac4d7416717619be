//! The persisted license record.
//!
//! Field names on disk are stable; optional fields default when missing so
//! older records (for example ones written before `usage_map` existed) still
//! load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Term requested when creating a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseTerm {
    /// A fixed number of distinct usage days.
    Days(u32),
    /// Unlimited usage.
    Lifetime,
    /// The configured default number of days.
    Default,
}

/// Parameters for creating a new license.
#[derive(Debug, Clone)]
pub struct CreateLicenseRequest {
    /// Product identifier; also names the license file.
    pub product_name: String,
    /// Requested term.
    pub term: LicenseTerm,
}

impl CreateLicenseRequest {
    /// Creates a request for `product_name` with `term`.
    pub fn new(product_name: impl Into<String>, term: LicenseTerm) -> Self {
        Self {
            product_name: product_name.into(),
            term,
        }
    }
}

/// One license, bound to one product on one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Binding token; recomputed and compared on every check.
    pub serial: String,
    /// Identifier of the bound machine.
    #[serde(rename = "pc_id")]
    pub machine_id: String,
    /// Product identifier.
    pub product_name: String,
    /// Creation time (informational).
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// Term length in distinct usage days (the lifetime sentinel for lifetime licenses).
    pub max_days: u32,
    /// Unlimited term; `max_days` is then never compared against usage.
    #[serde(default)]
    pub is_lifetime: bool,
    /// Timestamp of the most recent successful validation.
    #[serde(default)]
    pub last_used_date: String,
    /// Timestamp of first activation.
    #[serde(default)]
    pub first_run_date: String,
    /// Validation count, same-day repeats included.
    #[serde(default)]
    pub run_count: u64,
    /// Set on first successful validation, never cleared.
    #[serde(default)]
    pub is_activated: bool,
    /// Distinct usage days in chronological order.
    #[serde(default)]
    pub usage_history: Vec<String>,
    /// Lookup index over `usage_history`; rebuilt whenever absent or stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_map: Option<BTreeMap<String, bool>>,
}

impl LicenseRecord {
    /// A fresh, not yet activated record.
    pub fn new(
        serial: String,
        machine_id: String,
        product_name: String,
        max_days: u32,
        is_lifetime: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            serial,
            machine_id,
            product_name,
            created_at,
            max_days,
            is_lifetime,
            last_used_date: String::new(),
            first_run_date: String::new(),
            run_count: 0,
            is_activated: false,
            usage_history: Vec::new(),
            usage_map: Some(BTreeMap::new()),
        }
    }

    /// Number of distinct usage days.
    #[must_use]
    pub fn used_days(&self) -> usize {
        self.usage_history.len()
    }

    /// Days left in the term; always 0 for lifetime licenses.
    #[must_use]
    pub fn remaining_days(&self) -> u32 {
        if self.is_lifetime {
            return 0;
        }
        let used = u32::try_from(self.used_days()).unwrap_or(u32::MAX);
        self.max_days.saturating_sub(used)
    }

    /// Whether `day` is already in the usage history.
    ///
    /// Consults the index, rebuilding it first if it is missing or out of
    /// step with the history.
    pub fn used_on(&mut self, day: &str) -> bool {
        self.usage_index().get(day).copied().unwrap_or(false)
    }

    /// Appends `day` to the history and the index.
    pub fn record_day(&mut self, day: String) {
        self.usage_index().insert(day.clone(), true);
        self.usage_history.push(day);
    }

    /// Replaces the history with a single day.
    pub fn reset_usage(&mut self, day: String) {
        self.usage_map = Some(BTreeMap::from([(day.clone(), true)]));
        self.usage_history = vec![day];
    }

    fn usage_index(&mut self) -> &mut BTreeMap<String, bool> {
        let history = &self.usage_history;
        let stale = self.usage_map.as_ref().is_none_or(|map| {
            map.len() != history.len()
                || history.iter().any(|day| map.get(day) != Some(&true))
        });
        if stale {
            self.usage_map = Some(
                self.usage_history
                    .iter()
                    .map(|day| (day.clone(), true))
                    .collect(),
            );
        }
        self.usage_map.get_or_insert_with(BTreeMap::new)
    }
}

/// Read-only summary of a validated license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseInfo {
    pub product_name: String,
    pub is_lifetime: bool,
    pub max_days: u32,
    pub used_days: usize,
    pub remaining_days: u32,
    pub run_count: u64,
    pub first_run_date: String,
    pub last_used_date: String,
    pub usage_history: Vec<String>,
}

impl From<&LicenseRecord> for LicenseInfo {
    fn from(record: &LicenseRecord) -> Self {
        Self {
            product_name: record.product_name.clone(),
            is_lifetime: record.is_lifetime,
            max_days: record.max_days,
            used_days: record.used_days(),
            remaining_days: record.remaining_days(),
            run_count: record.run_count,
            first_run_date: record.first_run_date.clone(),
            last_used_date: record.last_used_date.clone(),
            usage_history: record.usage_history.clone(),
        }
    }
}
