//! The validation state machine.
//!
//! A license moves `Fresh -> Active` on its first successful validation and
//! accrues usage days from then on. `Expired`, revoked/corrupt and tampered
//! records are terminal: every later check fails the same way.
//!
//! Every check of an existing record verifies the machine binding and the
//! serial before any state changes. Failures before the transition leave the
//! file byte-for-byte untouched.

use crate::clock::{format_day, format_timestamp, Clock};
use crate::error::{LicenseError, LicenseResult};
use crate::record::LicenseRecord;
use crate::store::{self, LicenseLock};
use chrono::{DateTime, SubsecRound, Utc};
use licbind_crypto::{bind_serial, DerivedKey, LicenseKeys};
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info, warn};

/// How a successful validation changed the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOutcome {
    /// First validation: the record became active.
    Activated,
    /// A new calendar day was added to the usage history.
    NewDay,
    /// Today was already recorded; only counters and `last_used_date` moved.
    SameDay,
    /// Same timestamp as the last use; only `run_count` moved.
    SameInstant,
}

/// Checks the record is bound to `machine_id` and carries the serial that
/// `serial_key` derives for it.
pub fn verify_binding(
    record: &LicenseRecord,
    machine_id: &str,
    serial_key: &DerivedKey,
) -> LicenseResult<()> {
    if record.machine_id != machine_id {
        return Err(LicenseError::WrongMachine);
    }

    let expected = bind_serial(machine_id, &record.product_name, record.max_days, serial_key);
    if record.serial != expected {
        return Err(LicenseError::InvalidSerial);
    }
    Ok(())
}

/// Applies one validation at `now` to an already bound record.
///
/// Returns the next state of the record. On error the caller must discard
/// the transition; nothing should be persisted.
pub fn apply_usage(
    mut record: LicenseRecord,
    now: DateTime<Utc>,
) -> LicenseResult<(LicenseRecord, UsageOutcome)> {
    let timestamp = format_timestamp(now);
    let today = format_day(now);

    let outcome = if !record.is_activated {
        record.is_activated = true;
        record.first_run_date = timestamp.clone();
        record.last_used_date = timestamp;
        record.run_count = 1;
        record.reset_usage(today);
        UsageOutcome::Activated
    } else {
        record.run_count += 1;

        if !record.last_used_date.is_empty() {
            match compare_last_used(&record.last_used_date, now, &timestamp) {
                Ordering::Equal => return Ok((record, UsageOutcome::SameInstant)),
                Ordering::Greater => {
                    return Err(LicenseError::ClockRollbackDetected {
                        last_used: record.last_used_date,
                        now: timestamp,
                    });
                }
                Ordering::Less => {}
            }
        }

        let outcome = if record.used_on(&today) {
            UsageOutcome::SameDay
        } else {
            record.record_day(today);
            UsageOutcome::NewDay
        };
        record.last_used_date = timestamp;
        outcome
    };

    if !record.is_lifetime && record.used_days() > record.max_days as usize {
        return Err(LicenseError::LicenseExpired {
            used: record.used_days(),
            allowed: record.max_days,
        });
    }

    Ok((record, outcome))
}

/// Orders the stored last-use timestamp against `now` at second precision.
///
/// Stored timestamps may carry any UTC offset, so they are compared as
/// instants. Unparsable values fall back to string order, which matches
/// chronological order for the `...Z` form this crate writes.
fn compare_last_used(last_used: &str, now: DateTime<Utc>, timestamp: &str) -> Ordering {
    match DateTime::parse_from_rfc3339(last_used) {
        Ok(last) => last
            .with_timezone(&Utc)
            .trunc_subsecs(0)
            .cmp(&now.trunc_subsecs(0)),
        Err(_) => last_used.cmp(timestamp),
    }
}

/// Validates the license at `path` for `machine_id`, records the use and
/// persists the updated record.
pub fn validate(
    path: &Path,
    machine_id: &str,
    keys: &LicenseKeys,
    clock: &dyn Clock,
) -> LicenseResult<LicenseRecord> {
    let _lock = LicenseLock::exclusive_existing(path)?;

    let record = store::load_record(path, keys.encryption())?;
    verify_binding(&record, machine_id, keys.serial())?;

    let product = record.product_name.clone();
    let (record, outcome) = match apply_usage(record, clock.now()) {
        Ok(next) => next,
        Err(err) => {
            warn!(product = %product, "License validation rejected: {}", err);
            return Err(err);
        }
    };

    if let Err(err) = store::save_record(&record, path, keys.encryption()) {
        warn!(product = %product, "Validated license could not be saved: {}", err);
        return Err(err);
    }

    match outcome {
        UsageOutcome::Activated => info!(product = %product, "License activated"),
        UsageOutcome::NewDay => info!(
            product = %product,
            used_days = record.used_days(),
            "License usage day recorded"
        ),
        UsageOutcome::SameDay | UsageOutcome::SameInstant => {
            debug!(product = %product, run_count = record.run_count, "License validated")
        }
    }
    Ok(record)
}

/// Reads the license at `path` and checks its binding without recording a use.
pub fn inspect(path: &Path, machine_id: &str, keys: &LicenseKeys) -> LicenseResult<LicenseRecord> {
    store::require_license(path)?;
    let _lock = LicenseLock::shared(path);

    let record = store::load_record(path, keys.encryption())?;
    verify_binding(&record, machine_id, keys.serial())?;
    Ok(record)
}

/// Writes a fresh record to `path`, refusing to replace an existing file.
pub fn create(path: &Path, record: &LicenseRecord, keys: &LicenseKeys) -> LicenseResult<()> {
    let _lock = LicenseLock::exclusive(path)?;

    match path.try_exists() {
        Ok(false) => {}
        Ok(true) => return Err(LicenseError::AlreadyExists(path.display().to_string())),
        Err(e) => {
            return Err(LicenseError::Storage(format!(
                "failed to stat {}: {e}",
                path.display()
            )));
        }
    }

    store::save_record(record, path, keys.encryption())?;
    info!(product = %record.product_name, lifetime = record.is_lifetime, "License created");
    Ok(())
}

/// Irreversibly destroys the license at `path`.
pub fn revoke(path: &Path) -> LicenseResult<()> {
    let _lock = LicenseLock::exclusive_existing(path)?;

    store::overwrite_with_random(path)?;
    info!(path = %path.display(), "License revoked");
    Ok(())
}
