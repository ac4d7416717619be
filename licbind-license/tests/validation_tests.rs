use chrono::{DateTime, Duration, TimeZone, Utc};
use licbind_crypto::{bind_serial, LicenseKeys, MasterSecret};
use licbind_license::{apply_usage, verify_binding, LicenseError, LicenseRecord, UsageOutcome};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, day, hour, 0, 0).unwrap()
}

fn fresh(max_days: u32) -> LicenseRecord {
    LicenseRecord::new(
        "SERIAL".into(),
        "machine-1".into(),
        "Acme".into(),
        max_days,
        false,
        at(1, 0),
    )
}

fn activated(max_days: u32) -> LicenseRecord {
    apply_usage(fresh(max_days), at(1, 8)).unwrap().0
}

// ── Transitions ──────────────────────────────────────────────────

#[test]
fn first_use_activates() {
    let (record, outcome) = apply_usage(fresh(30), at(1, 8)).unwrap();
    assert_eq!(outcome, UsageOutcome::Activated);
    assert!(record.is_activated);
    assert_eq!(record.run_count, 1);
    assert_eq!(record.first_run_date, "2026-05-01T08:00:00Z");
    assert_eq!(record.last_used_date, "2026-05-01T08:00:00Z");
    assert_eq!(record.usage_history, vec!["2026-05-01"]);
    assert_eq!(
        record.usage_map,
        Some(BTreeMap::from([("2026-05-01".to_string(), true)]))
    );
}

#[test]
fn activation_ignores_stale_last_used() {
    // A fresh record never has a rollback reference, even if edited to carry one.
    let mut record = fresh(30);
    record.last_used_date = "2099-01-01T00:00:00Z".into();
    let (record, outcome) = apply_usage(record, at(1, 8)).unwrap();
    assert_eq!(outcome, UsageOutcome::Activated);
    assert_eq!(record.last_used_date, "2026-05-01T08:00:00Z");
}

#[test]
fn later_same_day_use() {
    let (record, outcome) = apply_usage(activated(30), at(1, 20)).unwrap();
    assert_eq!(outcome, UsageOutcome::SameDay);
    assert_eq!(record.run_count, 2);
    assert_eq!(record.usage_history, vec!["2026-05-01"]);
    assert_eq!(record.last_used_date, "2026-05-01T20:00:00Z");
}

#[test]
fn new_day_use() {
    let (record, outcome) = apply_usage(activated(30), at(2, 1)).unwrap();
    assert_eq!(outcome, UsageOutcome::NewDay);
    assert_eq!(record.usage_history, vec!["2026-05-01", "2026-05-02"]);
    assert_eq!(record.usage_map.as_ref().map(BTreeMap::len), Some(2));
}

#[test]
fn same_instant_short_circuits() {
    let record = activated(30);
    let (record, outcome) = apply_usage(record, at(1, 8)).unwrap();
    assert_eq!(outcome, UsageOutcome::SameInstant);
    assert_eq!(record.run_count, 2);
    assert_eq!(record.usage_history, vec!["2026-05-01"]);
}

#[test]
fn same_instant_skips_expiry_check() {
    let mut record = activated(1);
    record.usage_history.push("2026-04-30".into());
    record.usage_map = None;
    let (record, outcome) = apply_usage(record, at(1, 8)).unwrap();
    assert_eq!(outcome, UsageOutcome::SameInstant);
    assert_eq!(record.used_days(), 2);
}

#[test]
fn earlier_timestamp_is_rollback() {
    let err = apply_usage(activated(30), at(1, 7)).unwrap_err();
    assert!(matches!(err, LicenseError::ClockRollbackDetected { .. }));
}

#[test]
fn empty_last_used_skips_rollback_check() {
    let mut record = activated(30);
    record.last_used_date.clear();
    let (record, outcome) = apply_usage(record, at(1, 7)).unwrap();
    assert_eq!(outcome, UsageOutcome::SameDay);
    assert_eq!(record.last_used_date, "2026-05-01T07:00:00Z");
}

#[test]
fn expiry_fires_past_max_days() {
    let record = activated(2);
    let (record, _) = apply_usage(record, at(2, 8)).unwrap();
    let err = apply_usage(record, at(3, 8)).unwrap_err();
    match err {
        LicenseError::LicenseExpired { used, allowed } => {
            assert_eq!(used, 3);
            assert_eq!(allowed, 2);
        }
        other => panic!("expected expiry, got {other:?}"),
    }
}

#[test]
fn lifetime_flag_wins_over_max_days() {
    let mut record = fresh(1);
    record.is_lifetime = true;
    let mut record = apply_usage(record, at(1, 8)).unwrap().0;
    for day in 2..=20 {
        record = apply_usage(record, at(day, 8)).unwrap().0;
    }
    assert_eq!(record.used_days(), 20);
}

// ── Stored timestamps with offsets ───────────────────────────────

#[test]
fn offset_last_used_earlier_instant_is_not_rollback() {
    // 10:00+02:00 is 08:00Z, an hour before the check.
    let mut record = activated(30);
    record.last_used_date = "2026-05-01T10:00:00+02:00".into();

    let (record, outcome) = apply_usage(record, at(1, 9)).unwrap();
    assert_eq!(outcome, UsageOutcome::SameDay);
    assert_eq!(record.last_used_date, "2026-05-01T09:00:00Z");
    assert_eq!(record.usage_history, vec!["2026-05-01"]);
}

#[test]
fn offset_last_used_same_instant_short_circuits() {
    let mut record = activated(30);
    record.last_used_date = "2026-05-01T10:00:00+02:00".into();

    let (record, outcome) = apply_usage(record, at(1, 8)).unwrap();
    assert_eq!(outcome, UsageOutcome::SameInstant);
    assert_eq!(record.last_used_date, "2026-05-01T10:00:00+02:00");
}

#[test]
fn offset_last_used_later_instant_is_rollback() {
    // 12:00+02:00 is 10:00Z, an hour after the check.
    let mut record = activated(30);
    record.last_used_date = "2026-05-01T12:00:00+02:00".into();

    let err = apply_usage(record, at(1, 9)).unwrap_err();
    match err {
        LicenseError::ClockRollbackDetected { last_used, now } => {
            assert_eq!(last_used, "2026-05-01T12:00:00+02:00");
            assert_eq!(now, "2026-05-01T09:00:00Z");
        }
        other => panic!("expected rollback, got {other:?}"),
    }
}

#[test]
fn fractional_last_used_compares_at_second_precision() {
    let mut record = activated(30);
    record.last_used_date = "2026-05-01T08:00:00.750Z".into();

    let (_, outcome) = apply_usage(record, at(1, 8)).unwrap();
    assert_eq!(outcome, UsageOutcome::SameInstant);
}

#[test]
fn unparsable_last_used_falls_back_to_string_order() {
    let mut record = activated(30);
    record.last_used_date = "not-a-timestamp".into();
    assert!(matches!(
        apply_usage(record, at(2, 8)),
        Err(LicenseError::ClockRollbackDetected { .. })
    ));

    let mut record = activated(30);
    record.last_used_date = "2026-04".into();
    let (_, outcome) = apply_usage(record, at(2, 8)).unwrap();
    assert_eq!(outcome, UsageOutcome::NewDay);
}

// ── Index compatibility ──────────────────────────────────────────

#[test]
fn missing_usage_map_is_rebuilt() {
    let mut record = activated(30);
    record.usage_history = vec!["2026-04-29".into(), "2026-05-01".into()];
    record.usage_map = None;

    let (record, outcome) = apply_usage(record, at(1, 12)).unwrap();
    assert_eq!(outcome, UsageOutcome::SameDay);
    assert_eq!(record.usage_history, vec!["2026-04-29", "2026-05-01"]);
    assert_eq!(record.usage_map.as_ref().map(BTreeMap::len), Some(2));
}

#[test]
fn stale_usage_map_is_rebuilt() {
    let mut record = activated(30);
    // Index claims a day the history does not contain.
    record.usage_map = Some(BTreeMap::from([("2026-05-02".to_string(), true)]));

    let (record, outcome) = apply_usage(record, at(2, 8)).unwrap();
    assert_eq!(outcome, UsageOutcome::NewDay);
    assert_eq!(record.usage_history, vec!["2026-05-01", "2026-05-02"]);
}

#[test]
fn used_on_consults_history() {
    let mut record = activated(30);
    record.usage_map = None;
    assert!(record.used_on("2026-05-01"));
    assert!(!record.used_on("2026-05-02"));
}

#[test]
fn remaining_days_saturates() {
    let mut record = activated(1);
    record.usage_history.push("2026-05-02".into());
    assert_eq!(record.remaining_days(), 0);
    assert_eq!(activated(5).remaining_days(), 4);
}

#[test]
fn timestamps_keep_second_precision() {
    let now = at(1, 8) + Duration::milliseconds(1500);
    let (record, _) = apply_usage(fresh(30), now).unwrap();
    assert_eq!(record.last_used_date, "2026-05-01T08:00:01Z");
}

// ── Binding ──────────────────────────────────────────────────────

fn bound_record(keys: &LicenseKeys) -> LicenseRecord {
    let serial = bind_serial("machine-1", "Acme", 30, keys.serial());
    LicenseRecord::new(serial, "machine-1".into(), "Acme".into(), 30, false, at(1, 0))
}

fn keys() -> LicenseKeys {
    LicenseKeys::derive(&MasterSecret::new("binding-test-secret").unwrap())
}

#[test]
fn binding_accepts_matching_record() {
    let keys = keys();
    verify_binding(&bound_record(&keys), "machine-1", keys.serial()).unwrap();
}

#[test]
fn binding_checks_machine_first() {
    let keys = keys();
    let mut record = bound_record(&keys);
    record.serial = "WRONG".into();
    assert!(matches!(
        verify_binding(&record, "machine-2", keys.serial()),
        Err(LicenseError::WrongMachine)
    ));
}

#[test]
fn binding_rejects_edited_fields() {
    let keys = keys();

    let mut renamed = bound_record(&keys);
    renamed.product_name = "Other".into();
    assert!(matches!(
        verify_binding(&renamed, "machine-1", keys.serial()),
        Err(LicenseError::InvalidSerial)
    ));

    let mut lowered = bound_record(&keys);
    lowered.serial = lowered.serial.to_lowercase();
    assert!(matches!(
        verify_binding(&lowered, "machine-1", keys.serial()),
        Err(LicenseError::InvalidSerial)
    ));
}

#[test]
fn binding_rejects_other_serial_key() {
    let keys = keys();
    let other = LicenseKeys::derive(&MasterSecret::new("another-secret").unwrap());
    assert!(matches!(
        verify_binding(&bound_record(&keys), "machine-1", other.serial()),
        Err(LicenseError::InvalidSerial)
    ));
}
