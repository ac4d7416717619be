//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use licbind_license::{
    CreateLicenseRequest, LicenseConfig, LicenseManager, LicenseTerm, ManualClock,
    StaticMachineId,
};
use std::sync::Arc;
use tempfile::TempDir;

pub const MASTER_SECRET: &str = "TestMasterKeyForLicenseTests12345678901234";
pub const MACHINE_A: &str = "3f2a9c41d07b4e58a1c6e0f9b2d84a17";
pub const MACHINE_B: &str = "b7c0e2f4a6d8193b5c7e9f1a3d5b7c90";
pub const PRODUCT: &str = "Acme";

/// 2026-03-01T09:00:00Z.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// Isolated license directory plus a manual clock shared by managers.
pub struct Fixture {
    pub dir: TempDir,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            clock: Arc::new(ManualClock::new(start_time())),
        }
    }

    pub fn config(&self) -> LicenseConfig {
        LicenseConfig::new(MASTER_SECRET, self.dir.path()).unwrap()
    }

    /// Manager bound to `machine_id`, driven by the fixture clock.
    pub fn manager_on(&self, machine_id: &str) -> LicenseManager {
        LicenseManager::new(self.config(), &StaticMachineId::new(machine_id))
            .unwrap()
            .with_clock(self.clock.clone())
    }

    pub fn manager(&self) -> LicenseManager {
        self.manager_on(MACHINE_A)
    }

    /// Moves the clock forward by whole days.
    pub fn next_day(&self, days: i64) {
        self.clock.advance(Duration::days(days));
    }

    pub fn file_bytes(&self, product: &str) -> Vec<u8> {
        std::fs::read(self.config().license_path(product)).unwrap()
    }
}

pub fn create_days(manager: &LicenseManager, product: &str, days: u32) {
    manager
        .create(&CreateLicenseRequest::new(product, LicenseTerm::Days(days)))
        .unwrap();
}
