//! Machine-bound licenses stored as single encrypted files.
//!
//! This crate handles:
//! - Issuing licenses bound to a machine id, product and term
//! - Stateful validation: activation, usage-day accounting, clock rollback
//!   detection and expiration
//! - Read-only inspection and irreversible revocation
//!
//! # Design Principles
//!
//! - **Recompute, don't trust**: the stored serial is only ever compared
//!   against one recomputed from the record and the serial key
//! - **Ambiguous failure**: a revoked license and a corrupted file fail
//!   identically
//! - **Read-then-reject**: binding failures never modify the file
//!
//! # File Format
//!
//! `<license_dir>/<sanitized product>.license` holds
//! `nonce || AES-256-GCM(json record) || tag`, with no header.

mod clock;
mod config;
mod error;
mod machine;
mod manager;
mod record;
mod store;
mod validation;

pub use clock::{format_day, format_timestamp, Clock, ManualClock, SystemClock};
pub use config::{parse_term, sanitize_product_name, LicenseConfig, LICENSE_EXTENSION};
pub use error::{LicenseError, LicenseResult};
pub use machine::{fingerprint, HardwareMachineId, MachineIdSource, StaticMachineId};
pub use manager::LicenseManager;
pub use record::{CreateLicenseRequest, LicenseInfo, LicenseRecord, LicenseTerm};
pub use store::{load_record, lock_path, save_record, REVOCATION_BLOCK_SIZE};
pub use validation::{apply_usage, verify_binding, UsageOutcome};
