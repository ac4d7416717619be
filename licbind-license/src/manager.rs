//! Product-level license operations.

use crate::clock::{Clock, SystemClock};
use crate::config::{LicenseConfig, LICENSE_EXTENSION};
use crate::error::{LicenseError, LicenseResult};
use crate::machine::MachineIdSource;
use crate::record::{CreateLicenseRequest, LicenseInfo, LicenseRecord, LicenseTerm};
use crate::validation;
use licbind_crypto::{bind_serial, LicenseKeys};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Creates, validates, inspects and revokes licenses for the current machine.
///
/// Keys are derived and the machine id is resolved once, at construction.
pub struct LicenseManager {
    config: LicenseConfig,
    keys: LicenseKeys,
    machine_id: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LicenseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseManager")
            .field("license_dir", &self.config.license_dir)
            .finish_non_exhaustive()
    }
}

impl LicenseManager {
    /// Validates `config`, derives the operational keys and resolves the
    /// machine id.
    pub fn new(config: LicenseConfig, machine: &dyn MachineIdSource) -> LicenseResult<Self> {
        config.validate()?;
        let machine_id = machine.machine_id()?;
        let keys = LicenseKeys::derive(config.master_secret());

        Ok(Self {
            config,
            keys,
            machine_id,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The id of the machine licenses are bound to.
    #[must_use]
    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    #[must_use]
    pub fn config(&self) -> &LicenseConfig {
        &self.config
    }

    /// Location of the license file for `product_name`.
    #[must_use]
    pub fn license_path(&self, product_name: &str) -> PathBuf {
        self.config.license_path(product_name)
    }

    /// Issues a new license bound to this machine.
    ///
    /// # Errors
    ///
    /// [`LicenseError::AlreadyExists`] if the product already has a license
    /// file, [`LicenseError::InvalidTerm`] for a zero-day term.
    pub fn create(&self, request: &CreateLicenseRequest) -> LicenseResult<LicenseRecord> {
        let (max_days, is_lifetime) = match request.term {
            LicenseTerm::Lifetime => (self.config.lifetime_days, true),
            LicenseTerm::Default => (self.config.default_max_days, false),
            LicenseTerm::Days(0) => {
                return Err(LicenseError::InvalidTerm(
                    "max days must be positive".to_string(),
                ));
            }
            LicenseTerm::Days(days) => (days, false),
        };

        let serial = bind_serial(
            &self.machine_id,
            &request.product_name,
            max_days,
            self.keys.serial(),
        );
        let record = LicenseRecord::new(
            serial,
            self.machine_id.clone(),
            request.product_name.clone(),
            max_days,
            is_lifetime,
            self.clock.now(),
        );

        validation::create(&self.license_path(&request.product_name), &record, &self.keys)?;
        Ok(record)
    }

    /// Validates the product's license and records this use.
    pub fn validate(&self, product_name: &str) -> LicenseResult<LicenseRecord> {
        validation::validate(
            &self.license_path(product_name),
            &self.machine_id,
            &self.keys,
            self.clock.as_ref(),
        )
    }

    /// Validates the product's license and summarizes it.
    pub fn info(&self, product_name: &str) -> LicenseResult<LicenseInfo> {
        let record = self.validate(product_name)?;
        Ok(LicenseInfo::from(&record))
    }

    /// Reads the product's license without recording a use.
    pub fn view(&self, product_name: &str) -> LicenseResult<LicenseRecord> {
        validation::inspect(&self.license_path(product_name), &self.machine_id, &self.keys)
    }

    /// Destroys the product's license.
    pub fn revoke(&self, product_name: &str) -> LicenseResult<()> {
        validation::revoke(&self.license_path(product_name))
    }

    /// License files in the license directory, sorted by file name.
    pub fn list(&self) -> LicenseResult<Vec<PathBuf>> {
        let dir = &self.config.license_dir;
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LicenseError::Storage(format!(
                    "failed to read {}: {e}",
                    dir.display()
                )));
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().is_some_and(|ext| ext == LICENSE_EXTENSION)
            })
            .collect();
        files.sort();
        Ok(files)
    }
}
