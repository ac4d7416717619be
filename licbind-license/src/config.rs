//! Engine configuration.
//!
//! Built once at startup, either explicitly or from the environment, and
//! validated before any license operation runs.

use crate::error::{LicenseError, LicenseResult};
use crate::record::LicenseTerm;
use licbind_crypto::MasterSecret;
use std::env;
use std::path::PathBuf;

/// Environment variable holding the master secret.
pub const MASTER_KEY_VAR: &str = "LICENSE_MASTER_KEY";
/// Environment variable overriding the license directory.
pub const LICENSE_DIR_VAR: &str = "LICENSE_DIR";
/// Environment variable overriding the default term.
pub const DEFAULT_DAYS_VAR: &str = "LICENSE_DEFAULT_DAYS";
/// Environment variable overriding the lifetime sentinel.
pub const LIFETIME_DAYS_VAR: &str = "LICENSE_LIFETIME_DAYS";

/// File extension of license files.
pub const LICENSE_EXTENSION: &str = "license";

/// Settings for a [`LicenseManager`](crate::LicenseManager).
#[derive(Debug, Clone)]
pub struct LicenseConfig {
    master_secret: MasterSecret,
    /// Directory holding `<product>.license` files.
    pub license_dir: PathBuf,
    /// Term used for [`LicenseTerm::Default`].
    pub default_max_days: u32,
    /// Value stored in `max_days` for lifetime licenses.
    pub lifetime_days: u32,
}

impl LicenseConfig {
    pub const DEFAULT_MAX_DAYS: u32 = 30;
    pub const LIFETIME_DAYS: u32 = 99_999;

    /// Creates a configuration with default term settings.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::ConfigInvalid`] if `master_secret` is empty.
    pub fn new(master_secret: impl AsRef<[u8]>, license_dir: impl Into<PathBuf>) -> LicenseResult<Self> {
        let master_secret = MasterSecret::new(master_secret)
            .map_err(|_| LicenseError::ConfigInvalid(format!("{MASTER_KEY_VAR} must not be empty")))?;
        Ok(Self {
            master_secret,
            license_dir: license_dir.into(),
            default_max_days: Self::DEFAULT_MAX_DAYS,
            lifetime_days: Self::LIFETIME_DAYS,
        })
    }

    /// Loads the configuration from process environment variables.
    ///
    /// `LICENSE_DIR` falls back to the current working directory.
    pub fn from_env() -> LicenseResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> LicenseResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(MASTER_KEY_VAR)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LicenseError::ConfigInvalid(format!("{MASTER_KEY_VAR} is required")))?;

        let license_dir = match lookup(LICENSE_DIR_VAR).filter(|s| !s.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => env::current_dir().map_err(|e| {
                LicenseError::ConfigInvalid(format!("cannot resolve working directory: {e}"))
            })?,
        };

        let mut config = Self::new(secret, license_dir)?;
        if let Some(value) = lookup(DEFAULT_DAYS_VAR) {
            config.default_max_days = parse_positive(DEFAULT_DAYS_VAR, &value)?;
        }
        if let Some(value) = lookup(LIFETIME_DAYS_VAR) {
            config.lifetime_days = parse_positive(LIFETIME_DAYS_VAR, &value)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Sets the default term.
    #[must_use]
    pub fn with_default_max_days(mut self, days: u32) -> Self {
        self.default_max_days = days;
        self
    }

    /// Sets the lifetime sentinel.
    #[must_use]
    pub fn with_lifetime_days(mut self, days: u32) -> Self {
        self.lifetime_days = days;
        self
    }

    /// Checks the day settings are usable.
    pub fn validate(&self) -> LicenseResult<()> {
        if self.default_max_days == 0 {
            return Err(LicenseError::ConfigInvalid(
                "default max days must be positive".to_string(),
            ));
        }
        if self.lifetime_days == 0 {
            return Err(LicenseError::ConfigInvalid(
                "lifetime days must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The normalized master secret.
    pub fn master_secret(&self) -> &MasterSecret {
        &self.master_secret
    }

    /// Location of the license file for `product_name`.
    pub fn license_path(&self, product_name: &str) -> PathBuf {
        self.license_dir
            .join(format!("{}.{LICENSE_EXTENSION}", sanitize_product_name(product_name)))
    }
}

fn parse_positive(name: &str, value: &str) -> LicenseResult<u32> {
    match value.trim().parse::<u32>() {
        Ok(days) if days > 0 => Ok(days),
        _ => Err(LicenseError::ConfigInvalid(format!(
            "{name} must be a positive integer, got {value:?}"
        ))),
    }
}

/// Replaces characters that are unsafe in file names with `_`.
#[must_use]
pub fn sanitize_product_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

/// Parses a term argument: `lifetime` (any case) or a positive day count.
pub fn parse_term(input: &str) -> LicenseResult<LicenseTerm> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("lifetime") {
        return Ok(LicenseTerm::Lifetime);
    }
    match input.parse::<u32>() {
        Ok(days) if days > 0 => Ok(LicenseTerm::Days(days)),
        _ => Err(LicenseError::InvalidTerm(format!(
            "expected a positive number of days or 'lifetime', got {input:?}"
        ))),
    }
}
