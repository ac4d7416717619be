//! Machine identification for license binding.
//!
//! Produces a stable identifier for the current machine from platform
//! hardware identifiers. The identifier survives reboots but changes if the
//! underlying hardware identity changes.

use crate::error::{LicenseError, LicenseResult};
use sha2::{Digest, Sha256};
use std::env;

/// Anything that can name the current machine.
pub trait MachineIdSource {
    /// Returns the identifier of the current machine.
    fn machine_id(&self) -> LicenseResult<String>;
}

/// Machine id derived from platform hardware identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareMachineId;

impl HardwareMachineId {
    /// Raw `kind:value` identifiers found on this machine.
    #[must_use]
    pub fn components() -> Vec<String> {
        collect_hardware_ids()
    }
}

impl MachineIdSource for HardwareMachineId {
    fn machine_id(&self) -> LicenseResult<String> {
        fingerprint(&collect_hardware_ids()).ok_or_else(|| {
            LicenseError::PlatformUnsupported(format!(
                "no hardware identifiers found on {}",
                env::consts::OS
            ))
        })
    }
}

/// A caller-supplied machine id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMachineId(pub String);

impl StaticMachineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl MachineIdSource for StaticMachineId {
    fn machine_id(&self) -> LicenseResult<String> {
        if self.0.is_empty() {
            return Err(LicenseError::PlatformUnsupported(
                "empty machine id".to_string(),
            ));
        }
        Ok(self.0.clone())
    }
}

/// Hashes identifier components into a 32-character hex id.
///
/// Returns `None` when there is nothing to hash.
#[must_use]
pub fn fingerprint(components: &[String]) -> Option<String> {
    if components.is_empty() {
        return None;
    }
    let combined = components.join("|");
    let hash = Sha256::digest(combined.as_bytes());
    Some(hex::encode(&hash[..16]))
}

fn collect_hardware_ids() -> Vec<String> {
    #[cfg(target_os = "linux")]
    {
        linux_ids()
    }

    #[cfg(target_os = "macos")]
    {
        macos_ids()
    }

    #[cfg(target_os = "windows")]
    {
        windows_ids()
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        Vec::new()
    }
}

#[cfg(target_os = "linux")]
fn linux_ids() -> Vec<String> {
    let mut ids = Vec::new();

    // Try /etc/machine-id first, then /var/lib/dbus/machine-id
    if let Some(machine_id) = std::fs::read_to_string("/etc/machine-id")
        .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        ids.push(format!("machine:{machine_id}"));
    }

    if let Some(line) = std::fs::read_to_string("/proc/cpuinfo").ok().and_then(|info| {
        info.lines()
            .find(|l| l.starts_with("processor"))
            .map(|l| l.trim().to_string())
    }) {
        ids.push(format!("cpu:{line}"));
    }

    if let Some(mac) = first_mac_address() {
        ids.push(format!("mac:{mac}"));
    }

    ids
}

/// First non-loopback, non-zero MAC address, by interface name.
#[cfg(target_os = "linux")]
fn first_mac_address() -> Option<String> {
    let mut interfaces: Vec<_> = std::fs::read_dir("/sys/class/net")
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.file_name().is_some_and(|name| name != "lo"))
        .collect();
    interfaces.sort();

    interfaces.into_iter().find_map(|path| {
        std::fs::read_to_string(path.join("address"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|mac| !mac.is_empty() && mac != "00:00:00:00:00:00")
    })
}

#[cfg(target_os = "macos")]
fn macos_ids() -> Vec<String> {
    let output = std::process::Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .unwrap_or_default();

    let field = |key: &str| {
        output
            .lines()
            .find(|l| l.contains(key))
            .and_then(|l| l.split('"').nth(3))
            .map(String::from)
    };

    let mut ids = Vec::new();
    if let Some(uuid) = field("IOPlatformUUID") {
        ids.push(format!("uuid:{uuid}"));
    }
    if let Some(serial) = field("IOPlatformSerialNumber") {
        ids.push(format!("serial:{serial}"));
    }
    ids
}

#[cfg(target_os = "windows")]
fn windows_ids() -> Vec<String> {
    std::process::Command::new("reg")
        .args([
            "query",
            r"HKLM\SOFTWARE\Microsoft\Cryptography",
            "/v",
            "MachineGuid",
        ])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .and_then(|output| {
            output
                .lines()
                .find(|l| l.contains("MachineGuid"))
                .and_then(|l| l.split_whitespace().nth(2))
                .map(|guid| vec![format!("guid:{guid}")])
        })
        .unwrap_or_default()
}
