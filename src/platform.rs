//! Platform detection for selecting the bottle tag.
//!
//! Bottles are keyed by `<arch>_<os>` tags such as `arm64_sequoia` or
//! `x86_64_linux`. A formula whose bottle only exists under `all` is treated
//! as bottled on every platform (see [`crate::api::ApiFormula::bottle_for`]).

use crate::error::Result;
#[cfg(target_os = "macos")]
use anyhow::Context;
#[cfg(target_os = "macos")]
use std::process::Command;

/// Homebrew spells `aarch64` as `arm64`
fn homebrew_arch(arch: &str) -> &str {
    match arch {
        "aarch64" => "arm64",
        other => other,
    }
}

/// macOS marketing name for a `sw_vers -productVersion` string
pub fn macos_name(version: &str) -> &'static str {
    let major: u32 = version
        .split('.')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    match major {
        26 | 16 => "tahoe",
        15 => "sequoia",
        14 => "sonoma",
        13 => "ventura",
        12 => "monterey",
        11 => "big_sur",
        _ => "sonoma",
    }
}

/// Detect the bottle tag of the running system.
pub fn detect_bottle_tag() -> Result<String> {
    let arch = homebrew_arch(std::env::consts::ARCH);

    #[cfg(target_os = "macos")]
    {
        let output = Command::new("sw_vers")
            .arg("-productVersion")
            .output()
            .context("Failed to run sw_vers")?;
        let version = String::from_utf8(output.stdout).context("Invalid UTF-8 in sw_vers output")?;
        Ok(format!("{}_{}", arch, macos_name(version.trim())))
    }

    #[cfg(target_os = "linux")]
    {
        Ok(format!("{}_linux", arch))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = arch;
        Err(anyhow::anyhow!("Unsupported platform").into())
    }
}
