//! Build target resolution.
//!
//! A target is a `{os, arch, variant}` triple written as `OS/ARCH[/VARIANT]`
//! on the command line (e.g. `linux/amd64`, `linux/arm/7`). Resolution is
//! all-or-nothing: one malformed string fails the whole list.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while resolving platform strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
  /// The string does not match `OS/ARCH[/VARIANT]`.
  #[error("invalid platform '{input}': expected OS/ARCH[/VARIANT]")]
  InvalidPlatform { input: String },
}

/// A platform to build for.
///
/// `variant` is empty when the platform string had no third component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
  pub os: String,
  pub arch: String,
  pub variant: String,
}

impl Target {
  pub fn new(os: impl Into<String>, arch: impl Into<String>, variant: impl Into<String>) -> Self {
    Self {
      os: os.into(),
      arch: arch.into(),
      variant: variant.into(),
    }
  }

  /// Parse a single `OS/ARCH[/VARIANT]` string.
  pub fn parse(input: &str) -> Result<Self, TargetError> {
    let invalid = || TargetError::InvalidPlatform {
      input: input.to_string(),
    };

    let mut parts = input.splitn(3, '/');
    let os = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let arch = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let variant = match parts.next() {
      None => "",
      Some("") => return Err(invalid()),
      Some(v) => v,
    };

    Ok(Self::new(os, arch, variant))
  }

  pub fn is_windows(&self) -> bool {
    self.os == "windows"
  }

  /// Directory and archive suffix for this target: `{os}_{arch}{variant}`.
  pub fn dir_name(&self) -> String {
    format!("{}_{}{}", self.os, self.arch, self.variant)
  }

  /// Name of the produced executable, with `.exe` on Windows.
  pub fn binary_name(&self, base: &str) -> String {
    if self.is_windows() {
      format!("{}.exe", base)
    } else {
      base.to_string()
    }
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.variant.is_empty() {
      write!(f, "{}/{}", self.os, self.arch)
    } else {
      write!(f, "{}/{}/{}", self.os, self.arch, self.variant)
    }
  }
}

/// Resolve platform strings into targets, preserving input order.
///
/// An empty input yields an empty list; callers decide on a default.
pub fn parse_platforms<S: AsRef<str>>(platforms: &[S]) -> Result<Vec<Target>, TargetError> {
  platforms.iter().map(|p| Target::parse(p.as_ref())).collect()
}
