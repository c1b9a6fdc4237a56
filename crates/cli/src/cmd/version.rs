//! Implementation of the `mbuild version` command.
//!
//! Prints the version a release run would use, without building anything.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use mbuild_lib::ci::CiContext;
use mbuild_lib::version::{determine_version, normalize};

use crate::output::{print_json, print_stat, print_success};

#[derive(Serialize)]
struct VersionInfo<'a> {
  version: &'a str,
  normalized: &'a str,
}

pub fn cmd_version(repo: &Path, json: bool) -> Result<()> {
  let ci = CiContext::from_env();
  let version = determine_version(&ci, repo).context("Failed to determine version")?;
  let info = VersionInfo {
    version: &version,
    normalized: normalize(&version),
  };

  if json {
    return print_json(&info);
  }

  print_success(info.version);
  print_stat("Normalized", info.normalized);
  Ok(())
}
