//! Implementation of the `mbuild info` command.

use anyhow::Result;
use serde::Serialize;

use mbuild_lib::platform::host_target;

use crate::output::{print_info, print_json, print_stat};

#[derive(Serialize)]
struct Info {
  version: &'static str,
  host: Option<String>,
}

pub fn cmd_info(json: bool) -> Result<()> {
  let info = Info {
    version: env!("CARGO_PKG_VERSION"),
    host: host_target().map(|t| t.to_string()),
  };

  if json {
    return print_json(&info);
  }

  print_info(&format!("mbuild v{}", info.version));
  match &info.host {
    Some(host) => print_stat("Host platform", host),
    None => print_stat("Host platform", "unsupported"),
  }
  Ok(())
}
