use thiserror::Error;

mod info;
mod release;
mod version;

pub use info::cmd_info;
pub use release::{ReleaseArgs, cmd_release};
pub use version::cmd_version;

/// Invalid command-line input, reported with the usage exit code.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

#[cfg(test)]
mod tests {
  use super::*;
  use anyhow::Context;

  #[test]
  fn usage_error_survives_added_context() {
    let err = Err::<(), _>(UsageError("unsupported host platform".to_string()))
      .context("Release failed")
      .unwrap_err();

    let usage = err.downcast_ref::<UsageError>().unwrap();
    assert_eq!(usage.to_string(), "unsupported host platform");
    assert_eq!(format!("{:#}", err), "Release failed: unsupported host platform");
  }
}
