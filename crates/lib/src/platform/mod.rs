//! Host platform detection.
//!
//! Maps the running host onto the toolchain's `os/arch` naming so the CLI can
//! default to building for the current machine.

pub mod arch;
pub mod os;

use arch::Arch;
use os::Os;

use crate::target::Target;

/// Detect the host as a build target (e.g. `linux/amd64`).
///
/// Returns `None` if the OS or architecture is not supported
pub fn host_target() -> Option<Target> {
  Some(Target::new(Os::current()?.as_str(), Arch::current()?.as_str(), ""))
}
