//! mbuild-lib: cross-platform release builds
//!
//! This crate provides the pipeline behind the `mbuild` CLI:
//! - `target`: parse `OS/ARCH[/VARIANT]` platform strings
//! - `version`: derive a version from CI metadata or repository history
//! - `build`: run an external toolchain for every target with bounded concurrency
//! - `archive`: pack each successful build into a `.tar.gz` or `.zip`
//! - `publish`: attach archives to a release on the hosting service

pub mod archive;
pub mod build;
pub mod ci;
pub mod consts;
pub mod platform;
pub mod publish;
pub mod target;
#[cfg(test)]
mod util;
pub mod version;
