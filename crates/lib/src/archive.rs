//! Release archives.
//!
//! Every successfully built target is packed into one archive in the archive
//! output directory, named `{project}_{version}_{os}_{arch}{variant}.{ext}`.
//! Windows targets get a `.zip`, everything else a `.tar.gz`. The archive
//! holds the executable and, when present, a companion readme.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;
use tracing::{debug, info};

use crate::build::BuildReport;
use crate::consts::{DEFAULT_OUT_DIR, DEFAULT_README};
use crate::target::Target;
use crate::version::normalize;

/// Errors that can occur while writing archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("failed to create archive directory '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write archive '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write zip archive '{path}': {source}")]
  Zip {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },
}

/// Where archives are written.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
  pub out_dir: PathBuf,
}

impl Default for ArchiveConfig {
  fn default() -> Self {
    Self {
      out_dir: PathBuf::from(DEFAULT_OUT_DIR),
    }
  }
}

/// An archive written for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveResult {
  pub target: Target,
  pub archive: PathBuf,
}

/// Packs build outputs into distributable archives.
#[derive(Debug, Clone)]
pub struct Archiver {
  config: ArchiveConfig,
  project: String,
  version: String,
  readme: PathBuf,
}

impl Archiver {
  /// `version` is normalized (leading `v` stripped) for file names.
  pub fn new(config: ArchiveConfig, project: impl Into<String>, version: &str) -> Self {
    Self {
      config,
      project: project.into(),
      version: normalize(version).to_string(),
      readme: PathBuf::from(DEFAULT_README),
    }
  }

  /// Companion file added next to the executable when it exists.
  pub fn with_readme(mut self, readme: impl Into<PathBuf>) -> Self {
    self.readme = readme.into();
    self
  }

  /// File name of the archive for `target`.
  pub fn archive_name(&self, target: &Target) -> String {
    let ext = if target.is_windows() { "zip" } else { "tar.gz" };
    format!("{}_{}_{}.{}", self.project, self.version, target.dir_name(), ext)
  }

  /// Archive every successful result in `report`, in result order.
  ///
  /// Failed results are skipped without error.
  pub fn archive_build_results(&self, report: &BuildReport) -> Result<Vec<ArchiveResult>, ArchiveError> {
    let out_dir = &self.config.out_dir;
    std::fs::create_dir_all(out_dir).map_err(|source| ArchiveError::CreateDir {
      path: out_dir.clone(),
      source,
    })?;

    let readme = if self.readme.is_file() {
      Some(self.readme.as_path())
    } else {
      debug!(path = %self.readme.display(), "readme not found, archiving binaries only");
      None
    };

    let mut archives = Vec::new();
    for (target, binary) in report.succeeded() {
      let archive = out_dir.join(self.archive_name(target));
      let mut files = vec![binary];
      files.extend(readme);

      if target.is_windows() {
        write_zip(&archive, &files)?;
      } else {
        write_tar_gz(&archive, &files)?;
      }

      info!(target = %target, archive = %archive.display(), "archive written");
      archives.push(ArchiveResult {
        target: target.clone(),
        archive,
      });
    }

    Ok(archives)
  }
}

fn entry_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_else(|| path.display().to_string())
}

fn read(path: &Path) -> Result<Vec<u8>, ArchiveError> {
  std::fs::read(path).map_err(|source| ArchiveError::Read {
    path: path.to_path_buf(),
    source,
  })
}

fn write_tar_gz(archive: &Path, files: &[&Path]) -> Result<(), ArchiveError> {
  let write_err = |source| ArchiveError::Write {
    path: archive.to_path_buf(),
    source,
  };

  let file = File::create(archive).map_err(write_err)?;
  let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

  for path in files {
    let content = read(path)?;
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
      .append_data(&mut header, entry_name(path), content.as_slice())
      .map_err(write_err)?;
  }

  builder.into_inner().and_then(GzEncoder::finish).map_err(write_err)?;
  Ok(())
}

fn write_zip(archive: &Path, files: &[&Path]) -> Result<(), ArchiveError> {
  let zip_err = |source| ArchiveError::Zip {
    path: archive.to_path_buf(),
    source,
  };

  let file = File::create(archive).map_err(|source| ArchiveError::Write {
    path: archive.to_path_buf(),
    source,
  })?;
  let mut writer = zip::ZipWriter::new(file);
  let options = zip::write::SimpleFileOptions::default()
    .compression_method(zip::CompressionMethod::Deflated)
    .unix_permissions(0o755);

  for path in files {
    let content = read(path)?;
    writer.start_file(entry_name(path), options).map_err(zip_err)?;
    writer.write_all(&content).map_err(|source| ArchiveError::Write {
      path: archive.to_path_buf(),
      source,
    })?;
  }

  writer.finish().map_err(zip_err)?;
  Ok(())
}
