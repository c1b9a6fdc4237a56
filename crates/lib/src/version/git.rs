//! `git describe`-style versioning from repository history.

use std::collections::HashMap;
use std::path::Path;

use gix::ObjectId;
use tracing::{debug, trace};

use super::{VersionError, Versioning, shorten_sha};

/// Versioning derived from the nearest tag reachable from HEAD.
pub struct GitVersioning {
  repo: gix::Repository,
}

impl GitVersioning {
  /// Open the repository at `path`.
  ///
  /// Returns `Ok(None)` when `path` holds neither a `.git` entry nor a bare
  /// repository layout, so that callers can try another strategy. A repository
  /// that is present but cannot be opened (missing objects, broken `.git`) is
  /// an error.
  pub fn open(path: &Path) -> Result<Option<Self>, VersionError> {
    if !has_repository(path) {
      debug!(path = %path.display(), "no repository found");
      return Ok(None);
    }

    let repo = gix::open(path).map_err(|e| VersionError::Open {
      path: path.display().to_string(),
      source: Box::new(e),
    })?;
    Ok(Some(Self { repo }))
  }

  /// Map each tagged commit to its tag name.
  ///
  /// Annotated tags are peeled to the commit they point at. When several tags
  /// point at one commit the lexicographically smallest name is kept.
  fn tagged_commits(&self) -> Result<HashMap<ObjectId, String>, VersionError> {
    let references = self.repo.references().map_err(|e| VersionError::Tags(Box::new(e)))?;
    let tags = references.tags().map_err(|e| VersionError::Tags(Box::new(e)))?;

    let mut tagged: HashMap<ObjectId, String> = HashMap::new();
    for tag in tags {
      let mut tag = tag.map_err(VersionError::Tags)?;
      let name = tag.name().shorten().to_string();
      let id = tag
        .peel_to_id()
        .map_err(|e| VersionError::Tags(Box::new(e)))?
        .detach();

      trace!(tag = %name, commit = %id, "found tag");
      match tagged.get(&id) {
        Some(existing) if *existing <= name => {}
        _ => {
          tagged.insert(id, name);
        }
      }
    }

    Ok(tagged)
  }

  /// Walk history from HEAD until a tagged commit is found.
  ///
  /// `distance` counts the commits visited before the tagged one.
  fn describe(&self, tagged: &HashMap<ObjectId, String>, head: ObjectId) -> Result<String, VersionError> {
    let head_hex = head.to_string();
    let walk = self
      .repo
      .rev_walk([head])
      .all()
      .map_err(|e| VersionError::History(Box::new(e)))?;

    for (distance, info) in walk.enumerate() {
      let info = info.map_err(|e| VersionError::History(Box::new(e)))?;
      if let Some(tag) = tagged.get(&info.id) {
        debug!(tag = %tag, distance, "found tagged ancestor");
        return Ok(format!("{}-{}-{}", tag, distance, shorten_sha(&head_hex)));
      }
    }

    debug!("no tagged ancestor, using bare commit hash");
    Ok(shorten_sha(&head_hex).to_string())
  }
}

/// Whether `path` is a work tree (`.git` directory or file) or a bare
/// repository (`HEAD` next to `objects/` and `refs/`).
fn has_repository(path: &Path) -> bool {
  path.join(".git").exists()
    || (path.join("HEAD").is_file() && path.join("objects").is_dir() && path.join("refs").is_dir())
}

impl Versioning for GitVersioning {
  fn version(&self) -> Result<String, VersionError> {
    let tagged = self.tagged_commits()?;
    let head = self
      .repo
      .head_id()
      .map_err(|e| VersionError::Head(Box::new(e)))?
      .detach();

    if let Some(tag) = tagged.get(&head) {
      return Ok(tag.clone());
    }

    self.describe(&tagged, head)
  }
}
