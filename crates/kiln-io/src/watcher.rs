// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Filesystem watching that feeds a [`ChangeQueue`].

use crate::changes::ChangeNotifier;
use kiln_core::normalize_path;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

/// Errors raised when starting a [`DirectoryWatcher`].
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The watched directory does not exist.
    #[error("shader directory '{0}' does not exist")]
    MissingDirectory(PathBuf),
    /// The platform watcher could not be created or attached.
    #[error("failed to watch shader directory: {0}")]
    Notify(#[from] notify::Error),
}

/// Watches a shader directory and reports modified files as root-relative paths.
///
/// The callback runs on the watcher's own thread and only enqueues paths. Drop
/// the watcher to stop watching.
pub struct DirectoryWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    /// Starts watching `root` recursively.
    /// ## Arguments
    /// * `root` - The directory shader paths are relative to.
    /// * `notifier` - Where changed paths are reported.
    /// ## Errors
    /// * `WatchError` - If the directory is missing or cannot be watched.
    pub fn start(root: impl AsRef<Path>, notifier: ChangeNotifier) -> Result<Self, WatchError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(WatchError::MissingDirectory(root.to_path_buf()));
        }
        // Events may carry the canonical form of the root.
        let canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let roots = [root.to_path_buf(), canonical];

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if !reports_change(&event.kind) {
                        return;
                    }
                    for path in &event.paths {
                        if let Some(relative) = relative_shader_path(&roots, path) {
                            log::trace!("Shader file changed: {relative}");
                            notifier.notify(&relative);
                        }
                    }
                }
                Err(e) => log::warn!("Shader watcher error: {e}"),
            },
            Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        log::info!("Watching shader directory '{}'", root.display());

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }

    /// The watched directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Whether an event can change what a shader path reads back.
///
/// Removals count: the next reparse turns the file into a null source.
fn reports_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

/// Converts an event path into a normalized, root-relative shader path.
fn relative_shader_path(roots: &[PathBuf], path: &Path) -> Option<String> {
    let relative = roots.iter().find_map(|root| path.strip_prefix(root).ok())?;
    let normalized = normalize_path(&relative.to_string_lossy());
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeQueue;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};
    use std::collections::BTreeSet;
    use std::time::{Duration, Instant};

    /// Drains `queue` until `path` shows up or `timeout` passes.
    fn wait_for(queue: &ChangeQueue, path: &str, timeout: Duration) -> BTreeSet<String> {
        let deadline = Instant::now() + timeout;
        let mut seen = BTreeSet::new();
        while Instant::now() < deadline {
            seen.extend(queue.drain());
            if seen.contains(path) {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        seen
    }

    #[test]
    fn content_and_presence_changes_are_reported() {
        assert!(reports_change(&EventKind::Create(CreateKind::File)));
        assert!(reports_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(reports_change(&EventKind::Remove(RemoveKind::File)));
        assert!(!reports_change(&EventKind::Access(AccessKind::Read)));
    }

    #[test]
    fn paths_are_made_relative_to_the_root() {
        let roots = [PathBuf::from("/work/shaders")];
        assert_eq!(
            relative_shader_path(&roots, Path::new("/work/shaders/common/math.glsl")).as_deref(),
            Some("common/math.glsl")
        );
        assert_eq!(relative_shader_path(&roots, Path::new("/work/shaders")), None);
        assert_eq!(relative_shader_path(&roots, Path::new("/elsewhere/a.frag")), None);
    }

    #[test]
    fn canonical_root_is_also_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        let roots = [dir.path().to_path_buf(), canonical.clone()];
        assert_eq!(
            relative_shader_path(&roots, &canonical.join("a.frag")).as_deref(),
            Some("a.frag")
        );
    }

    #[test]
    fn missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ChangeQueue::new();
        let err = DirectoryWatcher::start(dir.path().join("absent"), queue.notifier()).unwrap_err();
        assert!(matches!(err, WatchError::MissingDirectory(_)));
    }

    #[test]
    fn watcher_starts_on_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ChangeQueue::new();
        let watcher = DirectoryWatcher::start(dir.path(), queue.notifier()).unwrap();
        assert_eq!(watcher.root(), dir.path());
    }

    #[test]
    fn written_files_reach_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("common")).unwrap();
        let queue = ChangeQueue::new();
        let _watcher = DirectoryWatcher::start(dir.path(), queue.notifier()).unwrap();

        std::fs::write(dir.path().join("common").join("math.glsl"), "float pi();\n").unwrap();

        let seen = wait_for(&queue, "common/math.glsl", Duration::from_secs(10));
        assert!(seen.contains("common/math.glsl"), "observed {seen:?}");
    }

    #[test]
    fn removed_files_reach_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lighting.glsl");
        std::fs::write(&file, "vec3 light();\n").unwrap();
        let queue = ChangeQueue::new();
        let _watcher = DirectoryWatcher::start(dir.path(), queue.notifier()).unwrap();

        std::fs::remove_file(&file).unwrap();

        let seen = wait_for(&queue, "lighting.glsl", Duration::from_secs(10));
        assert!(seen.contains("lighting.glsl"), "observed {seen:?}");
    }
}
