//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a data-source path named in a config file.
///
/// Absolute paths are kept as-is. Relative paths are anchored at `base` (the
/// directory of the config file that named them), or at the working directory
/// when no base is known. `..` and `.` components are then resolved
/// syntactically so the path does not need to exist yet.
pub fn resolve_against(base: Option<&Path>, path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else if let Some(base) = base {
        anchor(base).join(path)
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    normalize_syntactic(&absolute)
}

/// Directory that relative entries in `config_file` are resolved against.
pub fn config_base_dir(config_file: &Path) -> Option<PathBuf> {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn anchor(base: &Path) -> PathBuf {
    if base.is_absolute() {
        base.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| base.to_path_buf(), |cwd| cwd.join(base))
    }
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}
