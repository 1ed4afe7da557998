use std::path::{Component, Path, PathBuf};

/// Directories that must never be used as a sweep root.
/// A single misconfigured root here would empty a system directory.
const PROTECTED_PATHS: &[&str] = &[
    "/",
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/home",
    "/lib",
    "/lib64",
    "/opt",
    "/proc",
    "/root",
    "/sbin",
    "/sys",
    "/usr",
    "/var",
    "/System",
    "/Applications",
    "/Library",
    "/Users",
];

/// Paths under home that must never be swept entirely
const PROTECTED_HOME_DIRS: &[&str] = &[
    "", // home dir itself
    "Desktop",
    "Documents",
    "Pictures",
    "Music",
    "Movies",
    ".ssh",
    ".gnupg",
];

/// Lexically normalize a path: drop `.` components and trailing separators,
/// resolve `..` against preceding components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Check if a path is protected and should NEVER be used as a sweep root
pub fn is_protected(path: &Path) -> bool {
    let path = normalize(path);

    if PROTECTED_PATHS.iter().any(|p| path == Path::new(p)) {
        return true;
    }

    if let Some(home) = dirs::home_dir() {
        let home = normalize(&home);
        for dir in PROTECTED_HOME_DIRS {
            let protected = if dir.is_empty() {
                home.clone()
            } else {
                home.join(dir)
            };
            if path == protected {
                return true;
            }
        }
    }

    false
}
