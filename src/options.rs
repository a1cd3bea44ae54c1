//! Creation options of a mock file system.

use std::fmt;

use crate::core::Binding;
use crate::vfs::{Identity, SYMLINK_LIMIT};

/// Default maximum number of simultaneously open descriptors.
pub const MAX_OPEN_FILES: usize = 1024;

/// Largest size a file may grow to (4 GiB). Writes and truncations past it fail with
/// `EFBIG` and leave the file unchanged.
pub const MAX_FILE_SIZE: u64 = 1 << 32;

/// Options recognized when creating a [`MockFS`](crate::MockFS) or a
/// [`Session`](crate::Session).
///
/// ### Example
///
/// ```
/// use mockfs_kit::{Identity, Options};
///
/// let options = Options::default()
///     .with_cwd("/work")
///     .with_create_tmp(false)
///     .with_identity(Identity::new(501, 20));
/// assert!(options.create_cwd);
/// ```
pub struct Options {
    /// Create the directory chain of `cwd` (default `true`).
    pub create_cwd: bool,
    /// Create the directory chain of `tmp_dir` (default `true`).
    pub create_tmp: bool,
    /// Initial virtual working directory. Defaults to the host's current directory
    /// (only its name is used, the host file system is never read).
    pub cwd: String,
    /// Temporary directory path. Defaults to the host's temporary directory name.
    pub tmp_dir: String,
    /// Path prefixes an interceptor should route elsewhere. Not interpreted by the engine.
    pub exclude_paths: Vec<String>,
    /// Binding an interceptor should use for excluded paths. Not interpreted by the engine.
    pub exclude_binding: Option<Box<dyn Binding + Send>>,
    /// Simulated caller, owner of the items created by default.
    pub identity: Identity,
    /// Ceiling of the descriptor table.
    pub max_open_files: usize,
    /// Maximum number of symbolic link expansions per lookup.
    pub symlink_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        let cwd = std::env::current_dir()
            .ok()
            .and_then(|dir| dir.to_str().map(str::to_string))
            .filter(|dir| dir.starts_with('/'))
            .unwrap_or_else(|| "/".to_string());
        let tmp_dir = std::env::temp_dir()
            .to_str()
            .map(str::to_string)
            .filter(|dir| dir.starts_with('/'))
            .unwrap_or_else(|| "/tmp".to_string());

        Self {
            create_cwd: true,
            create_tmp: true,
            cwd,
            tmp_dir,
            exclude_paths: Vec::new(),
            exclude_binding: None,
            identity: Identity::default(),
            max_open_files: MAX_OPEN_FILES,
            symlink_limit: SYMLINK_LIMIT,
        }
    }
}

impl Options {
    /// Options that create neither the working nor the temporary directory and start in
    /// `/`: the tree contains exactly what the configuration describes.
    pub fn bare() -> Self {
        Self::default()
            .with_create_cwd(false)
            .with_create_tmp(false)
            .with_cwd("/")
    }

    pub fn with_create_cwd(mut self, create: bool) -> Self {
        self.create_cwd = create;
        self
    }

    pub fn with_create_tmp(mut self, create: bool) -> Self {
        self.create_tmp = create;
        self
    }

    pub fn with_cwd<S: Into<String>>(mut self, cwd: S) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_tmp_dir<S: Into<String>>(mut self, tmp_dir: S) -> Self {
        self.tmp_dir = tmp_dir.into();
        self
    }

    pub fn with_exclude_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclude_binding(mut self, binding: Box<dyn Binding + Send>) -> Self {
        self.exclude_binding = Some(binding);
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_max_open_files(mut self, max: usize) -> Self {
        self.max_open_files = max;
        self
    }

    pub fn with_symlink_limit(mut self, limit: usize) -> Self {
        self.symlink_limit = limit;
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("create_cwd", &self.create_cwd)
            .field("create_tmp", &self.create_tmp)
            .field("cwd", &self.cwd)
            .field("tmp_dir", &self.tmp_dir)
            .field("exclude_paths", &self.exclude_paths)
            .field("exclude_binding", &self.exclude_binding.is_some())
            .field("identity", &self.identity)
            .field("max_open_files", &self.max_open_files)
            .field("symlink_limit", &self.symlink_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert!(options.create_cwd);
        assert!(options.create_tmp);
        assert!(options.cwd.starts_with('/'));
        assert!(options.tmp_dir.starts_with('/'));
        assert!(options.exclude_paths.is_empty());
        assert_eq!(options.max_open_files, MAX_OPEN_FILES);
        assert_eq!(options.symlink_limit, 40);
        assert_eq!(options.identity, Identity::new(1000, 1000));
    }

    #[test]
    fn test_builder_methods() {
        let options = Options::bare()
            .with_exclude_paths(["/proc", "/sys"])
            .with_max_open_files(8)
            .with_symlink_limit(4);
        assert!(!options.create_cwd);
        assert!(!options.create_tmp);
        assert_eq!(options.cwd, "/");
        assert_eq!(options.exclude_paths, vec!["/proc", "/sys"]);
        assert_eq!(options.max_open_files, 8);
        assert_eq!(options.symlink_limit, 4);
        assert!(format!("{options:?}").contains("exclude_binding: false"));
    }
}
