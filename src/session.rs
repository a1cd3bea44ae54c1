//! Lifecycle of a mock file system installed for the duration of a test.

use anyhow::Context;
use tracing::{debug, warn};

use crate::builder::Config;
use crate::core::Binding;
use crate::options::Options;
use crate::vfs::{MockFS, Snapshot};

/// Routes file system calls of the code under test to a session.
///
/// Interception itself is host specific and lives outside this crate; a session only
/// drives its lifecycle.
pub trait Interceptor {
    /// Starts routing. `exclude_paths` must keep reaching the alternate binding.
    fn install(&mut self, exclude_paths: &[String]) -> anyhow::Result<()>;

    /// Stops routing and restores the real bindings.
    fn restore(&mut self) -> anyhow::Result<()>;
}

/// A mock file system together with its exclusion settings and optional interceptor.
///
/// The interceptor is installed on creation and restored by [`Session::dispose`], or on
/// drop if the session is never disposed explicitly.
///
/// ### Example
///
/// ```
/// use mockfs_kit::{Binding, Config, Options, Session};
///
/// let config = Config::new().entry("/tmp/foo.txt", "hello");
/// let mut session = Session::create(config, Options::bare())?;
/// assert_eq!(session.fs_mut().read_file("/tmp/foo.txt")?, b"hello");
/// session.dispose()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct Session {
    fs: MockFS,
    exclude_paths: Vec<String>,
    exclude_binding: Option<Box<dyn Binding + Send>>,
    interceptor: Option<Box<dyn Interceptor + Send>>,
    installed: bool,
}

impl Session {
    /// Builds the file system described by `config`.
    pub fn create(config: Config, options: Options) -> anyhow::Result<Self> {
        let fs = MockFS::create(config, &options).context("failed to build the mock file system")?;
        Ok(Self {
            fs,
            exclude_paths: options.exclude_paths,
            exclude_binding: options.exclude_binding,
            interceptor: None,
            installed: false,
        })
    }

    /// Builds the file system and installs `interceptor` in front of it.
    pub fn create_with(
        config: Config,
        options: Options,
        interceptor: Box<dyn Interceptor + Send>,
    ) -> anyhow::Result<Self> {
        let mut session = Self::create(config, options)?;
        session.install(interceptor)?;
        Ok(session)
    }

    fn install(&mut self, mut interceptor: Box<dyn Interceptor + Send>) -> anyhow::Result<()> {
        interceptor
            .install(&self.exclude_paths)
            .context("failed to install the interceptor")?;
        debug!(excluded = self.exclude_paths.len(), "interceptor installed");
        self.interceptor = Some(interceptor);
        self.installed = true;
        Ok(())
    }

    pub fn fs(&self) -> &MockFS {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut MockFS {
        &mut self.fs
    }

    /// Owned copy of the whole tree.
    pub fn root(&self) -> Snapshot {
        self.fs.snapshot()
    }

    pub fn exclude_paths(&self) -> &[String] {
        &self.exclude_paths
    }

    /// Checks if `path` starts with one of the excluded prefixes.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// The binding excluded paths should be served by.
    pub fn exclude_binding_mut(&mut self) -> Option<&mut (dyn Binding + Send + 'static)> {
        self.exclude_binding.as_deref_mut()
    }

    /// Restores the interceptor and tears the session down.
    pub fn dispose(mut self) -> anyhow::Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> anyhow::Result<()> {
        if !self.installed {
            return Ok(());
        }
        self.installed = false;
        if let Some(interceptor) = self.interceptor.as_mut() {
            interceptor
                .restore()
                .context("failed to restore the interceptor")?;
            debug!("interceptor restored");
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!(error = %format!("{err:#}"), "session dropped with a failing interceptor");
        }
    }
}
