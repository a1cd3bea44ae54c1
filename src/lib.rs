//! An in-memory mock file system with POSIX semantics for hermetic tests.
//!
//! ### Overview
//!
//! `mockfs-kit` lets a test describe the files it needs, run code against them and inspect
//! the result, without ever touching the disk. The tree is built from a declarative
//! [`Config`] and driven through the syscall-shaped [`Binding`] trait: `open`, `read`,
//! `write`, `rename`, `readdir`, `symlink` and friends behave like their POSIX namesakes,
//! failures included (`ENOENT`, `ENOTDIR`, `ELOOP`, `EMFILE`...).
//!
//! **Key ideas**:
//! - **Fidelity**: inode numbers, link counts, permission bits, timestamps and descriptor
//!   numbers follow what a POSIX kernel reports.
//! - **Isolation**: every [`MockFS`] is an independent value; nothing leaks between tests.
//! - **Inspection**: [`MockFS::snapshot`] returns an owned copy of the tree to assert on.
//! - **Interception**: a [`Session`] drives an [`Interceptor`] that routes the calls of the
//!   code under test to the mock.
//!
//! ```
//! use mockfs_kit::{directory, Binding, Config, ErrorKind, MockFS, Options};
//!
//! let config = Config::new()
//!     .entry("/tmp/foo.txt", "hello")
//!     .entry("/empty", directory());
//! let mut fs = MockFS::create(config, &Options::bare())?;
//!
//! assert_eq!(fs.stat("/tmp/foo.txt")?.size, 5);
//! assert_eq!(fs.stat("/tmp/foo.txt/x").unwrap_err().kind(), ErrorKind::NotADirectory);
//! # Ok::<(), mockfs_kit::FsError>(())
//! ```

mod builder;
mod core;
mod error;
mod options;
mod session;
mod vfs;

pub use crate::builder::{Config, DirectorySpec, FileSpec, Node, SymlinkSpec, directory, file, symlink};
pub use crate::core::{Binding, Fd, Result, utils};
pub use crate::error::{ErrorKind, FsError, Target};
pub use crate::options::{MAX_FILE_SIZE, MAX_OPEN_FILES, Options};
pub use crate::session::{Interceptor, Session};
pub use crate::vfs::{
    DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, DEFAULT_SYMLINK_MODE, DEVICE_ID, DirEntry, F_OK,
    FIRST_FD, Identity, Ino, ItemType, MockFS, OpenFlags, PERMISSION_MASK, R_OK, S_IFDIR,
    S_IFLNK, S_IFMT, S_IFREG, SYMLINK_LIMIT, Snapshot, SnapshotKind, Stats, W_OK, X_OK,
};
