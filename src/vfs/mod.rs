mod descriptor;
mod dir_entry;
mod item;
mod mock_fs;
mod resolver;
mod snapshot;
pub(crate) mod tree;

pub use descriptor::{FIRST_FD, OpenFlags};
pub use dir_entry::DirEntry;
pub(crate) use item::{Item, ItemKind};
pub use item::{
    DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, DEFAULT_SYMLINK_MODE, DEVICE_ID, F_OK, Identity, Ino,
    ItemType, PERMISSION_MASK, R_OK, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG, Stats, W_OK, X_OK,
};
pub use mock_fs::MockFS;
pub use resolver::SYMLINK_LIMIT;
pub use snapshot::{Snapshot, SnapshotKind};
