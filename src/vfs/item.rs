//! Items of the virtual tree: files, directories and symbolic links.

use std::time::SystemTime;

use indexmap::IndexMap;

/// Inode number, unique within one file system instance.
pub type Ino = u64;

/// Device number reported for every item of a mock file system.
pub const DEVICE_ID: u64 = 8675309;

pub const S_IFMT: u32 = 0o170000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFLNK: u32 = 0o120000;

/// Permission bits (including setuid, setgid and sticky).
pub const PERMISSION_MASK: u32 = 0o7777;

pub const DEFAULT_FILE_MODE: u32 = 0o666;
pub const DEFAULT_DIR_MODE: u32 = 0o777;
pub const DEFAULT_SYMLINK_MODE: u32 = 0o666;

/// `access()` mode bits.
pub const F_OK: u32 = 0;
pub const R_OK: u32 = 4;
pub const W_OK: u32 = 2;
pub const X_OK: u32 = 1;

const BLOCK_SIZE: u64 = 4096;

/// The simulated user on whose behalf operations run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

impl Identity {
    /// The superuser: bypasses every permission check.
    pub const ROOT: Identity = Identity { uid: 0, gid: 0 };

    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    pub fn is_root(&self) -> bool {
        self.uid == 0
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new(1000, 1000)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ItemType {
    File,
    Directory,
    Symlink,
}

impl ItemType {
    fn type_bits(self) -> u32 {
        match self {
            ItemType::File => S_IFREG,
            ItemType::Directory => S_IFDIR,
            ItemType::Symlink => S_IFLNK,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ItemKind {
    File { content: Vec<u8> },
    /// Children by name, in insertion order.
    Directory { entries: IndexMap<String, Ino> },
    Symlink { target: String },
}

impl ItemKind {
    pub fn file(content: Vec<u8>) -> Self {
        ItemKind::File { content }
    }

    pub fn directory() -> Self {
        ItemKind::Directory {
            entries: IndexMap::new(),
        }
    }

    pub fn symlink(target: &str) -> Self {
        ItemKind::Symlink {
            target: target.to_string(),
        }
    }
}

/// A node of the tree together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Item {
    pub ino: Ino,
    /// Permission bits only, the type comes from `kind`.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub birthtime: SystemTime,
    /// Number of directory entries naming this item (0 once unlinked).
    pub links: u32,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(ino: Ino, kind: ItemKind, mode: u32, owner: Identity, now: SystemTime) -> Self {
        Self {
            ino,
            mode: mode & PERMISSION_MASK,
            uid: owner.uid,
            gid: owner.gid,
            atime: now,
            mtime: now,
            ctime: now,
            birthtime: now,
            links: 0,
            kind,
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self.kind {
            ItemKind::File { .. } => ItemType::File,
            ItemKind::Directory { .. } => ItemType::Directory,
            ItemKind::Symlink { .. } => ItemType::Symlink,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, ItemKind::Directory { .. })
    }

    /// Mode with type bits.
    pub fn full_mode(&self) -> u32 {
        self.item_type().type_bits() | self.mode
    }

    pub fn entries(&self) -> Option<&IndexMap<String, Ino>> {
        match &self.kind {
            ItemKind::Directory { entries } => Some(entries),
            _ => None,
        }
    }

    pub fn entries_mut(&mut self) -> Option<&mut IndexMap<String, Ino>> {
        match &mut self.kind {
            ItemKind::Directory { entries } => Some(entries),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Symlink { target } => Some(target),
            _ => None,
        }
    }

    pub fn size(&self) -> u64 {
        match &self.kind {
            ItemKind::File { content } => content.len() as u64,
            ItemKind::Directory { .. } => BLOCK_SIZE,
            ItemKind::Symlink { target } => target.len() as u64,
        }
    }

    /// Checks `access` (a combination of `R_OK`, `W_OK`, `X_OK`) against the owner, group
    /// or other permission bits, whichever class `who` falls in.
    pub fn permits(&self, who: Identity, access: u32) -> bool {
        if who.is_root() {
            return true;
        }
        let shift = if who.uid == self.uid {
            6
        } else if who.gid == self.gid {
            3
        } else {
            0
        };
        let granted = (self.mode >> shift) & 0o7;
        granted & access == access
    }

    pub fn touch_accessed(&mut self, now: SystemTime) {
        self.atime = now;
    }

    /// Content or entries changed.
    pub fn touch_modified(&mut self, now: SystemTime) {
        self.mtime = now;
        self.ctime = now;
    }

    /// Metadata changed.
    pub fn touch_changed(&mut self, now: SystemTime) {
        self.ctime = now;
    }

    pub fn stats(&self, nlink: u64) -> Stats {
        let size = self.size();
        Stats {
            dev: DEVICE_ID,
            ino: self.ino,
            mode: self.full_mode(),
            nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            size,
            blksize: BLOCK_SIZE,
            blocks: size.div_ceil(512),
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
            birthtime: self.birthtime,
        }
    }
}

/// Metadata snapshot returned by `stat`, `lstat` and `fstat`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Stats {
    pub dev: u64,
    pub ino: Ino,
    /// Type and permission bits.
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: u64,
    pub blksize: u64,
    /// Number of 512-byte blocks.
    pub blocks: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub birthtime: SystemTime,
}

impl Stats {
    pub fn item_type(&self) -> ItemType {
        match self.mode & S_IFMT {
            S_IFDIR => ItemType::Directory,
            S_IFLNK => ItemType::Symlink,
            _ => ItemType::File,
        }
    }

    pub fn is_file(&self) -> bool {
        self.item_type() == ItemType::File
    }

    pub fn is_dir(&self) -> bool {
        self.item_type() == ItemType::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.item_type() == ItemType::Symlink
    }

    pub fn permissions(&self) -> u32 {
        self.mode & PERMISSION_MASK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_owned_by(uid: u32, gid: u32, mode: u32) -> Item {
        Item::new(
            7,
            ItemKind::file(b"data".to_vec()),
            mode,
            Identity::new(uid, gid),
            SystemTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn test_new_item_metadata() {
        let now = SystemTime::now();
        let item = Item::new(3, ItemKind::directory(), 0o40755, Identity::new(5, 6), now);

        assert_eq!(item.mode, 0o755); // type bits stripped
        assert_eq!(item.full_mode(), S_IFDIR | 0o755);
        assert_eq!((item.uid, item.gid), (5, 6));
        assert_eq!(item.birthtime, now);
        assert_eq!(item.item_type(), ItemType::Directory);
    }

    #[test]
    fn test_permits_owner_group_other() {
        let item = file_owned_by(10, 20, 0o640);

        assert!(item.permits(Identity::new(10, 99), R_OK | W_OK));
        assert!(!item.permits(Identity::new(10, 99), X_OK));
        assert!(item.permits(Identity::new(11, 20), R_OK));
        assert!(!item.permits(Identity::new(11, 20), W_OK));
        assert!(!item.permits(Identity::new(11, 21), R_OK));
        assert!(item.permits(Identity::new(11, 21), F_OK));
    }

    #[test]
    fn test_permits_root_bypass() {
        let item = file_owned_by(10, 20, 0o000);
        assert!(item.permits(Identity::ROOT, R_OK | W_OK | X_OK));
    }

    #[test]
    fn test_sizes_and_stats() {
        let file = file_owned_by(1, 1, 0o644);
        let stats = file.stats(1);
        assert_eq!(stats.size, 4);
        assert_eq!(stats.blocks, 1);
        assert_eq!(stats.dev, DEVICE_ID);
        assert!(stats.is_file());
        assert_eq!(stats.permissions(), 0o644);

        let link = Item::new(
            8,
            ItemKind::symlink("../target"),
            DEFAULT_SYMLINK_MODE,
            Identity::default(),
            SystemTime::UNIX_EPOCH,
        );
        assert_eq!(link.size(), 9);
        assert!(link.stats(1).is_symlink());
    }

    #[test]
    fn test_touch_updates_timestamps() {
        let mut item = file_owned_by(1, 1, 0o644);
        let later = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(60);

        item.touch_changed(later);
        assert_eq!(item.ctime, later);
        assert_eq!(item.mtime, SystemTime::UNIX_EPOCH);

        item.touch_modified(later);
        assert_eq!(item.mtime, later);
        assert_eq!(item.birthtime, SystemTime::UNIX_EPOCH);
    }
}
