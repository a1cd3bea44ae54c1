//! Owned, read-only copy of a tree for inspection in tests.

use indexmap::IndexMap;

use crate::core::utils;
use crate::vfs::tree::Tree;
use crate::vfs::{Item, ItemKind, ItemType, Stats};

/// Recursive copy of an item with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub stats: Stats,
    pub kind: SnapshotKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotKind {
    File { content: Vec<u8> },
    Directory { entries: IndexMap<String, Snapshot> },
    Symlink { target: String },
}

impl Snapshot {
    /// Copies `item` and everything below it.
    pub(crate) fn capture(tree: &Tree, item: &Item) -> Snapshot {
        let kind = match &item.kind {
            ItemKind::File { content } => SnapshotKind::File {
                content: content.clone(),
            },
            ItemKind::Directory { entries } => SnapshotKind::Directory {
                entries: entries
                    .iter()
                    .filter_map(|(name, child)| {
                        let child = tree.item(*child).ok()?;
                        Some((name.clone(), Snapshot::capture(tree, child)))
                    })
                    .collect(),
            },
            ItemKind::Symlink { target } => SnapshotKind::Symlink {
                target: target.clone(),
            },
        };
        Snapshot {
            stats: item.stats(tree.nlink(item.ino)),
            kind,
        }
    }

    /// Descends along `path` from this snapshot. Symbolic links are not followed;
    /// `.` and `..` are not interpreted.
    pub fn get(&self, path: &str) -> Option<&Snapshot> {
        utils::segments(path).try_fold(self, |node, name| node.entries()?.get(name))
    }

    pub fn item_type(&self) -> ItemType {
        match self.kind {
            SnapshotKind::File { .. } => ItemType::File,
            SnapshotKind::Directory { .. } => ItemType::Directory,
            SnapshotKind::Symlink { .. } => ItemType::Symlink,
        }
    }

    pub fn content(&self) -> Option<&[u8]> {
        match &self.kind {
            SnapshotKind::File { content } => Some(content.as_slice()),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&IndexMap<String, Snapshot>> {
        match &self.kind {
            SnapshotKind::Directory { entries } => Some(entries),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            SnapshotKind::Symlink { target } => Some(target.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::vfs::Identity;

    #[test]
    fn test_capture_and_get() {
        let now = SystemTime::now();
        let owner = Identity::default();
        let mut tree = Tree::new(0o755, owner, now);
        let dir = tree.create(ItemKind::directory(), 0o700, owner, now);
        let file = tree.create(ItemKind::file(b"abc".to_vec()), 0o644, owner, now);
        let link = tree.create(ItemKind::symlink("file"), 0o666, owner, now);
        tree.link(tree.root(), "dir", dir, now).unwrap();
        tree.link(dir, "file", file, now).unwrap();
        tree.link(dir, "link", link, now).unwrap();

        let root = Snapshot::capture(&tree, tree.root_item());
        assert_eq!(root.item_type(), ItemType::Directory);
        assert_eq!(root.stats.nlink, 3);

        let captured = root.get("/dir/file").unwrap();
        assert_eq!(captured.content(), Some(&b"abc"[..]));
        assert_eq!(captured.stats.ino, file);
        assert_eq!(root.get("dir/link").and_then(Snapshot::target), Some("file"));
        assert_eq!(root.get("/dir").unwrap().stats.permissions(), 0o700);
        assert!(root.get("/dir/link/anything").is_none());
        assert!(root.get("/missing").is_none());

        let names: Vec<&String> = root.get("/dir").unwrap().entries().unwrap().keys().collect();
        assert_eq!(names, ["file", "link"]);
    }
}
