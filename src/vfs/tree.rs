//! Arena holding every live item of one file system instance.
//!
//! Directories refer to their children by inode number; an item stays in the arena while a
//! directory entry names it or the engine keeps it alive for an open descriptor.

use std::collections::HashMap;
use std::time::SystemTime;

use crate::error::ErrorKind;
use crate::vfs::{Identity, Ino, Item, ItemKind};

const ROOT_INO: Ino = 1;

#[derive(Debug)]
pub(crate) struct Tree {
    items: HashMap<Ino, Item>,
    next_ino: Ino,
}

impl Tree {
    pub fn new(root_mode: u32, owner: Identity, now: SystemTime) -> Self {
        let mut root = Item::new(ROOT_INO, ItemKind::directory(), root_mode, owner, now);
        root.links = 1;
        let mut items = HashMap::new();
        items.insert(ROOT_INO, root);
        Self {
            items,
            next_ino: ROOT_INO + 1,
        }
    }

    pub fn root(&self) -> Ino {
        ROOT_INO
    }

    pub fn root_item(&self) -> &Item {
        // the root is created with the tree and never discarded
        &self.items[&ROOT_INO]
    }

    pub fn item(&self, ino: Ino) -> Result<&Item, ErrorKind> {
        self.items.get(&ino).ok_or(ErrorKind::NotFound)
    }

    pub fn item_mut(&mut self, ino: Ino) -> Result<&mut Item, ErrorKind> {
        self.items.get_mut(&ino).ok_or(ErrorKind::NotFound)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Allocates a new, not yet linked item.
    pub fn create(&mut self, kind: ItemKind, mode: u32, owner: Identity, now: SystemTime) -> Ino {
        let ino = self.next_ino;
        self.next_ino += 1;
        self.items.insert(ino, Item::new(ino, kind, mode, owner, now));
        ino
    }

    pub fn child(&self, dir: Ino, name: &str) -> Option<Ino> {
        self.items
            .get(&dir)
            .and_then(Item::entries)
            .and_then(|entries| entries.get(name))
            .copied()
    }

    /// Names `child` as `name` in `dir`, returning the item previously under that name.
    /// The replaced item is unlinked but not discarded.
    pub fn link(
        &mut self,
        dir: Ino,
        name: &str,
        child: Ino,
        now: SystemTime,
    ) -> Result<Option<Ino>, ErrorKind> {
        if !self.items.contains_key(&child) {
            return Err(ErrorKind::NotFound);
        }
        let parent = self.item_mut(dir)?;
        let entries = parent.entries_mut().ok_or(ErrorKind::NotADirectory)?;
        let replaced = entries.insert(name.to_string(), child);
        parent.touch_modified(now);

        if let Some(old) = replaced {
            if let Ok(item) = self.item_mut(old) {
                item.links = item.links.saturating_sub(1);
            }
        }
        self.item_mut(child)?.links += 1;
        Ok(replaced)
    }

    /// Removes the entry `name` from `dir`, returning the unlinked item.
    pub fn unlink(&mut self, dir: Ino, name: &str, now: SystemTime) -> Result<Ino, ErrorKind> {
        let parent = self.item_mut(dir)?;
        let entries = parent.entries_mut().ok_or(ErrorKind::NotADirectory)?;
        // Keeps the insertion order of the remaining entries.
        let ino = entries.shift_remove(name).ok_or(ErrorKind::NotFound)?;
        parent.touch_modified(now);

        let item = self.item_mut(ino)?;
        item.links = item.links.saturating_sub(1);
        Ok(ino)
    }

    /// Drops an item from the arena; a directory takes its whole subtree with it.
    pub fn discard(&mut self, ino: Ino) {
        if ino == ROOT_INO {
            return;
        }
        if let Some(item) = self.items.remove(&ino) {
            if let ItemKind::Directory { entries } = item.kind {
                for child in entries.into_values() {
                    self.discard(child);
                }
            }
        }
    }

    /// Link count as reported by `stat`: directories count `.` and each child's `..`.
    pub fn nlink(&self, ino: Ino) -> u64 {
        let Ok(item) = self.item(ino) else {
            return 0;
        };
        match item.entries() {
            Some(entries) if item.links > 0 => {
                let subdirs = entries
                    .values()
                    .filter(|child| self.item(**child).is_ok_and(Item::is_dir))
                    .count();
                2 + subdirs as u64
            }
            _ => u64::from(item.links),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Tree {
        Tree::new(0o755, Identity::default(), SystemTime::UNIX_EPOCH)
    }

    #[test]
    fn test_link_and_unlink() {
        let mut tree = tree();
        let now = SystemTime::now();
        let dir = tree.create(ItemKind::directory(), 0o755, Identity::default(), now);
        tree.link(tree.root(), "dir", dir, now).unwrap();

        assert_eq!(tree.child(tree.root(), "dir"), Some(dir));
        assert_eq!(tree.item(dir).unwrap().links, 1);
        assert_eq!(tree.item(tree.root()).unwrap().mtime, now);
        assert_eq!(tree.nlink(tree.root()), 3);

        let removed = tree.unlink(tree.root(), "dir", now).unwrap();
        assert_eq!(removed, dir);
        assert_eq!(tree.item(dir).unwrap().links, 0);
        assert_eq!(tree.unlink(tree.root(), "dir", now), Err(ErrorKind::NotFound));
    }

    #[test]
    fn test_inodes_are_never_reused() {
        let mut tree = tree();
        let now = SystemTime::now();
        let first = tree.create(ItemKind::file(Vec::new()), 0o644, Identity::default(), now);
        tree.discard(first);
        let second = tree.create(ItemKind::file(Vec::new()), 0o644, Identity::default(), now);
        assert_ne!(first, second);
    }

    #[test]
    fn test_replace_and_discard_subtree() {
        let mut tree = tree();
        let now = SystemTime::now();
        let dir = tree.create(ItemKind::directory(), 0o755, Identity::default(), now);
        let file = tree.create(ItemKind::file(b"x".to_vec()), 0o644, Identity::default(), now);
        tree.link(tree.root(), "dir", dir, now).unwrap();
        tree.link(dir, "file", file, now).unwrap();

        let other = tree.create(ItemKind::file(Vec::new()), 0o644, Identity::default(), now);
        let replaced = tree.link(tree.root(), "dir", other, now).unwrap();
        assert_eq!(replaced, Some(dir));

        tree.discard(dir);
        assert!(tree.item(dir).is_err());
        assert!(tree.item(file).is_err());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_link_into_file_fails() {
        let mut tree = tree();
        let now = SystemTime::now();
        let file = tree.create(ItemKind::file(Vec::new()), 0o644, Identity::default(), now);
        let other = tree.create(ItemKind::file(Vec::new()), 0o644, Identity::default(), now);
        assert_eq!(tree.link(file, "x", other, now), Err(ErrorKind::NotADirectory));
    }
}
