//! Declarative description of an initial tree.
//!
//! A [`Config`] maps paths to [`Node`]s. Plain content converts into a file node, while
//! [`file`], [`directory`] and [`symlink`] return builders that also carry metadata:
//!
//! ```
//! use mockfs_kit::{directory, file, symlink, Config};
//!
//! let config = Config::new()
//!     .entry("/etc/hosts", "127.0.0.1 localhost\n")
//!     .entry("/srv", directory().mode(0o755).item("index.html", file().content("<h1>hi</h1>")))
//!     .entry("/www", symlink("/srv"));
//! assert_eq!(config.len(), 3);
//! ```

use std::time::SystemTime;

use tracing::trace;

use crate::core::utils;
use crate::error::{ErrorKind, FsError, ResultExt};
use crate::vfs::tree::Tree;
use crate::vfs::{
    DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, DEFAULT_SYMLINK_MODE, Identity, Ino, ItemKind,
    PERMISSION_MASK,
};

const SYSCALL: &str = "create";

/// Optional metadata shared by every node builder. Unset fields take the defaults of the
/// file system being created.
#[derive(Debug, Clone, Default, PartialEq)]
struct Attributes {
    mode: Option<u32>,
    uid: Option<u32>,
    gid: Option<u32>,
    atime: Option<SystemTime>,
    mtime: Option<SystemTime>,
    ctime: Option<SystemTime>,
    birthtime: Option<SystemTime>,
}

macro_rules! attribute_setters {
    ($ty:ty) => {
        impl $ty {
            /// Permission bits.
            pub fn mode(mut self, mode: u32) -> Self {
                self.attrs.mode = Some(mode);
                self
            }

            pub fn uid(mut self, uid: u32) -> Self {
                self.attrs.uid = Some(uid);
                self
            }

            pub fn gid(mut self, gid: u32) -> Self {
                self.attrs.gid = Some(gid);
                self
            }

            pub fn atime(mut self, time: SystemTime) -> Self {
                self.attrs.atime = Some(time);
                self
            }

            pub fn mtime(mut self, time: SystemTime) -> Self {
                self.attrs.mtime = Some(time);
                self
            }

            pub fn ctime(mut self, time: SystemTime) -> Self {
                self.attrs.ctime = Some(time);
                self
            }

            pub fn birthtime(mut self, time: SystemTime) -> Self {
                self.attrs.birthtime = Some(time);
                self
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSpec {
    content: Vec<u8>,
    attrs: Attributes,
}

impl FileSpec {
    pub fn content<C: Into<Vec<u8>>>(mut self, content: C) -> Self {
        self.content = content.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectorySpec {
    items: Vec<(String, Node)>,
    attrs: Attributes,
}

impl DirectorySpec {
    /// Adds a child; a later child with the same name replaces an earlier one.
    pub fn item<S: Into<String>, N: Into<Node>>(mut self, name: S, node: N) -> Self {
        self.items.push((name.into(), node.into()));
        self
    }

    pub fn items<I, S, N>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = (S, N)>,
        S: Into<String>,
        N: Into<Node>,
    {
        self.items
            .extend(items.into_iter().map(|(name, node)| (name.into(), node.into())));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymlinkSpec {
    target: String,
    attrs: Attributes,
}

attribute_setters!(FileSpec);
attribute_setters!(DirectorySpec);
attribute_setters!(SymlinkSpec);

/// An empty file.
pub fn file() -> FileSpec {
    FileSpec::default()
}

/// An empty directory.
pub fn directory() -> DirectorySpec {
    DirectorySpec::default()
}

/// A symbolic link whose literal target is `target`.
pub fn symlink<S: Into<String>>(target: S) -> SymlinkSpec {
    SymlinkSpec {
        target: target.into(),
        attrs: Attributes::default(),
    }
}

/// One node of a configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    File(FileSpec),
    Directory(DirectorySpec),
    Symlink(SymlinkSpec),
}

impl From<FileSpec> for Node {
    fn from(spec: FileSpec) -> Self {
        Node::File(spec)
    }
}

impl From<DirectorySpec> for Node {
    fn from(spec: DirectorySpec) -> Self {
        Node::Directory(spec)
    }
}

impl From<SymlinkSpec> for Node {
    fn from(spec: SymlinkSpec) -> Self {
        Node::Symlink(spec)
    }
}

impl From<&str> for Node {
    fn from(content: &str) -> Self {
        file().content(content).into()
    }
}

impl From<String> for Node {
    fn from(content: String) -> Self {
        file().content(content).into()
    }
}

impl From<&[u8]> for Node {
    fn from(content: &[u8]) -> Self {
        file().content(content).into()
    }
}

impl<const N: usize> From<&[u8; N]> for Node {
    fn from(content: &[u8; N]) -> Self {
        file().content(content.as_slice()).into()
    }
}

impl From<Vec<u8>> for Node {
    fn from(content: Vec<u8>) -> Self {
        file().content(content).into()
    }
}

/// A nested configuration is a directory with default metadata.
impl From<Config> for Node {
    fn from(config: Config) -> Self {
        directory().items(config.entries).into()
    }
}

/// Ordered mapping from paths to nodes.
///
/// Keys may be absolute or relative to the working directory, may contain `.` and `..`,
/// and their missing ancestors are created as default directories. A later key replaces an
/// earlier node at the same path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    entries: Vec<(String, Node)>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry<S: Into<String>, N: Into<Node>>(mut self, path: S, node: N) -> Self {
        self.entries.push((path.into(), node.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>, N: Into<Node>> FromIterator<(S, N)> for Config {
    fn from_iter<I: IntoIterator<Item = (S, N)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(path, node)| (path.into(), node.into()))
                .collect(),
        }
    }
}

/// Turns configuration nodes into items of a tree.
pub(crate) struct Materializer<'a> {
    tree: &'a mut Tree,
    owner: Identity,
    now: SystemTime,
}

impl<'a> Materializer<'a> {
    pub fn new(tree: &'a mut Tree, owner: Identity, now: SystemTime) -> Self {
        Self { tree, owner, now }
    }

    /// Inserts every entry of `config`, resolving relative keys against `cwd`.
    pub fn populate(&mut self, cwd: &str, config: Config) -> Result<(), FsError> {
        for (key, node) in config.entries {
            let segments = utils::normalize(cwd, &key);
            match segments.split_last() {
                Some((name, ancestors)) => {
                    let parent = self.ensure_dirs(ancestors).at(SYSCALL, &key)?;
                    self.insert(parent, name, node, &key)?;
                }
                None => self.merge_into_root(node, &key)?,
            }
        }
        Ok(())
    }

    /// Walks `segments` from the root, creating missing directories. An existing
    /// non-directory on the way is `ENOTDIR`.
    pub fn ensure_dirs<S: AsRef<str>>(&mut self, segments: &[S]) -> Result<Ino, ErrorKind> {
        let mut dir = self.tree.root();
        for segment in segments {
            let segment = segment.as_ref();
            dir = match self.tree.child(dir, segment) {
                Some(child) if self.tree.item(child)?.is_dir() => child,
                Some(_) => return Err(ErrorKind::NotADirectory),
                None => {
                    let child =
                        self.tree
                            .create(ItemKind::directory(), DEFAULT_DIR_MODE, self.owner, self.now);
                    self.tree.link(dir, segment, child, self.now)?;
                    child
                }
            };
        }
        Ok(dir)
    }

    /// Names `node` as `name` in `parent`; a replaced item is discarded with its subtree.
    fn insert(&mut self, parent: Ino, name: &str, node: Node, path: &str) -> Result<Ino, FsError> {
        utils::validate_name(name).at(SYSCALL, path)?;
        let ino = self.build(node, path)?;
        if let Some(replaced) = self.tree.link(parent, name, ino, self.now).at(SYSCALL, path)? {
            trace!(path, replaced, "configuration entry replaced");
            self.tree.discard(replaced);
        }
        Ok(ino)
    }

    fn build(&mut self, node: Node, path: &str) -> Result<Ino, FsError> {
        let (kind, mode, attrs, children) = match node {
            Node::File(spec) => (
                ItemKind::file(spec.content),
                DEFAULT_FILE_MODE,
                spec.attrs,
                Vec::new(),
            ),
            Node::Directory(spec) => (ItemKind::directory(), DEFAULT_DIR_MODE, spec.attrs, spec.items),
            Node::Symlink(spec) => (
                ItemKind::symlink(&spec.target),
                DEFAULT_SYMLINK_MODE,
                spec.attrs,
                Vec::new(),
            ),
        };
        let ino = self.tree.create(kind, attrs.mode.unwrap_or(mode), self.owner, self.now);
        for (name, child) in children {
            let child_path = utils::join(path, &name);
            self.insert(ino, &name, child, &child_path)?;
        }
        // after the children: linking them touched the directory's times
        self.apply(ino, &attrs).at(SYSCALL, path)?;
        Ok(ino)
    }

    /// A key resolving to `/` merges a directory node into the root.
    fn merge_into_root(&mut self, node: Node, path: &str) -> Result<(), FsError> {
        let Node::Directory(spec) = node else {
            return Err(FsError::path(ErrorKind::IsADirectory, SYSCALL, path));
        };
        let root = self.tree.root();
        for (name, child) in spec.items {
            let child_path = utils::join("/", &name);
            self.insert(root, &name, child, &child_path)?;
        }
        self.apply(root, &spec.attrs).at(SYSCALL, path)
    }

    fn apply(&mut self, ino: Ino, attrs: &Attributes) -> Result<(), ErrorKind> {
        let item = self.tree.item_mut(ino)?;
        if let Some(mode) = attrs.mode {
            item.mode = mode & PERMISSION_MASK;
        }
        if let Some(uid) = attrs.uid {
            item.uid = uid;
        }
        if let Some(gid) = attrs.gid {
            item.gid = gid;
        }
        if let Some(atime) = attrs.atime {
            item.atime = atime;
        }
        if let Some(mtime) = attrs.mtime {
            item.mtime = mtime;
        }
        if let Some(ctime) = attrs.ctime {
            item.ctime = ctime;
        }
        if let Some(birthtime) = attrs.birthtime {
            item.birthtime = birthtime;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::vfs::{ItemType, Snapshot};

    fn materialize(cwd: &str, config: Config) -> Result<Tree, FsError> {
        let mut tree = Tree::new(DEFAULT_DIR_MODE, Identity::default(), SystemTime::now());
        Materializer::new(&mut tree, Identity::default(), SystemTime::now())
            .populate(cwd, config)?;
        Ok(tree)
    }

    fn snapshot(tree: &Tree) -> Snapshot {
        Snapshot::capture(tree, tree.root_item())
    }

    #[test]
    fn test_plain_content_becomes_file() -> Result<(), FsError> {
        let tree = materialize("/", Config::new().entry("/tmp/foo.txt", "hello"))?;
        let root = snapshot(&tree);

        let file = root.get("/tmp/foo.txt").unwrap();
        assert_eq!(file.content(), Some(&b"hello"[..]));
        assert_eq!(file.stats.size, 5);
        assert_eq!(file.stats.permissions(), DEFAULT_FILE_MODE);
        assert_eq!(root.get("/tmp").unwrap().item_type(), ItemType::Directory);
        Ok(())
    }

    #[test]
    fn test_metadata_is_applied() -> Result<(), FsError> {
        let epoch = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let config = Config::new()
            .entry(
                "/srv",
                directory()
                    .mode(0o750)
                    .uid(42)
                    .mtime(epoch)
                    .item("a.txt", file().content("a").gid(7).birthtime(epoch)),
            )
            .entry("/link", symlink("/srv/a.txt").mode(0o777));
        let root = snapshot(&materialize("/", config)?);

        let srv = root.get("/srv").unwrap();
        assert_eq!(srv.stats.permissions(), 0o750);
        assert_eq!(srv.stats.uid, 42);
        assert_eq!(srv.stats.mtime, epoch);

        let a = root.get("/srv/a.txt").unwrap();
        assert_eq!(a.stats.gid, 7);
        assert_eq!(a.stats.birthtime, epoch);

        let link = root.get("/link").unwrap();
        assert_eq!(link.target(), Some("/srv/a.txt"));
        assert_eq!(link.stats.permissions(), 0o777);
        Ok(())
    }

    #[test]
    fn test_relative_keys_and_nested_config() -> Result<(), FsError> {
        let nested = Config::new().entry("inner.txt", b"bytes");
        let config = Config::new()
            .entry("notes.txt", "n")
            .entry("../up.txt", "u")
            .entry("nested", nested);
        let root = snapshot(&materialize("/home/user", config)?);

        assert!(root.get("/home/user/notes.txt").is_some());
        assert!(root.get("/home/up.txt").is_some());
        assert_eq!(
            root.get("/home/user/nested/inner.txt").and_then(Snapshot::content),
            Some(&b"bytes"[..])
        );
        Ok(())
    }

    #[test]
    fn test_later_key_replaces_earlier() -> Result<(), FsError> {
        let config = Config::new()
            .entry("/a", directory().item("old.txt", "old"))
            .entry("/a/b.txt", "b")
            .entry("/a", "now a file");
        let tree = materialize("/", config)?;
        let root = snapshot(&tree);

        assert_eq!(root.get("/a").and_then(Snapshot::content), Some(&b"now a file"[..]));
        // root, /a
        assert_eq!(tree.len(), 2);
        Ok(())
    }

    #[test]
    fn test_entries_keep_insertion_order() -> Result<(), FsError> {
        let config: Config = vec![("/z", "z"), ("/a", "a"), ("/m", "m")].into_iter().collect();
        let root = snapshot(&materialize("/", config)?);
        let names: Vec<&String> = root.entries().unwrap().keys().collect();
        assert_eq!(names, ["z", "a", "m"]);
        Ok(())
    }

    #[test]
    fn test_root_key_merges() -> Result<(), FsError> {
        let config = Config::new().entry("/", directory().mode(0o755).item("x", "x"));
        let root = snapshot(&materialize("/", config)?);
        assert_eq!(root.stats.permissions(), 0o755);
        assert!(root.get("/x").is_some());

        let err = materialize("/", Config::new().entry("/", "content")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IsADirectory);
        Ok(())
    }

    #[test]
    fn test_invalid_configurations() {
        let err = materialize("/", Config::new().entry("/d", directory().item("a/b", "x")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "EINVAL: invalid argument, create '/d/a/b'");

        let err = materialize("/", Config::new().entry("/f", "x").entry("/f/g", "y"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
    }
}
