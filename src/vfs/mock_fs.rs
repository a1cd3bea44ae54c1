//! This module provides the mock file system engine: an in-memory tree driven through the
//! syscall-shaped [`Binding`] surface.

use std::io::SeekFrom;
use std::time::SystemTime;

use tracing::debug;

use crate::builder::{Config, Materializer};
use crate::core::{Binding, Fd, Result, utils};
use crate::error::{ErrorKind, ResultExt};
use crate::options::{MAX_FILE_SIZE, MAX_OPEN_FILES, Options};
use crate::vfs::descriptor::{Descriptor, DescriptorTable};
use crate::vfs::resolver::{Lookup, Resolved, Resolver, SYMLINK_LIMIT};
use crate::vfs::tree::Tree;
use crate::vfs::{
    DEFAULT_DIR_MODE, DEFAULT_SYMLINK_MODE, DirEntry, Identity, Ino, ItemKind, OpenFlags,
    PERMISSION_MASK, R_OK, Snapshot, Stats, W_OK, X_OK,
};

type Internal<T> = std::result::Result<T, ErrorKind>;

/// Mode of directories created by `mkdtemp`.
const TEMP_DIR_MODE: u32 = 0o700;

const TEMP_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// An in-memory POSIX-like file system.
///
/// `MockFS` owns a tree of files, directories and symbolic links, a table of open
/// descriptors and a virtual working directory. Nothing ever touches the host file system.
///
/// ### Internal state
///
/// * `tree`: arena of items keyed by inode number; directories map names to inode numbers
///   in insertion order. Inode numbers are never reused within an instance.
/// * `descriptors`: open descriptors (number, item, position, flags), lowest free number
///   first, starting at 3.
/// * `cwd`: canonical absolute path relative paths are resolved against.
/// * `identity`: the simulated caller all permission checks run for.
///
/// ### Invariants
///
/// 1. The root exists, is a directory and cannot be removed or renamed.
/// 2. Every item reachable from the root is named by exactly one directory entry.
/// 3. An unlinked item survives while a descriptor refers to it and is discarded on the
///    last close.
/// 4. A failed operation leaves the tree unchanged.
///
/// ### Thread Safety
///
/// Mutating operations take `&mut self`. Wrap the instance in a `Mutex` to share it.
///
/// ### Example
///
/// ```
/// use mockfs_kit::{Binding, Config, MockFS, Options};
///
/// let mut fs = MockFS::create(Config::new().entry("/docs/note.txt", "Hello"), &Options::bare())?;
///
/// assert_eq!(fs.read_file("/docs/note.txt")?, b"Hello");
/// fs.unlink("/docs/note.txt")?;
/// assert!(!fs.exists("/docs/note.txt"));
/// # Ok::<(), mockfs_kit::FsError>(())
/// ```
#[derive(Debug)]
pub struct MockFS {
    tree: Tree,
    descriptors: DescriptorTable,
    cwd: String,
    identity: Identity,
    symlink_limit: usize,
    temp_counter: u64,
}

impl Default for MockFS {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFS {
    /// Creates an instance holding only the root directory, with `/` as working directory.
    pub fn new() -> Self {
        let identity = Identity::default();
        Self {
            tree: Tree::new(DEFAULT_DIR_MODE, identity, SystemTime::now()),
            descriptors: DescriptorTable::new(MAX_OPEN_FILES),
            cwd: "/".to_string(),
            identity,
            symlink_limit: SYMLINK_LIMIT,
            temp_counter: 0,
        }
    }

    /// Creates an instance from a configuration.
    ///
    /// The working and temporary directory chains are created first (as requested by
    /// `options`), then every configuration entry is inserted in order.
    pub fn create(config: Config, options: &Options) -> Result<Self> {
        let now = SystemTime::now();
        let identity = options.identity;
        let cwd = utils::normalize("/", &options.cwd);
        let cwd_path = utils::to_path(&cwd);

        let mut tree = Tree::new(DEFAULT_DIR_MODE, identity, now);
        let mut materializer = Materializer::new(&mut tree, identity, now);
        if options.create_cwd {
            materializer.ensure_dirs(cwd.as_slice()).at("mkdir", &cwd_path)?;
        }
        if options.create_tmp {
            let tmp = utils::normalize("/", &options.tmp_dir);
            materializer.ensure_dirs(tmp.as_slice()).at("mkdir", &options.tmp_dir)?;
        }
        materializer.populate(&cwd_path, config)?;

        let fs = Self {
            tree,
            descriptors: DescriptorTable::new(options.max_open_files),
            cwd: cwd_path,
            identity,
            symlink_limit: options.symlink_limit,
            temp_counter: 0,
        };
        debug!(items = fs.tree.len(), cwd = %fs.cwd, "mock file system created");
        Ok(fs)
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Switches the simulated caller.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    /// Number of currently open descriptors.
    pub fn open_files(&self) -> usize {
        self.descriptors.open_count()
    }

    /// Owned copy of the whole tree.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.tree, self.tree.root_item())
    }

    /// Owned copy of the subtree at `path` (a final symbolic link is not followed).
    pub fn snapshot_at(&self, path: &str) -> Result<Snapshot> {
        let resolved = self.resolve(path, false).at("lstat", path)?;
        let item = self.tree.item(resolved.ino).at("lstat", path)?;
        Ok(Snapshot::capture(&self.tree, item))
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.tree, self.identity, self.symlink_limit)
    }

    fn resolve(&self, path: &str, follow: bool) -> Internal<Resolved> {
        self.resolver().resolve(&self.cwd, path, follow)
    }

    fn lookup(&self, path: &str, follow: bool) -> Internal<Lookup> {
        self.resolver().lookup(&self.cwd, path, follow)
    }

    fn check(&self, ino: Ino, access: u32) -> Internal<()> {
        if self.tree.item(ino)?.permits(self.identity, access) {
            Ok(())
        } else {
            Err(ErrorKind::PermissionDenied)
        }
    }

    /// Adding or removing an entry needs write and search permission on the directory.
    fn check_dir_writable(&self, dir: Ino) -> Internal<()> {
        self.check(dir, W_OK | X_OK)
    }

    /// Metadata changes are reserved to the owner.
    fn check_owner(&self, ino: Ino) -> Internal<()> {
        let item = self.tree.item(ino)?;
        if self.identity.is_root() || item.uid == self.identity.uid {
            Ok(())
        } else {
            Err(ErrorKind::PermissionDenied)
        }
    }

    fn stats_of(&self, ino: Ino) -> Internal<Stats> {
        Ok(self.tree.item(ino)?.stats(self.tree.nlink(ino)))
    }

    /// Creates an item owned by the caller and names it `name` in `parent`.
    fn add(&mut self, parent: Ino, name: &str, kind: ItemKind, mode: u32) -> Internal<Ino> {
        let now = SystemTime::now();
        let ino = self.tree.create(kind, mode, self.identity, now);
        self.tree.link(parent, name, ino, now)?;
        debug!(ino, parent, name, "item created");
        Ok(ino)
    }

    /// Discards `ino` once no directory entry and no descriptor refer to it.
    fn reap(&mut self, ino: Ino) {
        let unlinked = self.tree.item(ino).is_ok_and(|item| item.links == 0);
        if unlinked && !self.descriptors.references(ino) {
            debug!(ino, "item discarded");
            self.tree.discard(ino);
        }
    }

    fn change_dir(&mut self, path: &str) -> Internal<()> {
        let resolved = self.resolve(path, true)?;
        if !self.tree.item(resolved.ino)?.is_dir() {
            return Err(ErrorKind::NotADirectory);
        }
        self.check(resolved.ino, X_OK)?;
        self.cwd = resolved.path();
        Ok(())
    }

    fn check_access(&self, path: &str, mode: u32) -> Internal<()> {
        if mode & !(R_OK | W_OK | X_OK) != 0 {
            return Err(ErrorKind::InvalidArgument);
        }
        let resolved = self.resolve(path, true)?;
        self.check(resolved.ino, mode)
    }

    fn make_dir(&mut self, path: &str, mode: u32, recursive: bool) -> Internal<Option<String>> {
        if !recursive {
            return match self.lookup(path, false)? {
                Lookup::Found(_) => Err(ErrorKind::AlreadyExists),
                Lookup::Missing { parent, name } => {
                    self.check_dir_writable(parent.ino)?;
                    self.add(parent.ino, &name, ItemKind::directory(), mode)?;
                    Ok(None)
                }
            };
        }

        if path.is_empty() {
            return Err(ErrorKind::NotFound);
        }
        let segments = utils::normalize(&self.cwd, path);
        for depth in 1..=segments.len() {
            let prefix = utils::to_path(&segments[..depth]);
            match self.lookup(&prefix, true)? {
                Lookup::Found(resolved) => {
                    if !self.tree.item(resolved.ino)?.is_dir() {
                        return Err(if depth == segments.len() {
                            ErrorKind::AlreadyExists
                        } else {
                            ErrorKind::NotADirectory
                        });
                    }
                }
                Lookup::Missing { parent, .. } => {
                    // a dangling link occupies the name, like `mkdir -p`
                    if let Lookup::Found(_) = self.lookup(&prefix, false)? {
                        return Err(ErrorKind::AlreadyExists);
                    }
                    // everything below the first missing directory is created at once
                    self.check_dir_writable(parent.ino)?;
                    let mut dir = parent.ino;
                    for name in &segments[depth - 1..] {
                        dir = self.add(dir, name, ItemKind::directory(), mode)?;
                    }
                    return Ok(Some(prefix));
                }
            }
        }
        Ok(None)
    }

    fn make_temp_dir(&mut self, prefix: &str) -> Internal<String> {
        loop {
            let path = format!("{prefix}{}", self.next_temp_suffix());
            match self.make_dir(&path, TEMP_DIR_MODE, false) {
                Ok(_) => return Ok(path),
                Err(ErrorKind::AlreadyExists) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Six characters derived from a per-instance counter.
    fn next_temp_suffix(&mut self) -> String {
        self.temp_counter += 1;
        let mut value = self.temp_counter.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let base = TEMP_ALPHABET.len() as u64;
        (0..6)
            .map(|_| {
                let c = TEMP_ALPHABET[(value % base) as usize] as char;
                value /= base;
                c
            })
            .collect()
    }

    fn remove_dir(&mut self, path: &str) -> Internal<()> {
        if utils::segments(path).last() == Some(".") {
            return Err(ErrorKind::InvalidArgument);
        }
        let resolved = self.resolve(path, false)?;
        let Some((parent, name)) = resolved.parent(self.tree.root()) else {
            return Err(ErrorKind::Busy);
        };
        let is_empty = self
            .tree
            .item(resolved.ino)?
            .entries()
            .ok_or(ErrorKind::NotADirectory)?
            .is_empty();
        self.check_dir_writable(parent)?;
        if !is_empty {
            return Err(ErrorKind::NotEmpty);
        }

        self.tree.unlink(parent, name, SystemTime::now())?;
        debug!(path, ino = resolved.ino, "directory removed");
        self.reap(resolved.ino);
        Ok(())
    }

    fn remove_file(&mut self, path: &str) -> Internal<()> {
        let resolved = self.resolve(path, false)?;
        let Some((parent, name)) = resolved.parent(self.tree.root()) else {
            return Err(ErrorKind::IsADirectory);
        };
        if self.tree.item(resolved.ino)?.is_dir() {
            return Err(ErrorKind::IsADirectory);
        }
        self.check_dir_writable(parent)?;

        self.tree.unlink(parent, name, SystemTime::now())?;
        debug!(path, ino = resolved.ino, "item unlinked");
        self.reap(resolved.ino);
        Ok(())
    }

    fn move_item(&mut self, from: &str, to: &str) -> Internal<()> {
        let root = self.tree.root();
        let source = self.resolve(from, false)?;
        let Some((src_parent, src_name)) = source.parent(root) else {
            return Err(ErrorKind::Busy);
        };

        // (directory, name, item already there, destination lies below the source)
        let (dst_parent, dst_name, existing, inside) = match self.lookup(to, false)? {
            Lookup::Found(dest) => {
                let Some((parent, name)) = dest.parent(root) else {
                    return Err(ErrorKind::Busy);
                };
                let inside = dest.ino != source.ino && dest.passes_through(source.ino);
                (parent, name.to_string(), Some(dest.ino), inside)
            }
            Lookup::Missing { parent, name } => {
                let inside = parent.passes_through(source.ino);
                (parent.ino, name, None, inside)
            }
        };

        if existing == Some(source.ino) {
            return Ok(());
        }
        let source_is_dir = self.tree.item(source.ino)?.is_dir();
        if source_is_dir && inside {
            return Err(ErrorKind::InvalidArgument);
        }
        self.check_dir_writable(src_parent)?;
        self.check_dir_writable(dst_parent)?;
        if let Some(existing) = existing {
            match (source_is_dir, self.tree.item(existing)?.entries()) {
                (true, None) => return Err(ErrorKind::NotADirectory),
                (false, Some(_)) => return Err(ErrorKind::IsADirectory),
                (true, Some(entries)) if !entries.is_empty() => return Err(ErrorKind::NotEmpty),
                _ => {}
            }
        }

        let now = SystemTime::now();
        self.tree.unlink(src_parent, src_name, now)?;
        let replaced = self.tree.link(dst_parent, &dst_name, source.ino, now)?;
        self.tree.item_mut(source.ino)?.touch_changed(now);
        debug!(from, to, ino = source.ino, "item renamed");
        if let Some(replaced) = replaced {
            self.reap(replaced);
        }
        Ok(())
    }

    fn make_symlink(&mut self, target: &str, path: &str) -> Internal<()> {
        if target.is_empty() {
            return Err(ErrorKind::NotFound);
        }
        if target.contains('\0') {
            return Err(ErrorKind::InvalidArgument);
        }
        match self.lookup(path, false)? {
            Lookup::Found(_) => Err(ErrorKind::AlreadyExists),
            Lookup::Missing { parent, name } => {
                self.check_dir_writable(parent.ino)?;
                self.add(
                    parent.ino,
                    &name,
                    ItemKind::symlink(target),
                    DEFAULT_SYMLINK_MODE,
                )?;
                Ok(())
            }
        }
    }

    fn read_link(&self, path: &str) -> Internal<String> {
        let resolved = self.resolve(path, false)?;
        self.tree
            .item(resolved.ino)?
            .target()
            .map(str::to_string)
            .ok_or(ErrorKind::InvalidArgument)
    }

    /// Entry names and inode numbers of a directory; marks the directory accessed.
    fn list_dir(&mut self, path: &str) -> Internal<Vec<(String, Ino)>> {
        let resolved = self.resolve(path, true)?;
        let listing: Vec<(String, Ino)> = self
            .tree
            .item(resolved.ino)?
            .entries()
            .ok_or(ErrorKind::NotADirectory)?
            .iter()
            .map(|(name, ino)| (name.clone(), *ino))
            .collect();
        self.check(resolved.ino, R_OK)?;
        self.tree
            .item_mut(resolved.ino)?
            .touch_accessed(SystemTime::now());
        Ok(listing)
    }

    fn open_file(&mut self, path: &str, flags: OpenFlags, mode: u32) -> Internal<Fd> {
        let flags = if flags.read || flags.write {
            flags
        } else {
            flags.readable()
        };
        // checked first: a failing open must not create the file
        if self.descriptors.is_full() {
            return Err(ErrorKind::TooManyOpenFiles);
        }

        let exclusive = flags.create && flags.exclusive;
        let ino = match self.lookup(path, !exclusive)? {
            Lookup::Found(_) if exclusive => return Err(ErrorKind::AlreadyExists),
            Lookup::Found(resolved) => {
                let is_dir = self.tree.item(resolved.ino)?.is_dir();
                if is_dir && flags.write {
                    return Err(ErrorKind::IsADirectory);
                }
                let mut access = 0;
                if flags.read {
                    access |= R_OK;
                }
                if flags.write {
                    access |= W_OK;
                }
                self.check(resolved.ino, access)?;
                if flags.write && flags.truncate {
                    self.set_len(resolved.ino, 0)?;
                }
                resolved.ino
            }
            Lookup::Missing { parent, name } => {
                if !flags.create {
                    return Err(ErrorKind::NotFound);
                }
                if path.ends_with('/') {
                    return Err(ErrorKind::IsADirectory);
                }
                self.check_dir_writable(parent.ino)?;
                self.add(parent.ino, &name, ItemKind::file(Vec::new()), mode)?
            }
        };

        let fd = self.descriptors.allocate(Descriptor::new(ino, flags))?;
        debug!(fd, ino, path, "descriptor opened");
        Ok(fd)
    }

    fn close_descriptor(&mut self, fd: Fd) -> Internal<()> {
        let descriptor = self.descriptors.release(fd)?;
        debug!(fd, ino = descriptor.ino, "descriptor closed");
        self.reap(descriptor.ino);
        Ok(())
    }

    /// Reads at `offset`, or at the descriptor position (then advanced) when `None`.
    fn read_from(&mut self, fd: Fd, buf: &mut [u8], offset: Option<u64>) -> Internal<usize> {
        let descriptor = self.descriptors.get(fd)?;
        if !descriptor.flags.read {
            return Err(ErrorKind::BadDescriptor);
        }
        let ino = descriptor.ino;
        let start = offset.unwrap_or(descriptor.position);

        let item = self.tree.item_mut(ino)?;
        let is_dir = item.is_dir();
        let ItemKind::File { content } = &item.kind else {
            return Err(if is_dir {
                ErrorKind::IsADirectory
            } else {
                ErrorKind::InvalidArgument
            });
        };
        let from = usize::try_from(start).unwrap_or(usize::MAX).min(content.len());
        let count = buf.len().min(content.len() - from);
        buf[..count].copy_from_slice(&content[from..from + count]);
        item.touch_accessed(SystemTime::now());

        if offset.is_none() {
            self.descriptors.get_mut(fd)?.position = start + count as u64;
        }
        Ok(count)
    }

    /// Writes at `offset`, or at the descriptor position (then advanced) when `None`.
    /// In append mode every write lands at the end of the file.
    fn write_to(&mut self, fd: Fd, buf: &[u8], offset: Option<u64>) -> Internal<usize> {
        let descriptor = self.descriptors.get(fd)?;
        if !descriptor.flags.write {
            return Err(ErrorKind::BadDescriptor);
        }
        let ino = descriptor.ino;
        let start = if descriptor.flags.append {
            self.tree.item(ino)?.size()
        } else {
            offset.unwrap_or(descriptor.position)
        };

        let item = self.tree.item_mut(ino)?;
        let is_dir = item.is_dir();
        let ItemKind::File { content } = &mut item.kind else {
            return Err(if is_dir {
                ErrorKind::IsADirectory
            } else {
                ErrorKind::InvalidArgument
            });
        };
        if !buf.is_empty() {
            let end = start
                .checked_add(buf.len() as u64)
                .filter(|end| *end <= MAX_FILE_SIZE)
                .ok_or(ErrorKind::FileTooLarge)?;
            let from = usize::try_from(start).map_err(|_| ErrorKind::FileTooLarge)?;
            let to = usize::try_from(end).map_err(|_| ErrorKind::FileTooLarge)?;
            if content.len() < to {
                // the gap between the old end and `from` reads back as zeros
                content.resize(to, 0);
            }
            content[from..to].copy_from_slice(buf);
            item.touch_modified(SystemTime::now());
        }

        if offset.is_none() {
            self.descriptors.get_mut(fd)?.position = start + buf.len() as u64;
        }
        Ok(buf.len())
    }

    fn seek_descriptor(&mut self, fd: Fd, pos: SeekFrom) -> Internal<u64> {
        let descriptor = self.descriptors.get(fd)?;
        let position = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => descriptor.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.tree.item(descriptor.ino)?.size().checked_add_signed(delta),
        }
        .ok_or(ErrorKind::InvalidArgument)?;
        self.descriptors.get_mut(fd)?.position = position;
        Ok(position)
    }

    fn truncate_path(&mut self, path: &str, len: u64) -> Internal<()> {
        let resolved = self.resolve(path, true)?;
        if self.tree.item(resolved.ino)?.is_dir() {
            return Err(ErrorKind::IsADirectory);
        }
        self.check(resolved.ino, W_OK)?;
        self.set_len(resolved.ino, len)
    }

    fn truncate_descriptor(&mut self, fd: Fd, len: u64) -> Internal<()> {
        let descriptor = self.descriptors.get(fd)?;
        if !descriptor.flags.write {
            return Err(ErrorKind::BadDescriptor);
        }
        let ino = descriptor.ino;
        self.set_len(ino, len)
    }

    fn set_len(&mut self, ino: Ino, len: u64) -> Internal<()> {
        if len > MAX_FILE_SIZE {
            return Err(ErrorKind::FileTooLarge);
        }
        let len = usize::try_from(len).map_err(|_| ErrorKind::FileTooLarge)?;
        let item = self.tree.item_mut(ino)?;
        match &mut item.kind {
            ItemKind::File { content } => content.resize(len, 0),
            ItemKind::Directory { .. } => return Err(ErrorKind::IsADirectory),
            ItemKind::Symlink { .. } => return Err(ErrorKind::InvalidArgument),
        }
        item.touch_modified(SystemTime::now());
        Ok(())
    }

    fn change_mode(&mut self, path: &str, mode: u32) -> Internal<()> {
        let resolved = self.resolve(path, true)?;
        self.check_owner(resolved.ino)?;
        let item = self.tree.item_mut(resolved.ino)?;
        item.mode = mode & PERMISSION_MASK;
        item.touch_changed(SystemTime::now());
        Ok(())
    }

    /// Only the superuser may give an item away; the owner may change its group.
    fn change_owner(&mut self, path: &str, uid: u32, gid: u32) -> Internal<()> {
        let resolved = self.resolve(path, true)?;
        let identity = self.identity;
        let item = self.tree.item_mut(resolved.ino)?;
        if !identity.is_root() && (item.uid != identity.uid || uid != item.uid) {
            return Err(ErrorKind::PermissionDenied);
        }
        item.uid = uid;
        item.gid = gid;
        item.touch_changed(SystemTime::now());
        Ok(())
    }

    fn set_times(&mut self, path: &str, atime: SystemTime, mtime: SystemTime) -> Internal<()> {
        let resolved = self.resolve(path, true)?;
        self.check_owner(resolved.ino)?;
        let item = self.tree.item_mut(resolved.ino)?;
        item.atime = atime;
        item.mtime = mtime;
        item.touch_changed(SystemTime::now());
        Ok(())
    }

    fn copy(&mut self, src: &str, dest: &str, exclusive: bool) -> Internal<()> {
        let source = self.resolve(src, true)?;
        let item = self.tree.item(source.ino)?;
        let ItemKind::File { content } = &item.kind else {
            return Err(ErrorKind::IsADirectory);
        };
        let (content, mode) = (content.clone(), item.mode);
        self.check(source.ino, R_OK)?;

        match self.lookup(dest, !exclusive)? {
            Lookup::Found(_) if exclusive => return Err(ErrorKind::AlreadyExists),
            Lookup::Found(target) if target.ino == source.ino => {}
            Lookup::Found(target) => {
                if self.tree.item(target.ino)?.is_dir() {
                    return Err(ErrorKind::IsADirectory);
                }
                self.check(target.ino, W_OK)?;
                let item = self.tree.item_mut(target.ino)?;
                item.kind = ItemKind::file(content);
                item.touch_modified(SystemTime::now());
            }
            Lookup::Missing { parent, name } => {
                self.check_dir_writable(parent.ino)?;
                self.add(parent.ino, &name, ItemKind::file(content), mode)?;
            }
        }
        self.tree
            .item_mut(source.ino)?
            .touch_accessed(SystemTime::now());
        Ok(())
    }
}

impl Binding for MockFS {
    fn cwd(&self) -> &str {
        &self.cwd
    }

    fn chdir(&mut self, path: &str) -> Result<()> {
        self.change_dir(path).at("chdir", path)
    }

    fn stat(&self, path: &str) -> Result<Stats> {
        self.resolve(path, true)
            .and_then(|resolved| self.stats_of(resolved.ino))
            .at("stat", path)
    }

    fn lstat(&self, path: &str) -> Result<Stats> {
        self.resolve(path, false)
            .and_then(|resolved| self.stats_of(resolved.ino))
            .at("lstat", path)
    }

    fn fstat(&self, fd: Fd) -> Result<Stats> {
        self.descriptors
            .get(fd)
            .and_then(|descriptor| self.stats_of(descriptor.ino))
            .at_fd("fstat", fd)
    }

    fn access(&self, path: &str, mode: u32) -> Result<()> {
        self.check_access(path, mode).at("access", path)
    }

    fn realpath(&self, path: &str) -> Result<String> {
        self.resolve(path, true)
            .map(|resolved| resolved.path())
            .at("realpath", path)
    }

    fn mkdir(&mut self, path: &str, mode: u32, recursive: bool) -> Result<Option<String>> {
        self.make_dir(path, mode, recursive).at("mkdir", path)
    }

    fn mkdtemp(&mut self, prefix: &str) -> Result<String> {
        self.make_temp_dir(prefix).at("mkdtemp", prefix)
    }

    fn rmdir(&mut self, path: &str) -> Result<()> {
        self.remove_dir(path).at("rmdir", path)
    }

    fn unlink(&mut self, path: &str) -> Result<()> {
        self.remove_file(path).at("unlink", path)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.move_item(from, to).at_paths("rename", from, to)
    }

    fn symlink(&mut self, target: &str, path: &str) -> Result<()> {
        self.make_symlink(target, path)
            .at_paths("symlink", target, path)
    }

    fn readlink(&self, path: &str) -> Result<String> {
        self.read_link(path).at("readlink", path)
    }

    fn readdir(&mut self, path: &str) -> Result<Vec<String>> {
        let listing = self.list_dir(path).at("scandir", path)?;
        Ok(listing.into_iter().map(|(name, _)| name).collect())
    }

    fn readdir_with_types(&mut self, path: &str) -> Result<Vec<DirEntry>> {
        let listing = self.list_dir(path).at("scandir", path)?;
        listing
            .into_iter()
            .map(|(name, ino)| -> Internal<DirEntry> {
                Ok(DirEntry::new(name, self.tree.item(ino)?.item_type()))
            })
            .collect::<Internal<Vec<_>>>()
            .at("scandir", path)
    }

    fn open(&mut self, path: &str, flags: OpenFlags, mode: u32) -> Result<Fd> {
        self.open_file(path, flags, mode).at("open", path)
    }

    fn close(&mut self, fd: Fd) -> Result<()> {
        self.close_descriptor(fd).at_fd("close", fd)
    }

    fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        self.read_from(fd, buf, None).at_fd("read", fd)
    }

    fn pread(&mut self, fd: Fd, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.read_from(fd, buf, Some(offset)).at_fd("read", fd)
    }

    fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
        self.write_to(fd, buf, None).at_fd("write", fd)
    }

    fn pwrite(&mut self, fd: Fd, buf: &[u8], offset: u64) -> Result<usize> {
        self.write_to(fd, buf, Some(offset)).at_fd("write", fd)
    }

    fn seek(&mut self, fd: Fd, pos: SeekFrom) -> Result<u64> {
        self.seek_descriptor(fd, pos).at_fd("seek", fd)
    }

    fn truncate(&mut self, path: &str, len: u64) -> Result<()> {
        self.truncate_path(path, len).at("truncate", path)
    }

    fn ftruncate(&mut self, fd: Fd, len: u64) -> Result<()> {
        self.truncate_descriptor(fd, len).at_fd("ftruncate", fd)
    }

    fn fsync(&self, fd: Fd) -> Result<()> {
        self.descriptors.get(fd).map(|_| ()).at_fd("fsync", fd)
    }

    fn chmod(&mut self, path: &str, mode: u32) -> Result<()> {
        self.change_mode(path, mode).at("chmod", path)
    }

    fn chown(&mut self, path: &str, uid: u32, gid: u32) -> Result<()> {
        self.change_owner(path, uid, gid).at("chown", path)
    }

    fn utimes(&mut self, path: &str, atime: SystemTime, mtime: SystemTime) -> Result<()> {
        self.set_times(path, atime, mtime).at("utime", path)
    }

    fn copy_file(&mut self, src: &str, dest: &str, exclusive: bool) -> Result<()> {
        self.copy(src, dest, exclusive).at_paths("copyfile", src, dest)
    }
}
