//! Path resolution.
//!
//! Paths are walked one segment at a time from the root (relative paths are first joined
//! onto the working directory). Symbolic links are expanded in place: the segments of the
//! target are spliced in front of the remaining ones and the walk continues from the
//! link's directory, or from the root for an absolute target.
//!
//! Error precedence follows the kernel's lookup order: a non-directory component fails
//! with `ENOTDIR` and a directory without search permission fails with `EACCES` before
//! the next segment is even looked up.

use std::collections::VecDeque;

use tracing::trace;

use crate::core::utils;
use crate::error::ErrorKind;
use crate::vfs::tree::Tree;
use crate::vfs::{Identity, Ino, X_OK};

/// Default bound on symbolic link expansions per lookup (Linux `MAXSYMLINKS`).
pub const SYMLINK_LIMIT: usize = 40;

/// A resolved item and its canonical ancestry below the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub ino: Ino,
    pub chain: Vec<(String, Ino)>,
}

impl Resolved {
    fn new(chain: Vec<(String, Ino)>, root: Ino) -> Self {
        let ino = chain.last().map_or(root, |(_, ino)| *ino);
        Self { ino, chain }
    }

    /// Canonical absolute path.
    pub fn path(&self) -> String {
        let names: Vec<&str> = self.chain.iter().map(|(name, _)| name.as_str()).collect();
        utils::to_path(&names)
    }

    /// Directory holding this item and the entry name, `None` for the root.
    pub fn parent(&self, root: Ino) -> Option<(Ino, &str)> {
        let (name, _) = self.chain.last()?;
        let parent = self.chain.len().checked_sub(2).map_or(root, |i| self.chain[i].1);
        Some((parent, name.as_str()))
    }

    /// Checks if `ino` is this item or one of its ancestors (the root excluded).
    pub fn passes_through(&self, ino: Ino) -> bool {
        self.chain.iter().any(|(_, i)| *i == ino)
    }
}

/// Outcome of a lookup that may stop at a missing final segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lookup {
    Found(Resolved),
    /// Everything but the final segment resolved; `parent` is a directory.
    Missing { parent: Resolved, name: String },
}

pub(crate) struct Resolver<'a> {
    tree: &'a Tree,
    identity: Identity,
    limit: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a Tree, identity: Identity, limit: usize) -> Self {
        Self {
            tree,
            identity,
            limit,
        }
    }

    /// Resolves `path`; a missing item is `ENOENT`.
    pub fn resolve(&self, cwd: &str, path: &str, follow: bool) -> Result<Resolved, ErrorKind> {
        match self.lookup(cwd, path, follow)? {
            Lookup::Found(resolved) => Ok(resolved),
            Lookup::Missing { .. } => Err(ErrorKind::NotFound),
        }
    }

    /// Walks `path`. With `follow`, a symbolic link in the final position is expanded
    /// too (`stat` semantics); otherwise the link itself is returned (`lstat` semantics).
    /// A trailing `/` always follows and requires a directory.
    pub fn lookup(&self, cwd: &str, path: &str, follow: bool) -> Result<Lookup, ErrorKind> {
        if path.is_empty() {
            return Err(ErrorKind::NotFound);
        }
        if path.contains('\0') {
            return Err(ErrorKind::InvalidArgument);
        }
        let full = utils::join(cwd, path);
        let dir_required = full.ends_with('/') && full.len() > 1;
        let follow = follow || dir_required;

        let root = self.tree.root();
        let mut pending: VecDeque<String> = utils::segments(&full).map(str::to_string).collect();
        let mut chain: Vec<(String, Ino)> = Vec::new();
        let mut expansions = 0;

        while let Some(segment) = pending.pop_front() {
            let current = self.tree.item(chain.last().map_or(root, |(_, ino)| *ino))?;
            let entries = current.entries().ok_or(ErrorKind::NotADirectory)?;
            if !current.permits(self.identity, X_OK) {
                return Err(ErrorKind::PermissionDenied);
            }

            match segment.as_str() {
                "." => continue,
                ".." => {
                    chain.pop();
                    continue;
                }
                _ => {}
            }

            let is_last = pending.is_empty();
            let Some(&child) = entries.get(&segment) else {
                if is_last {
                    return Ok(Lookup::Missing {
                        parent: Resolved::new(chain, root),
                        name: segment,
                    });
                }
                return Err(ErrorKind::NotFound);
            };

            if let Some(target) = self.tree.item(child)?.target() {
                if !is_last || follow {
                    expansions += 1;
                    if expansions > self.limit {
                        return Err(ErrorKind::LinkLoop);
                    }
                    if target.is_empty() {
                        return Err(ErrorKind::NotFound);
                    }
                    trace!(link = %segment, link_target = target, "expanding symbolic link");
                    if utils::is_absolute(target) {
                        chain.clear();
                    }
                    for part in utils::segments(target).collect::<Vec<_>>().into_iter().rev() {
                        pending.push_front(part.to_string());
                    }
                    continue;
                }
            }

            chain.push((segment, child));
        }

        let resolved = Resolved::new(chain, root);
        if dir_required && !self.tree.item(resolved.ino)?.is_dir() {
            return Err(ErrorKind::NotADirectory);
        }
        Ok(Lookup::Found(resolved))
    }
}
