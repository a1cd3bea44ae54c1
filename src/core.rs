use std::io::SeekFrom;
use std::time::SystemTime;

use crate::error::FsError;
use crate::vfs::{DirEntry, OpenFlags, Stats};

/// File descriptor number handed out by [`Binding::open`].
pub type Fd = i32;

pub type Result<T> = std::result::Result<T, FsError>;

/// Size of the buffer used by the whole-file helpers.
const CHUNK_SIZE: usize = 8 * 1024;

/// The syscall-shaped operation surface of a mock file system.
///
/// Every method mirrors its POSIX namesake: paths are `/`-separated strings (absolute or
/// relative to [`Binding::cwd`]), modes are numeric permission bits and descriptors are
/// small integers. Interception adapters call the file system only through this trait.
///
/// The trait is object safe, so an alternate binding can be passed around as
/// `Box<dyn Binding + Send>`.
pub trait Binding {
    /// Returns the virtual current working directory (canonical, absolute).
    fn cwd(&self) -> &str;

    /// Changes the virtual current working directory.
    fn chdir(&mut self, path: &str) -> Result<()>;

    /// Metadata of the item at `path`, following a final symbolic link.
    fn stat(&self, path: &str) -> Result<Stats>;

    /// Metadata of the item at `path`; a final symbolic link is described itself.
    fn lstat(&self, path: &str) -> Result<Stats>;

    /// Metadata of the item behind an open descriptor.
    fn fstat(&self, fd: Fd) -> Result<Stats>;

    /// Checks accessibility of `path` for the `F_OK`/`R_OK`/`W_OK`/`X_OK` bits in `mode`.
    fn access(&self, path: &str, mode: u32) -> Result<()>;

    /// Canonical absolute path of `path` with every symbolic link resolved.
    fn realpath(&self, path: &str) -> Result<String>;

    /// Creates a directory. With `recursive`, missing ancestors are created too and an
    /// existing directory is not an error; the first created path is returned.
    fn mkdir(&mut self, path: &str, mode: u32, recursive: bool) -> Result<Option<String>>;

    /// Creates a uniquely named directory whose name starts with `prefix`.
    fn mkdtemp(&mut self, prefix: &str) -> Result<String>;

    fn rmdir(&mut self, path: &str) -> Result<()>;

    fn unlink(&mut self, path: &str) -> Result<()>;

    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Creates a symbolic link at `path` pointing to the literal `target`.
    fn symlink(&mut self, target: &str, path: &str) -> Result<()>;

    fn readlink(&self, path: &str) -> Result<String>;

    /// Names of the entries of a directory, in insertion order.
    fn readdir(&mut self, path: &str) -> Result<Vec<String>>;

    /// Like [`Binding::readdir`] but with the type of every entry.
    fn readdir_with_types(&mut self, path: &str) -> Result<Vec<DirEntry>>;

    /// Opens (and possibly creates) a file; `mode` applies only to a created file.
    fn open(&mut self, path: &str, flags: OpenFlags, mode: u32) -> Result<Fd>;

    fn close(&mut self, fd: Fd) -> Result<()>;

    /// Reads at the descriptor position and advances it. Returns the number of bytes read,
    /// `0` at end of file.
    fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize>;

    /// Reads at `offset` without moving the descriptor position.
    fn pread(&mut self, fd: Fd, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Writes at the descriptor position (or at the end in append mode) and advances it.
    fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize>;

    /// Writes at `offset` without moving the descriptor position.
    fn pwrite(&mut self, fd: Fd, buf: &[u8], offset: u64) -> Result<usize>;

    /// Repositions the descriptor, returning the new position.
    fn seek(&mut self, fd: Fd, pos: SeekFrom) -> Result<u64>;

    fn truncate(&mut self, path: &str, len: u64) -> Result<()>;

    fn ftruncate(&mut self, fd: Fd, len: u64) -> Result<()>;

    fn fsync(&self, fd: Fd) -> Result<()>;

    fn chmod(&mut self, path: &str, mode: u32) -> Result<()>;

    fn chown(&mut self, path: &str, uid: u32, gid: u32) -> Result<()>;

    fn utimes(&mut self, path: &str, atime: SystemTime, mtime: SystemTime) -> Result<()>;

    /// Copies content and permission bits of `src` into `dest`. With `exclusive`, an
    /// existing `dest` is an error.
    fn copy_file(&mut self, src: &str, dest: &str, exclusive: bool) -> Result<()>;

    /// Checks if `path` resolves to an item.
    fn exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }

    /// Reads the entire contents of a file.
    fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let fd = self.open(path, OpenFlags::read_only(), 0o666)?;
        let mut content = Vec::new();
        let mut chunk = [0u8; CHUNK_SIZE];
        let result = loop {
            match self.read(fd, &mut chunk) {
                Ok(0) => break Ok(content),
                Ok(n) => content.extend_from_slice(&chunk[..n]),
                Err(err) => break Err(err),
            }
        };
        self.close(fd)?;
        result
    }

    /// Replaces the contents of a file, creating it if needed.
    fn write_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let fd = self.open(path, OpenFlags::write_only(), 0o666)?;
        let result = write_all(self, fd, content);
        self.close(fd)?;
        result
    }

    /// Appends to a file, creating it if needed.
    fn append_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let fd = self.open(path, OpenFlags::append_only(), 0o666)?;
        let result = write_all(self, fd, content);
        self.close(fd)?;
        result
    }
}

fn write_all<B: Binding + ?Sized>(binding: &mut B, fd: Fd, mut content: &[u8]) -> Result<()> {
    while !content.is_empty() {
        let written = binding.write(fd, content)?;
        content = &content[written..];
    }
    Ok(())
}

pub mod utils {
    //! Helpers for `/`-separated virtual paths.

    use crate::error::ErrorKind;

    pub fn is_absolute(path: &str) -> bool {
        path.starts_with('/')
    }

    /// Non-empty segments of `path`; `.` and `..` are kept.
    pub fn segments(path: &str) -> impl Iterator<Item = &str> {
        path.split('/').filter(|s| !s.is_empty())
    }

    /// Joins `path` onto `base` unless `path` is already absolute.
    pub fn join(base: &str, path: &str) -> String {
        if is_absolute(path) {
            path.to_string()
        } else if base.ends_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Lexically normalized segments of `path` resolved against `cwd`:
    /// `.` is dropped and `..` removes the previous segment (never above the root).
    pub fn normalize(cwd: &str, path: &str) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for segment in segments(&join(cwd, path)) {
            match segment {
                "." => {}
                ".." => {
                    result.pop();
                }
                name => result.push(name.to_string()),
            }
        }
        result
    }

    /// Builds an absolute path from segments.
    pub fn to_path<S: AsRef<str>>(segments: &[S]) -> String {
        if segments.is_empty() {
            return "/".to_string();
        }
        segments.iter().fold(String::new(), |mut path, segment| {
            path.push('/');
            path.push_str(segment.as_ref());
            path
        })
    }

    /// Checks a directory entry name.
    pub fn validate_name(name: &str) -> Result<(), ErrorKind> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
            return Err(ErrorKind::InvalidArgument);
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_join() {
            assert_eq!(join("/home/user", "file.txt"), "/home/user/file.txt");
            assert_eq!(join("/", "file.txt"), "/file.txt");
            assert_eq!(join("/home", "/etc"), "/etc");
        }

        #[test]
        fn test_normalize() {
            assert_eq!(normalize("/current/dir", "../foo"), vec!["current", "foo"]);
            assert_eq!(normalize("/current/dir", "./foo"), vec!["current", "dir", "foo"]);
            assert_eq!(normalize("/", "/foo/./../bar"), vec!["bar"]);
            assert!(normalize("/a", "../../../..").is_empty());
            assert_eq!(normalize("/", "/foo//bar/"), vec!["foo", "bar"]);
        }

        #[test]
        fn test_to_path() {
            assert_eq!(to_path::<&str>(&[]), "/");
            assert_eq!(to_path(&["a", "b"]), "/a/b");
        }

        #[test]
        fn test_validate_name() {
            assert!(validate_name("file.txt").is_ok());
            assert_eq!(validate_name(""), Err(ErrorKind::InvalidArgument));
            assert_eq!(validate_name("a/b"), Err(ErrorKind::InvalidArgument));
            assert_eq!(validate_name(".."), Err(ErrorKind::InvalidArgument));
            assert_eq!(validate_name("nul\0"), Err(ErrorKind::InvalidArgument));
        }
    }
}
