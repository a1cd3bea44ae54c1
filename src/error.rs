//! Error taxonomy of the mock file system.
//!
//! Every failing operation produces exactly one [`FsError`]: a symbolic [`ErrorKind`]
//! (mirroring a POSIX errno), the name of the syscall that raised it and the path(s) or
//! descriptor involved.

use std::fmt;
use std::io;

use crate::core::Fd;

/// Symbolic failure kinds, one per errno the engine can report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `ENOENT`
    NotFound,
    /// `ENOTDIR`
    NotADirectory,
    /// `EISDIR`
    IsADirectory,
    /// `EEXIST`
    AlreadyExists,
    /// `ENOTEMPTY`
    NotEmpty,
    /// `EACCES`
    PermissionDenied,
    /// `ELOOP`
    LinkLoop,
    /// `EBADF`
    BadDescriptor,
    /// `EMFILE`
    TooManyOpenFiles,
    /// `EINVAL`
    InvalidArgument,
    /// `EBUSY`
    Busy,
    /// `EFBIG`
    FileTooLarge,
}

impl ErrorKind {
    /// Errno code, e.g. `"ENOENT"`.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "ENOENT",
            ErrorKind::NotADirectory => "ENOTDIR",
            ErrorKind::IsADirectory => "EISDIR",
            ErrorKind::AlreadyExists => "EEXIST",
            ErrorKind::NotEmpty => "ENOTEMPTY",
            ErrorKind::PermissionDenied => "EACCES",
            ErrorKind::LinkLoop => "ELOOP",
            ErrorKind::BadDescriptor => "EBADF",
            ErrorKind::TooManyOpenFiles => "EMFILE",
            ErrorKind::InvalidArgument => "EINVAL",
            ErrorKind::Busy => "EBUSY",
            ErrorKind::FileTooLarge => "EFBIG",
        }
    }

    /// Linux errno number.
    pub fn errno(self) -> i32 {
        match self {
            ErrorKind::NotFound => 2,
            ErrorKind::NotADirectory => 20,
            ErrorKind::IsADirectory => 21,
            ErrorKind::AlreadyExists => 17,
            ErrorKind::NotEmpty => 39,
            ErrorKind::PermissionDenied => 13,
            ErrorKind::LinkLoop => 40,
            ErrorKind::BadDescriptor => 9,
            ErrorKind::TooManyOpenFiles => 24,
            ErrorKind::InvalidArgument => 22,
            ErrorKind::Busy => 16,
            ErrorKind::FileTooLarge => 27,
        }
    }

    /// Human readable description, as printed by libc.
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "no such file or directory",
            ErrorKind::NotADirectory => "not a directory",
            ErrorKind::IsADirectory => "illegal operation on a directory",
            ErrorKind::AlreadyExists => "file already exists",
            ErrorKind::NotEmpty => "directory not empty",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::LinkLoop => "too many symbolic links encountered",
            ErrorKind::BadDescriptor => "bad file descriptor",
            ErrorKind::TooManyOpenFiles => "too many open files",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Busy => "resource busy or locked",
            ErrorKind::FileTooLarge => "file too large",
        }
    }

    fn io_kind(self) -> io::ErrorKind {
        match self {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::NotADirectory => io::ErrorKind::NotADirectory,
            ErrorKind::IsADirectory => io::ErrorKind::IsADirectory,
            ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            ErrorKind::NotEmpty => io::ErrorKind::DirectoryNotEmpty,
            ErrorKind::PermissionDenied => io::ErrorKind::PermissionDenied,
            ErrorKind::LinkLoop => io::ErrorKind::Other,
            ErrorKind::BadDescriptor => io::ErrorKind::InvalidInput,
            ErrorKind::TooManyOpenFiles => io::ErrorKind::Other,
            ErrorKind::InvalidArgument => io::ErrorKind::InvalidInput,
            ErrorKind::Busy => io::ErrorKind::ResourceBusy,
            ErrorKind::FileTooLarge => io::ErrorKind::FileTooLarge,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What an error is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Path(String),
    /// Two-path operations (`rename`, `symlink`, `copy_file`).
    Paths(String, String),
    Descriptor(Fd),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Path(path) => write!(f, " '{path}'"),
            Target::Paths(from, to) => write!(f, " '{from}' -> '{to}'"),
            Target::Descriptor(_) => Ok(()),
        }
    }
}

/// Errno-style error raised by a mock file system operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {}, {}{}", .kind.code(), .kind.description(), .syscall, .target)]
pub struct FsError {
    kind: ErrorKind,
    syscall: &'static str,
    target: Target,
}

impl FsError {
    pub fn new(kind: ErrorKind, syscall: &'static str, target: Target) -> Self {
        Self {
            kind,
            syscall,
            target,
        }
    }

    pub fn path(kind: ErrorKind, syscall: &'static str, path: &str) -> Self {
        Self::new(kind, syscall, Target::Path(path.to_string()))
    }

    pub fn paths(kind: ErrorKind, syscall: &'static str, from: &str, to: &str) -> Self {
        Self::new(kind, syscall, Target::Paths(from.to_string(), to.to_string()))
    }

    pub fn descriptor(kind: ErrorKind, syscall: &'static str, fd: Fd) -> Self {
        Self::new(kind, syscall, Target::Descriptor(fd))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Errno code, e.g. `"ENOTDIR"`.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn errno(&self) -> i32 {
        self.kind.errno()
    }

    /// Name of the operation that failed, e.g. `"open"`.
    pub fn syscall(&self) -> &'static str {
        self.syscall
    }

    pub fn target(&self) -> &Target {
        &self.target
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        io::Error::new(err.kind.io_kind(), err)
    }
}

/// Attaches syscall context to internal `ErrorKind` results.
pub(crate) trait ResultExt<T> {
    fn at(self, syscall: &'static str, path: &str) -> Result<T, FsError>;
    fn at_fd(self, syscall: &'static str, fd: Fd) -> Result<T, FsError>;
    fn at_paths(self, syscall: &'static str, from: &str, to: &str) -> Result<T, FsError>;
}

impl<T> ResultExt<T> for Result<T, ErrorKind> {
    fn at(self, syscall: &'static str, path: &str) -> Result<T, FsError> {
        self.map_err(|kind| FsError::path(kind, syscall, path))
    }

    fn at_fd(self, syscall: &'static str, fd: Fd) -> Result<T, FsError> {
        self.map_err(|kind| FsError::descriptor(kind, syscall, fd))
    }

    fn at_paths(self, syscall: &'static str, from: &str, to: &str) -> Result<T, FsError> {
        self.map_err(|kind| FsError::paths(kind, syscall, from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let err = FsError::path(ErrorKind::NotFound, "open", "/missing");
        assert_eq!(
            err.to_string(),
            "ENOENT: no such file or directory, open '/missing'"
        );

        let err = FsError::paths(ErrorKind::NotEmpty, "rename", "/a", "/b");
        assert_eq!(err.to_string(), "ENOTEMPTY: directory not empty, rename '/a' -> '/b'");

        let err = FsError::descriptor(ErrorKind::BadDescriptor, "close", 7);
        assert_eq!(err.to_string(), "EBADF: bad file descriptor, close");
        assert_eq!(err.target(), &Target::Descriptor(7));
    }

    #[test]
    fn test_kind_codes_and_errno() {
        assert_eq!(ErrorKind::LinkLoop.code(), "ELOOP");
        assert_eq!(ErrorKind::LinkLoop.errno(), 40);
        assert_eq!(ErrorKind::NotADirectory.errno(), 20);
        assert_eq!(ErrorKind::TooManyOpenFiles.code(), "EMFILE");
        assert_eq!(ErrorKind::FileTooLarge.code(), "EFBIG");
        assert_eq!(ErrorKind::FileTooLarge.errno(), 27);
    }

    #[test]
    fn test_into_io_error() {
        let err = FsError::path(ErrorKind::AlreadyExists, "mkdir", "/tmp");
        let io_err: io::Error = err.clone().into();
        assert_eq!(io_err.kind(), io::ErrorKind::AlreadyExists);
        let inner = io_err.get_ref().and_then(|e| e.downcast_ref::<FsError>());
        assert_eq!(inner, Some(&err));
    }

    #[test]
    fn test_result_ext_attaches_context() {
        let res: Result<(), ErrorKind> = Err(ErrorKind::PermissionDenied);
        let err = res.at("readdir", "/secret").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(err.syscall(), "readdir");
        assert_eq!(err.target(), &Target::Path("/secret".to_string()));
    }
}
