//! Open file descriptors.
//!
//! A descriptor binds a small integer to an item, a byte position and the flags it was
//! opened with. Numbers are allocated lowest-free first, starting above the three standard
//! streams, and are reused once closed.

use crate::core::Fd;
use crate::error::ErrorKind;
use crate::vfs::Ino;

/// First descriptor number handed out; 0, 1 and 2 belong to the host's stdio.
pub const FIRST_FD: Fd = 3;

/// Flags an item is opened with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    /// Every write lands at the end of the file.
    pub append: bool,
    /// Create the file if it is missing.
    pub create: bool,
    /// With `create`: fail if the path already exists.
    pub exclusive: bool,
    /// Truncate an existing file to zero length (only with `write`).
    pub truncate: bool,
}

impl OpenFlags {
    /// `r`
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// `w`
    pub fn write_only() -> Self {
        Self {
            write: true,
            create: true,
            truncate: true,
            ..Self::default()
        }
    }

    /// `a`
    pub fn append_only() -> Self {
        Self {
            write: true,
            append: true,
            create: true,
            ..Self::default()
        }
    }

    /// `r+`
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Self::default()
        }
    }

    /// Parses a flag string: `r`, `r+`, `rs+`, `w`, `wx`, `w+`, `wx+`, `a`, `ax`, `a+`,
    /// `ax+` (`xw`/`xa` spellings are accepted too).
    pub fn parse(flags: &str) -> Result<Self, ErrorKind> {
        let parsed = match flags {
            "r" | "rs" | "sr" => Self::read_only(),
            "r+" | "rs+" | "sr+" => Self::read_write(),
            "w" => Self::write_only(),
            "wx" | "xw" => Self::write_only().exclusive(),
            "w+" => Self::write_only().readable(),
            "wx+" | "xw+" => Self::write_only().readable().exclusive(),
            "a" | "as" | "sa" => Self::append_only(),
            "ax" | "xa" => Self::append_only().exclusive(),
            "a+" | "as+" | "sa+" => Self::append_only().readable(),
            "ax+" | "xa+" => Self::append_only().readable().exclusive(),
            _ => return Err(ErrorKind::InvalidArgument),
        };
        Ok(parsed)
    }

    pub fn readable(mut self) -> Self {
        self.read = true;
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Creates the file when it is missing, e.g. `read_write().creating()` for `O_RDWR | O_CREAT`.
    pub fn creating(mut self) -> Self {
        self.create = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Descriptor {
    pub ino: Ino,
    pub position: u64,
    pub flags: OpenFlags,
}

impl Descriptor {
    pub fn new(ino: Ino, flags: OpenFlags) -> Self {
        Self {
            ino,
            position: 0,
            flags,
        }
    }
}

/// Table of open descriptors.
#[derive(Debug)]
pub(crate) struct DescriptorTable {
    slots: Vec<Option<Descriptor>>,
    limit: usize,
}

impl DescriptorTable {
    /// `limit` is the maximum number of simultaneously open descriptors.
    pub fn new(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            limit,
        }
    }

    pub fn is_full(&self) -> bool {
        self.open_count() >= self.limit
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Stores `descriptor` under the lowest free number.
    pub fn allocate(&mut self, descriptor: Descriptor) -> Result<Fd, ErrorKind> {
        if self.is_full() {
            return Err(ErrorKind::TooManyOpenFiles);
        }
        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(descriptor);
                index
            }
            None => {
                self.slots.push(Some(descriptor));
                self.slots.len() - 1
            }
        };
        Fd::try_from(index)
            .map(|index| index + FIRST_FD)
            .map_err(|_| ErrorKind::TooManyOpenFiles)
    }

    pub fn get(&self, fd: Fd) -> Result<&Descriptor, ErrorKind> {
        Self::index(fd)
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
            .ok_or(ErrorKind::BadDescriptor)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut Descriptor, ErrorKind> {
        Self::index(fd)
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::as_mut)
            .ok_or(ErrorKind::BadDescriptor)
    }

    pub fn release(&mut self, fd: Fd) -> Result<Descriptor, ErrorKind> {
        let index = Self::index(fd).ok_or(ErrorKind::BadDescriptor)?;
        let descriptor = self
            .slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(ErrorKind::BadDescriptor)?;
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        Ok(descriptor)
    }

    /// Checks if any open descriptor refers to `ino`.
    pub fn references(&self, ino: Ino) -> bool {
        self.slots.iter().flatten().any(|d| d.ino == ino)
    }

    fn index(fd: Fd) -> Option<usize> {
        fd.checked_sub(FIRST_FD).and_then(|i| usize::try_from(i).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_lowest_free() {
        let mut table = DescriptorTable::new(16);
        let a = table.allocate(Descriptor::new(1, OpenFlags::read_only())).unwrap();
        let b = table.allocate(Descriptor::new(2, OpenFlags::read_only())).unwrap();
        let c = table.allocate(Descriptor::new(3, OpenFlags::read_only())).unwrap();
        assert_eq!((a, b, c), (3, 4, 5));

        table.release(4).unwrap();
        let reused = table.allocate(Descriptor::new(9, OpenFlags::read_only())).unwrap();
        assert_eq!(reused, 4);
        assert_eq!(table.get(4).unwrap().ino, 9);
    }

    #[test]
    fn test_release_twice_is_bad_descriptor() {
        let mut table = DescriptorTable::new(16);
        let fd = table.allocate(Descriptor::new(1, OpenFlags::read_only())).unwrap();
        assert!(table.release(fd).is_ok());
        assert_eq!(table.release(fd), Err(ErrorKind::BadDescriptor));
        assert_eq!(table.get(fd).err(), Some(ErrorKind::BadDescriptor));
    }

    #[test]
    fn test_unknown_descriptors() {
        let table = DescriptorTable::new(16);
        assert_eq!(table.get(-1).err(), Some(ErrorKind::BadDescriptor));
        assert_eq!(table.get(0).err(), Some(ErrorKind::BadDescriptor));
        assert_eq!(table.get(100).err(), Some(ErrorKind::BadDescriptor));
    }

    #[test]
    fn test_limit() {
        let mut table = DescriptorTable::new(2);
        table.allocate(Descriptor::new(1, OpenFlags::read_only())).unwrap();
        table.allocate(Descriptor::new(1, OpenFlags::read_only())).unwrap();
        assert!(table.is_full());
        assert_eq!(
            table.allocate(Descriptor::new(1, OpenFlags::read_only())),
            Err(ErrorKind::TooManyOpenFiles)
        );
        assert!(table.references(1));
        assert!(!table.references(2));
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(OpenFlags::parse("r"), Ok(OpenFlags::read_only()));
        let wx = OpenFlags::parse("wx+").unwrap();
        assert!(wx.read && wx.write && wx.create && wx.exclusive && wx.truncate);
        let a = OpenFlags::parse("a").unwrap();
        assert!(a.append && a.create && !a.read && !a.truncate);
        assert_eq!(OpenFlags::parse("q"), Err(ErrorKind::InvalidArgument));
    }
}
