use crate::vfs::ItemType;

/// An entry returned by `readdir_with_types`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    kind: ItemType,
}

impl DirEntry {
    pub fn new<S: Into<String>>(name: S, kind: ItemType) -> DirEntry {
        DirEntry {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemType {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == ItemType::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ItemType::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == ItemType::Symlink
    }
}
