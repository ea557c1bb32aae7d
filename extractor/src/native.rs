//! Native library scanning.
//!
//! Every `*.so` under the raw `lib/` tree is handed to a [`BinaryParser`].
//! Each library is processed in isolation: a parse failure becomes a
//! [`LibraryOutcome::Failed`] value and the walk moves on.

use goblin::elf::Elf;
use goblin::elf::header::machine_to_str;
use goblin::elf::section_header::SHN_UNDEF;
use goblin::elf::sym::{STB_GLOBAL, STB_WEAK};
use log::debug;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Suffix identifying shared objects.
pub const SHARED_OBJECT_SUFFIX: &str = ".so";

/// Maximum number of exported function names kept per library.
pub const MAX_REPORTED_EXPORTS: usize = 20;

/// Facts a parser extracts from one binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryInfo {
    /// Machine type tag, e.g. `AARCH64`.
    pub machine: String,
    /// Entry point address.
    pub entry_point: u64,
    /// Exported function names in parser order.
    pub exported_functions: Vec<String>,
}

/// Why a single library could not be parsed.
#[derive(Debug, Error)]
pub enum NativeParseError {
    /// The file could not be read.
    #[error("failed to read file: {0}")]
    Read(#[from] io::Error),

    /// The bytes are not a well-formed ELF object.
    #[error("{0}")]
    Malformed(String),
}

/// Parses a binary file into [`BinaryInfo`].
#[cfg_attr(test, mockall::automock)]
pub trait BinaryParser {
    /// Parses the binary at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NativeParseError`] when the file cannot be read or is not a
    /// valid object.
    fn parse(&self, path: &Path) -> Result<BinaryInfo, NativeParseError>;
}

/// [`BinaryParser`] backed by `goblin`'s ELF reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElfParser;

impl BinaryParser for ElfParser {
    fn parse(&self, path: &Path) -> Result<BinaryInfo, NativeParseError> {
        let bytes = std::fs::read(path)?;
        parse_elf(&bytes)
    }
}

/// Parses an in-memory ELF image.
///
/// Exported functions are the dynamic symbols that are functions, defined
/// in the object, and have global or weak binding, in symbol-table order.
///
/// # Errors
///
/// Returns [`NativeParseError::Malformed`] when `goblin` rejects the image.
pub fn parse_elf(bytes: &[u8]) -> Result<BinaryInfo, NativeParseError> {
    let elf = Elf::parse(bytes).map_err(|err| NativeParseError::Malformed(err.to_string()))?;

    let exported_functions = elf
        .dynsyms
        .iter()
        .filter(|sym| {
            sym.is_function()
                && sym.st_shndx != SHN_UNDEF as usize
                && matches!(sym.st_bind(), STB_GLOBAL | STB_WEAK)
        })
        .filter_map(|sym| elf.dynstrtab.get_at(sym.st_name))
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect();

    Ok(BinaryInfo {
        machine: machine_to_str(elf.header.e_machine).to_owned(),
        entry_point: elf.entry,
        exported_functions,
    })
}

/// One successfully parsed library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeLibrary {
    /// File name, e.g. `libgame.so`.
    pub file_name: String,
    /// Full path on disk.
    pub path: PathBuf,
    /// Machine type tag.
    pub machine: String,
    /// Entry point address.
    pub entry_point: u64,
    /// At most [`MAX_REPORTED_EXPORTS`] exported names, in parser order.
    pub exported_functions: Vec<String>,
    /// Number of exports the parser reported before truncation.
    pub total_exports: usize,
}

impl NativeLibrary {
    fn from_info(path: PathBuf, file_name: String, info: BinaryInfo) -> Self {
        let total_exports = info.exported_functions.len();
        let mut exported_functions = info.exported_functions;
        exported_functions.truncate(MAX_REPORTED_EXPORTS);
        Self {
            file_name,
            path,
            machine: info.machine,
            entry_point: info.entry_point,
            exported_functions,
            total_exports,
        }
    }
}

/// Result of processing one shared object.
#[derive(Debug)]
pub enum LibraryOutcome {
    /// The library parsed.
    Parsed(NativeLibrary),
    /// The library could not be parsed.
    Failed {
        /// File name of the library.
        file_name: String,
        /// Full path on disk.
        path: PathBuf,
        /// Parser error.
        error: NativeParseError,
    },
}

impl LibraryOutcome {
    /// File name of the library this outcome describes.
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Parsed(library) => &library.file_name,
            Self::Failed { file_name, .. } => file_name,
        }
    }
}

/// Walks `lib_dir` and parses every shared object found.
///
/// Files are visited in file-name order within each directory. A missing
/// directory yields no outcomes.
pub fn scan_native_libraries(lib_dir: &Path, parser: &dyn BinaryParser) -> Vec<LibraryOutcome> {
    shared_objects(lib_dir)
        .into_iter()
        .map(|path| {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            match parser.parse(&path) {
                Ok(info) => LibraryOutcome::Parsed(NativeLibrary::from_info(path, file_name, info)),
                Err(error) => {
                    debug!("failed to parse {}: {error}", path.display());
                    LibraryOutcome::Failed {
                        file_name,
                        path,
                        error,
                    }
                }
            }
        })
        .collect()
}

fn shared_objects(lib_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(lib_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("skipping unreadable entry under {}: {err}", lib_dir.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .ends_with(SHARED_OBJECT_SUFFIX)
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}
