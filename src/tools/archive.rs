//! Debug-symbol archives.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{run_logged, ToolError};

/// One file going into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File on disk
    pub local: PathBuf,
    /// Name inside the archive
    pub name: String,
}

impl ArchiveEntry {
    /// Entry named after the file itself, located in `dir`.
    pub fn in_dir(dir: &Path, file_name: &str) -> Self {
        Self {
            local: dir.join(file_name),
            name: file_name.to_string(),
        }
    }
}

/// Packs entries into a single archive file.
pub trait Archiver {
    fn create(&self, dest: &Path, entries: &[ArchiveEntry]) -> Result<(), ToolError>;
}

fn check_inputs(entries: &[ArchiveEntry]) -> Result<(), ToolError> {
    match entries.iter().find(|e| !e.local.is_file()) {
        Some(missing) => Err(ToolError::MissingOutput(missing.local.clone())),
        None => Ok(()),
    }
}

/// Deflate zip written in-process.
#[derive(Debug, Clone, Default)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn create(&self, dest: &Path, entries: &[ArchiveEntry]) -> Result<(), ToolError> {
        check_inputs(entries)?;
        let file = File::create(dest)?;
        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for entry in entries {
            zip.start_file(entry.name.as_str(), options)
                .map_err(|e| ToolError::Archive(format!("{}: {}", entry.name, e)))?;
            let mut src = File::open(&entry.local)?;
            io::copy(&mut src, &mut zip)?;
        }
        zip.finish()
            .map_err(|e| ToolError::Archive(format!("{}: {}", dest.display(), e)))?;
        Ok(())
    }
}

/// LZSA archive made by the MakeLZSA tool.
///
/// The tool runs inside the destination directory and takes
/// `<file>:<name>` pairs, so entries are passed relative to it.
#[derive(Debug, Clone)]
pub struct LzsaArchiver {
    program: PathBuf,
}

impl LzsaArchiver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Archiver for LzsaArchiver {
    fn create(&self, dest: &Path, entries: &[ArchiveEntry]) -> Result<(), ToolError> {
        if !self.program.is_file() {
            return Err(ToolError::NotFound(self.program.clone()));
        }
        check_inputs(entries)?;
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let program = fs::canonicalize(&self.program)?;
        let dest_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut cmd = Command::new(program);
        cmd.current_dir(dir).arg(dest_name);
        for entry in entries {
            let local = entry.local.strip_prefix(dir).unwrap_or(&entry.local);
            cmd.arg(format!("{}:{}", local.display(), entry.name));
        }
        run_logged(&mut cmd)?;

        if !dest.is_file() {
            return Err(ToolError::MissingOutput(dest.to_path_buf()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_zip_contains_entries() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("SumatraPDF.pdb"), b"main symbols").unwrap();
        fs::write(dir.path().join("libmupdf.pdb"), b"mupdf symbols").unwrap();

        let dest = dir.path().join("SumatraPDF.pdb.zip");
        let entries = vec![
            ArchiveEntry::in_dir(dir.path(), "libmupdf.pdb"),
            ArchiveEntry::in_dir(dir.path(), "SumatraPDF.pdb"),
        ];
        ZipArchiver.create(&dest, &entries).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("SumatraPDF.pdb")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "main symbols");
    }

    #[test]
    fn test_zip_missing_input() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("x.zip");
        let err = ZipArchiver
            .create(&dest, &[ArchiveEntry::in_dir(dir.path(), "Installer.pdb")])
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingOutput(p) if p.ends_with("Installer.pdb")));
    }

    #[test]
    fn test_lzsa_tool_missing() {
        let dir = TempDir::new().unwrap();
        let err = LzsaArchiver::new(dir.path().join("MakeLZSA.exe"))
            .create(&dir.path().join("x.lzsa"), &[])
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
