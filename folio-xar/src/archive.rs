//! Container layer: ZIP archives and plain directory trees.
//!
//! Readers return every file entry with its bytes; directory entries and
//! anything under `META-INF/` are dropped. Writers go through
//! [`ArchiveSink`] so export does not care where entries land.

use crate::error::{XarError, XarResult};
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Reserved path of the manifest.
pub const PACKAGE_MANIFEST: &str = "package.xml";

const META_INF: &str = "META-INF/";

/// Largest entry read from a ZIP archive, in bytes.
pub const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// One file of a package, path separated by `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

fn ignored(name: &str) -> bool {
    name.ends_with('/') || name.starts_with(META_INF)
}

// ─── Readers ─────────────────────────────────────────────────────────

pub fn read_zip(bytes: &[u8]) -> XarResult<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() || ignored(file.name()) {
            continue;
        }
        let name = file.name().to_string();
        let too_large = || XarError::ArchiveFormat(format!("{name}: entry exceeds {MAX_ENTRY_BYTES} bytes"));
        if file.size() > MAX_ENTRY_BYTES {
            return Err(too_large());
        }
        // The declared size is not trusted; the read itself is bounded.
        let mut bytes = Vec::new();
        (&mut file)
            .take(MAX_ENTRY_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| XarError::ArchiveFormat(format!("{name}: {e}")))?;
        if bytes.len() as u64 > MAX_ENTRY_BYTES {
            return Err(too_large());
        }
        entries.push(ArchiveEntry { name, bytes });
    }
    log::debug!("read {} entries from zip archive", entries.len());
    Ok(entries)
}

/// Read every file below `root`, named relative to it.
pub fn read_dir(root: &Path) -> XarResult<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for item in fs::read_dir(&dir)? {
            let path = item?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let name = relative_name(root, &path)?;
            if ignored(&name) {
                continue;
            }
            entries.push(ArchiveEntry {
                bytes: fs::read(&path)?,
                name,
            });
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    log::debug!("read {} entries from {}", entries.len(), root.display());
    Ok(entries)
}

fn relative_name(root: &Path, path: &Path) -> XarResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| XarError::ArchiveFormat(format!("{}: {e}", path.display())))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

// ─── Writers ─────────────────────────────────────────────────────────

pub trait ArchiveSink {
    fn write_entry(&mut self, name: &str, bytes: &[u8]) -> XarResult<()>;
}

/// Deflate-compressed ZIP output.
pub struct ZipSink<W: Write + Seek> {
    writer: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: ZipWriter::new(inner),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Write the central directory and hand back the underlying writer.
    pub fn finish(self) -> XarResult<W> {
        Ok(self.writer.finish()?)
    }
}

impl<W: Write + Seek> ArchiveSink for ZipSink<W> {
    fn write_entry(&mut self, name: &str, bytes: &[u8]) -> XarResult<()> {
        self.writer.start_file(name, self.options)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }
}

/// Writes entries as files below a root directory.
pub struct DirSink {
    root: PathBuf,
}

impl DirSink {
    pub fn new(root: impl Into<PathBuf>) -> XarResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_of(&self, name: &str) -> XarResult<PathBuf> {
        let relative = Path::new(name);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(XarError::ArchiveFormat(format!("unsafe entry name {name:?}")));
        }
        Ok(self.root.join(relative))
    }
}

impl ArchiveSink for DirSink {
    fn write_entry(&mut self, name: &str, bytes: &[u8]) -> XarResult<()> {
        let path = self.path_of(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(bytes).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_zip_reader_skips_directories_and_meta_inf() {
        let bytes = zip_of(&[
            ("package.xml", b"<package/>"),
            ("Main/", b""),
            ("Main/WebHome", b"<document/>"),
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0"),
        ]);
        let entries = read_zip(&bytes).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["package.xml", "Main/WebHome"]);
        assert_eq!(entries[1].bytes, b"<document/>");
    }

    /// Overwrite the uncompressed size in every local and central header.
    fn declare_size(bytes: &mut [u8], size: u32) {
        let patch = |bytes: &mut [u8], at: usize| bytes[at..at + 4].copy_from_slice(&size.to_le_bytes());
        for i in 0..bytes.len() {
            let tail = &bytes[i..];
            if tail.starts_with(b"PK\x03\x04") {
                patch(bytes, i + 22);
            } else if tail.starts_with(b"PK\x01\x02") {
                patch(bytes, i + 24);
            }
        }
    }

    #[test]
    fn test_lying_entry_size_is_format_error() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file(PACKAGE_MANIFEST, stored).unwrap();
        writer.write_all(b"<package/>").unwrap();
        let mut bytes = writer.finish().unwrap().into_inner();
        declare_size(&mut bytes, 0xFFFF_FFF0);

        let err = read_zip(&bytes).unwrap_err();
        assert!(matches!(err, XarError::ArchiveFormat(_)), "{err:?}");
    }

    #[test]
    fn test_garbage_is_not_an_archive() {
        assert!(matches!(read_zip(b"definitely not a zip"), Err(XarError::ArchiveFormat(_))));
    }

    #[test]
    fn test_zip_sink_output_is_readable() {
        let mut sink = ZipSink::new(Cursor::new(Vec::new()));
        sink.write_entry("Main/WebHome", b"hello").unwrap();
        sink.write_entry(PACKAGE_MANIFEST, b"<package/>").unwrap();
        let bytes = sink.finish().unwrap().into_inner();
        let entries = read_zip(&bytes).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Main/WebHome");
    }

    #[test]
    fn test_dir_sink_and_reader() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = DirSink::new(tmp.path().join("pack")).unwrap();
        sink.write_entry("Main/WebHome.fr", b"bonjour").unwrap();
        sink.write_entry(PACKAGE_MANIFEST, b"<package/>").unwrap();
        fs::create_dir_all(tmp.path().join("pack/META-INF")).unwrap();
        fs::write(tmp.path().join("pack/META-INF/extra"), b"x").unwrap();

        let entries = read_dir(&tmp.path().join("pack")).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Main/WebHome.fr", "package.xml"]);
    }

    #[test]
    fn test_dir_sink_rejects_escaping_names() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = DirSink::new(tmp.path()).unwrap();
        assert!(sink.write_entry("../outside", b"x").is_err());
        assert!(sink.write_entry("/etc/passwd", b"x").is_err());
    }
}
