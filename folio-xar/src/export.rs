//! Archive export.
//!
//! Every requested document is loaded and encoded before the first byte is
//! written: a document that cannot be loaded aborts the export instead of
//! producing an incomplete archive. The manifest goes last.

use crate::archive::{ArchiveSink, DirSink, ZipSink, PACKAGE_MANIFEST};
use crate::codec;
use crate::descriptor::{DefaultAction, PackageDescriptor, PackageInfo, XarEntry};
use crate::error::{XarError, XarResult};
use crate::filter::{self, DocumentFilter};
use crate::xml::Charset;
use folio_core::{DocumentKey, Version};
use folio_store::Wiki;
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Charset of document entries. The manifest is always ISO-8859-1.
    pub charset: Charset,
    pub info: PackageInfo,
    pub default_action: DefaultAction,
    /// Also export every stored translation of each requested original.
    pub with_translations: bool,
}

pub struct Exporter<'w> {
    wiki: &'w Wiki,
    filters: Vec<Box<dyn DocumentFilter>>,
}

impl<'w> Exporter<'w> {
    pub fn new(wiki: &'w Wiki) -> Self {
        Self {
            wiki,
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: impl DocumentFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// ZIP archive bytes.
    pub fn export_archive(&self, keys: &[DocumentKey], options: &ExportOptions) -> XarResult<Vec<u8>> {
        let mut sink = ZipSink::new(Cursor::new(Vec::new()));
        self.export_to(keys, options, &mut sink)?;
        Ok(sink.finish()?.into_inner())
    }

    /// Unpacked package below `root`.
    pub fn export_to_dir(
        &self,
        keys: &[DocumentKey],
        options: &ExportOptions,
        root: &Path,
    ) -> XarResult<PackageDescriptor> {
        let mut sink = DirSink::new(root)?;
        self.export_to(keys, options, &mut sink)
    }

    pub fn export_to(
        &self,
        keys: &[DocumentKey],
        options: &ExportOptions,
        sink: &mut dyn ArchiveSink,
    ) -> XarResult<PackageDescriptor> {
        let mut descriptor = PackageDescriptor::new(options.info.clone());
        let mut encoded = Vec::new();
        for key in self.expand(keys, options)? {
            let mut doc = self.wiki.load(&key)?;
            if doc.is_new() {
                return Err(XarError::DocumentNotFound(key));
            }
            if !options.info.preserve_version {
                doc.version = Version::INITIAL;
            }
            let bytes = codec::encode_document(&doc, &options.charset)?;
            let entry = XarEntry::new(key, options.default_action);
            encoded.push((entry.entry_name.clone(), bytes));
            descriptor.add_entry(entry)?;
        }

        for (name, bytes) in &encoded {
            sink.write_entry(name, bytes)?;
        }
        sink.write_entry(PACKAGE_MANIFEST, &descriptor.to_xml()?)?;
        log::info!(
            "exported {} documents as {} into package {:?}",
            encoded.len(),
            options.charset,
            descriptor.info.name
        );
        Ok(descriptor)
    }

    /// Requested keys that pass the filters, each followed by its stored
    /// translations when asked for.
    fn expand(&self, keys: &[DocumentKey], options: &ExportOptions) -> XarResult<Vec<DocumentKey>> {
        let mut expanded = Vec::with_capacity(keys.len());
        for key in keys {
            if !filter::accepted(&self.filters, key) {
                continue;
            }
            expanded.push(key.clone());
            if !options.with_translations || key.is_translation() {
                continue;
            }
            let original = self.wiki.load(key)?;
            for language in self.wiki.translations(&original)? {
                let translation = key.with_language(language);
                if !keys.contains(&translation) && filter::accepted(&self.filters, &translation) {
                    expanded.push(translation);
                }
            }
        }
        Ok(expanded)
    }
}
