//! In-memory OPC package: the ZIP container behind a `.pptx` file.

use songdeck_core::{Error, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the content types part.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Name of the package-level relationships part.
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";

/// All parts of a package, keyed by part name without a leading slash
/// (e.g. `ppt/slides/slide1.xml`).
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<String, Vec<u8>>,
}

impl Package {
    /// Create an empty package.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every part from a ZIP archive.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::Zip(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().trim_start_matches('/').to_string();
            let mut content = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut content)
                .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", name, e)))?;
            parts.insert(name, content);
        }

        log::debug!("Read package with {} parts", parts.len());
        Ok(Self { parts })
    }

    /// Open a package file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| Error::from_io(path, e))?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Whether a part exists.
    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    /// Raw bytes of a part.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(|v| v.as_slice())
    }

    /// A part decoded as UTF-8 XML text.
    pub fn part_str(&self, name: &str) -> Result<String> {
        let bytes = self
            .part(name)
            .ok_or_else(|| Error::Template(format!("Missing part '{}'", name)))?;
        crate::xml::part_text(name, bytes)
    }

    /// Insert or replace a part.
    pub fn set_part(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.parts.insert(name.into(), content.into());
    }

    /// Remove a part, returning its bytes if it existed.
    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(name)
    }

    /// Part names in sorted order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(|k| k.as_str())
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the package holds no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Serialize the package to ZIP bytes.
    ///
    /// `[Content_Types].xml` and `_rels/.rels` are written first.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let leading = [CONTENT_TYPES_PART, PACKAGE_RELS_PART];
        let ordered = leading
            .iter()
            .filter_map(|name| self.parts.get_key_value(*name))
            .chain(
                self.parts
                    .iter()
                    .filter(|(name, _)| !leading.contains(&name.as_str())),
            );

        for (name, content) in ordered {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::Zip(format!("Failed to add '{}': {}", name, e)))?;
            zip.write_all(content)
                .map_err(|e| Error::Zip(format!("Failed to write '{}': {}", name, e)))?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::Zip(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }

    /// Write the package to disk in a single call.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }
}

/// Relationships part that belongs to `part` (`ppt/slides/slide1.xml` ->
/// `ppt/slides/_rels/slide1.xml.rels`).
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Directory of a part, with a trailing slash (empty at package root).
pub fn part_dir(part: &str) -> &str {
    match part.rfind('/') {
        Some(pos) => &part[..=pos],
        None => "",
    }
}

/// Resolve a relationship target against the part that owns the relationship.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = part_dir(source_part)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Relative target from `source_part` to `target_part`, as written in a
/// relationships part.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let from: Vec<&str> = part_dir(source_part)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let to: Vec<&str> = target_part.split('/').collect();
    let (to_dirs, file) = to.split_at(to.len() - 1);

    let common = from
        .iter()
        .zip(to_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = std::iter::repeat("..").take(from.len() - common).collect();
    parts.extend_from_slice(&to_dirs[common..]);
    parts.extend_from_slice(file);
    parts.join("/")
}
