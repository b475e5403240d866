//! Source unit reading with encoding fallback, plus a per-run parse memo.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use tracing::debug;

use crate::errors::{CcpromptError, CcpromptResult};
use crate::indexer::parser::{FrontEnd, ParsedUnit};
use crate::query::guards::MAX_SOURCE_FILE_BYTES;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encoding a source file was decoded with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// Decoded contents of one file. Immutable once read.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub encoding: SourceEncoding,
}

fn decode_utf16(bytes: &[u8]) -> Option<(String, SourceEncoding)> {
    let (encoding, payload): (&'static Encoding, &[u8]) = match Encoding::for_bom(bytes) {
        Some((enc, bom_len)) if enc == UTF_16LE || enc == UTF_16BE => (enc, &bytes[bom_len..]),
        Some(_) => return None,
        None => (UTF_16LE, bytes),
    };
    if payload.len() % 2 != 0 {
        return None;
    }
    let text = encoding.decode_without_bom_handling_and_without_replacement(payload)?;
    let tag = if encoding == UTF_16BE {
        SourceEncoding::Utf16Be
    } else {
        SourceEncoding::Utf16Le
    };
    Some((text.into_owned(), tag))
}

/// Decode raw bytes: UTF-8 first, then UTF-16. Never substitutes
/// replacement characters.
pub fn decode_source(bytes: &[u8]) -> Option<(String, SourceEncoding)> {
    let utf8 = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(utf8) {
        return Some((text.to_string(), SourceEncoding::Utf8));
    }
    decode_utf16(bytes)
}

/// Read and decode `path` with an explicit size limit.
pub fn try_read_source(path: &Path, max_bytes: u64) -> CcpromptResult<SourceFile> {
    let unreadable = |reason: String| CcpromptError::UnreadableFile {
        path: path.to_path_buf(),
        reason,
    };
    let metadata = std::fs::metadata(path).map_err(|e| unreadable(e.to_string()))?;
    if metadata.len() > max_bytes {
        return Err(unreadable(format!(
            "{} bytes exceeds the {max_bytes} byte limit",
            metadata.len()
        )));
    }
    let bytes = std::fs::read(path).map_err(|e| unreadable(e.to_string()))?;
    let (text, encoding) =
        decode_source(&bytes).ok_or_else(|| unreadable("undecodable as UTF-8 or UTF-16".into()))?;
    Ok(SourceFile {
        path: path.to_path_buf(),
        text,
        encoding,
    })
}

/// Read `path`, returning `None` for anything unreadable or undecodable.
pub fn read_source(path: &Path) -> Option<SourceFile> {
    read_source_limited(path, MAX_SOURCE_FILE_BYTES)
}

pub fn read_source_limited(path: &Path, max_bytes: u64) -> Option<SourceFile> {
    match try_read_source(path, max_bytes) {
        Ok(file) => Some(file),
        Err(err) => {
            debug!("{err}");
            None
        }
    }
}

/// Parsed units keyed by path, valid for one run.
///
/// Failures are remembered too so a broken file is read and parsed at most
/// once.
pub struct SourceCache {
    units: HashMap<PathBuf, Option<Rc<ParsedUnit>>>,
    max_file_bytes: u64,
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::new(MAX_SOURCE_FILE_BYTES)
    }
}

impl SourceCache {
    pub fn new(max_file_bytes: u64) -> Self {
        Self {
            units: HashMap::new(),
            max_file_bytes,
        }
    }

    pub fn parsed(&mut self, front_end: &FrontEnd, path: &Path) -> Option<Rc<ParsedUnit>> {
        if let Some(cached) = self.units.get(path) {
            return cached.clone();
        }
        match read_source_limited(path, self.max_file_bytes) {
            Some(source) => self.parse_source(front_end, source),
            None => {
                self.units.insert(path.to_path_buf(), None);
                None
            }
        }
    }

    /// Parse an already decoded file and remember the outcome under its path.
    pub fn parse_source(
        &mut self,
        front_end: &FrontEnd,
        source: SourceFile,
    ) -> Option<Rc<ParsedUnit>> {
        let path = source.path.clone();
        let unit = match front_end.parse(source) {
            Ok(unit) => Some(Rc::new(unit)),
            Err(failure) => {
                debug!("{}", failure.into_error(&path));
                None
            }
        };
        self.units.insert(path, unit.clone());
        unit
    }

    /// Outcome of an earlier parse of `path`; `None` when never attempted.
    pub fn cached(&self, path: &Path) -> Option<Option<Rc<ParsedUnit>>> {
        self.units.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
