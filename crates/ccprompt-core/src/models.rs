//! Shared typed models used across the indexing and query layers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::indexer::parser::Language;

// ---------------------------------------------------------------------------
// Node kinds and spans
// ---------------------------------------------------------------------------

/// Kind of a definition node exposed by a front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Module,
    ClassDef,
    FunctionDef,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::ClassDef => "class",
            NodeKind::FunctionDef => "function",
        }
    }
}

/// Byte and line offsets of a node inside its source file. Lines are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SourceSpan {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
}

// ---------------------------------------------------------------------------
// Index entries
// ---------------------------------------------------------------------------

/// A fully-qualified location recorded in the definition index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locator {
    pub file: PathBuf,
    pub module_path: String,
    /// Dotted path of the definition inside its module (`Outer.method`).
    /// `None` for module entries.
    pub member: Option<String>,
    pub kind: NodeKind,
}

impl Locator {
    pub fn qualified_name(&self) -> String {
        match &self.member {
            Some(member) if self.module_path.is_empty() => member.clone(),
            Some(member) => format!("{}.{}", self.module_path, member),
            None => self.module_path.clone(),
        }
    }

    /// Bare name of the located definition (last member segment).
    pub fn bare_name(&self) -> &str {
        let full = self.member.as_deref().unwrap_or(&self.module_path);
        full.rsplit('.').next().unwrap_or(full)
    }
}

/// Counters collected while building an index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub files_seen: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub definitions: usize,
    pub elapsed_ms: u64,
}

/// Project-wide mapping from a name to every location defining it.
///
/// Built once per run by [`crate::indexer::pipeline::build_index_with`] and
/// read-only afterwards. Entry order within one name is file-visitation
/// order, so lookups are reproducible for a fixed tree.
#[derive(Clone, Debug)]
pub struct DefinitionIndex {
    language: Language,
    roots: Vec<PathBuf>,
    entries: IndexMap<String, Vec<Locator>>,
    /// Every file the build walked, indexed or skipped.
    files: HashSet<PathBuf>,
    stats: IndexStats,
}

impl DefinitionIndex {
    pub(crate) fn new(language: Language, roots: Vec<PathBuf>) -> Self {
        Self {
            language,
            roots,
            entries: IndexMap::new(),
            files: HashSet::new(),
            stats: IndexStats::default(),
        }
    }

    pub(crate) fn insert(&mut self, key: String, locator: Locator) {
        let slot = self.entries.entry(key).or_default();
        if !slot.contains(&locator) {
            slot.push(locator);
        }
    }

    /// Records `path` as walked; false when it already was.
    pub(crate) fn record_file(&mut self, path: &Path) -> bool {
        self.files.insert(path.to_path_buf())
    }

    pub(crate) fn stats_mut(&mut self) -> &mut IndexStats {
        &mut self.stats
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, name: &str) -> &[Locator] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Candidate locations for a possibly dotted reference.
    ///
    /// Exact keys win. Otherwise the last dotted segment is looked up and the
    /// candidates whose qualified name ends with the whole reference are
    /// moved to the front, keeping index order within each group.
    pub fn candidates(&self, reference: &str) -> Vec<&Locator> {
        let exact = self.lookup(reference);
        if !exact.is_empty() {
            return exact.iter().collect();
        }
        let Some((_, last)) = reference.rsplit_once('.') else {
            return Vec::new();
        };
        let suffix = format!(".{reference}");
        let (mut preferred, rest): (Vec<&Locator>, Vec<&Locator>) = self
            .lookup(last)
            .iter()
            .partition(|loc| loc.qualified_name().ends_with(&suffix));
        preferred.extend(rest);
        preferred
    }

    /// True when the build walked `path`. Files under a root that the walk
    /// pruned (ignore rules, say) are not visited.
    pub fn visited_file(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Extraction results
// ---------------------------------------------------------------------------

/// Deduplication key for emitted definitions: (resolved file, definition name).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CanonicalIdentity {
    pub path: PathBuf,
    pub name: String,
}

impl CanonicalIdentity {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// Identities already emitted during one `extract` run, across all targets.
#[derive(Clone, Debug, Default)]
pub struct VisitedSet {
    seen: HashSet<CanonicalIdentity>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `identity`; returns false when it was already present.
    pub fn insert(&mut self, identity: CanonicalIdentity) -> bool {
        self.seen.insert(identity)
    }

    pub fn contains(&self, identity: &CanonicalIdentity) -> bool {
        self.seen.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// One emitted definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExtractedSource {
    pub file_path: String,
    pub source: String,
    pub name: String,
    /// Dotted path inside the file (`Outer.method`); the module path for
    /// whole-module entries.
    pub qualified_name: String,
    pub kind: NodeKind,
    pub start_line: usize,
    pub end_line: usize,
}

impl ExtractedSource {
    pub fn as_pair(&self) -> (&str, &str) {
        (&self.file_path, &self.source)
    }

    pub fn identity(&self) -> CanonicalIdentity {
        CanonicalIdentity::new(&self.file_path, &self.qualified_name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub index_entries: usize,
    pub targets_requested: usize,
    pub elapsed_ms: u64,
}

/// Outcome of one `extract` run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ExtractionReport {
    /// Emitted definitions in discovery order.
    pub entries: Vec<ExtractedSource>,
    /// Targets that resolved to nothing.
    pub not_found: Vec<String>,
    pub stats: ExtractStats,
}

impl ExtractionReport {
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.entries.iter().map(ExtractedSource::as_pair).collect()
    }

    pub fn to_payload(&self) -> serde_json::Value {
        let entries: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "file_path": entry.file_path,
                    "name": entry.name,
                    "qualified_name": entry.qualified_name,
                    "kind": entry.kind.as_str(),
                    "lines": format!("{}-{}", entry.start_line, entry.end_line),
                    "source": entry.source,
                })
            })
            .collect();
        serde_json::json!({
            "entries": entries,
            "not_found": self.not_found,
            "stats": self.stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(file: &str, module_path: &str, member: Option<&str>, kind: NodeKind) -> Locator {
        Locator {
            file: PathBuf::from(file),
            module_path: module_path.to_string(),
            member: member.map(str::to_string),
            kind,
        }
    }

    #[test]
    fn test_locator_qualified_name() {
        let loc = locator("/p/pkg/mod.py", "pkg.mod", Some("Outer.method"), NodeKind::FunctionDef);
        assert_eq!(loc.qualified_name(), "pkg.mod.Outer.method");
        assert_eq!(loc.bare_name(), "method");

        let module = locator("/p/pkg/mod.py", "pkg.mod", None, NodeKind::Module);
        assert_eq!(module.qualified_name(), "pkg.mod");
        assert_eq!(module.bare_name(), "mod");
    }

    #[test]
    fn test_index_insert_keeps_order_and_skips_duplicates() {
        let mut index = DefinitionIndex::new(Language::Python, vec![]);
        let a = locator("/p/a.py", "a", Some("Base"), NodeKind::ClassDef);
        let b = locator("/p/b.py", "b", Some("Base"), NodeKind::ClassDef);
        index.insert("Base".into(), a.clone());
        index.insert("Base".into(), b.clone());
        index.insert("Base".into(), a.clone());
        assert_eq!(index.lookup("Base"), &[a, b]);
        assert!(index.lookup("Missing").is_empty());
    }

    #[test]
    fn test_candidates_prefers_matching_dotted_suffix() {
        let mut index = DefinitionIndex::new(Language::Python, vec![]);
        let other = locator("/p/other.py", "other", Some("Base"), NodeKind::ClassDef);
        let wanted = locator("/p/pkg/models.py", "pkg.models", Some("Base"), NodeKind::ClassDef);
        index.insert("Base".into(), other.clone());
        index.insert("Base".into(), wanted.clone());

        let found = index.candidates("models.Base");
        assert_eq!(found, vec![&wanted, &other]);
        assert!(index.candidates("Nothing").is_empty());
    }

    #[test]
    fn test_visited_file_tracks_recorded_paths_only() {
        let mut index = DefinitionIndex::new(Language::Python, vec![PathBuf::from("/p")]);
        assert!(index.record_file(Path::new("/p/a.py")));
        assert!(!index.record_file(Path::new("/p/a.py")));
        assert!(index.visited_file(Path::new("/p/a.py")));
        assert!(!index.visited_file(Path::new("/p/.venv/lib/dep.py")));
    }

    #[test]
    fn test_visited_set_reports_repeat_insert() {
        let mut visited = VisitedSet::new();
        assert!(visited.insert(CanonicalIdentity::new("/p/a.py", "A")));
        assert!(!visited.insert(CanonicalIdentity::new("/p/a.py", "A")));
        assert!(visited.insert(CanonicalIdentity::new("/p/b.py", "A")));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn test_report_payload_shape() {
        let report = ExtractionReport {
            entries: vec![ExtractedSource {
                file_path: "/p/a.py".into(),
                source: "class A: pass".into(),
                name: "A".into(),
                qualified_name: "A".into(),
                kind: NodeKind::ClassDef,
                start_line: 1,
                end_line: 1,
            }],
            not_found: vec!["ghost".into()],
            stats: ExtractStats::default(),
        };
        let payload = report.to_payload();
        assert_eq!(payload["entries"][0]["kind"], "class");
        assert_eq!(payload["entries"][0]["lines"], "1-1");
        assert_eq!(payload["not_found"][0], "ghost");
    }
}
