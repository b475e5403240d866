//! Definition lookup and inheritance chain traversal.
//!
//! A [`Resolver`] turns names into concrete definitions: index candidates
//! first, in index order, then, for names the index has never seen, a scan
//! of the files under the search paths that the index build did not visit. [`Resolver::walk_chain`] expands a class into its transitive bases
//! and metaclasses breadth-first, so each level is emitted in declaration
//! order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use regex::Regex;
use tracing::{debug, warn};

use crate::indexer::filesystem::{iter_source_files, resolve_root, to_module_name};
use crate::indexer::parser::{FrontEnd, ParsedUnit, SyntaxNode};
use crate::indexer::pipeline::IndexOptions;
use crate::indexer::source::{read_source_limited, SourceCache, SourceFile};
use crate::models::{
    CanonicalIdentity, DefinitionIndex, ExtractedSource, Locator, NodeKind, VisitedSet,
};

/// What a lookup is allowed to land on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Wanted {
    Class,
    /// Any class or function definition.
    Definition,
}

impl Wanted {
    fn accepts(self, kind: NodeKind) -> bool {
        match self {
            Wanted::Class => kind == NodeKind::ClassDef,
            Wanted::Definition => kind != NodeKind::Module,
        }
    }
}

/// A definition pinned to its parsed file.
#[derive(Clone)]
pub struct Located {
    pub unit: Rc<ParsedUnit>,
    /// Dotted path inside the file.
    pub member: String,
    pub kind: NodeKind,
}

impl Located {
    pub fn identity(&self) -> CanonicalIdentity {
        CanonicalIdentity::new(self.unit.path(), &self.member)
    }

    /// The syntax node this location points at.
    pub fn node<'t>(&'t self, front_end: &FrontEnd) -> Option<SyntaxNode<'t>> {
        find_member(front_end, &self.unit, &self.member, self.kind)
    }
}

fn find_member<'t>(
    front_end: &FrontEnd,
    unit: &'t ParsedUnit,
    member: &str,
    kind: NodeKind,
) -> Option<SyntaxNode<'t>> {
    let bare = member.rsplit('.').next().unwrap_or(member);
    front_end
        .definitions_named(unit, bare)
        .into_iter()
        .filter(|def| def.kind == kind)
        .find(|def| front_end.qualified_member(unit, def).as_deref() == Some(member))
}

/// Matches `name` as a whole identifier, treating `$` as a word character.
fn whole_word(name: &str) -> Option<Regex> {
    let pattern = format!(r"(?:^|[^\w$]){}(?:$|[^\w$])", regex::escape(name));
    Regex::new(&pattern).ok()
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub struct Resolver<'a> {
    front_end: FrontEnd,
    index: &'a DefinitionIndex,
    cache: SourceCache,
    search_paths: Vec<PathBuf>,
    respect_ignore_files: bool,
    max_file_bytes: u64,
    /// `(search root, file)` for files the index build never visited,
    /// listed on first use.
    fallback_files: Option<Vec<(PathBuf, PathBuf)>>,
    /// Decoded fallback files awaiting a prefilter hit.
    fallback_sources: HashMap<PathBuf, Option<SourceFile>>,
    missing: HashSet<(String, Wanted)>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        front_end: FrontEnd,
        index: &'a DefinitionIndex,
        search_paths: &[PathBuf],
        options: &IndexOptions,
    ) -> Self {
        let search_paths = search_paths.iter().map(|p| resolve_root(p)).collect();
        Self {
            front_end,
            index,
            cache: SourceCache::new(options.max_file_bytes),
            search_paths,
            respect_ignore_files: options.respect_ignore_files,
            max_file_bytes: options.max_file_bytes,
            fallback_files: None,
            fallback_sources: HashMap::new(),
            missing: HashSet::new(),
        }
    }

    pub fn front_end(&self) -> &FrontEnd {
        &self.front_end
    }

    pub fn index(&self) -> &DefinitionIndex {
        self.index
    }

    /// Parse the file behind `locator` and find the node it names.
    pub fn locate(&mut self, locator: &Locator) -> Option<Located> {
        let member = locator.member.clone()?;
        let unit = self.cache.parsed(&self.front_end, &locator.file)?;
        find_member(&self.front_end, &unit, &member, locator.kind)?;
        Some(Located {
            unit,
            member,
            kind: locator.kind,
        })
    }

    /// Resolve `reference` to its first matching definition.
    ///
    /// Index candidates are tried in order and the first one that parses
    /// wins. Search paths outside the index are scanned only when the index
    /// has no candidate of any kind for the name.
    pub fn find(&mut self, reference: &str, wanted: Wanted) -> Option<Located> {
        let key = (reference.to_string(), wanted);
        if self.missing.contains(&key) {
            return None;
        }
        let candidates: Vec<Locator> = self
            .index
            .candidates(reference)
            .into_iter()
            .filter(|loc| wanted.accepts(loc.kind))
            .cloned()
            .collect();
        for candidate in &candidates {
            if let Some(found) = self.locate(candidate) {
                debug!("resolved '{reference}' to {}", candidate.qualified_name());
                return Some(found);
            }
        }
        let found = if self.index.candidates(reference).is_empty() {
            self.scan_fallback(reference, wanted)
        } else {
            None
        };
        if found.is_none() {
            self.missing.insert(key);
        }
        found
    }

    /// Resolve a class reference (a base or metaclass name).
    pub fn find_class(&mut self, reference: &str) -> Option<Located> {
        self.find(reference, Wanted::Class)
    }

    fn fallback_files(&mut self) -> &[(PathBuf, PathBuf)] {
        if self.fallback_files.is_none() {
            let language = self.index.language();
            let mut files = Vec::new();
            let mut seen = HashSet::new();
            for root in &self.search_paths {
                if !root.exists() {
                    continue;
                }
                for file in iter_source_files(root, language, self.respect_ignore_files) {
                    if !self.index.visited_file(&file) && seen.insert(file.clone()) {
                        files.push((root.clone(), file));
                    }
                }
            }
            debug!("{} files outside the index are searchable", files.len());
            self.fallback_files = Some(files);
        }
        self.fallback_files.as_deref().unwrap_or(&[])
    }

    /// Parsed unit for a fallback file whose text mentions `pattern`.
    ///
    /// Each file is read from disk at most once per resolver; the decoded
    /// text waits in `fallback_sources` until some name matches it.
    fn fallback_unit(&mut self, file: &Path, pattern: &Regex) -> Option<Rc<ParsedUnit>> {
        if let Some(cached) = self.cache.cached(file) {
            return cached.filter(|unit| pattern.is_match(unit.text()));
        }
        let max_file_bytes = self.max_file_bytes;
        let source = self
            .fallback_sources
            .entry(file.to_path_buf())
            .or_insert_with(|| read_source_limited(file, max_file_bytes))
            .as_ref()?;
        if !pattern.is_match(&source.text) {
            return None;
        }
        let source = self.fallback_sources.remove(file).flatten()?;
        self.cache.parse_source(&self.front_end, source)
    }

    fn scan_fallback(&mut self, reference: &str, wanted: Wanted) -> Option<Located> {
        let bare = reference.rsplit('.').next().unwrap_or(reference);
        let pattern = whole_word(bare)?;
        let qualified_suffix = format!(".{reference}");
        let language = self.index.language();
        let files = self.fallback_files().to_vec();
        for (root, file) in files {
            let Some(unit) = self.fallback_unit(&file, &pattern) else {
                continue;
            };
            let rel_path = file.strip_prefix(&root).unwrap_or(&file);
            let module_path = to_module_name(rel_path, language);
            let hit = self
                .front_end
                .definitions_named(&unit, bare)
                .into_iter()
                .filter(|def| wanted.accepts(def.kind))
                .filter_map(|def| {
                    let member = self.front_end.qualified_member(&unit, &def)?;
                    Some((member, def.kind))
                })
                // A dotted reference must name the hit's module and member.
                .find(|(member, _)| {
                    let full = format!("{module_path}.{member}");
                    bare == reference
                        || member == reference
                        || full == reference
                        || full.ends_with(&qualified_suffix)
                });
            if let Some((member, kind)) = hit {
                debug!("resolved '{reference}' by scanning {}", file.display());
                return Some(Located { unit, member, kind });
            }
        }
        None
    }

    /// Source entry for a located definition.
    pub fn emit(&self, located: &Located) -> Option<ExtractedSource> {
        let node = located.node(&self.front_end)?;
        let span = node.span();
        Some(ExtractedSource {
            file_path: path_string(located.unit.path()),
            source: node.source_text(&located.unit).to_string(),
            name: node.name.clone().unwrap_or_default(),
            qualified_name: located.member.clone(),
            kind: located.kind,
            start_line: span.start_line,
            end_line: span.end_line,
        })
    }

    fn base_references(&self, located: &Located) -> Vec<String> {
        located
            .node(&self.front_end)
            .map(|node| self.front_end.base_references(&located.unit, &node))
            .unwrap_or_default()
    }

    /// The innermost class lexically enclosing a located definition.
    pub fn enclosing_class(&self, located: &Located) -> Option<Located> {
        let node = located.node(&self.front_end)?;
        let class = self.front_end.enclosing_class(&located.unit, &node)?;
        let member = self.front_end.qualified_member(&located.unit, &class)?;
        Some(Located {
            unit: Rc::clone(&located.unit),
            member,
            kind: NodeKind::ClassDef,
        })
    }

    /// Emit `seed` and its transitive bases and metaclasses into `out`.
    ///
    /// Identities already in `visited` are skipped along with everything
    /// reachable only through them, which also terminates cycles.
    pub fn walk_chain(
        &mut self,
        seed: Located,
        visited: &mut VisitedSet,
        out: &mut Vec<ExtractedSource>,
    ) {
        let mut queue: VecDeque<Located> = VecDeque::from([seed]);
        let mut attempted: HashSet<String> = HashSet::new();

        while let Some(class) = queue.pop_front() {
            let identity = class.identity();
            if visited.contains(&identity) {
                continue;
            }
            let Some(entry) = self.emit(&class) else {
                continue;
            };
            visited.insert(identity);
            out.push(entry);

            for base in self.base_references(&class) {
                if !attempted.insert(base.clone()) {
                    continue;
                }
                match self.find_class(&base) {
                    Some(found) => queue.push_back(found),
                    None => warn!("Class or metaclass '{base}' not found in provided directories."),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::indexer::parser::Language;
    use crate::indexer::pipeline::build_index_with;

    fn options() -> IndexOptions {
        IndexOptions {
            respect_ignore_files: false,
            max_file_bytes: 1024 * 1024,
        }
    }

    fn index_of(language: Language, roots: &[PathBuf]) -> (FrontEnd, DefinitionIndex) {
        let front_end = FrontEnd::for_language(language).unwrap();
        let index = build_index_with(&front_end, roots, &options());
        (front_end, index)
    }

    fn chain_names(resolver: &mut Resolver<'_>, target: &str) -> Vec<String> {
        let seed = resolver.find_class(target).unwrap();
        let mut visited = VisitedSet::new();
        let mut out = Vec::new();
        resolver.walk_chain(seed, &mut visited, &mut out);
        out.into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_chain_is_breadth_first_in_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("shapes.py"),
            "class Root:\n    pass\n\nclass Left(Root):\n    pass\n\nclass Right(Root):\n    pass\n\nclass Leaf(Left, Right):\n    pass\n",
        )
        .unwrap();
        let roots = vec![dir.path().to_path_buf()];
        let (front_end, index) = index_of(Language::Python, &roots);
        let mut resolver = Resolver::new(front_end, &index, &roots, &options());

        assert_eq!(chain_names(&mut resolver, "Leaf"), vec!["Leaf", "Left", "Right", "Root"]);
    }

    #[test]
    fn test_metaclass_follows_bases() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("meta.py"),
            "class Meta(type):\n    pass\n\nclass Base:\n    pass\n\nclass Model(Base, metaclass=Meta):\n    pass\n",
        )
        .unwrap();
        let roots = vec![dir.path().to_path_buf()];
        let (front_end, index) = index_of(Language::Python, &roots);
        let mut resolver = Resolver::new(front_end, &index, &roots, &options());

        // `type` is a builtin and simply does not resolve.
        assert_eq!(chain_names(&mut resolver, "Model"), vec!["Model", "Base", "Meta"]);
    }

    #[test]
    fn test_cycle_terminates_with_each_class_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "class A(B):\n    pass\n").unwrap();
        fs::write(dir.path().join("b.py"), "class B(A):\n    pass\n").unwrap();
        let roots = vec![dir.path().to_path_buf()];
        let (front_end, index) = index_of(Language::Python, &roots);
        let mut resolver = Resolver::new(front_end, &index, &roots, &options());

        assert_eq!(chain_names(&mut resolver, "A"), vec!["A", "B"]);
    }

    #[test]
    fn test_dotted_base_prefers_matching_module() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("aaa.py"), "class Base:\n    decoy = True\n").unwrap();
        fs::write(dir.path().join("lib/models.py"), "class Base:\n    real = True\n").unwrap();
        fs::write(dir.path().join("app.py"), "class App(models.Base):\n    pass\n").unwrap();
        let roots = vec![dir.path().to_path_buf()];
        let (front_end, index) = index_of(Language::Python, &roots);
        let mut resolver = Resolver::new(front_end, &index, &roots, &options());

        let seed = resolver.find_class("App").unwrap();
        let mut visited = VisitedSet::new();
        let mut out = Vec::new();
        resolver.walk_chain(seed, &mut visited, &mut out);
        assert_eq!(out.len(), 2);
        assert!(out[1].source.contains("real = True"));
        assert!(out[1].file_path.ends_with("models.py"));
    }

    #[test]
    fn test_fallback_scans_uncovered_search_path() {
        let project = tempfile::tempdir().unwrap();
        let venv = tempfile::tempdir().unwrap();
        fs::write(project.path().join("app.py"), "class App(Framework):\n    pass\n").unwrap();
        fs::write(venv.path().join("framework.py"), "class Framework:\n    pass\n").unwrap();

        let (front_end, index) = index_of(Language::Python, &[project.path().to_path_buf()]);
        assert!(index.lookup("Framework").is_empty());
        let search = vec![project.path().to_path_buf(), venv.path().to_path_buf()];
        let mut resolver = Resolver::new(front_end, &index, &search, &options());

        assert_eq!(chain_names(&mut resolver, "App"), vec!["App", "Framework"]);
    }

    #[test]
    fn test_missing_names_are_memoized() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "class A:\n    pass\n").unwrap();
        let roots = vec![dir.path().to_path_buf()];
        let (front_end, index) = index_of(Language::Python, &roots);
        let mut resolver = Resolver::new(front_end, &index, &roots, &options());

        assert!(resolver.find_class("Ghost").is_none());
        assert!(resolver.missing.contains(&("Ghost".to_string(), Wanted::Class)));
        assert!(resolver.find_class("Ghost").is_none());
    }

    #[test]
    fn test_javascript_chain_across_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.js"), "export class Base {\n  hello() {}\n}\n").unwrap();
        fs::write(
            dir.path().join("widget.ts"),
            "class Widget extends Base implements Drawable {\n  draw(): void {}\n}\n",
        )
        .unwrap();
        let roots = vec![dir.path().to_path_buf()];
        let (front_end, index) = index_of(Language::JavaScript, &roots);
        let mut resolver = Resolver::new(front_end, &index, &roots, &options());

        assert_eq!(chain_names(&mut resolver, "Widget"), vec!["Widget", "Base"]);
    }

    #[test]
    fn test_dotted_fallback_requires_matching_module() {
        let project = tempfile::tempdir().unwrap();
        let venv = tempfile::tempdir().unwrap();
        fs::write(project.path().join("app.py"), "class App(models.Base):\n    pass\n").unwrap();
        fs::write(venv.path().join("aaa.py"), "class Base:\n    decoy = True\n").unwrap();
        fs::create_dir_all(venv.path().join("lib")).unwrap();
        fs::write(venv.path().join("lib/models.py"), "class Base:\n    real = True\n").unwrap();

        let (front_end, index) = index_of(Language::Python, &[project.path().to_path_buf()]);
        let search = vec![project.path().to_path_buf(), venv.path().to_path_buf()];
        let mut resolver = Resolver::new(front_end, &index, &search, &options());

        let found = resolver.find_class("models.Base").unwrap();
        assert!(found.unit.path().ends_with("lib/models.py"));
        assert!(resolver.find_class("other.Base").is_none());
    }

    #[test]
    fn test_index_candidate_of_other_kind_skips_fallback() {
        let project = tempfile::tempdir().unwrap();
        let venv = tempfile::tempdir().unwrap();
        fs::write(project.path().join("tools.py"), "x = 1\n").unwrap();
        fs::write(venv.path().join("other.py"), "def tools():\n    return 'venv'\n").unwrap();

        let (front_end, index) = index_of(Language::Python, &[project.path().to_path_buf()]);
        let search = vec![project.path().to_path_buf(), venv.path().to_path_buf()];
        let mut resolver = Resolver::new(front_end, &index, &search, &options());

        assert!(resolver.find("tools", Wanted::Definition).is_none());
        assert!(resolver.fallback_files.is_none());
    }

    #[test]
    fn test_fallback_reads_each_file_once() {
        let project = tempfile::tempdir().unwrap();
        let venv = tempfile::tempdir().unwrap();
        fs::write(project.path().join("app.py"), "class App:\n    pass\n").unwrap();
        let venv_file = resolve_root(venv.path()).join("framework.py");
        fs::write(&venv_file, "class Framework:\n    pass\n").unwrap();

        let (front_end, index) = index_of(Language::Python, &[project.path().to_path_buf()]);
        let search = vec![project.path().to_path_buf(), venv.path().to_path_buf()];
        let mut resolver = Resolver::new(front_end, &index, &search, &options());

        assert!(resolver.find_class("Ghost").is_none());
        assert!(resolver.fallback_sources.contains_key(&venv_file));
        assert!(resolver.cache.cached(&venv_file).is_none());

        // The memoized text serves the next lookup even after the file is gone.
        fs::remove_file(&venv_file).unwrap();
        let found = resolver.find_class("Framework").unwrap();
        assert_eq!(found.member, "Framework");
        assert!(!resolver.fallback_sources.contains_key(&venv_file));
        assert!(resolver.cache.cached(&venv_file).is_some());
    }

    #[test]
    fn test_whole_word_pattern_handles_dollar() {
        let pattern = whole_word("$el").unwrap();
        assert!(pattern.is_match("class $el {}"));
        assert!(!pattern.is_match("class $element {}"));
        assert!(!whole_word("Base").unwrap().is_match("class BaseX:"));
    }
}
