//! Extraction orchestration: target names in, ordered source entries out.
//!
//! A class target yields the class followed by its inheritance chain. A
//! function or method target yields the chain of its innermost enclosing
//! class (when it has one) followed by the function itself. A name that only
//! matches a module yields the whole module file. Every run shares one
//! [`VisitedSet`] across its targets, so nothing is emitted twice.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::errors::{CcpromptError, CcpromptResult};
use crate::indexer::parser::{FrontEnd, Language};
use crate::indexer::pipeline::{build_index_with, IndexOptions};
use crate::indexer::source::read_source_limited;
use crate::models::{
    DefinitionIndex, ExtractStats, ExtractedSource, ExtractionReport, Locator, NodeKind,
    VisitedSet,
};
use crate::query::guards::{is_valid_target_name, normalize_target_names};
use crate::query::inheritance::{path_string, Resolver, Wanted};

/// Knobs for one `extract` run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    pub language: Language,
    pub index: IndexOptions,
}

impl ExtractOptions {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            index: IndexOptions::default(),
        }
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new(Language::Python)
    }
}

/// Resolves target names against one index.
pub struct Extractor<'a> {
    resolver: Resolver<'a>,
    max_file_bytes: u64,
}

impl<'a> Extractor<'a> {
    pub fn new(index: &'a DefinitionIndex, search_paths: &[PathBuf]) -> CcpromptResult<Self> {
        Self::with_options(index, search_paths, &IndexOptions::default())
    }

    pub fn with_options(
        index: &'a DefinitionIndex,
        search_paths: &[PathBuf],
        options: &IndexOptions,
    ) -> CcpromptResult<Self> {
        let front_end = FrontEnd::for_language(index.language())?;
        Ok(Self {
            resolver: Resolver::new(front_end, index, search_paths, options),
            max_file_bytes: options.max_file_bytes,
        })
    }

    /// Entries newly emitted for `target`, in discovery order.
    ///
    /// `None` means the target resolved to nothing. `Some` with an empty
    /// list means it resolved but everything was already in `visited`.
    pub fn resolve_target(
        &mut self,
        target: &str,
        visited: &mut VisitedSet,
    ) -> Option<Vec<ExtractedSource>> {
        if !is_valid_target_name(target) {
            debug!("'{target}' is not a valid definition name");
            return None;
        }
        let mut out = Vec::new();

        if let Some(found) = self.resolver.find(target, Wanted::Definition) {
            match found.kind {
                NodeKind::ClassDef => {
                    debug!("Found class '{target}' in {}", found.unit.path().display());
                    self.resolver.walk_chain(found, visited, &mut out);
                }
                _ => {
                    debug!("Found function '{target}' in {}", found.unit.path().display());
                    if let Some(class) = self.resolver.enclosing_class(&found) {
                        debug!("Processing class '{}'", class.member);
                        self.resolver.walk_chain(class, visited, &mut out);
                    }
                    let identity = found.identity();
                    if !visited.contains(&identity) {
                        if let Some(entry) = self.resolver.emit(&found) {
                            visited.insert(identity);
                            out.push(entry);
                        }
                    }
                }
            }
            return Some(out);
        }

        let modules: Vec<Locator> = self
            .resolver
            .index()
            .candidates(target)
            .into_iter()
            .filter(|loc| loc.kind == NodeKind::Module)
            .cloned()
            .collect();
        for module in modules {
            let Some(entry) = self.module_entry(&module) else {
                continue;
            };
            debug!("Found module '{target}' in {}", entry.file_path);
            if visited.insert(entry.identity()) {
                out.push(entry);
            }
            return Some(out);
        }
        None
    }

    fn module_entry(&self, module: &Locator) -> Option<ExtractedSource> {
        let source = read_source_limited(&module.file, self.max_file_bytes)?;
        let name = module.bare_name().to_string();
        let end_line = source.text.lines().count().max(1);
        Some(ExtractedSource {
            file_path: path_string(&module.file),
            source: source.text,
            name,
            qualified_name: module.module_path.clone(),
            kind: NodeKind::Module,
            start_line: 1,
            end_line,
        })
    }
}

/// Resolve one target name against a prebuilt index.
///
/// An empty result means not found (or already emitted into `visited`);
/// logging it is the caller's concern.
pub fn resolve(
    target: &str,
    index: &DefinitionIndex,
    search_paths: &[PathBuf],
    visited: &mut VisitedSet,
) -> Vec<ExtractedSource> {
    match Extractor::new(index, search_paths) {
        Ok(mut extractor) => extractor.resolve_target(target, visited).unwrap_or_default(),
        Err(err) => {
            warn!("{err}");
            Vec::new()
        }
    }
}

/// Extract every target with its context from `search_paths`.
///
/// The first search path is the project and gets indexed; the rest (a
/// virtual env's site-packages, say) are only scanned for names the
/// project index cannot resolve.
pub fn extract<S: AsRef<str>>(
    targets: &[S],
    search_paths: &[PathBuf],
    language_tag: &str,
) -> CcpromptResult<ExtractionReport> {
    let language = Language::from_tag(language_tag)?;
    extract_with_options(targets, search_paths, &ExtractOptions::new(language))
}

pub fn extract_with_options<S: AsRef<str>>(
    targets: &[S],
    search_paths: &[PathBuf],
    options: &ExtractOptions,
) -> CcpromptResult<ExtractionReport> {
    let started = Instant::now();
    let front_end = FrontEnd::for_language(options.language)?;
    let project: Vec<PathBuf> = search_paths.iter().take(1).cloned().collect();
    let index = build_index_with(&front_end, &project, &options.index);
    let mut extractor = Extractor::with_options(&index, search_paths, &options.index)?;

    let names = normalize_target_names(targets);
    let mut visited = VisitedSet::new();
    let mut report = ExtractionReport::default();
    for name in &names {
        info!("Searching for '{name}'");
        match extractor.resolve_target(name, &mut visited) {
            Some(entries) => report.entries.extend(entries),
            None => {
                warn!("{}", CcpromptError::NotFound { name: name.clone() });
                report.not_found.push(name.clone());
            }
        }
    }

    let index_stats = index.stats();
    report.stats = ExtractStats {
        files_indexed: index_stats.files_indexed,
        files_skipped: index_stats.files_skipped,
        index_entries: index.len(),
        targets_requested: names.len(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    Ok(report)
}
