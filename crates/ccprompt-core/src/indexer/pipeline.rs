//! Definition index build: one walk over every search root.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::errors::CcpromptResult;
use crate::indexer::filesystem::{
    iter_source_files, resolve_root, respect_ignore_from_env, to_module_name,
};
use crate::indexer::parser::{FrontEnd, Language};
use crate::indexer::source::read_source_limited;
use crate::models::{DefinitionIndex, Locator, NodeKind};
use crate::query::guards::MAX_SOURCE_FILE_BYTES;

/// Knobs for scanning a source tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexOptions {
    pub respect_ignore_files: bool,
    pub max_file_bytes: u64,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            respect_ignore_files: respect_ignore_from_env(),
            max_file_bytes: MAX_SOURCE_FILE_BYTES,
        }
    }
}

/// Index every definition of `language` under `root`.
pub fn build_index(root: &Path, language: Language) -> CcpromptResult<DefinitionIndex> {
    let front_end = FrontEnd::for_language(language)?;
    Ok(build_index_with(&front_end, &[root.to_path_buf()], &IndexOptions::default()))
}

/// Index every definition under each of `roots`, in root order.
///
/// Unreadable files and files the front end refuses are skipped; a file
/// reachable from two roots is indexed once, under the first.
pub fn build_index_with(
    front_end: &FrontEnd,
    roots: &[PathBuf],
    options: &IndexOptions,
) -> DefinitionIndex {
    let started = Instant::now();
    let language = front_end.language();
    let resolved_roots: Vec<PathBuf> = roots.iter().map(|r| resolve_root(r)).collect();
    let mut index = DefinitionIndex::new(language, resolved_roots.clone());

    for root in &resolved_roots {
        if !root.exists() {
            warn!("search path {} does not exist", root.display());
            continue;
        }
        for file_path in iter_source_files(root, language, options.respect_ignore_files) {
            if !index.record_file(&file_path) {
                continue;
            }
            index.stats_mut().files_seen += 1;
            index_file(front_end, root, &file_path, options, &mut index);
        }
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let stats = index.stats_mut();
    stats.elapsed_ms = elapsed_ms;
    info!(
        "indexed {} {} files ({} skipped, {} definitions) in {} ms",
        stats.files_indexed, language, stats.files_skipped, stats.definitions, elapsed_ms
    );
    index
}

fn index_file(
    front_end: &FrontEnd,
    root: &Path,
    file_path: &Path,
    options: &IndexOptions,
    index: &mut DefinitionIndex,
) {
    let Some(source) = read_source_limited(file_path, options.max_file_bytes) else {
        index.stats_mut().files_skipped += 1;
        return;
    };
    let unit = match front_end.parse(source) {
        Ok(unit) => unit,
        Err(failure) => {
            debug!("{}", failure.into_error(file_path));
            index.stats_mut().files_skipped += 1;
            return;
        }
    };

    let rel_path = match file_path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        // The root is the file itself.
        _ => file_path
            .file_name()
            .map(Path::new)
            .unwrap_or(file_path),
    };
    let module_path = to_module_name(rel_path, front_end.language());
    index.insert(
        module_path.clone(),
        Locator {
            file: file_path.to_path_buf(),
            module_path: module_path.clone(),
            member: None,
            kind: NodeKind::Module,
        },
    );

    let mut definitions = 0;
    for node in front_end.definitions(&unit) {
        let Some(name) = node.name.clone() else {
            continue;
        };
        let Some(member) = front_end.qualified_member(&unit, &node) else {
            continue;
        };
        let locator = Locator {
            file: file_path.to_path_buf(),
            module_path: module_path.clone(),
            member: Some(member),
            kind: node.kind,
        };
        index.insert(locator.qualified_name(), locator.clone());
        index.insert(name, locator);
        definitions += 1;
    }

    let stats = index.stats_mut();
    stats.files_indexed += 1;
    stats.definitions += definitions;
}
