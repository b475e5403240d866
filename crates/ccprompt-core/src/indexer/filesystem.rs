//! Filesystem scanning helpers for indexing passes.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::indexer::parser::Language;

const LANGUAGE_BY_EXTENSION: &[(&str, Language)] = &[
    ("py", Language::Python),
    ("js", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("cjs", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("ts", Language::JavaScript),
    ("tsx", Language::JavaScript),
];

const IMPLICIT_IGNORED_DIRS: &[&str] = &[".git", ".hg", ".svn", "__pycache__"];

const RESPECT_IGNORE_ENV: &str = "CCPROMPT_RESPECT_IGNORE";

/// Whether `.gitignore`/`.ignore` rules should prune the walk, read from
/// `CCPROMPT_RESPECT_IGNORE`. Off unless explicitly enabled, because the
/// virtual-env site-packages directory users point at is usually ignored.
pub fn respect_ignore_from_env() -> bool {
    match std::env::var(RESPECT_IGNORE_ENV) {
        Ok(val) => matches!(
            val.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    LANGUAGE_BY_EXTENSION
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

/// Make a search root absolute, canonicalizing when the path exists.
pub fn resolve_root(path: &Path) -> PathBuf {
    match std::fs::canonicalize(path) {
        Ok(p) => p,
        Err(_) if path.is_absolute() => path.to_path_buf(),
        Err(_) => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path),
    }
}

/// Convert a root-relative file path to a dotted module name.
///
/// Strips the file extension and joins path components with dots. For
/// Python a trailing `__init__` is dropped so a package is named by its
/// directory.
pub fn to_module_name(rel_path: &Path, language: Language) -> String {
    let without_ext = rel_path.with_extension("");
    let mut parts: Vec<&str> = without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect();
    if language == Language::Python && parts.len() > 1 && parts.last() == Some(&"__init__") {
        parts.pop();
    }
    parts.join(".")
}

fn is_implicitly_ignored(name: &str) -> bool {
    IMPLICIT_IGNORED_DIRS.contains(&name)
}

/// All files under `root` whose extension belongs to `language`.
///
/// Entries are visited in file-name order within each directory so the
/// result is deterministic for a fixed tree. Unreadable directory entries
/// are skipped.
pub fn iter_source_files(root: &Path, language: Language, respect_ignore: bool) -> Vec<PathBuf> {
    if root.is_file() {
        return if detect_language(root) == Some(language) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        };
    }
    let matches = |path: &Path| detect_language(path) == Some(language);

    if respect_ignore {
        let walker = ignore::WalkBuilder::new(root)
            .hidden(false)
            .parents(false)
            .git_global(false)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| !is_implicitly_ignored(&entry.file_name().to_string_lossy()))
            .build();
        return walker
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    debug!("skipping walk entry under {}: {err}", root.display());
                    None
                }
            })
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file() || ft.is_symlink()))
            .map(|e| e.into_path())
            .filter(|p| matches(p))
            .collect();
    }

    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !is_implicitly_ignored(&entry.file_name().to_string_lossy())
        })
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                debug!("skipping walk entry under {}: {err}", root.display());
                None
            }
        })
        .filter(|e| e.file_type().is_file() || e.path_is_symlink())
        .map(|e| e.into_path())
        .filter(|p| matches(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_detect_language_by_extension() {
        assert_eq!(detect_language(Path::new("a/b.py")), Some(Language::Python));
        assert_eq!(detect_language(Path::new("a/b.TS")), Some(Language::JavaScript));
        assert_eq!(detect_language(Path::new("a/b.tsx")), Some(Language::JavaScript));
        assert_eq!(detect_language(Path::new("a/b.rs")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }

    #[test]
    fn test_to_module_name_simple() {
        assert_eq!(
            to_module_name(Path::new("src/pkg/symbols.py"), Language::Python),
            "src.pkg.symbols"
        );
    }

    #[test]
    fn test_to_module_name_package_init() {
        assert_eq!(to_module_name(Path::new("pkg/__init__.py"), Language::Python), "pkg");
        assert_eq!(to_module_name(Path::new("__init__.py"), Language::Python), "__init__");
        assert_eq!(
            to_module_name(Path::new("lib/__init__.js"), Language::JavaScript),
            "lib.__init__"
        );
    }

    #[test]
    fn test_iter_source_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::write(root.join("b.py"), "x = 1\n").unwrap();
        fs::write(root.join("a.py"), "x = 1\n").unwrap();
        fs::write(root.join("notes.txt"), "class Nope: pass\n").unwrap();
        fs::write(root.join("pkg/c.py"), "x = 1\n").unwrap();
        fs::write(root.join("__pycache__/cached.py"), "x = 1\n").unwrap();

        let files = iter_source_files(root, Language::Python, false);
        let rel: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["a.py", "b.py", "pkg/c.py"]);
    }

    #[test]
    fn test_iter_source_files_respects_gitignore_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("venv")).unwrap();
        fs::write(root.join(".gitignore"), "venv/\n").unwrap();
        fs::write(root.join("main.py"), "x = 1\n").unwrap();
        fs::write(root.join("venv/dep.py"), "x = 1\n").unwrap();

        assert_eq!(iter_source_files(root, Language::Python, false).len(), 2);
        let pruned = iter_source_files(root, Language::Python, true);
        assert_eq!(pruned.len(), 1);
        assert!(pruned[0].ends_with("main.py"));
    }

    #[test]
    fn test_iter_source_files_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.js");
        fs::write(&file, "function f() {}\n").unwrap();
        assert_eq!(iter_source_files(&file, Language::JavaScript, false), vec![file.clone()]);
        assert!(iter_source_files(&file, Language::Python, false).is_empty());
    }

    #[test]
    fn test_iter_source_files_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(iter_source_files(&missing, Language::Python, false).is_empty());
    }
}
