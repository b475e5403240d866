//! Rendering and writing of extraction reports.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ccprompt_core::ExtractionReport;
use clap::ValueEnum;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One `File: <path>` block per entry, each followed by a blank line.
pub fn render_text(report: &ExtractionReport) -> String {
    report
        .pairs()
        .into_iter()
        .map(|(path, source)| format!("File: {path}\n\n{source}\n\n"))
        .collect()
}

pub fn render_json(report: &ExtractionReport) -> Result<String> {
    serde_json::to_string_pretty(&report.to_payload()).context("Error serializing report")
}

pub fn render(report: &ExtractionReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report),
    }
}

pub fn write_output(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .with_context(|| format!("Error writing to output file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccprompt_core::{ExtractedSource, NodeKind};

    fn report() -> ExtractionReport {
        let entry = |name: &str, source: &str| ExtractedSource {
            file_path: "/p/models.py".into(),
            source: source.into(),
            name: name.into(),
            qualified_name: name.into(),
            kind: NodeKind::ClassDef,
            start_line: 1,
            end_line: 1,
        };
        ExtractionReport {
            entries: vec![
                entry("Derived", "class Derived(Base): pass"),
                entry("Base", "class Base: pass"),
            ],
            not_found: vec!["ghost".into()],
            ..ExtractionReport::default()
        }
    }

    #[test]
    fn test_render_text_blocks() {
        assert_eq!(
            render_text(&report()),
            "File: /p/models.py\n\nclass Derived(Base): pass\n\nFile: /p/models.py\n\nclass Base: pass\n\n"
        );
        assert_eq!(render_text(&ExtractionReport::default()), "");
    }

    #[test]
    fn test_render_json_payload() {
        let rendered = render(&report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["entries"][1]["name"], "Base");
        assert_eq!(value["not_found"][0], "ghost");
    }

    #[test]
    fn test_write_output_reports_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_output(&path, "x").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x");

        let err = write_output(&dir.path().join("missing/out.txt"), "x").unwrap_err();
        assert!(err.to_string().contains("Error writing to output file"));
    }
}
