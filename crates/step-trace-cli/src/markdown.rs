//! Fenced-code-block extraction for the markdown snippet runner (§6).
//!
//! Ground truth: `generate_traces_from_markdown.py` matches
//! ` ```python ... trace-id=<id> ... \n<code>``` ` blocks with a regex and
//! traces each one with no entry point. `step-trace-cli` keeps that same
//! shape as a single regex rather than a line scanner.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^```python[^\n`]*trace-id=([\w-]+)[^\n`]*\n([\s\S]*?)^```").expect("snippet pattern is valid")
});

/// One `trace-id=...`-tagged python code block pulled out of a markdown
/// file.
#[derive(Debug, Clone)]
pub struct Snippet {
    pub trace_id: String,
    pub code: String,
    pub source_file: PathBuf,
}

/// Extracts every tagged fenced code block from `text`. A block's info
/// string must start a python fence (` ```python`, possibly followed by
/// more attributes) and carry a `trace-id=<id>` attribute; untagged or
/// non-python fences are skipped.
#[must_use]
pub fn extract_snippets(text: &str, source_file: &Path) -> Vec<Snippet> {
    SNIPPET
        .captures_iter(text)
        .map(|caps| Snippet {
            trace_id: caps[1].to_string(),
            code: caps[2].to_string(),
            source_file: source_file.to_path_buf(),
        })
        .collect()
}

/// Recursively walks `root` for `.md`/`.markdown` files, in a stable
/// (sorted) order so a run is reproducible.
pub fn find_markdown_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else if matches!(path.extension().and_then(|e| e.to_str()), Some("md" | "markdown")) {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_single_tagged_block() {
        let text = "# Title\n\n```python trace-id=two-sum\ndef f():\n    pass\n```\n";
        let snippets = extract_snippets(text, Path::new("doc.md"));
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].trace_id, "two-sum");
        assert_eq!(snippets[0].code, "def f():\n    pass\n");
    }

    #[test]
    fn ignores_fences_without_a_trace_id() {
        let text = "```python\nprint(1)\n```\n";
        assert!(extract_snippets(text, Path::new("doc.md")).is_empty());
    }

    #[test]
    fn ignores_non_python_fences() {
        let text = "```rust trace-id=not-python\nfn main() {}\n```\n";
        assert!(extract_snippets(text, Path::new("doc.md")).is_empty());
    }

    #[test]
    fn extracts_multiple_blocks_from_one_file() {
        let text = "```python trace-id=a\nx = 1\n```\ntext\n```python trace-id=b\ny = 2\n```\n";
        let snippets = extract_snippets(text, Path::new("doc.md"));
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].trace_id, "a");
        assert_eq!(snippets[1].trace_id, "b");
    }
}
