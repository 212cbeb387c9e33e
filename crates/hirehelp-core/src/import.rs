use std::path::Path;

/// Files longer than this on their first line don't suggest a name.
const NAME_LINE_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unsupported file type '{0}', expected .txt or .md")]
    UnsupportedExtension(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A local handbook file ready to be fed to the admin form.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedDocument {
    /// `None` when the first line is too long or cleans down to nothing.
    /// Adoption rejects an empty name either way.
    pub suggested_name: Option<String>,
    pub handbook_text: String,
}

pub fn import_document(file_name: &str, contents: &str) -> Result<ImportedDocument, ImportError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if extension != "txt" && extension != "md" {
        return Err(ImportError::UnsupportedExtension(file_name.to_string()));
    }

    Ok(ImportedDocument {
        suggested_name: suggest_name(contents),
        handbook_text: contents.to_string(),
    })
}

pub fn import_file(path: &Path) -> Result<ImportedDocument, ImportError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    // Check the extension before touching the disk.
    import_document(&file_name, "")?;
    let contents = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.display().to_string(),
        source,
    })?;
    import_document(&file_name, &contents)
}

fn suggest_name(contents: &str) -> Option<String> {
    let first = contents.lines().next()?;
    if first.chars().count() >= NAME_LINE_LIMIT {
        return None;
    }
    let cleaned: String = first
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .collect();
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_first_line_becomes_name() {
        let doc = import_document("acme.md", "# Acme Corp 2025!\nLeave: 20 days").unwrap();
        assert_eq!(doc.suggested_name.as_deref(), Some("Acme Corp"));
        assert!(doc.handbook_text.contains("Leave: 20 days"));
    }

    #[test]
    fn long_first_line_suggests_nothing() {
        let line = "a".repeat(60);
        let doc = import_document("h.txt", &format!("{line}\nbody")).unwrap();
        assert_eq!(doc.suggested_name, None);
    }

    #[test]
    fn punctuation_only_line_suggests_nothing() {
        let doc = import_document("h.txt", "----\nbody").unwrap();
        assert_eq!(doc.suggested_name, None);
    }

    #[test]
    fn other_extensions_are_rejected() {
        let err = import_document("handbook.pdf", "x").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedExtension(_)));
        assert!(import_document("README", "x").is_err());
        assert!(import_document("NOTES.MD", "x").is_ok());
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("globex.txt");
        std::fs::write(&path, "Globex\nRemote work allowed").unwrap();

        let doc = import_file(&path).unwrap();
        assert_eq!(doc.suggested_name.as_deref(), Some("Globex"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = import_file(Path::new("/nonexistent/handbook.md")).unwrap_err();
        assert!(matches!(err, ImportError::Read { .. }));
    }
}
