//! Bibliography entries for HTML citation rendering, read from CSL-JSON
//! or BibTeX

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{FilterError, Result};

/// A bibliography entry, as far as HTML citations need it
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BibEntry {
    pub id: String,
    #[serde(default, rename = "DOI", alias = "doi")]
    pub doi: Option<String>,
    #[serde(default, rename = "URL", alias = "url")]
    pub url: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl BibEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Where a citation of this entry should link to, if anywhere
    pub fn href(&self) -> Option<String> {
        if let Some(doi) = &self.doi {
            return Some(format!("https://doi.org/{doi}"));
        }
        self.url.clone().or_else(|| self.link.clone())
    }
}

/// Entries keyed by citation id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bibliography {
    entries: BTreeMap<String, BibEntry>,
}

impl Bibliography {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse CSL-JSON (an array of objects with at least an `id`)
    pub fn from_json_str(input: &str) -> Result<Self> {
        let entries: Vec<BibEntry> = serde_json::from_str(input)?;
        Ok(entries.into_iter().collect())
    }

    /// Parse a BibTeX/BibLaTeX database
    pub fn from_bibtex_str(input: &str) -> Result<Self> {
        let library = hayagriva::io::from_biblatex_str(input).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            FilterError::BibliographyBibtex(messages.join("; "))
        })?;
        Ok(library
            .iter()
            .map(|entry| BibEntry {
                id: entry.key().to_string(),
                doi: entry
                    .serial_number()
                    .and_then(|numbers| numbers.0.get("doi"))
                    .cloned(),
                url: entry.url().map(|url| url.value.to_string()),
                link: None,
            })
            .collect())
    }

    /// Load a bibliography file: BibTeX for `.bib`, CSL-JSON otherwise
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| FilterError::BibliographyIo {
            path: path.to_path_buf(),
            source,
        })?;
        let is_bibtex = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("bib"));
        if is_bibtex {
            Self::from_bibtex_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn insert(&mut self, entry: BibEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&BibEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<BibEntry> for Bibliography {
    fn from_iter<I: IntoIterator<Item = BibEntry>>(iter: I) -> Self {
        let mut bib = Bibliography::new();
        for entry in iter {
            bib.insert(entry);
        }
        bib
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csl_json() {
        let bib = Bibliography::from_json_str(
            r#"[
                {"id": "smith2019", "DOI": "10.1000/xyz", "title": "Ignored"},
                {"id": "jones", "URL": "http://example.org"},
                {"id": "bare"}
            ]"#,
        )
        .unwrap();
        assert_eq!(bib.len(), 3);
        assert_eq!(
            bib.get("smith2019").and_then(BibEntry::href).as_deref(),
            Some("https://doi.org/10.1000/xyz")
        );
        assert_eq!(
            bib.get("jones").and_then(BibEntry::href).as_deref(),
            Some("http://example.org")
        );
        assert_eq!(bib.get("bare").and_then(BibEntry::href), None);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Bibliography::from_json_str("{\"id\": 1}"),
            Err(FilterError::BibliographyJson(_))
        ));
    }

    #[test]
    fn test_bibtex() {
        let bib = Bibliography::from_bibtex_str(
            r#"
@article{smith2019,
  title = {A Title},
  author = {Smith, Jane},
  year = {2019},
  doi = {10.1000/xyz},
}

@online{site,
  title = {Site},
  url = {http://example.org/},
}
"#,
        )
        .unwrap();
        assert_eq!(bib.len(), 2);
        assert_eq!(
            bib.get("smith2019").and_then(BibEntry::href).as_deref(),
            Some("https://doi.org/10.1000/xyz")
        );
        assert_eq!(
            bib.get("site").and_then(BibEntry::href).as_deref(),
            Some("http://example.org/")
        );
    }

    #[test]
    fn test_load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.bib");
        fs::write(&path, "@book{k1, title = {T}, year = {2000}}\n").unwrap();
        let bib = Bibliography::load(&path).unwrap();
        assert_eq!(bib.get("k1"), Some(&BibEntry::new("k1")));

        let path = dir.path().join("refs.json");
        fs::write(&path, "@book{k1, title = {T}}\n").unwrap();
        assert!(matches!(
            Bibliography::load(&path),
            Err(FilterError::BibliographyJson(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Bibliography::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, FilterError::BibliographyIo { .. }));
    }
}
