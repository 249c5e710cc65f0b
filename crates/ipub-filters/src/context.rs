//! Per-document filter state
//!
//! A [`FilterContext`] is created for one document and one target format.
//! It carries the resolved options, the label table and counters built by
//! the label pass, and the bibliography used for HTML citations.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use ipub_ast::{Meta, MetaValue, OutputFormat, Pandoc};

use crate::bibliography::Bibliography;
use crate::definitions::{REFERENCES_KEY, RefType};
use crate::options::{FilterOptions, OptionOverrides};

/// A labelled element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub ref_type: RefType,
    pub number: u32,
}

/// State threaded through every pass of one pipeline run
#[derive(Debug)]
pub struct FilterContext {
    format: OutputFormat,
    options: FilterOptions,
    references: BTreeMap<String, Reference>,
    counters: HashMap<RefType, u32>,
    labelled: HashSet<String>,
    collisions: Vec<String>,
    bibliography: Arc<Bibliography>,
    bib_numbers: HashMap<String, usize>,
}

impl FilterContext {
    pub fn new(format: OutputFormat, options: FilterOptions) -> Self {
        Self {
            format,
            options,
            references: BTreeMap::new(),
            counters: HashMap::new(),
            labelled: HashSet::new(),
            collisions: Vec::new(),
            bibliography: Arc::new(Bibliography::new()),
            bib_numbers: HashMap::new(),
        }
    }

    /// Create a context with options resolved from the document metadata
    pub fn for_document(doc: &Pandoc, format: OutputFormat, layers: &[OptionOverrides]) -> Self {
        Self::new(format, FilterOptions::resolve(&doc.meta, layers))
    }

    pub fn with_bibliography(mut self, bibliography: Arc<Bibliography>) -> Self {
        self.bibliography = bibliography;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn bibliography(&self) -> &Bibliography {
        &self.bibliography
    }

    pub fn references(&self) -> &BTreeMap<String, Reference> {
        &self.references
    }

    pub fn reference(&self, label: &str) -> Option<Reference> {
        self.references.get(label).copied()
    }

    /// Labels that were given to more than one element in this run
    pub fn collisions(&self) -> &[String] {
        &self.collisions
    }

    /// Number a newly labelled element and record it in the label table.
    ///
    /// A label that was already used in this run keeps the last element's
    /// number.
    pub fn register(&mut self, label: &str, ref_type: RefType) -> u32 {
        let counter = self.counters.entry(ref_type).or_insert(0);
        *counter += 1;
        let number = *counter;
        if !self.labelled.insert(label.to_string()) {
            tracing::warn!(label, kind = %ref_type, "Duplicate label, keeping the last one");
            self.collisions.push(label.to_string());
        }
        self.references
            .insert(label.to_string(), Reference { ref_type, number });
        number
    }

    /// Forget everything recorded by a previous run
    pub fn reset(&mut self) {
        self.references.clear();
        self.counters.clear();
        self.labelled.clear();
        self.collisions.clear();
        self.bib_numbers.clear();
    }

    /// Number of elements of a type labelled so far
    pub fn count(&self, ref_type: RefType) -> u32 {
        self.counters.get(&ref_type).copied().unwrap_or(0)
    }

    /// Position of a bibliography entry in citation order, assigned on first use
    pub fn bib_number(&mut self, id: &str) -> usize {
        let next = self.bib_numbers.len() + 1;
        *self.bib_numbers.entry(id.to_string()).or_insert(next)
    }

    /// Seed the label table from `$$references` in the metadata
    pub fn load_references(&mut self, meta: &Meta) {
        let Some(map) = meta.get(REFERENCES_KEY).and_then(MetaValue::as_map) else {
            return;
        };
        for (label, entry) in map {
            let Some(entry) = entry.as_map() else {
                continue;
            };
            let ref_type = entry
                .get("type")
                .and_then(MetaValue::as_string)
                .and_then(|t| RefType::parse(&t));
            let number = entry
                .get("number")
                .and_then(MetaValue::as_string)
                .and_then(|n| n.trim().parse().ok());
            if let (Some(ref_type), Some(number)) = (ref_type, number) {
                self.references
                    .insert(label.clone(), Reference { ref_type, number });
            }
        }
    }

    /// Write the label table back into the metadata as `$$references`
    pub fn store_references(&self, meta: &mut Meta) {
        if self.references.is_empty() {
            return;
        }
        let map = self
            .references
            .iter()
            .map(|(label, reference)| {
                let mut entry = BTreeMap::new();
                entry.insert(
                    "type".to_string(),
                    MetaValue::MetaString(reference.ref_type.as_str().to_string()),
                );
                entry.insert(
                    "number".to_string(),
                    MetaValue::MetaString(reference.number.to_string()),
                );
                (label.clone(), MetaValue::MetaMap(entry))
            })
            .collect();
        meta.insert(REFERENCES_KEY, MetaValue::MetaMap(map));
    }
}
