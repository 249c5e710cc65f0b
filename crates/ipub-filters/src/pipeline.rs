//! Pass pipeline
//!
//! - [`Pass`] - The trait implemented by every filter pass
//! - [`Pipeline`] - An ordered list of passes run over one document
//!
//! Passes communicate through the tree (tagged Span/Div containers) and
//! through the [`FilterContext`], so their relative order matters: raw and
//! citation extraction must precede the renderers, and the label pass must
//! run before anything that reads reference numbers. The pipeline enforces
//! this by rejecting passes added out of [`Stage`] order.

use std::fmt;

use ipub_ast::Pandoc;

use crate::context::FilterContext;
use crate::error::{FilterError, Result};
use crate::format_cites::FormatCites;
use crate::format_labels::FormatLabels;
use crate::format_raw::FormatRaw;
use crate::prepare_cites::PrepareCites;
use crate::prepare_labels::PrepareLabels;
use crate::prepare_raw::PrepareRaw;

/// Position of a pass in the pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    PrepareRaw,
    PrepareCites,
    PrepareLabels,
    FormatCites,
    FormatLabels,
    FormatRaw,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PrepareRaw => "prepare-raw",
            Stage::PrepareCites => "prepare-cites",
            Stage::PrepareLabels => "prepare-labels",
            Stage::FormatCites => "format-cites",
            Stage::FormatLabels => "format-labels",
            Stage::FormatRaw => "format-raw",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single traversal of the document
pub trait Pass: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    fn stage(&self) -> Stage;

    /// Apply the pass to the document
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be filtered; the pipeline
    /// stops at the first error.
    fn run(&self, doc: &mut Pandoc, ctx: &mut FilterContext) -> Result<()>;
}

/// Passes to run over a document, in stage order
#[derive(Default)]
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// All six passes
    pub fn standard() -> Self {
        let passes: Vec<Box<dyn Pass>> = vec![
            Box::new(PrepareRaw),
            Box::new(PrepareCites),
            Box::new(PrepareLabels),
            Box::new(FormatCites),
            Box::new(FormatLabels),
            Box::new(FormatRaw),
        ];
        Self { passes }
    }

    /// Add a pass.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::PassOrder`] if the pass belongs to an earlier
    /// stage than a pass already added.
    pub fn push(&mut self, pass: Box<dyn Pass>) -> Result<()> {
        if let Some(last) = self.passes.last()
            && pass.stage() < last.stage()
        {
            return Err(FilterError::PassOrder {
                pass: pass.name().to_string(),
                stage: pass.stage(),
                after: last.stage(),
            });
        }
        self.passes.push(pass);
        Ok(())
    }

    /// Builder form of [`Pipeline::push`]
    pub fn with(mut self, pass: impl Pass + 'static) -> Result<Self> {
        self.push(Box::new(pass))?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Names of the passes in execution order
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass over the document.
    ///
    /// Honours the `apply_filters`, `convert_raw` and `at_notation` options,
    /// clears state left in `ctx` by an earlier run, seeds the label table from the document's `$$references` and writes
    /// it back afterwards (or clears the metadata under `strip_meta`).
    pub fn run(&self, doc: &mut Pandoc, ctx: &mut FilterContext) -> Result<()> {
        if !ctx.options().apply_filters {
            tracing::debug!("Filters disabled by document options");
            return Ok(());
        }
        ctx.reset();
        ctx.load_references(&doc.meta);
        for pass in &self.passes {
            let enabled = match pass.stage() {
                Stage::PrepareRaw => ctx.options().convert_raw,
                Stage::PrepareCites => ctx.options().at_notation,
                _ => true,
            };
            if !enabled {
                tracing::debug!(pass = pass.name(), "Skipping pass");
                continue;
            }
            tracing::debug!(pass = pass.name(), format = %ctx.format(), "Running pass");
            pass.run(doc, ctx)?;
        }
        if ctx.options().strip_meta {
            doc.meta.clear();
        } else {
            ctx.store_references(&mut doc.meta);
        }
        Ok(())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("passes", &self.pass_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FilterOptions;
    use ipub_ast::{Meta, OutputFormat};
    use std::sync::{Arc, Mutex};

    struct Recording {
        name: &'static str,
        stage: Stage,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Pass for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn stage(&self) -> Stage {
            self.stage
        }

        fn run(&self, _doc: &mut Pandoc, _ctx: &mut FilterContext) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    fn recording(name: &'static str, stage: Stage, log: &Arc<Mutex<Vec<&'static str>>>) -> Box<dyn Pass> {
        Box::new(Recording {
            name,
            stage,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            Pipeline::standard().pass_names(),
            vec![
                "prepare-raw",
                "prepare-cites",
                "prepare-labels",
                "format-cites",
                "format-labels",
                "format-raw"
            ]
        );
    }

    #[test]
    fn test_out_of_order_push_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline
            .push(recording("labels", Stage::FormatLabels, &log))
            .unwrap();
        let err = pipeline
            .push(recording("cites", Stage::PrepareCites, &log))
            .unwrap_err();
        assert!(matches!(
            err,
            FilterError::PassOrder {
                stage: Stage::PrepareCites,
                after: Stage::FormatLabels,
                ..
            }
        ));
        assert_eq!(pipeline.len(), 1);
    }

    #[test]
    fn test_disabled_stages_are_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.push(recording("raw", Stage::PrepareRaw, &log)).unwrap();
        pipeline.push(recording("cites", Stage::PrepareCites, &log)).unwrap();
        pipeline.push(recording("labels", Stage::PrepareLabels, &log)).unwrap();

        let options = FilterOptions {
            convert_raw: false,
            at_notation: false,
            ..Default::default()
        };
        let mut doc = Pandoc::new(Meta::new(), vec![]);
        let mut ctx = FilterContext::new(OutputFormat::Rst, options);
        pipeline.run(&mut doc, &mut ctx).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["labels"]);
    }

    #[test]
    fn test_apply_filters_false_runs_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.push(recording("raw", Stage::PrepareRaw, &log)).unwrap();
        let options = FilterOptions {
            apply_filters: false,
            ..Default::default()
        };
        let mut doc = Pandoc::new(Meta::new(), vec![]);
        let mut ctx = FilterContext::new(OutputFormat::Rst, options);
        pipeline.run(&mut doc, &mut ctx).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }
}
