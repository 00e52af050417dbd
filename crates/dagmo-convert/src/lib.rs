//! Conversion engine for dagmo.
//!
//! Converts marimo notebooks to dagster asset modules and back.
//!
//! # Architecture
//!
//! ```text
//! notebook.py ──► reader::notebook ──► classify ──► resolve::infer ────► rewrite::pipeline ──► PipelineGenerator ──► assets.py
//!
//! assets.py ────► reader::pipeline ──► classify ──► resolve::declared ──► rewrite::notebook ──► NotebookGenerator ──► notebook.py
//!                                                         │
//!                                                         ▼
//!                                                  DependencyGraph
//!                                                (cycles are fatal)
//! ```
//!
//! Every direction returns the converted source together with the
//! warnings collected for constructs that were passed through or dropped.

mod assemble;
mod classify;
mod reader;
mod resolve;
mod rewrite;

pub use dagmo_core::{
    Construct, ConversionConfig, Error, Result, UnsupportedConstructWarning,
};

use assemble::{NotebookGenerator, PipelineGenerator};
use dagmo_core::Diagnostics;
use tracing::debug;

/// Converted source and the warnings raised while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub source: String,
    pub warnings: Vec<UnsupportedConstructWarning>,
}

/// Converter between the two forms.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConversionConfig,
}

impl Converter {
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// Convert a marimo notebook into a dagster asset module.
    pub fn notebook_to_pipeline(&self, source: &str) -> Result<Conversion> {
        let config = &self.config;
        let mut diagnostics = Diagnostics::new();

        let mut module = reader::notebook::read(source, config, &mut diagnostics)?;
        for unit in &mut module.units {
            unit.kind = classify::notebook(unit, config);
        }
        debug!(
            "Classified {} cells, {} convertible",
            module.units.len(),
            module.convertible_units().count()
        );

        let order = resolve::infer(&mut module, config, &mut diagnostics)?;
        let module = rewrite::pipeline::rewrite(module, &order, config, &mut diagnostics)?;
        let source = PipelineGenerator::new(config).generate(&module);

        Ok(Conversion {
            source,
            warnings: diagnostics.into_warnings(),
        })
    }

    /// Convert a dagster asset module into a marimo notebook.
    pub fn pipeline_to_notebook(&self, source: &str) -> Result<Conversion> {
        let config = &self.config;
        let mut diagnostics = Diagnostics::new();

        let read = reader::pipeline::read(source, config, &mut diagnostics)?;
        let mut module = read.module;
        for unit in &mut module.units {
            unit.kind = classify::pipeline(unit, config);
        }
        debug!("Classified {} assets", module.units.len());

        let order = resolve::declared(&mut module, &mut diagnostics)?;
        let module = rewrite::notebook::rewrite(module, &read.scope, &order, config, &mut diagnostics)?;
        let source = NotebookGenerator::new(config).generate(&module);

        Ok(Conversion {
            source,
            warnings: diagnostics.into_warnings(),
        })
    }
}

/// Convert a marimo notebook with the default configuration.
pub fn marimo_to_dagster(source: &str) -> Result<Conversion> {
    Converter::default().notebook_to_pipeline(source)
}

/// Convert a dagster asset module with the default configuration.
pub fn dagster_to_marimo(source: &str) -> Result<Conversion> {
    Converter::default().pipeline_to_notebook(source)
}
