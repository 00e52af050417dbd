//! Conversion configuration.
//!
//! Every framework name the converter recognizes or emits lives here, so
//! nothing is hard-wired to a particular package alias. All structs
//! deserialize with defaults for missing fields:
//!
//! ```json
//! { "notebook": { "generated_with": "0.14.0" }, "emit_definitions": false }
//! ```

use serde::{Deserialize, Serialize};

/// Names used by the notebook form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotebookDialect {
    /// Package imported by notebooks.
    pub package: String,
    /// Conventional alias of the package inside cells.
    pub alias: String,
    /// Name of the application object.
    pub app_name: String,
    /// Attribute of the application object used as cell decorator.
    pub cell_decorator: String,
    /// Version written to `__generated_with`.
    pub generated_with: String,
    /// Keyword arguments passed to the application constructor.
    pub app_options: String,
    /// Decorator arguments that only mean something to the notebook editor.
    pub framework_args: Vec<String>,
    /// Namespace holding interactive widgets (`mo.ui`).
    pub ui_namespace: String,
    /// Layout helpers that make a cell presentational.
    pub layout_functions: Vec<String>,
    /// Function rendering markdown text.
    pub markdown_function: String,
}

impl Default for NotebookDialect {
    fn default() -> Self {
        Self {
            package: "marimo".to_string(),
            alias: "mo".to_string(),
            app_name: "app".to_string(),
            cell_decorator: "cell".to_string(),
            generated_with: "0.13.0".to_string(),
            app_options: "width=\"medium\"".to_string(),
            framework_args: strings(&["hide_code", "disabled", "column"]),
            ui_namespace: "ui".to_string(),
            layout_functions: strings(&["accordion", "hstack", "vstack", "tabs", "icon"]),
            markdown_function: "md".to_string(),
        }
    }
}

/// Names used by the pipeline form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineDialect {
    /// Package imported by pipeline modules.
    pub package: String,
    /// Alias emitted for the package.
    pub alias: String,
    pub asset_decorator: String,
    pub multi_asset_decorator: String,
    /// Output declaration used inside `outs={...}`.
    pub asset_out: String,
    /// Object collecting all assets of a module.
    pub definitions: String,
    /// Conventional name of the execution context parameter.
    pub context_param: String,
    /// Annotations that mark a parameter as the execution context.
    pub context_types: Vec<String>,
    /// Context attributes whose method calls are pure reporting (`context.log.info`).
    pub report_attributes: Vec<String>,
    /// Context methods that are pure reporting (`context.add_output_metadata`).
    pub report_methods: Vec<String>,
    /// Base classes of resources injected as parameters.
    pub resource_bases: Vec<String>,
}

impl Default for PipelineDialect {
    fn default() -> Self {
        Self {
            package: "dagster".to_string(),
            alias: "dg".to_string(),
            asset_decorator: "asset".to_string(),
            multi_asset_decorator: "multi_asset".to_string(),
            asset_out: "AssetOut".to_string(),
            definitions: "Definitions".to_string(),
            context_param: "context".to_string(),
            context_types: strings(&["AssetExecutionContext", "OpExecutionContext"]),
            report_attributes: strings(&["log"]),
            report_methods: strings(&["add_output_metadata", "log_event"]),
            resource_bases: strings(&[
                "ConfigurableResource",
                "ConfigurableIOManager",
                "Config",
            ]),
        }
    }
}

/// The embedded-query call in each form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDialect {
    /// Function of the notebook package (`mo.sql`).
    pub notebook_function: String,
    /// Module providing the pipeline call (`duckdb`).
    pub pipeline_module: String,
    /// Function of the pipeline module (`duckdb.sql`).
    pub pipeline_function: String,
    /// Keyword naming the connection in the notebook call.
    pub notebook_engine_arg: String,
    /// Keyword naming the connection in the pipeline call.
    pub pipeline_connection_arg: String,
    /// Notebook keywords dropped when converting to a pipeline.
    pub notebook_only_args: Vec<String>,
    /// Pipeline keywords the notebook call has no counterpart for.
    pub pipeline_only_args: Vec<String>,
}

impl Default for QueryDialect {
    fn default() -> Self {
        Self {
            notebook_function: "sql".to_string(),
            pipeline_module: "duckdb".to_string(),
            pipeline_function: "sql".to_string(),
            notebook_engine_arg: "engine".to_string(),
            pipeline_connection_arg: "connection".to_string(),
            notebook_only_args: strings(&["output"]),
            pipeline_only_args: strings(&["alias", "params"]),
        }
    }
}

/// Configuration of one converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub notebook: NotebookDialect,
    pub pipeline: PipelineDialect,
    pub query: QueryDialect,
    /// Decorator keywords with the same meaning in both forms.
    pub recognized_decorator_args: Vec<String>,
    /// Emit `defs = dg.Definitions(assets=[...])` at the end of pipelines.
    pub emit_definitions: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            notebook: NotebookDialect::default(),
            pipeline: PipelineDialect::default(),
            query: QueryDialect::default(),
            recognized_decorator_args: strings(&[
                "group_name",
                "compute_kind",
                "description",
                "key_prefix",
                "owners",
                "tags",
                "kinds",
                "metadata",
                "code_version",
                "io_manager_key",
                "deps",
            ]),
            emit_definitions: true,
        }
    }
}

impl ConversionConfig {
    pub fn is_recognized_arg(&self, key: &str) -> bool {
        self.recognized_decorator_args.iter().any(|k| k == key)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
