//! Integration tests for dagmo conversions.
//!
//! Tests both directions end to end and the pipeline → notebook → pipeline
//! roundtrip.

use dagmo_convert::{
    Construct, ConversionConfig, Converter, Error, dagster_to_marimo, marimo_to_dagster,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// A notebook with an import cell, markdown, a UI control, code and SQL.
fn orders_notebook() -> &'static str {
    r##"# /// script
# requires-python = ">=3.11"
# dependencies = [
#     "marimo>=0.13",
#     "polars",
# ]
# ///

import marimo

__generated_with = "0.13.0"
app = marimo.App(width="medium")


@app.cell
def _():
    import marimo as mo
    import polars as pl
    return mo, pl


@app.cell
def _(mo):
    mo.md(r"""# Orders""")
    return


@app.cell(hide_code=True, group_name="raw", retries=3)
def _(pl):
    orders = pl.read_csv("orders.csv")
    return (orders,)


@app.cell
def _(mo):
    threshold = mo.ui.slider(1, 100)
    threshold
    return


@app.cell
def _(mo, orders):
    big = mo.sql(f"select * from orders where amount > 10")
    return (big,)


if __name__ == "__main__":
    app.run()
"##
}

/// The pipeline expected from [`orders_notebook`].
fn orders_pipeline() -> &'static str {
    r##"# /// script
# requires-python = ">=3.11"
# dependencies = [
#     "dagster",
#     "polars",
# ]
# ///


import dagster as dg
import duckdb
import polars as pl


@dg.asset(group_name="raw", retries=3)
def orders():
    """# Orders"""
    orders = pl.read_csv("orders.csv")
    return orders


@dg.asset
def big(orders):
    big = duckdb.sql(f"select * from orders where amount > 10")
    return big


defs = dg.Definitions(assets=[orders, big])
"##
}

/// A hand-written asset module, not produced by the converter.
fn handwritten_pipeline() -> &'static str {
    r#""""Customer analytics."""

import dagster as dg
import polars as pl
from dagster import AssetExecutionContext


@dg.asset(compute_kind="polars")
def customers(context: AssetExecutionContext):
    """All customers.

    Loaded from the CRM export.
    """
    context.log.info("loading customers")
    return pl.read_parquet("customers.parquet")


@dg.multi_asset(
    outs={
        "active": dg.AssetOut(),
        "churned": dg.AssetOut(),
    },
)
def split(customers):
    active = customers.filter(pl.col("active"))
    churned = customers.filter(~pl.col("active"))
    return active, churned


@dg.asset(deps=["split"])
def report(active, churned):
    print(len(active), len(churned))


defs = dg.Definitions(assets=[customers, split, report])
"#
}

fn constructs(warnings: &[dagmo_convert::UnsupportedConstructWarning]) -> Vec<Construct> {
    warnings.iter().map(|w| w.construct).collect()
}

// =============================================================================
// Notebook → Pipeline Tests
// =============================================================================

#[test]
fn test_notebook_to_pipeline() {
    let conversion = marimo_to_dagster(orders_notebook()).expect("conversion failed");
    assert_eq!(conversion.source, orders_pipeline());
}

#[test]
fn test_ui_dropped_silently_unknown_key_flagged_once() {
    let conversion = marimo_to_dagster(orders_notebook()).expect("conversion failed");

    assert!(!conversion.source.contains("slider"));
    assert!(conversion.source.contains("retries=3"));
    assert_eq!(constructs(&conversion.warnings), vec![Construct::DecoratorArgument]);
    assert_eq!(conversion.warnings[0].unit, "orders");
}

#[test]
fn test_dependency_order_follows_data() {
    let notebook = r#"import marimo

app = marimo.App()


@app.cell
def _(cleaned):
    report = cleaned.describe()
    return (report,)


@app.cell
def _(raw):
    cleaned = raw.drop_nulls()
    return (cleaned,)


@app.cell
def _():
    raw = load()
    return (raw,)
"#;
    let conversion = marimo_to_dagster(notebook).expect("conversion failed");
    let source = &conversion.source;

    let raw = source.find("def raw():").expect("raw asset");
    let cleaned = source.find("def cleaned(raw):").expect("cleaned asset");
    let report = source.find("def report(cleaned):").expect("report asset");
    assert!(raw < cleaned && cleaned < report);
    assert!(source.ends_with("defs = dg.Definitions(assets=[raw, cleaned, report])\n"));
}

#[test]
fn test_mutual_reads_are_a_cycle() {
    let notebook = r#"import marimo

app = marimo.App()


@app.cell
def _(b):
    a = b + 1
    return (a,)


@app.cell
def _(a):
    b = a + 1
    return (b,)
"#;
    match marimo_to_dagster(notebook) {
        Err(Error::CyclicDependency { cycle }) => assert_eq!(cycle, vec!["a", "b"]),
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_duplicate_cell_names() {
    let notebook = r#"@app.cell
def _():
    x = 1
    return (x,)


@app.cell
def _():
    x = 2
    return (x,)
"#;
    assert!(matches!(
        marimo_to_dagster(notebook),
        Err(Error::DuplicateName(name)) if name == "x"
    ));
}

#[test]
fn test_metadata_substitution() {
    let notebook = r#"# /// script
# dependencies = [
#     "numpy",
#     "marimo>=1.0",
#     "pandas==2.2.0",
# ]
# ///
import marimo

app = marimo.App()


@app.cell
def _():
    x = 1
    return (x,)
"#;
    let conversion = marimo_to_dagster(notebook).expect("conversion failed");
    assert!(conversion.source.starts_with(
        "# /// script\n# dependencies = [\n#     \"numpy\",\n#     \"dagster\",\n#     \"pandas==2.2.0\",\n# ]\n# ///\n"
    ));
}

#[test]
fn test_markdown_without_following_code_goes_to_module_docstring() {
    let notebook = r#"@app.cell
def _(mo):
    mo.md("Closing remarks.")
    return


@app.cell
def _(mo):
    mo.md("Also this.")
    return
"#;
    let conversion = marimo_to_dagster(notebook).expect("conversion failed");
    assert!(
        conversion
            .source
            .starts_with("\"\"\"Closing remarks.\n\nAlso this.\n\"\"\"\n")
    );
}

// =============================================================================
// Pipeline → Notebook Tests
// =============================================================================

#[test]
fn test_pipeline_to_notebook() {
    let conversion = dagster_to_marimo(handwritten_pipeline()).expect("conversion failed");
    let source = &conversion.source;

    assert!(source.starts_with("\"\"\"Customer analytics.\"\"\"\n\n\nimport marimo\n"));
    assert!(source.contains("    import marimo as mo\n    import polars as pl\n    return (mo, pl)\n"));
    assert!(source.contains(
        "@app.cell(compute_kind=\"polars\")\ndef _(pl):\n    customers = pl.read_parquet(\"customers.parquet\")\n    return (customers,)\n"
    ));
    assert!(source.contains("    All customers.\n\n    Loaded from the CRM export.\n"));
    assert!(source.contains("def split(customers, pl):\n"));
    assert!(source.contains("    return (active, churned)\n"));
    assert!(source.contains(
        "@app.cell(deps=[\"split\"])\ndef report(active, churned):\n    print(len(active), len(churned))\n    return\n"
    ));
    assert!(!source.contains("context"));
    assert!(source.ends_with("if __name__ == \"__main__\":\n    app.run()\n"));
    assert!(conversion.warnings.is_empty(), "{:?}", conversion.warnings);
}

#[test]
fn test_pipeline_leftovers_are_flagged() {
    let pipeline = r#"import dagster as dg


class Warehouse(dg.ConfigurableResource):
    url: str


@dg.asset
def orders(context, warehouse: Warehouse):
    if not warehouse.url:
        return None
    context.add_output_metadata({"source": warehouse.url})
    return dg.MaterializeResult(metadata={"rows": 3})


defs = dg.Definitions(assets=[orders], resources={"warehouse": Warehouse(url="db")})
"#;
    let conversion = dagster_to_marimo(pipeline).expect("conversion failed");
    assert_eq!(
        constructs(&conversion.warnings),
        vec![
            Construct::TopLevelStatement,
            Construct::DefinitionsArgument,
            Construct::ResourceParameter,
            Construct::EarlyReturn,
            Construct::FrameworkApi,
        ]
    );
    assert!(conversion.source.contains("orders = dg.MaterializeResult(metadata={\"rows\": 3})"));
}

#[test]
fn test_unknown_upstream_is_kept() {
    let pipeline = r#"import dagster as dg


@dg.asset
def report(external_table):
    return external_table.head()
"#;
    let conversion = dagster_to_marimo(pipeline).expect("conversion failed");
    assert_eq!(constructs(&conversion.warnings), vec![Construct::UnresolvedUpstream]);
    assert!(conversion.source.contains("def _(external_table):\n    report = external_table.head()\n"));
}

// =============================================================================
// Roundtrip Tests
// =============================================================================

#[test]
fn test_pipeline_notebook_pipeline_is_identical() {
    let converter = Converter::default();
    let pipeline = converter
        .notebook_to_pipeline(orders_notebook())
        .expect("first conversion failed")
        .source;

    let notebook = converter
        .pipeline_to_notebook(&pipeline)
        .expect("pipeline → notebook failed")
        .source;
    let again = converter
        .notebook_to_pipeline(&notebook)
        .expect("notebook → pipeline failed")
        .source;

    assert_eq!(again, pipeline);
}

/// An asset whose docstring is followed by an import that moves to the
/// module import block.
const DOCSTRING_WITH_IMPORT: &str = r#"import dagster as dg


@dg.asset
def payload():
    """Encoded payload."""
    import json

    payload = json.dumps({"a": 1})
    return payload
"#;

/// An asset whose first statement is a log call the notebook drops.
const LEADING_LOG_CALL: &str = r#"import dagster as dg


@dg.asset
def orders(context: dg.AssetExecutionContext):
    context.log.info("start")

    orders = [1, 2, 3]
    return orders
"#;

const MULTI_ASSET: &str = r#"import dagster as dg


@dg.asset
def numbers():
    return [1, 2, 3]


@dg.multi_asset(
    outs={
        "small": dg.AssetOut(),
        "large": dg.AssetOut(),
    },
)
def split(numbers):
    small = [n for n in numbers if n < 2]
    large = [n for n in numbers if n >= 2]
    return small, large
"#;

const ASYNC_ASSET: &str = r#"import dagster as dg


@dg.asset
async def fetch():
    return await download()
"#;

fn pipeline_roundtrip(converter: &Converter, pipeline: &str) -> String {
    let notebook = converter
        .pipeline_to_notebook(pipeline)
        .expect("pipeline → notebook failed")
        .source;
    converter
        .notebook_to_pipeline(&notebook)
        .expect("notebook → pipeline failed")
        .source
}

#[test]
fn test_pipeline_roundtrip_is_idempotent() {
    let converter = Converter::default();
    for fixture in [DOCSTRING_WITH_IMPORT, LEADING_LOG_CALL, MULTI_ASSET, ASYNC_ASSET] {
        let once = pipeline_roundtrip(&converter, fixture);
        let twice = pipeline_roundtrip(&converter, &once);
        assert_eq!(twice, once, "fixture:\n{fixture}");
    }
}

#[test]
fn test_hoisted_import_keeps_body_flush() {
    let converter = Converter::default();
    let pipeline = pipeline_roundtrip(&converter, DOCSTRING_WITH_IMPORT);
    assert!(pipeline.contains("\nimport json\n"));
    assert!(pipeline.contains(
        "def payload():\n    \"\"\"Encoded payload.\"\"\"\n    payload = json.dumps({\"a\": 1})\n"
    ));

    let pipeline = pipeline_roundtrip(&converter, LEADING_LOG_CALL);
    assert!(pipeline.contains("def orders():\n    orders = [1, 2, 3]\n    return orders\n"));
}

#[test]
fn test_async_asset_roundtrip() {
    let conversion = dagster_to_marimo(ASYNC_ASSET).expect("conversion failed");
    assert!(conversion.source.contains(
        "@app.cell\nasync def _():\n    fetch = await download()\n    return (fetch,)\n"
    ));
    let pipeline = marimo_to_dagster(&conversion.source).expect("conversion failed").source;
    assert!(pipeline.contains("@dg.asset\nasync def fetch():\n    fetch = await download()\n    return fetch\n"));
}

#[test]
fn test_renamed_asset_resolves_downstream() {
    let pipeline = r#"import dagster as dg


@dg.asset(name="raw")
def load():
    return [1, 2]


@dg.asset(key=["warehouse", "cleaned"])
def clean(raw):
    return [n for n in raw if n]


@dg.asset
def c(raw, cleaned):
    return raw + cleaned
"#;
    let conversion = dagster_to_marimo(pipeline).expect("conversion failed");
    assert!(conversion.warnings.is_empty(), "{:?}", conversion.warnings);
    let source = &conversion.source;
    assert!(source.contains("def _():\n    raw = [1, 2]\n    return (raw,)\n"));
    assert!(source.contains("def _(raw):\n    cleaned = [n for n in raw if n]\n    return (cleaned,)\n"));
    assert!(source.contains("    c = raw + cleaned\n"));
    assert!(!source.contains("name="));
    assert!(!source.contains("key="));
}

#[test]
fn test_invalid_syntax_is_a_parse_error() {
    for source in ["x = = 1", "x = 1 +", "x = (1,, 2)", "x = 1 2", "for in y: pass"] {
        assert!(
            matches!(marimo_to_dagster(source), Err(Error::Parse { line: 1, .. })),
            "source: {source}"
        );
    }
    assert!(matches!(dagster_to_marimo("x = = 1"), Err(Error::Parse { line: 1, .. })));

    let broken_cell = "@app.cell\ndef _():\n    x = = 1\n    return (x,)\n";
    assert!(matches!(marimo_to_dagster(broken_cell), Err(Error::Parse { line: 3, .. })));
}

#[test]
fn test_handwritten_pipeline_stabilizes() {
    let converter = Converter::default();
    let notebook = converter.pipeline_to_notebook(handwritten_pipeline()).unwrap().source;
    let pipeline = converter.notebook_to_pipeline(&notebook).unwrap().source;
    let notebook_again = converter.pipeline_to_notebook(&pipeline).unwrap().source;
    let pipeline_again = converter.notebook_to_pipeline(&notebook_again).unwrap().source;
    assert_eq!(pipeline_again, pipeline);
}

#[test]
fn test_query_call_roundtrip() {
    let notebook = r#"@app.cell
def _(mo):
    one = mo.sql("select 1")
    return (one,)
"#;
    let pipeline = marimo_to_dagster(notebook).unwrap().source;
    assert!(pipeline.contains("    one = duckdb.sql(\"select 1\")\n"));
    assert!(pipeline.contains("\nimport duckdb\n"));

    let back = dagster_to_marimo(&pipeline).unwrap().source;
    assert!(back.contains("def _(mo):\n    one = mo.sql(\"select 1\")\n    return (one,)\n"));
    assert!(!back.contains("duckdb"));
}

#[test]
fn test_custom_config() {
    let config: ConversionConfig =
        serde_json::from_str(r#"{"emit_definitions": false}"#).expect("valid config");
    let converter = Converter::new(config);
    let conversion = converter.notebook_to_pipeline(orders_notebook()).unwrap();
    assert!(!conversion.source.contains("Definitions"));
}
