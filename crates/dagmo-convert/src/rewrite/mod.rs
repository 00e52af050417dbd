//! Body rewriting.
//!
//! Rewrites work on statement text with minimal splices, so everything a
//! rule does not touch is emitted exactly as written.

pub(crate) mod notebook;
pub(crate) mod pipeline;

use std::ops::Range;

use dagmo_core::pattern::{self, QueryArg, QueryCall, StatementShape};
use dagmo_core::python::{Statement, StatementKind, has_own_return};
use dagmo_core::{
    ArgRole, Construct, ConversionConfig, DecoratorArg, Diagnostics, ParamRole, Result, Unit,
};
use tracing::trace;

/// Substitution of the embedded-query call in one direction.
pub(crate) struct QueryRewrite<'a> {
    object: &'a str,
    function: &'a str,
    callee: String,
    /// Connection keyword in the source and target call.
    keyword: (&'a str, &'a str),
    /// Keywords removed without a warning.
    dropped: &'a [String],
    /// Keywords known to have no counterpart in the target call.
    foreign: &'a [String],
    target: &'static str,
}

impl<'a> QueryRewrite<'a> {
    pub(crate) fn to_pipeline(config: &'a ConversionConfig) -> Self {
        let query = &config.query;
        Self {
            object: &config.notebook.alias,
            function: &query.notebook_function,
            callee: format!("{}.{}", query.pipeline_module, query.pipeline_function),
            keyword: (&query.notebook_engine_arg, &query.pipeline_connection_arg),
            dropped: &query.notebook_only_args,
            foreign: &[],
            target: "pipeline",
        }
    }

    pub(crate) fn to_notebook(config: &'a ConversionConfig) -> Self {
        let query = &config.query;
        Self {
            object: &query.pipeline_module,
            function: &query.pipeline_function,
            callee: format!("{}.{}", config.notebook.alias, query.notebook_function),
            keyword: (&query.pipeline_connection_arg, &query.notebook_engine_arg),
            dropped: &[],
            foreign: &query.pipeline_only_args,
            target: "notebook",
        }
    }

    /// Rewrite every direct call in the unit body and return how many were
    /// rewritten. Indirect uses are left alone and reported.
    pub(crate) fn apply(&self, unit: &mut Unit, diagnostics: &mut Diagnostics) -> Result<usize> {
        let mut rewritten = 0;
        for statement in &mut unit.body {
            let calls = pattern::query_calls(&statement.text, self.object, self.function);
            if calls.is_empty() {
                continue;
            }
            let mut edits: Vec<(Range<usize>, String)> = Vec::new();
            for call in calls {
                match call {
                    QueryCall::Call(site) => {
                        edits.push((site.callee.clone(), self.callee.clone()));
                        self.argument_edits(&site.args, &unit.name, &mut edits, diagnostics);
                        rewritten += 1;
                    }
                    QueryCall::Opaque { line } => diagnostics.push(
                        unit.name.as_str(),
                        Construct::QueryArgument,
                        format!(
                            "`{}.{}` on statement line {line} is not called directly and was kept",
                            self.object, self.function
                        ),
                    ),
                }
            }
            if edits.is_empty() {
                continue;
            }
            let text = splice(&statement.text, edits);
            let leading = std::mem::take(&mut statement.leading);
            *statement = Statement::parse(text)?;
            statement.leading = leading;
        }
        if rewritten > 0 {
            trace!("Rewrote {} query calls in {}", rewritten, unit.name);
        }
        Ok(rewritten)
    }

    fn argument_edits(
        &self,
        args: &[QueryArg],
        unit: &str,
        edits: &mut Vec<(Range<usize>, String)>,
        diagnostics: &mut Diagnostics,
    ) {
        let removed: Vec<bool> = args
            .iter()
            .map(|a| a.keyword.as_ref().is_some_and(|k| self.dropped.contains(k)))
            .collect();

        let mut i = 0;
        while i < args.len() {
            if !removed[i] {
                let arg = &args[i];
                match (&arg.keyword, &arg.keyword_span) {
                    (Some(keyword), Some(span)) if keyword == self.keyword.0 => {
                        edits.push((span.clone(), self.keyword.1.to_string()));
                    }
                    (Some(keyword), _) => {
                        let why = if self.foreign.contains(keyword) {
                            format!("has no {} counterpart", self.target)
                        } else {
                            "is not a recognized query keyword".to_string()
                        };
                        diagnostics.push(
                            unit,
                            Construct::QueryArgument,
                            format!("`{keyword}=` of the query call {why} and was kept"),
                        );
                    }
                    (None, _) => {}
                }
                i += 1;
                continue;
            }

            // Remove a run of dropped arguments together with one separator.
            let first = i;
            while i < args.len() && removed[i] {
                i += 1;
            }
            let range = if i < args.len() {
                args[first].span.start..args[i].span.start
            } else if first > 0 {
                args[first - 1].span.end..args[i - 1].span.end
            } else {
                args[first].span.start..args[i - 1].span.end
            };
            edits.push((range, String::new()));
        }
    }
}

/// Apply non-overlapping replacements to `text`.
fn splice(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
    let mut out = text.to_string();
    for (range, replacement) in edits {
        out.replace_range(range, &replacement);
    }
    out
}

/// Remove the context parameter and its pure reporting statements.
///
/// Any remaining reference to the context is kept and reported once.
pub(crate) fn strip_context(unit: &mut Unit, config: &ConversionConfig, diagnostics: &mut Diagnostics) {
    let contexts: Vec<String> = unit.params_with(ParamRole::Context).map(str::to_string).collect();
    if contexts.is_empty() {
        return;
    }
    unit.params.retain(|p| p.role != ParamRole::Context);

    let mut body: Vec<Statement> = Vec::with_capacity(unit.body.len());
    let mut carried: Vec<String> = Vec::new();
    for mut statement in std::mem::take(&mut unit.body) {
        let report = contexts
            .iter()
            .any(|c| StatementShape::of(&statement, c, &config.pipeline) == StatementShape::ContextReport);
        if report {
            // Keep the comments and spacing above a removed report.
            carried.append(&mut statement.leading);
            continue;
        }
        if !carried.is_empty() {
            carried.append(&mut statement.leading);
            statement.leading = std::mem::take(&mut carried);
        }
        body.push(statement);
    }
    unit.body = body;

    let text = unit.body_text();
    if let Some(context) = contexts.iter().find(|c| pattern::references(&text, c)) {
        diagnostics.push(
            unit.name.as_str(),
            Construct::ContextUsage,
            format!("`{context}` is still used after removing its parameter"),
        );
    }
}

/// Decorator arguments carried into the target form.
///
/// Recognized keys are copied, editor-only and structural ones dropped,
/// unknown keys kept with one warning each and positional ones dropped
/// with a warning.
pub(crate) fn carry_decorator_args(unit: &Unit, diagnostics: &mut Diagnostics) -> Vec<DecoratorArg> {
    let mut carried = Vec::new();
    for arg in &unit.decorator_args {
        match (arg.role, &arg.key) {
            (ArgRole::Recognized, _) => carried.push(arg.clone()),
            (ArgRole::FrameworkOnly | ArgRole::Structural, _) => {}
            (ArgRole::Unrecognized, Some(key)) => {
                diagnostics.push(
                    unit.name.as_str(),
                    Construct::DecoratorArgument,
                    format!("decorator argument `{key}` is not recognized and was kept as is"),
                );
                carried.push(arg.clone());
            }
            (ArgRole::Unrecognized, None) => diagnostics.push(
                unit.name.as_str(),
                Construct::PositionalDecoratorArgument,
                format!("positional decorator argument `{}` was dropped", arg.value),
            ),
        }
    }
    carried
}

/// Report `return` statements that end the unit early.
///
/// `statements` are the body statements to check; a trailing return the
/// caller translates itself must not be included.
pub(crate) fn flag_early_returns(unit: &str, statements: &[Statement], diagnostics: &mut Diagnostics) {
    let early = statements
        .iter()
        .any(|s| s.is_return() || (s.kind == StatementKind::Other && has_own_return(&s.text)));
    if early {
        diagnostics.push(
            unit,
            Construct::EarlyReturn,
            "a `return` before the end of the body changes what the unit produces",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagmo_core::UnitParam;

    fn unit_with(body: &[&str]) -> Unit {
        Unit {
            name: "report".to_string(),
            body: body.iter().map(|s| Statement::parse(*s).unwrap()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_to_pipeline() {
        let config = ConversionConfig::default();
        let mut unit = unit_with(&["df = mo.sql(f\"select * from t\", output=False, engine=con)"]);
        let mut diagnostics = Diagnostics::new();
        let count = QueryRewrite::to_pipeline(&config)
            .apply(&mut unit, &mut diagnostics)
            .unwrap();
        assert_eq!(count, 1);
        assert!(diagnostics.is_empty());
        assert_eq!(
            unit.body[0].text,
            "df = duckdb.sql(f\"select * from t\", connection=con)"
        );
    }

    #[test]
    fn test_query_drops_trailing_argument() {
        let config = ConversionConfig::default();
        let mut unit = unit_with(&["mo.sql(\"select 1\", output=False)"]);
        let mut diagnostics = Diagnostics::new();
        QueryRewrite::to_pipeline(&config)
            .apply(&mut unit, &mut diagnostics)
            .unwrap();
        assert_eq!(unit.body[0].text, "duckdb.sql(\"select 1\")");
    }

    #[test]
    fn test_query_to_notebook_flags_foreign_keywords() {
        let config = ConversionConfig::default();
        let mut unit = unit_with(&["return duckdb.sql(q, connection=con, params=[1])"]);
        let mut diagnostics = Diagnostics::new();
        QueryRewrite::to_notebook(&config)
            .apply(&mut unit, &mut diagnostics)
            .unwrap();
        assert_eq!(unit.body[0].text, "return mo.sql(q, engine=con, params=[1])");
        assert_eq!(
            unit.body[0].kind,
            StatementKind::Return(Some("mo.sql(q, engine=con, params=[1])".to_string()))
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.warnings()[0].message.contains("no notebook counterpart"));
    }

    #[test]
    fn test_indirect_query_is_flagged() {
        let config = ConversionConfig::default();
        let mut unit = unit_with(&["run = mo.sql"]);
        let mut diagnostics = Diagnostics::new();
        let count = QueryRewrite::to_pipeline(&config)
            .apply(&mut unit, &mut diagnostics)
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(unit.body[0].text, "run = mo.sql");
        assert_eq!(diagnostics.warnings()[0].construct, Construct::QueryArgument);
    }

    #[test]
    fn test_strip_context() {
        let config = ConversionConfig::default();
        let mut unit = unit_with(&[
            "context.log.info(\"start\")",
            "x = 1",
            "context.add_output_metadata({\"n\": x})",
        ]);
        unit.body[0].leading = vec!["# announce".to_string()];
        unit.params = vec![
            UnitParam {
                name: "context".to_string(),
                role: ParamRole::Context,
            },
            UnitParam::data("raw"),
        ];
        let mut diagnostics = Diagnostics::new();
        strip_context(&mut unit, &config, &mut diagnostics);

        assert!(diagnostics.is_empty());
        assert_eq!(unit.params, vec![UnitParam::data("raw")]);
        assert_eq!(unit.body.len(), 1);
        assert_eq!(unit.body[0].text, "x = 1");
        assert_eq!(unit.body[0].leading, vec!["# announce"]);
    }

    #[test]
    fn test_strip_context_flags_other_uses() {
        let config = ConversionConfig::default();
        let mut unit = unit_with(&["run_id = context.run_id"]);
        unit.params = vec![UnitParam {
            name: "context".to_string(),
            role: ParamRole::Context,
        }];
        let mut diagnostics = Diagnostics::new();
        strip_context(&mut unit, &config, &mut diagnostics);
        assert_eq!(unit.body.len(), 1);
        assert_eq!(diagnostics.warnings()[0].construct, Construct::ContextUsage);
    }

    #[test]
    fn test_carry_decorator_args() {
        let mut unit = unit_with(&[]);
        unit.decorator_args = vec![
            DecoratorArg {
                key: Some("group_name".to_string()),
                value: "\"raw\"".to_string(),
                role: ArgRole::Recognized,
            },
            DecoratorArg {
                key: Some("hide_code".to_string()),
                value: "True".to_string(),
                role: ArgRole::FrameworkOnly,
            },
            DecoratorArg {
                key: Some("retries".to_string()),
                value: "3".to_string(),
                role: ArgRole::Unrecognized,
            },
            DecoratorArg {
                key: None,
                value: "fn".to_string(),
                role: ArgRole::Unrecognized,
            },
        ];
        let mut diagnostics = Diagnostics::new();
        let carried = carry_decorator_args(&unit, &mut diagnostics);
        let rendered: Vec<_> = carried.iter().map(DecoratorArg::render).collect();
        assert_eq!(rendered, vec!["group_name=\"raw\"", "retries=3"]);
        let constructs: Vec<_> = diagnostics.warnings().iter().map(|w| w.construct).collect();
        assert_eq!(
            constructs,
            vec![Construct::DecoratorArgument, Construct::PositionalDecoratorArgument]
        );
    }

    #[test]
    fn test_early_returns() {
        let unit = unit_with(&[
            "if df.empty:\n    return None",
            "def helper():\n    return 1",
            "x = 1",
        ]);
        let mut diagnostics = Diagnostics::new();
        flag_early_returns("u", &unit.body[1..], &mut diagnostics);
        assert!(diagnostics.is_empty());
        flag_early_returns("u", &unit.body, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
    }
}
