pub mod compiler;
pub mod context;
pub mod examples;

use crate::{
    config::AppConfig,
    error::{Result, ServiceError},
    explain::{self, FilterExplanation},
    filter::FilterMap,
    keywords::{KeywordExtractor, StopwordExtractor},
    parser::{self, templates, ParseResult},
    validation::{self, QueryDebugInfo},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use self::context::{apply_context, merge_context, FilterContext};

/// Entry point shared by the service handlers. Holds no mutable state.
#[derive(Clone)]
pub struct FilterEngine {
    config: Arc<AppConfig>,
    extractor: Arc<dyn KeywordExtractor>,
}

impl FilterEngine {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self::with_extractor(config, Arc::new(StopwordExtractor))
    }

    pub fn with_extractor(config: Arc<AppConfig>, extractor: Arc<dyn KeywordExtractor>) -> Self {
        Self { config, extractor }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn build_filter(
        &self,
        text: &str,
        table: &str,
        context: Option<&FilterContext>,
    ) -> ParseResult {
        compose(text, table, context, self.extractor.as_ref()).result
    }

    pub fn translate(&self, request: BuildFilterRequest) -> Result<BuildFilterResponse> {
        let table = resolve_table(&self.config, request.table.as_deref())?;
        let built = compose(
            &request.query,
            &table,
            request.context.as_ref(),
            self.extractor.as_ref(),
        );
        let explanation = explain::explain(&built.result.filters, &table);

        Ok(BuildFilterResponse {
            query: compiler::compile_raw(&built.result.filters),
            encoded_query: compiler::compile(&built.result.filters),
            filter_explanation: explanation.explanation,
            sql_equivalent: explanation.sql_equivalent,
            estimated_size: explanation.estimated_size.to_string(),
            table,
            filters: built.result.filters,
            confidence: built.result.confidence,
            explanation: built.result.explanation,
            suggestions: built.result.suggestions,
            template_used: built.result.template_used,
            filters_from_nl: built.from_text,
            filters_from_context: built.from_context,
        })
    }

    pub fn explain(&self, request: ExplainRequest) -> Result<ExplainResponse> {
        let table = resolve_table(&self.config, request.table.as_deref())?;
        let compiled = compiler::compile_raw(&request.filters);
        let analysis = validation::debug_query_construction(&compiled, Some(&request.filters));
        let result_review = request.result_count.map(|count| {
            let check = validation::validate_result_count(&table, &request.filters, count);
            let mut suggestions = check.suggestions;
            suggestions.extend(validation::suggest_query_improvements(&request.filters, count));
            ResultReview {
                count,
                warnings: check.warnings,
                suggestions,
            }
        });

        Ok(ExplainResponse {
            explanation: explain::explain(&request.filters, &table),
            encoded_query: compiler::encode_query(&compiled),
            compiled_query: compiled,
            table,
            analysis,
            result_review,
        })
    }

    pub fn debug(&self, request: DebugRequest) -> QueryDebugInfo {
        validation::debug_query_construction(&request.query, request.filters.as_ref())
    }
}

struct Composed {
    result: ParseResult,
    from_text: FilterMap,
    from_context: FilterMap,
}

fn compose(
    text: &str,
    table: &str,
    context: Option<&FilterContext>,
    extractor: &dyn KeywordExtractor,
) -> Composed {
    let mut result = parser::parse_natural_language(text, table, extractor);
    let from_text = result.filters.clone();
    let mut from_context = FilterMap::new();

    if let Some(context) = context {
        let parsed_nothing = result.filters.is_empty();
        let contributed = apply_context(context, table);
        let added = merge_context(&mut result.filters, &contributed);
        debug!(table, added = added.len(), "context merged");

        for key in &added {
            if let Some(value) = contributed.get(key) {
                from_context.insert(key.as_str(), value);
            }
        }
        if parsed_nothing && !added.is_empty() {
            result.explanation = format!("Applied context filters: {}", added.join(", "));
        }
    }

    Composed {
        result,
        from_text,
        from_context,
    }
}

/// Parses `text` into filters for `table` and merges `context` on top.
/// Context never overwrites a key produced by the parse.
pub fn build_filter(text: &str, table: &str, context: Option<&FilterContext>) -> ParseResult {
    compose(text, table, context, &StopwordExtractor).result
}

pub fn explain_filter(filters: &FilterMap, table: &str) -> FilterExplanation {
    explain::explain(filters, table)
}

/// Fresh copies of the template filters keyed by template name.
pub fn get_templates() -> IndexMap<String, FilterMap> {
    templates::get_templates()
}

pub fn template_catalogue() -> Vec<TemplateEntry> {
    templates::catalogue()
        .iter()
        .map(|template| TemplateEntry {
            name: template.name.to_string(),
            description: template.description.to_string(),
            use_case: template.use_case.to_string(),
            filters: template.filters(),
        })
        .collect()
}

fn resolve_table(config: &AppConfig, candidate: Option<&str>) -> Result<String> {
    let Some(candidate) = candidate else {
        return check_table(config, &config.default_table).map_err(|err| {
            ServiceError::Config(format!("default table rejected: {err}"))
        });
    };
    check_table(config, candidate.trim())
}

fn check_table(config: &AppConfig, table: &str) -> Result<String> {
    if table.is_empty() {
        return Err(ServiceError::InvalidRequest("table must not be empty".into()));
    }
    if !table
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
    {
        return Err(ServiceError::InvalidRequest(format!(
            "invalid table name '{table}'"
        )));
    }
    if !config.table_allowed(table) {
        return Err(ServiceError::InvalidRequest(format!(
            "table '{table}' is not enabled"
        )));
    }

    Ok(table.to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildFilterRequest {
    pub query: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub context: Option<FilterContext>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildFilterResponse {
    pub table: String,
    pub filters: FilterMap,
    pub confidence: f64,
    pub explanation: String,
    pub suggestions: Vec<String>,
    pub template_used: Option<String>,
    pub filters_from_nl: FilterMap,
    pub filters_from_context: FilterMap,
    pub query: String,
    pub encoded_query: String,
    pub filter_explanation: String,
    pub sql_equivalent: String,
    pub estimated_size: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplainRequest {
    pub filters: FilterMap,
    #[serde(default)]
    pub table: Option<String>,
    /// Row count the caller got back for these filters, if it already ran them.
    #[serde(default)]
    pub result_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplainResponse {
    pub table: String,
    #[serde(flatten)]
    pub explanation: FilterExplanation,
    pub compiled_query: String,
    pub encoded_query: String,
    pub analysis: QueryDebugInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_review: Option<ResultReview>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultReview {
    pub count: usize,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebugRequest {
    pub query: String,
    #[serde(default)]
    pub filters: Option<FilterMap>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateEntry {
    pub name: String,
    pub description: String,
    pub use_case: String,
    pub filters: FilterMap,
}
