//! Intent-driven workflow: classify, dispatch tool calls, normalize.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use futures::future::join_all;
use moviehub_common::{Error, Movie, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::intent::{Intent, IntentClassifier, IntentType, RuleIntentClassifier};
use super::normalize::{aggregate_search_results, ProviderTag, SearchBag};
use super::strategy::{genre_keyword, select_strategy, DirectorExtractor, PatternDirectorExtractor, SearchStrategy};
use super::trace::{ExecutionStep, ExecutionTrace};
use crate::config::OrchestratorConfig;
use crate::metadata::providers::{omdb, tmdb};
use crate::tools::local::WatchlistResult;
use crate::tools::ToolGateway;

const TMDB_SEARCH: &str = "tmdb-provider.search_movies";
const TMDB_DETAILS: &str = "tmdb-provider.get_movie_details";
const TMDB_POPULAR: &str = "tmdb-provider.get_popular_movies";
const TMDB_DISCOVER: &str = "tmdb-provider.discover_movies";
const TMDB_DIRECTOR: &str = "tmdb-provider.search_movies_by_director";
const OMDB_SEARCH: &str = "omdb-provider.search_movies";
const OMDB_DETAILS: &str = "omdb-provider.get_movie_by_id";
const TVMAZE_SEARCH: &str = "tvmaze-provider.search_shows";
const USER_WATCHLIST: &str = "user-service.get_watchlist";

const CLASSIFIER_CONTEXT: &str = "movie_search";

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// Body of `POST /execute`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// What a branch produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowResult {
    SearchResults {
        results: Vec<Movie>,
        sources: Vec<String>,
    },
    MovieDetails {
        movie: Movie,
        #[serde(rename = "searchQuery")]
        search_query: String,
    },
    ComparisonResults {
        results: Vec<Movie>,
        sources: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Recommendations {
        recommendations: Vec<Movie>,
        #[serde(rename = "basedOn")]
        based_on: String,
        #[serde(rename = "userHistory")]
        user_history: bool,
    },
}

/// Outcome of one execution. Failures are reported here, never raised.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<WorkflowResult>,
    pub execution_trace: Vec<ExecutionStep>,
    pub total_duration: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct SearchOutcome {
    results: Vec<Movie>,
    sources: Vec<String>,
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Comparison title extraction
// ---------------------------------------------------------------------------

static COMPARE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:please\s+)?(?:compare|对比一下|对比|比较一下|比较)\s*")
        .expect("compare prefix pattern is valid")
});

static STRONG_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:vs\.?|versus)\s+|\s*(?:和|与|跟|,|，|、)\s*")
        .expect("compare separator pattern is valid")
});

static WEAK_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:and|with)\s+").expect("compare separator pattern is valid")
});

fn split_titles(body: &str, separator: &Regex) -> Vec<String> {
    let mut seen = HashSet::new();
    let titles: Vec<String> = separator
        .split(body)
        .map(|t| {
            t.trim_matches(|c: char| {
                c.is_whitespace() || matches!(c, '"' | '\'' | '“' | '”' | '《' | '》' | '?' | '？')
            })
            .to_string()
        })
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .take(2)
        .collect();
    if titles.len() == 2 {
        titles
    } else {
        Vec::new()
    }
}

/// Best-effort "A vs B" split. Returns no titles when the query does not
/// look like a comparison of two named movies. "and" only separates titles
/// when no stronger separator is present.
pub fn extract_compare_titles(query: &str) -> Vec<String> {
    let body = COMPARE_PREFIX.replace(query, "");
    let titles = split_titles(&body, &STRONG_SEPARATOR);
    if titles.is_empty() {
        split_titles(&body, &WEAK_SEPARATOR)
    } else {
        titles
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs one workflow per call. Holds no per-execution state.
pub struct WorkflowOrchestrator {
    gateway: Arc<dyn ToolGateway>,
    classifier: Option<Arc<dyn IntentClassifier>>,
    rules: RuleIntentClassifier,
    directors: Arc<dyn DirectorExtractor>,
    intent_timeout: Duration,
    tool_timeout: Duration,
    recommendation_count: usize,
}

impl WorkflowOrchestrator {
    pub fn new(gateway: Arc<dyn ToolGateway>, config: &OrchestratorConfig) -> Self {
        Self {
            gateway,
            classifier: None,
            rules: RuleIntentClassifier,
            directors: Arc::new(PatternDirectorExtractor::default()),
            intent_timeout: Duration::from_secs(config.intent_timeout_secs.max(1)),
            tool_timeout: Duration::from_secs(config.tool_timeout_secs.max(1)),
            recommendation_count: config.recommendation_count.max(1),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_director_extractor(mut self, directors: Arc<dyn DirectorExtractor>) -> Self {
        self.directors = directors;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn gateway(&self) -> &Arc<dyn ToolGateway> {
        &self.gateway
    }

    /// Run the full workflow for `query`.
    pub async fn execute(&self, query: &str, user_id: Option<&str>) -> WorkflowResponse {
        let mut trace = ExecutionTrace::new();
        info!(query, "Executing workflow");

        let intent = self.analyze_intent(query, &mut trace).await;
        let outcome = match intent.kind {
            IntentType::SearchMovies => self.search_workflow(query, &intent, &mut trace).await,
            IntentType::GetMovieDetails => self.details_workflow(query, &intent, &mut trace).await,
            IntentType::CompareMovies => self.compare_workflow(query, &intent, &mut trace).await,
            IntentType::RecommendMovies => {
                self.recommend_workflow(query, user_id, &intent, &mut trace).await
            }
        };

        let total_duration = trace.elapsed_ms();
        match outcome {
            Ok(result) => WorkflowResponse {
                query: query.to_string(),
                intent: Some(intent),
                result: Some(result),
                execution_trace: trace.into_steps(),
                total_duration,
                success: true,
                error: None,
            },
            Err(e) => {
                error!(query, error = %e, "Workflow execution failed");
                WorkflowResponse {
                    query: query.to_string(),
                    intent: Some(intent),
                    result: None,
                    execution_trace: trace.into_steps(),
                    total_duration,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Intent
    // ------------------------------------------------------------------

    /// Ask the classifier, falling back to rules on any failure.
    async fn analyze_intent(&self, query: &str, trace: &mut ExecutionTrace) -> Intent {
        let started = Instant::now();
        let input = json!({ "query": query });

        let classified = match &self.classifier {
            Some(classifier) => {
                let attempt = tokio::time::timeout(
                    self.intent_timeout,
                    classifier.classify(query, CLASSIFIER_CONTEXT),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(Error::upstream(
                        "llm",
                        format!("timed out after {}ms", self.intent_timeout.as_millis()),
                    ))
                });
                match attempt {
                    Ok(intent) => {
                        trace.record_success(
                            "ai_intent_analysis",
                            "llm_service",
                            input.clone(),
                            to_json(&intent),
                            started,
                        );
                        Some(intent)
                    }
                    Err(e) => {
                        warn!(error = %e, "LLM intent analysis failed, falling back to rules");
                        trace.record_failure("ai_intent_analysis", "llm_service", input.clone(), &e, started);
                        None
                    }
                }
            }
            None => None,
        };

        let source = if classified.is_some() { "llm" } else { "rules" };
        let intent = classified.unwrap_or_else(|| self.rules.classify_query(query));
        debug!(intent = ?intent.kind, confidence = intent.confidence, source, "Intent resolved");
        trace.record_success(
            "analyze_intent",
            "intent_analyzer",
            input,
            json!({ "intent": intent, "source": source }),
            started,
        );
        intent
    }

    // ------------------------------------------------------------------
    // Tool dispatch
    // ------------------------------------------------------------------

    async fn call_tool(&self, name: &str, args: Value) -> Result<Value> {
        match tokio::time::timeout(self.tool_timeout, self.gateway.call_tool(name, args)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::upstream(name, e)),
            Err(_) => Err(Error::upstream(
                name,
                format!("timed out after {}ms", self.tool_timeout.as_millis()),
            )),
        }
    }

    /// Call every tool concurrently and wait for all of them. Failed calls
    /// leave their slot empty.
    async fn fan_out(&self, calls: Vec<(ProviderTag, &'static str, Value)>) -> SearchBag {
        let pending = calls.into_iter().map(|(tag, tool, args)| async move {
            (tag, tool, self.call_tool(tool, args).await)
        });

        let mut bag = SearchBag::default();
        for (tag, tool, result) in join_all(pending).await {
            match result {
                Ok(value) => {
                    let slot = match tag {
                        ProviderTag::Tmdb => &mut bag.tmdb,
                        ProviderTag::Omdb => &mut bag.omdb,
                        ProviderTag::Tvmaze => &mut bag.tvmaze,
                    };
                    *slot = Some(value);
                }
                Err(e) => warn!(tool, error = %e, "Tool call failed, continuing without it"),
            }
        }
        bag
    }

    async fn search_sources(&self, strategy: &SearchStrategy) -> Result<SearchBag> {
        match strategy {
            SearchStrategy::DirectSearch { query } => Ok(self
                .fan_out(vec![
                    (ProviderTag::Tmdb, TMDB_SEARCH, json!({ "query": query })),
                    (ProviderTag::Omdb, OMDB_SEARCH, json!({ "query": query })),
                    (ProviderTag::Tvmaze, TVMAZE_SEARCH, json!({ "query": query })),
                ])
                .await),
            SearchStrategy::GenreSearch { genre, .. } => {
                let keyword = genre_keyword(*genre);
                Ok(self
                    .fan_out(vec![
                        (
                            ProviderTag::Tmdb,
                            TMDB_DISCOVER,
                            json!({ "genreId": genre, "sortBy": "popularity.desc", "page": 1 }),
                        ),
                        (
                            ProviderTag::Omdb,
                            OMDB_SEARCH,
                            json!({ "query": keyword, "type": "movie" }),
                        ),
                        (ProviderTag::Tvmaze, TVMAZE_SEARCH, json!({ "query": keyword })),
                    ])
                    .await)
            }
            SearchStrategy::PopularSearch => Ok(SearchBag {
                tmdb: Some(self.call_tool(TMDB_POPULAR, json!({ "page": 1 })).await?),
                ..Default::default()
            }),
            SearchStrategy::DirectorSearch { director_name } => Ok(SearchBag {
                tmdb: Some(
                    self.call_tool(TMDB_DIRECTOR, json!({ "director": director_name, "page": 1 }))
                        .await?,
                ),
                ..Default::default()
            }),
        }
    }

    // ------------------------------------------------------------------
    // Branches
    // ------------------------------------------------------------------

    async fn search_steps(
        &self,
        query: &str,
        intent: &Intent,
        trace: &mut ExecutionTrace,
    ) -> Result<SearchOutcome> {
        let started = Instant::now();
        let strategy = select_strategy(query, Some(intent), self.directors.as_ref());
        debug!(?strategy, "Search strategy selected");

        let bag = self.search_sources(&strategy).await?;
        let sources = bag.sources();
        trace.record_success(
            "search_sources",
            "multi_source_search",
            json!({ "query": query, "strategy": strategy }),
            to_json(&bag),
            started,
        );

        let aggregated_at = Instant::now();
        let results = aggregate_search_results(&bag);
        trace.record_success(
            "aggregate_results",
            "aggregation_service",
            json!({ "sources": sources }),
            json!({ "count": results.len() }),
            aggregated_at,
        );

        Ok(SearchOutcome { results, sources })
    }

    async fn search_workflow(
        &self,
        query: &str,
        intent: &Intent,
        trace: &mut ExecutionTrace,
    ) -> Result<WorkflowResult> {
        let started = Instant::now();
        let found = self
            .search_steps(query, intent, trace)
            .await
            .map_err(|e| {
                trace.record_failure("search_movies", "movie_search_workflow", json!({ "query": query }), &e, started);
                e
            })?;
        Ok(WorkflowResult::SearchResults {
            results: found.results,
            sources: found.sources,
        })
    }

    /// Full record for the best search hit, from the catalog when it knows
    /// the movie and from the ratings database otherwise.
    async fn fetch_details(&self, movie: &Movie) -> Result<(&'static str, Value, Movie)> {
        if let Some(id) = movie.external_ids.tmdb {
            let args = json!({ "movieId": id });
            let raw = self.call_tool(TMDB_DETAILS, args.clone()).await?;
            let details: tmdb::TmdbMovieDetails =
                serde_json::from_value(raw).map_err(|e| Error::malformed(TMDB_DETAILS, e))?;
            return Ok(("tmdb-provider", args, tmdb::movie_from_details(&details)));
        }
        if let Some(imdb) = &movie.external_ids.imdb {
            let args = json!({ "imdbId": imdb });
            let raw = self.call_tool(OMDB_DETAILS, args.clone()).await?;
            let details: omdb::OmdbMovieDetails =
                serde_json::from_value(raw).map_err(|e| Error::malformed(OMDB_DETAILS, e))?;
            return Ok(("omdb-provider", args, omdb::movie_from_details(&details)));
        }
        Err(Error::not_found("movie id", &movie.id))
    }

    async fn details_steps(
        &self,
        query: &str,
        intent: &Intent,
        trace: &mut ExecutionTrace,
    ) -> Result<WorkflowResult> {
        let found = self.search_steps(query, intent, trace).await?;
        let first = found
            .results
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("movie", query))?;

        let started = Instant::now();
        let (tool, args, movie) = self.fetch_details(&first).await?;
        trace.record_success("get_movie_details", tool, args, to_json(&movie), started);

        Ok(WorkflowResult::MovieDetails {
            movie,
            search_query: query.to_string(),
        })
    }

    async fn details_workflow(
        &self,
        query: &str,
        intent: &Intent,
        trace: &mut ExecutionTrace,
    ) -> Result<WorkflowResult> {
        let started = Instant::now();
        self.details_steps(query, intent, trace).await.map_err(|e| {
            trace.record_failure("get_movie_details", "movie_details_workflow", json!({ "query": query }), &e, started);
            e
        })
    }

    /// Catalog search for `title`, then full details of its first hit.
    async fn resolve_title(&self, title: &str) -> Result<Movie> {
        let raw = self.call_tool(TMDB_SEARCH, json!({ "query": title })).await?;
        let page: tmdb::TmdbPage =
            serde_json::from_value(raw).map_err(|e| Error::malformed(TMDB_SEARCH, e))?;
        let first = page
            .results
            .first()
            .ok_or_else(|| Error::not_found("movie", title))?;
        let raw = self
            .call_tool(TMDB_DETAILS, json!({ "movieId": first.id }))
            .await?;
        let details: tmdb::TmdbMovieDetails =
            serde_json::from_value(raw).map_err(|e| Error::malformed(TMDB_DETAILS, e))?;
        Ok(tmdb::movie_from_details(&details))
    }

    async fn compare_steps(
        &self,
        query: &str,
        intent: &Intent,
        trace: &mut ExecutionTrace,
    ) -> Result<WorkflowResult> {
        let started = Instant::now();
        let mut titles = extract_compare_titles(query);
        if titles.is_empty() {
            let found = self.search_steps(query, intent, trace).await?;
            if found.results.len() >= 2 {
                titles = found.results.iter().take(2).map(|m| m.title.clone()).collect();
            }
        }

        if titles.is_empty() {
            return Ok(WorkflowResult::ComparisonResults {
                results: Vec::new(),
                sources: Vec::new(),
                message: Some("No movies found to compare".to_string()),
            });
        }

        let resolved = join_all(titles.iter().map(|title| self.resolve_title(title))).await;
        let movies: Vec<Movie> = titles
            .iter()
            .zip(resolved)
            .filter_map(|(title, result)| match result {
                Ok(movie) => Some(movie),
                Err(e) => {
                    warn!(title = %title, error = %e, "Could not resolve movie for comparison");
                    None
                }
            })
            .collect();

        if movies.is_empty() {
            return Ok(WorkflowResult::ComparisonResults {
                results: Vec::new(),
                sources: Vec::new(),
                message: Some("No movie details found for comparison".to_string()),
            });
        }

        trace.record_success(
            "compare_movies",
            "movie_comparison",
            json!({ "movies": titles }),
            to_json(&movies),
            started,
        );
        Ok(WorkflowResult::ComparisonResults {
            results: movies,
            sources: vec!["tmdb".to_string()],
            message: None,
        })
    }

    async fn compare_workflow(
        &self,
        query: &str,
        intent: &Intent,
        trace: &mut ExecutionTrace,
    ) -> Result<WorkflowResult> {
        let started = Instant::now();
        self.compare_steps(query, intent, trace).await.map_err(|e| {
            trace.record_failure("compare_movies", "movie_comparison_workflow", json!({ "query": query }), &e, started);
            e
        })
    }

    /// Watched or listed movie ids for a user. Failures count as no history.
    async fn load_history(&self, user_id: &str) -> Vec<String> {
        let result = self
            .call_tool(USER_WATCHLIST, json!({ "userId": user_id }))
            .await
            .and_then(|raw| {
                serde_json::from_value::<WatchlistResult>(raw)
                    .map_err(|e| Error::malformed(USER_WATCHLIST, e))
            });
        match result {
            Ok(list) => list.movies.into_iter().map(|item| item.movie_id).collect(),
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load watch history");
                Vec::new()
            }
        }
    }

    async fn recommend_workflow(
        &self,
        query: &str,
        user_id: Option<&str>,
        intent: &Intent,
        trace: &mut ExecutionTrace,
    ) -> Result<WorkflowResult> {
        let started = Instant::now();
        let history = match user_id {
            Some(id) => self.load_history(id).await,
            None => Vec::new(),
        };

        let candidates = match self.search_steps(query, intent, trace).await {
            Ok(found) => found.results,
            Err(e) => {
                warn!(query, error = %e, "Recommendation search failed");
                trace.record_failure("recommend_movies", "recommendation_workflow", json!({ "query": query, "userId": user_id }), &e, started);
                Vec::new()
            }
        };

        let known: HashSet<&str> = history.iter().map(String::as_str).collect();
        let recommendations: Vec<Movie> = candidates
            .into_iter()
            .filter(|m| !known.contains(m.id.as_str()))
            .take(self.recommendation_count)
            .collect();

        trace.record_success(
            "generate_recommendations",
            "recommendation_engine",
            json!({ "query": query, "userHistory": history.len() }),
            json!({ "count": recommendations.len() }),
            started,
        );

        Ok(WorkflowResult::Recommendations {
            recommendations,
            based_on: query.to_string(),
            user_history: !history.is_empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::intent::{ExtractedEntities, StrategyHint, StrategyKind};
    use crate::tools::{ToolDescriptor, ToolError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Gateway double answering from a fixed table and recording calls.
    #[derive(Default)]
    struct StubGateway {
        replies: HashMap<&'static str, Value>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl StubGateway {
        fn with(mut self, tool: &'static str, reply: Value) -> Self {
            self.replies.insert(tool, reply);
            self
        }

        fn called(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(name, _)| name.clone()).collect()
        }
    }

    #[async_trait]
    impl ToolGateway for StubGateway {
        async fn call_tool(&self, qualified_name: &str, args: Value) -> std::result::Result<Value, ToolError> {
            self.calls.lock().push((qualified_name.to_string(), args));
            self.replies
                .get(qualified_name)
                .cloned()
                .ok_or_else(|| ToolError::failed(qualified_name, "unavailable"))
        }

        async fn list_tools(&self) -> std::result::Result<Vec<ToolDescriptor>, ToolError> {
            Ok(Vec::new())
        }
    }

    struct StubClassifier(Option<Intent>);

    #[async_trait]
    impl IntentClassifier for StubClassifier {
        async fn classify(&self, _query: &str, _context: &str) -> Result<Intent> {
            self.0
                .clone()
                .ok_or_else(|| Error::malformed("llm", "not json"))
        }
    }

    fn tmdb_page(movies: &[(u64, &str, &str)]) -> Value {
        json!({
            "page": 1,
            "results": movies.iter().map(|(id, title, date)| json!({
                "id": id, "title": title, "releaseDate": date, "voteAverage": 8.0, "voteCount": 100
            })).collect::<Vec<_>>()
        })
    }

    fn tmdb_details(id: u64, title: &str) -> Value {
        json!({
            "id": id, "title": title, "releaseDate": "2021-09-15", "runtime": 155,
            "voteAverage": 7.8, "voteCount": 9000, "genres": ["Science Fiction"],
            "imdbId": "tt1160419", "directors": ["Denis Villeneuve"], "cast": []
        })
    }

    fn omdb_page() -> Value {
        json!({"results": [{"title": "Dune", "year": "2021", "imdbId": "tt1160419"}], "totalResults": 1})
    }

    fn orchestrator(gateway: StubGateway) -> (WorkflowOrchestrator, Arc<StubGateway>) {
        let gateway = Arc::new(gateway);
        let orchestrator = WorkflowOrchestrator::new(gateway.clone(), &OrchestratorConfig::default());
        (orchestrator, gateway)
    }

    #[tokio::test]
    async fn search_tolerates_partial_failure() {
        let (workflow, gateway) = orchestrator(
            StubGateway::default()
                .with(TMDB_SEARCH, tmdb_page(&[(438631, "Dune", "2021-09-15")]))
                .with(OMDB_SEARCH, omdb_page()),
        );

        let response = workflow.execute("Dune", None).await;
        assert!(response.success);
        match response.result.unwrap() {
            WorkflowResult::SearchResults { results, sources } => {
                assert_eq!(sources, vec!["tmdb", "omdb"]);
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].id, "tmdb-438631");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(gateway.called().len(), 3);

        let steps: Vec<_> = response.execution_trace.iter().map(|s| s.step.as_str()).collect();
        assert_eq!(steps, vec!["analyze_intent", "search_sources", "aggregate_results"]);
    }

    #[tokio::test]
    async fn classifier_failure_falls_back_to_rules() {
        let (workflow, _) = orchestrator(StubGateway::default());
        let workflow = workflow.with_classifier(Arc::new(StubClassifier(None)));

        let response = workflow.execute("热门电影", None).await;
        let first = &response.execution_trace[0];
        assert_eq!(first.step, "ai_intent_analysis");
        assert!(!first.success);
        assert_eq!(response.intent.unwrap().kind, IntentType::SearchMovies);

        // Popular search is a single catalog call; its failure fails the run.
        assert!(!response.success);
        let last = response.execution_trace.last().unwrap();
        assert_eq!(last.step, "search_movies");
        assert_eq!(last.tool, "movie_search_workflow");
        assert!(!last.success);
    }

    #[tokio::test]
    async fn director_search_is_a_single_catalog_call() {
        let (workflow, gateway) = orchestrator(StubGateway::default().with(
            TMDB_DIRECTOR,
            tmdb_page(&[(438631, "Dune", "2021-09-15"), (329865, "Arrival", "2016-11-10")]),
        ));

        let response = workflow.execute("films directed by Denis Villeneuve", None).await;
        assert!(response.success, "{:?}", response.error);
        assert_eq!(gateway.called(), vec![TMDB_DIRECTOR]);

        let calls = gateway.calls.lock().clone();
        assert_eq!(calls[0].1["director"], "Denis Villeneuve");
        assert_eq!(calls[0].1["page"], 1);

        match response.result.unwrap() {
            WorkflowResult::SearchResults { results, sources } => {
                assert_eq!(sources, vec!["tmdb"]);
                assert_eq!(results.len(), 2);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn director_search_failure_fails_the_run() {
        let (workflow, gateway) = orchestrator(StubGateway::default());

        let response = workflow.execute("films directed by Denis Villeneuve", None).await;
        assert!(!response.success);
        assert!(response.error.is_some());
        assert_eq!(gateway.called(), vec![TMDB_DIRECTOR]);

        let last = response.execution_trace.last().unwrap();
        assert_eq!(last.step, "search_movies");
        assert!(!last.success);
        assert!(last.error.as_deref().unwrap().contains(TMDB_DIRECTOR));
    }

    #[tokio::test]
    async fn classifier_hint_drives_genre_search() {
        let mut intent = Intent::new(IntentType::SearchMovies, 0.95);
        intent.extracted_entities = Some(ExtractedEntities {
            genres: vec!["horror".into()],
            ..Default::default()
        });
        intent.search_strategy = Some(StrategyHint {
            kind: StrategyKind::GenreSearch,
            parameters: Value::Null,
        });

        let (workflow, gateway) = orchestrator(
            StubGateway::default().with(TMDB_DISCOVER, tmdb_page(&[(1, "Hereditary", "2018-06-07")])),
        );
        let workflow = workflow.with_classifier(Arc::new(StubClassifier(Some(intent))));

        let response = workflow.execute("scary stuff", None).await;
        assert!(response.success);

        let calls = gateway.calls.lock().clone();
        let discover = calls.iter().find(|(name, _)| name == TMDB_DISCOVER).unwrap();
        assert_eq!(discover.1["genreId"], 27);
        let omdb = calls.iter().find(|(name, _)| name == OMDB_SEARCH).unwrap();
        assert_eq!(omdb.1["query"], "horror");
    }

    #[tokio::test]
    async fn details_use_catalog_id_of_first_hit() {
        let (workflow, gateway) = orchestrator(
            StubGateway::default()
                .with(TMDB_SEARCH, tmdb_page(&[(438631, "Dune", "2021-09-15")]))
                .with(TMDB_DETAILS, tmdb_details(438631, "Dune")),
        );

        let response = workflow.execute("Dune details", None).await;
        assert!(response.success, "{:?}", response.error);
        match response.result.unwrap() {
            WorkflowResult::MovieDetails { movie, search_query } => {
                assert_eq!(movie.directors, vec!["Denis Villeneuve"]);
                assert_eq!(search_query, "Dune details");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(gateway.called().contains(&TMDB_DETAILS.to_string()));
    }

    #[tokio::test]
    async fn details_without_results_fail_gracefully() {
        let (workflow, _) = orchestrator(StubGateway::default());
        let response = workflow.execute("Nothing details", None).await;
        assert!(!response.success);
        assert!(response.error.is_some());
        let last = response.execution_trace.last().unwrap();
        assert_eq!(last.tool, "movie_details_workflow");
    }

    #[tokio::test]
    async fn compare_resolves_both_titles() {
        let gateway = StubGateway::default()
            .with(TMDB_SEARCH, tmdb_page(&[(438631, "Dune", "2021-09-15")]))
            .with(TMDB_DETAILS, tmdb_details(438631, "Dune"));
        let (workflow, _) = orchestrator(gateway);

        let response = workflow.execute("compare Dune vs Inception", None).await;
        assert!(response.success);
        match response.result.unwrap() {
            WorkflowResult::ComparisonResults { results, sources, message } => {
                assert_eq!(results.len(), 2);
                assert_eq!(sources, vec!["tmdb"]);
                assert!(message.is_none());
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn compare_with_nothing_found_is_still_success() {
        let (workflow, _) = orchestrator(StubGateway::default());
        let response = workflow.execute("compare A vs B", None).await;
        assert!(response.success);
        match response.result.unwrap() {
            WorkflowResult::ComparisonResults { results, message, .. } => {
                assert!(results.is_empty());
                assert_eq!(message.as_deref(), Some("No movie details found for comparison"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn recommendations_skip_watchlisted_and_survive_missing_history() {
        let page = tmdb_page(&[
            (1, "A", "2001-01-01"),
            (2, "B", "2002-01-01"),
            (3, "C", "2003-01-01"),
        ]);
        let gateway = StubGateway::default()
            .with(TMDB_POPULAR, page)
            .with(USER_WATCHLIST, json!({"movies": [{
                "id": "7f0b7d4e-4c1e-4a57-9a3a-0d1b2f9c8e11",
                "userId": "u1", "movieId": "tmdb-2", "status": "watched", "progress": 100,
                "addedAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"
            }]}));
        let (workflow, _) = orchestrator(gateway);

        let response = workflow.execute("recommend popular movies", Some("u1")).await;
        assert!(response.success, "{:?}", response.error);
        match response.result.unwrap() {
            WorkflowResult::Recommendations { recommendations, user_history, based_on } => {
                let ids: Vec<_> = recommendations.iter().map(|m| m.id.as_str()).collect();
                assert_eq!(ids, vec!["tmdb-1", "tmdb-3"]);
                assert!(user_history);
                assert_eq!(based_on, "recommend popular movies");
            }
            other => panic!("unexpected result {other:?}"),
        }

        let (workflow, _) = orchestrator(StubGateway::default());
        let response = workflow.execute("recommend something", Some("ghost")).await;
        assert!(response.success);
    }

    #[test]
    fn compare_title_heuristics() {
        assert_eq!(extract_compare_titles("compare Dune vs Inception"), vec!["Dune", "Inception"]);
        assert_eq!(extract_compare_titles("对比《沙丘》和《盗梦空间》"), vec!["沙丘", "盗梦空间"]);
        assert_eq!(extract_compare_titles("Heat and Ronin"), vec!["Heat", "Ronin"]);
        assert_eq!(
            extract_compare_titles("Pride and Prejudice vs Emma"),
            vec!["Pride and Prejudice", "Emma"]
        );
        assert!(extract_compare_titles("compare Dune").is_empty());
    }

    #[test]
    fn result_serializes_with_type_tag() {
        let value = serde_json::to_value(WorkflowResult::MovieDetails {
            movie: Movie::new("tmdb-1", "X"),
            search_query: "x".into(),
        })
        .unwrap();
        assert_eq!(value["type"], "movie_details");
        assert_eq!(value["searchQuery"], "x");
    }
}
