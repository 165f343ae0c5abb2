use crate::filter::RelevanceFilter;
use crate::record::ArticleRecord;
use crate::report::{RunAborted, RunReport, StageError};
use crate::structured::{StructuredExtractor, parse_record};
use cheatguard_common::{MalformedOutputPolicy, RunMode};
use cheatguard_llm::traits::LlmClient;
use cheatguard_mail::Notifier;
use cheatguard_web::{
    ContentExtractor, ExtractConfig, PageFetcher, QueryDispatcher, SearchProvider, SearchRequest,
};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MAIL_SUBJECT: &str = "CheatGuard digest";

/// The query a digest run searches for in the month of `date`.
///
/// ```
/// use chrono::NaiveDate;
/// use cheatguard_pipeline::digest_query;
///
/// let d = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
/// assert_eq!(
///     digest_query(d),
///     "Recent Papers about Cheating in Education and Academia in March 2025"
/// );
/// ```
pub fn digest_query(date: NaiveDate) -> String {
    format!(
        "Recent Papers about Cheating in Education and Academia in {}",
        date.format("%B %Y")
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub mode: RunMode,
    pub max_results: usize,
    pub include_sites: Vec<String>,
    pub exclude_sites: Vec<String>,
    pub extract: ExtractConfig,
    pub malformed_output: MalformedOutputPolicy,
    pub mail_subject: String,
}

impl PipelineConfig {
    pub fn for_mode(mode: RunMode) -> Self {
        Self {
            mode,
            max_results: cheatguard_web::search::DEFAULT_MAX_RESULTS,
            include_sites: Vec::new(),
            exclude_sites: Vec::new(),
            extract: ExtractConfig::for_mode(mode),
            malformed_output: MalformedOutputPolicy::default(),
            mail_subject: DEFAULT_MAIL_SUBJECT.into(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_mode(RunMode::default())
    }
}

/// Search, extract, filter, structure, and (in digest mode) mail.
///
/// URLs are processed one after another; every stage is awaited before the
/// next starts.
pub struct Pipeline {
    config: PipelineConfig,
    dispatcher: QueryDispatcher,
    extractor: ContentExtractor,
    filter: RelevanceFilter,
    structured: StructuredExtractor,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        llm: Arc<dyn LlmClient>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            dispatcher: QueryDispatcher::new(search),
            extractor: ContentExtractor::new(fetcher, config.extract.clone()),
            filter: RelevanceFilter::new(llm.clone(), config.mode),
            structured: StructuredExtractor::new(llm, config.mode),
            notifier,
            config,
        }
    }

    pub async fn run(&self, query: &str) -> Result<RunReport, RunAborted> {
        self.run_with(query, |_| {}).await
    }

    /// Like [`Pipeline::run`], handing each record to `on_record` as soon as
    /// it is accepted.
    pub async fn run_with<F>(&self, query: &str, mut on_record: F) -> Result<RunReport, RunAborted>
    where
        F: FnMut(&ArticleRecord),
    {
        let started = Instant::now();
        let request = SearchRequest::new(query)
            .with_max_results(self.config.max_results)
            .include(self.config.include_sites.iter().cloned())
            .exclude(self.config.exclude_sites.iter().cloned());

        let mut report = RunReport {
            query: request.rendered(),
            ..Default::default()
        };
        tracing::info!(
            target: "pipeline",
            mode = ?self.config.mode,
            query = %report.query,
            "pipeline.run.start"
        );

        report.urls = match self.dispatcher.dispatch_checked(&request).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!(target: "pipeline", error = %e, "search.dispatch.error");
                report.issues.push(StageError::Search(e.to_string()));
                Vec::new()
            }
        };

        for url in report.urls.clone() {
            match self.process_url(query, &url).await {
                Ok(Some(record)) => {
                    on_record(&record);
                    report.records.push(record);
                }
                Ok(None) => {}
                Err(issue) if self.is_fatal(&issue) => {
                    tracing::error!(target: "pipeline", %issue, "pipeline.run.aborted");
                    return Err(RunAborted {
                        partial: report,
                        cause: issue,
                    });
                }
                Err(issue @ StageError::EmptyFilterResult { .. }) => {
                    tracing::debug!(target: "pipeline", %issue, "pipeline.record.skipped");
                    report.issues.push(issue);
                }
                Err(issue) => {
                    tracing::warn!(target: "pipeline", %issue, "pipeline.record.skipped");
                    report.issues.push(issue);
                }
            }
        }

        if self.config.mode == RunMode::Digest {
            self.deliver(&mut report).await;
        }

        tracing::info!(
            target: "pipeline",
            urls = report.urls.len(),
            records = report.records.len(),
            issues = report.issues.len(),
            emailed = report.emailed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline.run.done"
        );
        Ok(report)
    }

    fn is_fatal(&self, issue: &StageError) -> bool {
        match issue {
            StageError::Model { .. } => true,
            StageError::MalformedStructuredOutput { .. } => {
                self.config.malformed_output == MalformedOutputPolicy::AbortRun
            }
            _ => false,
        }
    }

    async fn process_url(&self, query: &str, url: &str) -> Result<Option<ArticleRecord>, StageError> {
        let excerpt = self
            .extractor
            .try_extract(url)
            .await
            .map_err(|e| {
                tracing::warn!(target: "pipeline", url, error = %e, "extract.fetch.failed");
                StageError::Fetch {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            })?;
        if excerpt.is_empty() {
            return Err(StageError::Fetch {
                url: url.to_string(),
                message: "page had no extractable text".into(),
            });
        }

        let filtered = self
            .filter
            .filter(query, &excerpt)
            .await
            .map_err(|e| model_error(url, e))?
            .ok_or_else(|| StageError::EmptyFilterResult {
                url: url.to_string(),
            })?;

        let reply = self
            .structured
            .request(&filtered)
            .await
            .map_err(|e| model_error(url, e))?;

        let keep_url = self.config.mode.prefix_source_url();
        let record = parse_record(&reply, keep_url).map_err(|e| {
            tracing::debug!(target: "pipeline", url, reply = %reply, "structured.reply.rejected");
            StageError::MalformedStructuredOutput {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let Some(mut record) = record else {
            tracing::debug!(target: "pipeline", url, "structured.no_article");
            return Ok(None);
        };
        if keep_url && record.url.is_none() {
            record.url = Some(url.to_string());
        }
        Ok(Some(record))
    }

    async fn deliver(&self, report: &mut RunReport) {
        let Some(notifier) = &self.notifier else {
            tracing::debug!(target: "pipeline", "mail.skipped.no_notifier");
            return;
        };
        if report.records.is_empty() {
            tracing::info!(target: "pipeline", "mail.skipped.no_records");
            return;
        }

        let body = match digest_body(&report.records) {
            Ok(body) => body,
            Err(e) => {
                report.issues.push(StageError::EmailSend(e.to_string()));
                return;
            }
        };
        match notifier.send(&self.config.mail_subject, &body).await {
            Ok(()) => report.emailed = true,
            Err(e) => {
                tracing::warn!(target: "pipeline", error = %e, "mail.send.failed");
                report.issues.push(StageError::EmailSend(e.to_string()));
            }
        }
    }
}

/// Records rendered one after another, separated by a blank line.
pub fn digest_body(records: &[ArticleRecord]) -> Result<String, crate::record::RecordError> {
    let rendered = records
        .iter()
        .map(ArticleRecord::to_pretty_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join("\n\n"))
}

fn model_error(url: &str, e: cheatguard_common::CheatguardError) -> StageError {
    StageError::Model {
        url: url.to_string(),
        message: e.to_string(),
    }
}
