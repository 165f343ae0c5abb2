//! Turns loaded configuration into a ready [`Pipeline`].

use anyhow::{Context, Result, bail};
use cheatguard_common::RunMode;
use cheatguard_config::{CheatguardConfig, MailSection, SearchProviderKind, SearchSection};
use cheatguard_llm::ensure_llm_ready;
use cheatguard_mail::{GmailNotifier, Notifier, OAuthClient, OAuthEndpoints, TokenStore};
use cheatguard_pipeline::{Pipeline, PipelineConfig};
use cheatguard_web::brave::BraveSearch;
use cheatguard_web::{ExtractConfig, HttpPageFetcher, SearchProvider, StaticSearch};
use std::sync::Arc;
use std::time::Duration;

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_results: Option<usize>,
    pub include_sites: Vec<String>,
    pub exclude_sites: Vec<String>,
    pub no_email: bool,
}

pub fn pipeline_config(cfg: &CheatguardConfig, mode: RunMode, overrides: &Overrides) -> PipelineConfig {
    let mut extract = ExtractConfig::for_mode(mode);
    if let Some(max) = cfg.extract.max_chars {
        extract.max_chars = max;
    }
    extract.timeout = Duration::from_secs(cfg.extract.timeout_secs);
    extract.user_agent = cfg.extract.user_agent.clone();
    extract.deny_classes = cfg.extract.deny_classes.clone();

    let pick = |cli: &[String], file: &[String]| {
        if cli.is_empty() {
            file.to_vec()
        } else {
            cli.to_vec()
        }
    };

    PipelineConfig {
        mode,
        max_results: overrides.max_results.unwrap_or(cfg.search.max_results),
        include_sites: pick(&overrides.include_sites, &cfg.search.include_sites),
        exclude_sites: pick(&overrides.exclude_sites, &cfg.search.exclude_sites),
        extract,
        malformed_output: cfg.pipeline.malformed_output,
        mail_subject: cfg.mail.subject.clone(),
    }
}

pub fn search_provider(search: &SearchSection) -> Result<Arc<dyn SearchProvider>> {
    match search.provider {
        SearchProviderKind::Brave => {
            let Some(key) = search.api_key.clone().filter(|k| !k.trim().is_empty()) else {
                bail!("search.api_key is required for the brave provider (or set CHEATGUARD__SEARCH__API_KEY)");
            };
            Ok(Arc::new(BraveSearch::new(key)?))
        }
        SearchProviderKind::Static => {
            if search.urls.is_empty() {
                tracing::warn!(target: "app", "search.static.empty");
            }
            Ok(Arc::new(StaticSearch::new(search.urls.iter().cloned())))
        }
    }
}

/// `None` when mail is switched off or not fully configured.
pub fn notifier(mail: &MailSection, enabled: bool) -> Result<Option<Arc<dyn Notifier>>> {
    if !enabled {
        return Ok(None);
    }
    if !mail.is_complete() {
        tracing::warn!(target: "app", "mail.disabled.incomplete_config");
        return Ok(None);
    }
    let (Some(sender), Some(receiver), Some(client_id), Some(client_secret)) = (
        mail.sender.clone(),
        mail.receiver.clone(),
        mail.client_id.clone(),
        mail.client_secret.clone(),
    ) else {
        return Ok(None);
    };

    let oauth = OAuthClient::new(client_id, client_secret, OAuthEndpoints::default())?;
    let store = TokenStore::new(mail.resolved_token_path());
    let gmail: Arc<dyn Notifier> = Arc::new(GmailNotifier::new(oauth, store, sender, receiver)?);
    Ok(Some(gmail))
}

pub async fn build_pipeline(
    cfg: &CheatguardConfig,
    mode: RunMode,
    overrides: &Overrides,
) -> Result<Pipeline> {
    let config = pipeline_config(cfg, mode, overrides);
    let search = search_provider(&cfg.search)?;
    let fetcher = HttpPageFetcher::new(&config.extract.user_agent, config.extract.timeout)?;
    let llm_config = cfg.llm.to_llm_config()?;
    let llm = ensure_llm_ready(&llm_config)
        .await
        .context("language model is not ready")?;
    let notifier = notifier(&cfg.mail, mode == RunMode::Digest && !overrides.no_email)?;

    tracing::info!(
        target: "app",
        ?mode,
        search = search.name(),
        model = llm.model_name(),
        mail = notifier.is_some(),
        "app.pipeline.ready"
    );
    Ok(Pipeline::new(config, search, Arc::new(fetcher), llm, notifier))
}
