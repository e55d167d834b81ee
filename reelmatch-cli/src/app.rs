//! Command implementations wired from [`crate::config::Config`].

use std::sync::Arc;

use anyhow::{Context, bail};
use reelmatch_core::orchestration::TracingProgress;
use reelmatch_core::providers::ProviderSettings;
use reelmatch_core::{
    BatchOutcome, CandidateMatcher, CanonicalStore, EnrichOptions,
    EnrichmentOrchestrator, FailureLedger, JsonFileStorage, LedgerDocument,
    OmdbApiProvider, StoreDocument,
};
use reelmatch_model::MovieKey;
use tracing::info;

use crate::config::Config;

async fn open_store(config: &Config) -> anyhow::Result<CanonicalStore> {
    let path = &config.storage.store_path;
    CanonicalStore::load(Arc::new(JsonFileStorage::<StoreDocument>::new(path)))
        .await
        .with_context(|| format!("failed to open store {}", path.display()))
}

async fn open_ledger(config: &Config) -> anyhow::Result<FailureLedger> {
    let path = &config.storage.ledger_path;
    FailureLedger::load(Arc::new(JsonFileStorage::<LedgerDocument>::new(path)))
        .await
        .with_context(|| format!("failed to open ledger {}", path.display()))
}

fn build_matcher(config: &Config) -> anyhow::Result<CandidateMatcher> {
    let Some(api_key) = config.provider.api_key.clone() else {
        bail!("OMDB_API_KEY is required to enrich");
    };
    let settings = ProviderSettings::new(api_key)
        .with_base_url(config.provider.base_url.clone())
        .with_timeout(config.provider.timeout);
    let provider = OmdbApiProvider::new(settings)
        .context("failed to build metadata provider")?;
    Ok(CandidateMatcher::new(Arc::new(provider)))
}

/// Store and ledger owner for the commands that change them outside a batch.
async fn open_maintenance(config: &Config) -> anyhow::Result<EnrichmentOrchestrator> {
    let store = open_store(config).await?;
    let ledger = open_ledger(config).await?;
    Ok(EnrichmentOrchestrator::for_maintenance(
        store,
        ledger,
        config.enrich.clone(),
    ))
}

fn parse_key(raw: &str) -> anyhow::Result<MovieKey> {
    MovieKey::new(raw).with_context(|| format!("invalid key '{raw}'"))
}

pub async fn enrich(config: &Config, options: EnrichOptions) -> anyhow::Result<()> {
    // Provider settings are checked before touching any document.
    let matcher = build_matcher(config)?;
    let store = open_store(config).await?;
    let ledger = open_ledger(config).await?;

    let mut orchestrator =
        EnrichmentOrchestrator::new(store, ledger, matcher, config.enrich.clone())
            .with_progress(Arc::new(TracingProgress));
    let result = orchestrator.run(options).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if let BatchOutcome::Aborted { reason } = &result.outcome {
        bail!("enrichment aborted: {reason}");
    }
    Ok(())
}

pub async fn list_failures(config: &Config, json: bool) -> anyhow::Result<()> {
    let ledger = open_ledger(config).await?;

    if json {
        let records: Vec<_> = ledger.list().collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if ledger.is_empty() {
        println!("No recorded failures");
        return Ok(());
    }
    for record in ledger.list() {
        println!(
            "{}\t{}\t{} attempt(s)\t{}\t{}",
            record.identifier,
            record.last_attempt.format("%Y-%m-%d %H:%M"),
            record.attempts.len(),
            record.reason,
            record.original_title,
        );
    }
    Ok(())
}

pub async fn clear_failures(
    config: &Config,
    identifier: Option<&str>,
) -> anyhow::Result<()> {
    let mut orchestrator = open_maintenance(config).await?;
    match identifier {
        Some(identifier) => {
            if orchestrator.clear_failure(identifier).await? {
                println!("Cleared {identifier}");
            } else {
                println!("No failure recorded for {identifier}");
            }
        }
        None => {
            let cleared = orchestrator.clear_failures().await?;
            println!("Cleared {cleared} failure(s)");
        }
    }
    Ok(())
}

pub async fn demote(config: &Config, key: &str) -> anyhow::Result<()> {
    let key = parse_key(key)?;
    let mut orchestrator = open_maintenance(config).await?;

    let target = orchestrator
        .demote(&key)
        .await
        .with_context(|| format!("failed to demote {key}"))?;

    info!(from = %key, to = %target, "demoted");
    println!("{key} -> {target}");
    Ok(())
}

pub async fn show(config: &Config, key: &str) -> anyhow::Result<()> {
    let key = parse_key(key)?;
    let store = open_store(config).await?;
    let Some(entity) = store.get(&key) else {
        bail!("no movie stored under {key}");
    };
    println!("{}", serde_json::to_string_pretty(entity)?);
    Ok(())
}
