//! YtLens - offline rule tester
//!
//! Runs the filter over a YAML list of items instead of a live page, so rule
//! lists can be checked before they are deployed.
//!
//! # Usage
//!
//! ```text
//! ytlens [CONFIG_DIR] ITEMS_FILE
//! ```
//!
//! - `CONFIG_DIR` (default `YtLens Data`) holds `ytlens.yaml`; a default file
//!   is written if none exists.
//! - `ITEMS_FILE` is a YAML list of `{title, channelName, description, badge}`.
//!
//! Every item goes through one real orchestrator pass (badge lane, classifier,
//! presentation). The offline page has no menus, so menu interaction always
//! reports "not found". One line per item is printed with the verdict and the
//! presentation effects that were applied.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use ytlens::config::ConfigStore;
use ytlens::host::{ExtractionError, HostError, MenuCandidate};
use ytlens::services::{Collaborators, PassOutcome};
use ytlens::{
    APP_NAME, ContentItem, Extractor, FilterSettings, Highlight, HostRef, MenuHost, Orchestrator,
    Presenter, RuleSet, VERSION, YamlConfigStore, classify,
};

const DEFAULT_CONFIG_DIR: &str = "YtLens Data";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ItemRecord {
    title: String,
    channel_name: String,
    description: String,
    badge: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Hidden,
    Highlighted(Highlight),
}

/// In-memory stand-in for a page: one element per item record.
struct OfflinePage {
    records: Vec<ItemRecord>,
    handles: Vec<HostRef>,
    processed: Mutex<Vec<bool>>,
    effects: Mutex<Vec<Vec<Effect>>>,
}

impl OfflinePage {
    fn new(records: Vec<ItemRecord>) -> Self {
        let handles = (0..records.len()).map(HostRef::new).collect();
        let count = records.len();
        Self {
            records,
            handles,
            processed: Mutex::new(vec![false; count]),
            effects: Mutex::new(vec![Vec::new(); count]),
        }
    }

    fn index_of(&self, handle: &HostRef) -> Option<usize> {
        handle.payload::<usize>().copied()
    }

    fn record_effect(&self, handle: &HostRef, effect: Effect) -> Result<(), HostError> {
        let index = self
            .index_of(handle)
            .ok_or_else(|| HostError::Detached(handle.clone()))?;
        let mut effects = self
            .effects
            .lock()
            .map_err(|_| HostError::failed("record_effect", "effects lock poisoned"))?;
        effects[index].push(effect);
        Ok(())
    }

    fn effects_for(&self, index: usize) -> Vec<Effect> {
        self.effects
            .lock()
            .map(|effects| effects[index].clone())
            .unwrap_or_default()
    }
}

impl Extractor for OfflinePage {
    fn find_unprocessed_items(&self) -> Vec<HostRef> {
        let processed = self
            .processed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.handles
            .iter()
            .zip(processed.iter())
            .filter(|(_, done)| !**done)
            .map(|(handle, _)| handle.clone())
            .collect()
    }

    fn extract_item(&self, handle: &HostRef) -> Result<ContentItem, ExtractionError> {
        let record = self
            .index_of(handle)
            .and_then(|index| self.records.get(index))
            .ok_or_else(|| ExtractionError::new(handle, "unknown element"))?;
        Ok(ContentItem::new(
            handle.clone(),
            record.title.as_str(),
            record.channel_name.as_str(),
            record.description.as_str(),
        )
        .with_badge(record.badge))
    }

    fn mark_processed(&self, handle: &HostRef) {
        if let Some(index) = self.index_of(handle) {
            let mut processed = self
                .processed
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            processed[index] = true;
        }
    }

    fn has_suppressed_badge(&self, handle: &HostRef) -> bool {
        self.index_of(handle)
            .and_then(|index| self.records.get(index))
            .is_some_and(|record| record.badge)
    }

    fn contains_item(&self, node: &HostRef) -> bool {
        self.index_of(node).is_some()
    }
}

impl Presenter for OfflinePage {
    fn hide(&self, handle: &HostRef) -> Result<(), HostError> {
        self.record_effect(handle, Effect::Hidden)
    }

    fn highlight(&self, handle: &HostRef, variant: Highlight) -> Result<(), HostError> {
        self.record_effect(handle, Effect::Highlighted(variant))
    }
}

impl MenuHost for OfflinePage {
    fn menu_trigger(&self, _item: &HostRef) -> Option<HostRef> {
        None
    }

    fn toggle_menu(&self, _trigger: &HostRef) -> Result<(), HostError> {
        Ok(())
    }

    fn poll_menu_candidates(&self) -> Result<Vec<MenuCandidate>, HostError> {
        Ok(Vec::new())
    }

    fn invoke_candidate(&self, _candidate: &MenuCandidate) -> Result<(), HostError> {
        Ok(())
    }

    fn dispatch_cancel_signal(&self) -> Result<(), HostError> {
        Ok(())
    }
}

fn parse_args() -> Result<(String, String)> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [items] => Ok((DEFAULT_CONFIG_DIR.to_string(), items.clone())),
        [config_dir, items] => Ok((config_dir.clone(), items.clone())),
        _ => bail!("Usage: {} [CONFIG_DIR] ITEMS_FILE", APP_NAME),
    }
}

fn load_items(path: &str) -> Result<Vec<ItemRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read items file: {}", path))?;
    serde_yaml_ng::from_str(&contents)
        .with_context(|| format!("Failed to parse items file: {}", path))
}

fn describe_effects(effects: &[Effect]) -> String {
    if effects.is_empty() {
        return "-".to_string();
    }
    effects
        .iter()
        .map(|effect| match effect {
            Effect::Hidden => "hidden".to_string(),
            Effect::Highlighted(variant) => variant.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

async fn run(
    config_dir: &str,
    items_path: &str,
    logging: &ytlens::logging::LoggingHandle,
) -> Result<()> {
    let store = YamlConfigStore::new(config_dir)?;
    if !store.config_path().exists() {
        let defaults = FilterSettings::default()
            .to_values()
            .context("Failed to serialize default settings")?;
        store.save(defaults).await?;
        tracing::info!("Wrote default settings to {}", store.config_path());
    }

    let records = load_items(items_path)?;
    tracing::info!("Loaded {} items from {}", records.len(), items_path);

    let page = Arc::new(OfflinePage::new(records));
    let switch = logging.debug_switch();
    let orchestrator = Orchestrator::new(
        Collaborators {
            extractor: page.clone(),
            presenter: page.clone(),
            menu: page.clone(),
        },
        Arc::new(store),
    )
    .with_debug_mode_hook(move |debug_mode| switch.apply(debug_mode));

    orchestrator.initialize().await;

    let summary = match orchestrator.run_pass().await {
        PassOutcome::Completed(summary) => summary,
        other => bail!("Pass did not run: {:?}", other),
    };

    let settings = orchestrator.state().snapshot().settings;
    let rules = RuleSet::compile(&settings.blacklist, &settings.whitelist);

    for (index, record) in page.records.iter().enumerate() {
        let item = page.extract_item(&page.handles[index])?;
        let decision = if settings.filter_synchronized_videos && record.badge {
            format!("BADGE ({:?})", settings.synchronized_video_action)
        } else {
            classify(&item, &rules, settings.list_mode()).to_string()
        };
        println!(
            "{:>4}  {:<60}  {}  [{}]",
            index + 1,
            record.title,
            decision,
            describe_effects(&page.effects_for(index))
        );
    }

    println!(
        "\n{} processed, {} blocked, {} unclassified (dryrun={})",
        summary.processed,
        summary.blocked,
        summary.unclassified,
        settings.dry_run
    );

    orchestrator.metrics().log_summary();
    Ok(())
}

fn main() -> Result<()> {
    let logging = ytlens::logging::setup_logging_with_console("logs", "ytlens", false, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let (config_dir, items_path) = parse_args()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("ytlens-worker")
        .build()?;

    let result = runtime.block_on(run(&config_dir, &items_path, &logging));

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    result.map_err(|e| {
        tracing::error!("Run failed: {:#}", e);
        e
    })
}
