use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::browser::page::LivePage;
use crate::browser::session::BrowserSession;
use crate::capture_page;
use crate::cli::config::AppConfig;
use crate::context::EngineContext;
use crate::embedding::{EmbeddingService, HashedNgramEmbedder, OllamaEmbedder};
use crate::record::ingest::{
    ExternalElement, KeywordIntentClassifier, VisionElement, ingest_vision, parse_vision_lines, register_external,
};
use crate::record::naming::normalize_page_name;
use crate::report::console::format_console_report;
use crate::report::report_model::TestSuiteReport;
use crate::resolver::engine::LocatorResolver;
use crate::resolver::strategy::ActionKind;
use crate::spec::runner::TestRunner;
use crate::spec::spec_model::TestSpec;
use crate::store::{ElementStore, JsonFileStore};
use crate::trace::logger::TraceLogger;

// ============================================================================
// Engine wiring
// ============================================================================

/// Build the engine context described by `config`.
pub fn build_context(config: &AppConfig) -> Result<EngineContext, Box<dyn Error>> {
    config.validate()?;

    let store: Arc<dyn ElementStore> = Arc::new(JsonFileStore::open(&config.store.path)?);
    let embedder = build_embedder(config);
    let tracer = match &config.trace.path {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };

    Ok(EngineContext::new(store, embedder)
        .with_settings(config.engine_settings())
        .with_tracer(tracer))
}

/// Pick the embedding backend named in config.
pub fn build_embedder(config: &AppConfig) -> Arc<dyn EmbeddingService> {
    match config.embedding.backend.as_str() {
        "ollama" => Arc::new(OllamaEmbedder::new(
            config.embedding.endpoint_or_default(),
            config.embedding.model_or_default(),
            config.embedding.dimension,
        )),
        _ => Arc::new(HashedNgramEmbedder::new(config.embedding.dimension)),
    }
}

fn launch_browser(config: &AppConfig) -> Result<BrowserSession, Box<dyn Error>> {
    Ok(BrowserSession::launch(&config.browser.server_script, config.browser.headless)?)
}

// ============================================================================
// ingest subcommand
// ============================================================================

/// Store vision output for a page. Returns the number of records written.
pub fn cmd_ingest(ctx: &EngineContext, page: &str, file: &str) -> Result<usize, Box<dyn Error>> {
    let content = std::fs::read_to_string(file)?;
    let elements = load_vision_elements(&content)?;
    let page_name = normalize_page_name(page);

    let records = ingest_vision(&page_name, &elements, &KeywordIntentClassifier);
    let count = records.len();
    ctx.store.upsert_many(records)?;

    println!("Stored {} elements for page '{}'", count, page_name);
    Ok(count)
}

/// Vision output is either a JSON array or `label - type - intent` lines.
pub fn load_vision_elements(content: &str) -> Result<Vec<VisionElement>, Box<dyn Error>> {
    if content.trim_start().starts_with('[') {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(parse_vision_lines(content))
    }
}

// ============================================================================
// register subcommand
// ============================================================================

pub fn cmd_register(ctx: &EngineContext, mut input: ExternalElement) -> Result<String, Box<dyn Error>> {
    input.page_name = normalize_page_name(&input.page_name);
    let record = register_external(&input, &KeywordIntentClassifier);
    let name = record.unique_name.clone();
    ctx.store.upsert(record)?;

    println!("Registered '{}'", name);
    Ok(name)
}

// ============================================================================
// enrich subcommand
// ============================================================================

pub fn cmd_enrich(
    ctx: &EngineContext,
    config: &AppConfig,
    url: &str,
    page: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let page_name = normalize_page_name(page.unwrap_or(url));
    let mut session = launch_browser(config)?;
    session.navigate(url)?;

    let report = capture_page(ctx, &mut session, &page_name)?;
    session.quit()?;

    println!(
        "Page '{}': {} matched, {} unmatched, {} external skipped, {} already matched",
        page_name,
        report.matched_count(),
        report.unmatched_count(),
        report.skipped_external,
        report.skipped_already_matched
    );
    for record in &report.matched {
        println!("  + {}", record.unique_name);
    }
    for unmatched in &report.unmatched {
        match unmatched.best_score {
            Some(score) => println!("  - {} (best {:.3})", unmatched.unique_name, score),
            None => println!("  - {}", unmatched.unique_name),
        }
    }
    Ok(())
}

// ============================================================================
// resolve subcommand
// ============================================================================

pub fn cmd_resolve(
    ctx: &EngineContext,
    config: &AppConfig,
    url: &str,
    name: &str,
    action: &str,
    value: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let action = parse_action(action)?;
    let mut session = launch_browser(config)?;
    session.navigate(url)?;

    let resolver = LocatorResolver::new(ctx);
    {
        let mut handle = resolver.resolve(name, &mut session, action)?;
        println!(
            "{} -> {} via {}{}",
            name,
            handle.locator,
            handle.strategy.as_str(),
            handle
                .healed_to
                .as_deref()
                .map(|h| format!(" (healed to {})", h))
                .unwrap_or_default()
        );
        match action {
            ActionKind::Click => handle.click()?,
            ActionKind::Fill => handle.fill(value.unwrap_or_default())?,
            ActionKind::Assert => {}
        }
    }

    session.quit()?;
    Ok(())
}

pub fn parse_action(action: &str) -> Result<ActionKind, Box<dyn Error>> {
    match action.to_lowercase().as_str() {
        "click" => Ok(ActionKind::Click),
        "fill" => Ok(ActionKind::Fill),
        "assert" => Ok(ActionKind::Assert),
        other => Err(format!("unknown action '{}' (expected click, fill or assert)", other).into()),
    }
}

// ============================================================================
// list subcommand
// ============================================================================

pub fn cmd_list(ctx: &EngineContext, page: &str) -> Result<(), Box<dyn Error>> {
    let records = ctx.store.get_by_page(&normalize_page_name(page))?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

// ============================================================================
// run subcommand
// ============================================================================

/// Run scenario specs and return whether all passed.
pub fn cmd_run(
    ctx: &EngineContext,
    config: &AppConfig,
    spec_path: &str,
    output: Option<&str>,
) -> Result<bool, Box<dyn Error>> {
    let specs = load_specs(spec_path)?;

    if specs.is_empty() {
        eprintln!("No test specs found at: {}", spec_path);
        return Ok(true);
    }
    info!(count = specs.len(), "running test specs");

    let mut session = launch_browser(config)?;
    let resolver = LocatorResolver::new(ctx);
    let start = std::time::Instant::now();

    let mut results = Vec::new();
    for spec in &specs {
        debug!(spec = %spec.name, "running");
        results.push(TestRunner::run(spec, &mut session, &resolver));
    }

    let duration = start.elapsed().as_millis();
    session.quit()?;

    let report = TestSuiteReport::from_results("CLI Run", results).with_duration(duration);
    let all_passed = report.all_passed();
    let output_content = format_console_report(&report);

    match output {
        Some(path) => std::fs::write(path, &output_content)?,
        None => print!("{}", output_content),
    }

    Ok(all_passed)
}

/// Load test specs from a single YAML file or a directory of YAML files.
pub fn load_specs(path: &str) -> Result<Vec<TestSpec>, Box<dyn Error>> {
    let metadata = std::fs::metadata(path)?;
    if metadata.is_dir() {
        let mut specs = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let p = entry?.path();
            if is_yaml(&p) {
                let content = std::fs::read_to_string(&p)?;
                specs.push(serde_yaml::from_str::<TestSpec>(&content)?);
            }
        }
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(specs)
    } else {
        let content = std::fs::read_to_string(path)?;
        Ok(vec![serde_yaml::from_str(&content)?])
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "yaml" || e == "yml")
}
