//! Fabox - release bundling and deployment
//!
//! Usage:
//!   fabox products            # List products in the source root
//!   fabox build [PRODUCT]     # Bundle a product under a new tag
//!   fabox deploy [BUNDLE]     # Deploy a bundle to its live slot
//!   fabox rollback [PRODUCT]  # Restore the previous deployment

mod interactive;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fabox_core::bundle::{Bundle, BundleTag, TagSummary};
use fabox_core::config::{ConfigStore, FaboxConfig, to_toml};
use fabox_core::context::AppContext;
use fabox_core::deploy::{DeployedVersion, SlotFilter, SlotState};
use fabox_core::error::{FaboxError, NotFoundKind};

use crate::interactive::{DialoguerPrompter, InteractiveFlow};

#[derive(Parser)]
#[command(name = "fabox")]
#[command(about = "Release bundling and deployment", long_about = None)]
struct Cli {
    /// Path to fabox.toml (default: ./fabox.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products available for bundling
    Products,

    /// List archived bundles
    Bundles {
        /// Only bundles of this tag (e.g. site_220101)
        #[arg(long)]
        tag: Option<String>,

        /// One line per tag with build counts
        #[arg(long)]
        summary: bool,
    },

    /// Build a new bundle of a product
    ///
    /// Prompts for the product and tag name when they are not given.
    /// Type "exit" at any prompt to abort.
    #[command(alias = "tag")]
    Build {
        /// Product to bundle
        product: Option<String>,

        /// Tag name; the bundle tag becomes <product>_<name>
        #[arg(long = "tag", short = 't')]
        tag_name: Option<String>,

        /// Use the date as tag name without asking
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Deploy a bundle to its product's live slot
    Deploy {
        /// Archive file name, or a tag to deploy its latest build
        bundle: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Restore a product's previous deployment
    Rollback {
        /// Product to roll back
        product: Option<String>,
    },

    /// List versions deployed in live slots
    Versions {
        /// List previous slots instead
        #[arg(long, conflicts_with = "all")]
        previous: bool,

        /// List every slot
        #[arg(long)]
        all: bool,
    },

    /// Show the slots of one product
    Status {
        product: String,

        /// Hash each slot tree (slower)
        #[arg(long)]
        verify: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write a default fabox.toml to the config path
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fabox=info,fabox_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_user_abort(&err) => {
            println!("\nExiting application as requested");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {err:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn is_user_abort(err: &anyhow::Error) -> bool {
    err.downcast_ref::<FaboxError>()
        .is_some_and(FaboxError::is_user_abort)
}

fn run_cli(cli: Cli) -> Result<()> {
    let store = ConfigStore::resolve(cli.config.as_deref())?;
    if let Commands::Config { init: true } = cli.command {
        return run_config_init(&store);
    }

    let ctx = load_context(&store)?;
    let format = cli.format;

    match cli.command {
        Commands::Products => run_products(&ctx, format),
        Commands::Bundles { tag, summary } => run_bundles(&ctx, tag.as_deref(), summary, format),
        Commands::Build {
            product,
            tag_name,
            yes,
        } => run_build(&ctx, product.as_deref(), tag_name.as_deref(), yes, format),
        Commands::Deploy { bundle, yes } => run_deploy(&ctx, bundle.as_deref(), yes, format),
        Commands::Rollback { product } => run_rollback(&ctx, product.as_deref(), format),
        Commands::Versions { previous, all } => {
            let filter = match (previous, all) {
                (_, true) => SlotFilter::All,
                (true, false) => SlotFilter::Previous,
                (false, false) => SlotFilter::Live,
            };
            run_versions(&ctx, filter, format)
        }
        Commands::Status { product, verify } => run_status(&ctx, &product, verify, format),
        Commands::Config { .. } => run_config_show(&store, &ctx, format),
    }
}

/// Relative roots in the config are taken from the working directory.
fn load_context(store: &ConfigStore) -> Result<AppContext> {
    let config = store.load()?;
    let working_dir = std::env::current_dir()?;
    Ok(AppContext::new(config, &working_dir)?)
}

fn run_products(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let catalog = ctx.catalog();
    let products = catalog.list_products()?;

    match format {
        OutputFormat::Table => {
            if products.is_empty() {
                println!(
                    "No products available under {}",
                    catalog.source_root().display()
                );
                return Ok(());
            }
            println!("Available products are:");
            for product in &products {
                println!("\t{product}");
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "source_root": catalog.source_root(),
                "products": products,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn run_bundles(
    ctx: &AppContext,
    tag: Option<&str>,
    summary: bool,
    format: OutputFormat,
) -> Result<()> {
    let store = ctx.bundle_store();

    if summary {
        let mut tags = store.tags()?;
        if let Some(filter) = tag {
            tags.retain(|entry| entry.tag.to_string() == filter);
        }
        return match format {
            OutputFormat::Table => {
                print_tag_table(&tags);
                Ok(())
            }
            OutputFormat::Json => print_tag_json(&tags),
        };
    }

    let filter = tag.map(BundleTag::parse).transpose()?;
    let bundles = store.list_bundles(filter.as_ref())?;
    match format {
        OutputFormat::Table => print_bundle_table(&bundles),
        OutputFormat::Json => print_bundle_json(&bundles)?,
    }
    Ok(())
}

fn run_build(
    ctx: &AppContext,
    product: Option<&str>,
    tag_name: Option<&str>,
    yes: bool,
    format: OutputFormat,
) -> Result<()> {
    let products = ctx.catalog().list_products()?;
    let mut flow = InteractiveFlow::new(DialoguerPrompter::default());

    let product = flow.choose_product(&products, product, "Which product do you want to tag?")?;
    let today = chrono::Local::now().date_naive();
    let tag_name = match (tag_name, yes) {
        (None, true) => fabox_core::select::default_tag_name(today),
        (tag_name, _) => flow.choose_tag_name(today, tag_name)?,
    };

    println!("I will build bundle: {product}_{tag_name}");
    let report = ctx.builder().build(&product, &tag_name)?;

    match format {
        OutputFormat::Table => {
            println!(
                "{} {}",
                style("Built").green().bold(),
                style(report.bundle.filename()).cyan()
            );
            println!("  Archive:  {}", report.archive.display());
            println!("  Version:  {}", report.stamp.render());
            if report.stripped > 0 {
                println!("  Stripped: {} metadata directories", report.stripped);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "bundle": report.bundle.filename(),
                "tag": report.bundle.tag,
                "build": report.bundle.build,
                "archive": report.archive,
                "version": report.stamp.render(),
                "stripped": report.stripped,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn run_deploy(
    ctx: &AppContext,
    bundle: Option<&str>,
    yes: bool,
    format: OutputFormat,
) -> Result<()> {
    let store = ctx.bundle_store();
    let mut flow = InteractiveFlow::new(DialoguerPrompter::default());

    let bundle = match bundle {
        Some(spec) => store.resolve(spec)?,
        None => {
            let tag = flow.choose_bundle_tag(&store.tags()?, None)?;
            store
                .latest(&tag)?
                .ok_or_else(|| FaboxError::not_found(NotFoundKind::Tag, tag.to_string()))?
        }
    };

    if !flow.confirm(&format!("Deploy bundle '{}'?", bundle.filename()), yes)? {
        println!("Deploy cancelled.");
        return Ok(());
    }

    println!("I will deploy bundle: {}", bundle.filename());
    let report = ctx.deploy_engine()?.deploy(&bundle)?;

    match format {
        OutputFormat::Table => {
            if report.promoted {
                println!(
                    "{} {} to {}",
                    style("Deployed").green().bold(),
                    style(report.bundle.filename()).cyan(),
                    report.live.display()
                );
            } else {
                println!(
                    "{} {} was not promoted; {} is unchanged",
                    style("Incomplete").yellow().bold(),
                    style(report.bundle.filename()).cyan(),
                    report.live.display()
                );
            }
            if let Some(previous) = &report.previous {
                println!("  Previous: {}", previous.display());
            }
            for warning in &report.warnings {
                println!("  {} {}", style("warning:").yellow(), warning);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "bundle": report.bundle.filename(),
                "product": report.product,
                "live": report.live,
                "promoted": report.promoted,
                "previous": report.previous,
                "warnings": report.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn run_rollback(ctx: &AppContext, product: Option<&str>, format: OutputFormat) -> Result<()> {
    let products = ctx.catalog().list_products()?;
    let mut flow = InteractiveFlow::new(DialoguerPrompter::default());
    let product =
        flow.choose_product(&products, product, "Which project do you want to rollback?")?;

    let report = ctx.rollback_engine().rollback(&product)?;

    match format {
        OutputFormat::Table => {
            println!(
                "{} {} to its previous deployment",
                style("Rolled back").green().bold(),
                style(&report.product).cyan()
            );
            if let Some(rollback) = &report.rollback {
                println!("  Replaced deployment kept at {}", rollback.display());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn run_versions(ctx: &AppContext, filter: SlotFilter, format: OutputFormat) -> Result<()> {
    let versions = ctx.deployed_versions().list(filter)?;
    match format {
        OutputFormat::Table => print_versions_table(&versions),
        OutputFormat::Json => print_versions_json(&versions)?,
    }
    Ok(())
}

fn run_status(ctx: &AppContext, product: &str, verify: bool, format: OutputFormat) -> Result<()> {
    let slots = ctx.deployed_versions().slots(product, verify)?;
    if slots.iter().all(|state| !state.present) {
        return Err(FaboxError::not_found(NotFoundKind::Slot, product).into());
    }
    match format {
        OutputFormat::Table => print_slot_table(product, &slots),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "product": product,
                "slots": slots,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn run_config_init(store: &ConfigStore) -> Result<()> {
    if store.exists() {
        anyhow::bail!(
            "Config file already exists: {}",
            store.config_path().display()
        );
    }
    store.save(&FaboxConfig::default())?;
    println!("Wrote default config to {}", store.config_path().display());
    Ok(())
}

fn run_config_show(store: &ConfigStore, ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let source = if store.exists() {
        store.config_path().display().to_string()
    } else {
        format!("{} (not found, using defaults)", store.config_path().display())
    };

    match format {
        OutputFormat::Table => {
            println!("# {source}");
            print!("{}", to_toml(ctx.config())?);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": store.config_path(),
                "exists": store.exists(),
                "config": ctx.config(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_tag_table(tags: &[TagSummary]) {
    if tags.is_empty() {
        println!("No bundles archived.");
        return;
    }

    println!("{:<40} {:>7} {:>7}", "Tag", "Builds", "Latest");
    println!("{}", "-".repeat(56));
    for entry in tags {
        println!(
            "{:<40} {:>7} {:>7}",
            truncate(&entry.tag.to_string(), 40),
            entry.builds,
            entry.latest.to_string()
        );
    }
}

fn print_tag_json(tags: &[TagSummary]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(tags)?);
    Ok(())
}

fn print_bundle_table(bundles: &[Bundle]) {
    if bundles.is_empty() {
        println!("No bundles archived.");
        return;
    }

    println!("{:<50} {:<7} Format", "Bundle", "Build");
    println!("{}", "-".repeat(66));
    for bundle in bundles {
        println!(
            "{:<50} {:<7} {}",
            truncate(&bundle.filename(), 50),
            bundle.build.to_string(),
            bundle.format
        );
    }
}

fn print_bundle_json(bundles: &[Bundle]) -> Result<()> {
    let output: Vec<_> = bundles
        .iter()
        .map(|bundle| {
            serde_json::json!({
                "filename": bundle.filename(),
                "product": bundle.product(),
                "tag": bundle.tag,
                "build": bundle.build,
                "format": bundle.format.to_string(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// One stamp line per slot, like the `version.txt` files themselves.
fn print_versions_table(versions: &[DeployedVersion]) {
    if versions.is_empty() {
        println!("No deployed versions found.");
        return;
    }
    for version in versions {
        println!("{}", version.stamp.render());
    }
}

fn print_versions_json(versions: &[DeployedVersion]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(versions)?);
    Ok(())
}

fn print_slot_table(product: &str, slots: &[SlotState]) {
    println!("Product: {product}");
    println!();
    println!("  {:<10} {:<3} Version", "Slot", "");
    for state in slots {
        let symbol = if state.present {
            style("✓").green()
        } else {
            style("-").dim()
        };
        let version = state
            .stamp
            .as_ref()
            .map(|stamp| stamp.render())
            .unwrap_or_else(|| slot_placeholder(state).to_string());
        println!("  {:<10} {:<3} {}", state.slot.to_string(), symbol, version);
        if let Some(hash) = &state.hash {
            println!("  {:<10} {:<3} blake3 {}", "", "", hash);
        }
    }
}

fn slot_placeholder(state: &SlotState) -> &'static str {
    if state.present {
        "(no version.txt)"
    } else {
        "(empty)"
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn build_with_tag_alias_parses() {
        let cli = Cli::try_parse_from(["fabox", "tag", "site", "--tag", "220101", "-y"]).unwrap();
        match cli.command {
            Commands::Build {
                product,
                tag_name,
                yes,
            } => {
                assert_eq!(product.as_deref(), Some("site"));
                assert_eq!(tag_name.as_deref(), Some("220101"));
                assert!(yes);
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn deploy_without_bundle_parses() {
        let cli = Cli::try_parse_from(["fabox", "deploy"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Deploy {
                bundle: None,
                yes: false
            }
        ));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fabox",
            "versions",
            "--all",
            "-o",
            "json",
            "--config",
            "/tmp/fabox.toml",
        ])
        .unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/fabox.toml")));
    }

    #[test]
    fn versions_flags_conflict() {
        assert!(Cli::try_parse_from(["fabox", "versions", "--previous", "--all"]).is_err());
    }

    #[test]
    fn status_requires_product() {
        assert!(Cli::try_parse_from(["fabox", "status"]).is_err());
        assert!(Cli::try_parse_from(["fabox", "status", "site", "--verify"]).is_ok());
    }

    #[test]
    fn user_abort_is_recognized_through_anyhow() {
        let err = anyhow::Error::new(FaboxError::UserAbort);
        assert!(is_user_abort(&err));
        assert!(!is_user_abort(&anyhow::anyhow!("boom")));
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
