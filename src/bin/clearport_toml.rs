use clap::Parser;
use clearport::core::mapping::PackageMapping;
use clearport::core::ConfigProvider;
use clearport::utils::error::ErrorSeverity;
use clearport::utils::{logger, validation::Validate};
use clearport::{ClearportEngine, LocalStorage, TomlConfig, TranslatePipeline};

#[derive(Parser)]
#[command(name = "clearport-toml")]
#[command(about = "Translate Clear Linux options with a TOML run configuration")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "clearport.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the output directory from the config
    #[arg(long)]
    output_path: Option<String>,

    /// Show what would be processed without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    logger::init_logger(args.verbose || config.verbose(), config.json_logs());
    tracing::info!("🚀 Starting TOML-based clearport run");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    if let Some(output_path) = &args.output_path {
        config.output.output_path = output_path.clone();
        tracing::info!("🔧 Output path overridden to: {}", output_path);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let storage = LocalStorage::new(String::new());
    let pipeline = TranslatePipeline::new(storage, config);
    let engine = ClearportEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Translation completed successfully!");
            println!("✅ Translation completed successfully!");
            println!("📁 Overrides written to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Translation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Run: {}", config.run.name);
    if let Some(description) = &config.run.description {
        println!("  Description: {}", description);
    }
    println!("  Repositories: {}", config.repos_dir());
    println!("  Options file: {}", config.options_file_name());
    println!("  Mapping: {}", config.mapping_file());
    println!("  Output: {}", config.output_path());
    println!("  Reports: {} ({})", config.report_dir(), config.report_formats().join(", "));

    if let Some(archive) = config.archive_name() {
        println!("  Archive: {}", archive);
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let rules = config.rule_table()?;
    println!("🛠️ Rule Table:");
    println!("  {} rules for {} option names", rules.len(), rules.option_names().count());
    for option in rules.option_names() {
        for rule in rules.rules_for(option) {
            let variables: Vec<&str> = rule.assign.iter().map(|a| a.variable.as_str()).collect();
            println!(
                "  {} ({:?}, when={}) -> {}",
                option,
                rule.kind,
                rule.when,
                variables.join(", ")
            );
        }
    }
    for (variable, policy) in rules.policies() {
        println!("  {} merges as {:?}", variable, policy);
    }

    println!();
    println!("🔄 Package Mapping:");
    match std::fs::read(config.mapping_file()) {
        Ok(data) => {
            let mapping =
                PackageMapping::from_json_bytes(config.mapping_file(), &data, &config.mapping_options())?;
            println!(
                "  {} mapped packages, {} target atoms",
                mapping.len(),
                mapping.atom_count()
            );
        }
        Err(e) => println!("  ⚠️ Mapping file not readable: {}", e),
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during an actual run.");

    Ok(())
}
