use anyhow::{Context, Result};
use clap::Parser;
use clearport::core::matcher::PackageMatcher;
use clearport::core::Storage;
use clearport::utils::logger;
use clearport::LocalStorage;
use std::collections::BTreeMap;

#[derive(Parser)]
#[command(name = "build-mapping")]
#[command(about = "Match Clear Linux package names against Gentoo atoms")]
struct Args {
    /// Clear Linux package names, one per line
    #[arg(long, default_value = "data/clearlinux_pkgs.txt")]
    clearlinux_pkgs: String,

    /// Gentoo atoms (category/name), one per line
    #[arg(long, default_value = "data/gentoo_pkgs.txt")]
    gentoo_pkgs: String,

    /// Where to write the mapping table
    #[arg(short, long, default_value = "data/pkg_mapping.json")]
    output: String,

    /// Extra manual overrides as a JSON object of name -> atom
    #[arg(long)]
    overrides: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let storage = LocalStorage::new(String::new());

    let gentoo = storage
        .read_file(&args.gentoo_pkgs)
        .await
        .with_context(|| format!("reading {}", args.gentoo_pkgs))?;
    let gentoo = String::from_utf8_lossy(&gentoo);
    let clearlinux = storage
        .read_file(&args.clearlinux_pkgs)
        .await
        .with_context(|| format!("reading {}", args.clearlinux_pkgs))?;
    let clearlinux = String::from_utf8_lossy(&clearlinux);

    let mut matcher = PackageMatcher::new(gentoo.lines());
    if let Some(path) = &args.overrides {
        let data = storage
            .read_file(path)
            .await
            .with_context(|| format!("reading overrides {}", path))?;
        let extra: BTreeMap<String, String> =
            serde_json::from_slice(&data).with_context(|| format!("parsing overrides {}", path))?;
        tracing::info!("Loaded {} extra overrides", extra.len());
        matcher = matcher.with_overrides(extra);
    }

    let results = matcher.map_all(clearlinux.lines());
    let matched = results.values().filter(|r| r.gentoo_match.is_some()).count();
    tracing::info!(
        "Matched {} of {} Clear Linux packages",
        matched,
        results.len()
    );

    let mut json = serde_json::to_string_pretty(&results)?;
    json.push('\n');
    storage.write_file(&args.output, json.as_bytes()).await?;

    println!("📁 Mapping written to: {}", args.output);
    Ok(())
}
