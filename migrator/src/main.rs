//! socrata2ckan - migrate a Socrata catalog export into CKAN
//!
//! ```bash
//! socrata2ckan --apikey KEY --ckan-url https://data.example.org index.csv files/
//! socrata2ckan --dry-run --output plan.json index.csv files/   # plan only
//! ```
//!
//! `CKAN_API_KEY` and `CKAN_URL` may come from the environment or a `.env`.

use clap::Parser;
use migrator::{migrate, CkanClient, ColumnMapping, MigrateOptions, MigrationResult};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "socrata2ckan")]
#[command(about = "Migrate a Socrata catalog export into a CKAN instance", long_about = None)]
struct Cli {
    /// CKAN API key
    #[arg(long, env = "CKAN_API_KEY", hide_env_values = true)]
    apikey: String,

    /// Base URL of the CKAN instance
    #[arg(long, env = "CKAN_URL")]
    ckan_url: String,

    /// Socrata index CSV
    indexfile: PathBuf,

    /// Directory holding the exported resource files
    filesdir: Option<PathBuf>,

    /// Column mapping JSON (default: Socrata export headers)
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Plan only, create nothing on the target
    #[arg(long)]
    dry_run: bool,

    /// Write the plan/report JSON here (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip payload validation
    #[arg(long)]
    no_validate: bool,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", cli.indexfile.display());
    eprintln!("   Target: {}", cli.ckan_url);

    let mapping = match cli.mapping {
        Some(ref path) => {
            eprintln!("   Mapping: {}", path.display());
            ColumnMapping::from_file(path)?
        }
        None => ColumnMapping::socrata_v1(),
    };

    let options = MigrateOptions {
        files_dir: cli.filesdir.clone(),
        mapping,
        dry_run: cli.dry_run,
        skip_validation: cli.no_validate,
    };

    let client = CkanClient::new(cli.ckan_url.as_str(), cli.apikey.as_str());
    let result = migrate(&client, &cli.indexfile, &options).await?;

    print_summary(&result);

    let json = serde_json::to_string_pretty(&result)?;
    write_output(&json, cli.output.as_deref())?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn print_summary(result: &MigrationResult) {
    eprintln!("\n📊 Run {}", result.plan.run_id);
    eprintln!("   Rows: {}", result.csv_info.row_count);
    eprintln!("   Derived views skipped: {}", result.skipped_derived);
    eprintln!("   New organizations/groups: {}", result.plan.new_entities.len());
    eprintln!("   Datasets: {}", result.plan.datasets.len());
    eprintln!("   Resources: {}", result.plan.resource_count());
    if result.dropped_resources > 0 {
        eprintln!("   ⚠️  Resources without file: {}", result.dropped_resources);
    }
    if result.report.is_none() {
        eprintln!("   (dry run)");
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
