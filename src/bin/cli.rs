use clap::{Parser, Subcommand};
use page_bloom_rs::{
    BloomFilter, FilterConfig, FilterConfigBuilder, FilterParams,
    FilterSnapshot, bytes2hr, ratio2hr,
};
use serde::Serialize;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, long_about = None)]
#[command(about = "Page bloom filter tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the filter shape planned for an item count and error rate
    Plan {
        /// Expected number of distinct items
        #[arg(short, long, default_value = "1000000")]
        items: usize,

        /// False positive rate (clamped to 0.0005..=0.1)
        #[arg(short, long, default_value = "0.01")]
        fpr: f64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a filter from a file with one key per line
    Build {
        /// Expected number of distinct items
        #[arg(short, long)]
        items: usize,

        /// False positive rate (clamped to 0.0005..=0.1)
        #[arg(short, long, default_value = "0.01")]
        fpr: f64,

        /// Key file, `-` for stdin
        #[arg(long)]
        input: PathBuf,

        /// Where to write the filter snapshot
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check keys against a saved filter
    Query {
        /// Filter snapshot file
        #[arg(long)]
        filter: PathBuf,

        /// Keys to check
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Display information about a saved filter
    Info {
        /// Filter snapshot file
        #[arg(long)]
        filter: PathBuf,
    },
}

#[derive(Serialize)]
struct PlanReport {
    #[serde(flatten)]
    config: FilterConfig,
    #[serde(flatten)]
    params: FilterParams,
    page_size: usize,
    data_size: usize,
    capacity: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan { items, fpr, json } => plan(items, fpr, json)?,
        Commands::Build {
            items,
            fpr,
            input,
            output,
        } => build(items, fpr, &input, &output)?,
        Commands::Query { filter, keys } => query(&filter, &keys)?,
        Commands::Info { filter } => show_info(&filter)?,
    }

    Ok(())
}

fn plan(
    items: usize,
    fpr: f64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = FilterConfigBuilder::default()
        .item_count(items)
        .false_positive_rate(fpr)
        .build()?;
    let params = config.params()?;

    if json {
        let report = PlanReport {
            config,
            params,
            page_size: params.page_size(),
            data_size: params.data_size(),
            capacity: params.capacity(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Planned page bloom filter:");
    println!("  Items: {items}");
    println!("  False positive rate: {fpr}");
    println!("  Ways: {}", params.ways);
    println!(
        "  Page: 2^{} = {}",
        params.page_level,
        bytes2hr(params.page_size())
    );
    println!("  Pages: {}", params.page_count);
    println!("  Buffer: {}", bytes2hr(params.data_size()));
    println!("  Capacity: {}", params.capacity());
    Ok(())
}

fn build(
    items: usize,
    fpr: f64,
    input: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut filter = FilterConfigBuilder::default()
        .item_count(items)
        .false_positive_rate(fpr)
        .build()?
        .build()?;

    let reader: Box<dyn BufRead> = if input == Path::new("-") {
        Box::new(io::stdin().lock())
    } else {
        Box::new(BufReader::new(File::open(input)?))
    };

    let mut lines = 0_usize;
    for line in reader.lines() {
        filter.set(line?.as_bytes());
        lines += 1;
    }

    filter.snapshot().save(output)?;
    info!(
        lines,
        distinct = filter.unique_count(),
        path = %output.display(),
        "filter written"
    );
    println!(
        "Inserted {lines} keys, ~{} distinct, into {}",
        filter.unique_count(),
        output.display()
    );
    Ok(())
}

fn load(
    path: &Path,
) -> Result<Box<dyn BloomFilter>, Box<dyn std::error::Error>> {
    let filter = FilterSnapshot::load(path)?.restore()?;
    info!(path = %path.display(), ways = filter.ways(), "filter loaded");
    Ok(filter)
}

fn query(
    path: &Path,
    keys: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = load(path)?;
    for key in keys {
        let verdict = if filter.test(key.as_bytes()) {
            "present"
        } else {
            "absent"
        };
        println!("{key}\t{verdict}");
    }
    Ok(())
}

fn show_info(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let filter = load(path)?;
    println!("Page Bloom Filter:");
    println!("  File: {}", path.display());
    println!("  Ways: {}", filter.ways());
    println!(
        "  Page: 2^{} = {}",
        filter.page_level(),
        bytes2hr(1 << filter.page_level())
    );
    println!("  Pages: {}", filter.page_count());
    println!("  Buffer: {}", bytes2hr(filter.data().len()));
    println!("  Capacity: {}", filter.capacity());
    println!("  Distinct items: {}", filter.unique_count());
    println!("  Fill: {}", ratio2hr(filter.fill_ratio()));
    println!("  Capacity at 1% fpr: {}", filter.virtual_capacity(0.01));
    Ok(())
}
