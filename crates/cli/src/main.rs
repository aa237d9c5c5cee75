use clap::Parser;
use featurematch::pipeline::{recognize, Database};
use featurematch_core::{config, FeatureIndex, KdTreeConfig};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "featurematch",
    about = "Recognize objects in images by voting over nearest reference descriptors"
)]
struct Args {
    /// Label table: one `label<TAB>name` row per object class
    #[arg(long, default_value = config::DEFAULT_OBJECTS_FILE)]
    objects: PathBuf,

    /// Reference descriptors: `label<TAB>source<TAB>components...` rows
    #[arg(long, default_value = config::DEFAULT_DESCRIPTIONS_FILE)]
    descriptions: PathBuf,

    /// Maximum points per kd-tree leaf
    #[arg(long, default_value_t = config::DEFAULT_BUCKET_CAPACITY)]
    bucket_capacity: usize,

    /// Points examined per descriptor search (higher = more exact, slower)
    #[arg(long, default_value_t = config::DEFAULT_CHECK_BUDGET)]
    checks: usize,

    /// Print one JSON report per query instead of a text summary
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Emit log records as JSON
    #[arg(long, default_value_t = false)]
    log_json: bool,

    /// Query keypoint files to recognize
    #[arg(required = true)]
    queries: Vec<PathBuf>,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::from_default_env()
        .add_directive("featurematch=info".parse().expect("valid directive literal"))
        .add_directive(
            "featurematch_core=info"
                .parse()
                .expect("valid directive literal"),
        );
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_json);

    if args.checks == 0 {
        eprintln!("Error: checks must be > 0");
        std::process::exit(1);
    }
    if args.bucket_capacity == 0 {
        eprintln!("Error: bucket_capacity must be > 0");
        std::process::exit(1);
    }

    let start = Instant::now();
    let db = Database::load(&args.objects, &args.descriptions)?;
    tracing::info!(
        classes = db.names().len(),
        descriptors = db.descriptors().vectors.len(),
        dimension = db.descriptors().vectors.dimension(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Database loaded"
    );
    if db.descriptors().vectors.is_empty() {
        tracing::warn!("Descriptor database is empty; every query will report no match");
    }

    let index = FeatureIndex::with_config(
        &db.descriptors().vectors,
        KdTreeConfig {
            bucket_capacity: args.bucket_capacity,
            check_budget: args.checks,
        },
    )?;

    let mut failed = 0usize;
    for query in &args.queries {
        match recognize(&index, &db, query, index.config.check_budget) {
            Ok(report) if args.json => println!("{}", serde_json::to_string(&report)?),
            Ok(report) => println!("{}", report.summary()),
            Err(e) => {
                failed += 1;
                tracing::error!(query = %query.display(), error = %e, "Recognition failed");
                eprintln!("Error: {}: {}", query.display(), e);
            }
        }
    }

    if failed > 0 {
        tracing::warn!(failed, total = args.queries.len(), "Some queries failed");
        std::process::exit(1);
    }
    Ok(())
}
