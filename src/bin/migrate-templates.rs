//! Bring every stored template up to the current schema.
//!
//! Usage: migrate-templates [--seed] [--force] [--animations replace|add-missing]

use portfolio_builder::compose::{AnimationPolicy, EnhanceOptions};
use portfolio_builder::{db, logging, migration, store::PgStore};
use std::env;

const USAGE: &str =
    "Usage: migrate-templates [--seed] [--force] [--animations replace|add-missing]";

struct Args {
    seed: bool,
    options: EnhanceOptions,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        seed: false,
        options: EnhanceOptions::default(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => parsed.seed = true,
            "--force" => parsed.options.force = true,
            "--animations" => {
                parsed.options.animations = match args.next().as_deref() {
                    Some("replace") => AnimationPolicy::Replace,
                    Some("add-missing") => AnimationPolicy::AddMissing,
                    other => return Err(format!("invalid --animations value: {:?}", other)),
                }
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            other => return Err(format!("unknown argument: {}\n{}", other, USAGE)),
        }
    }
    Ok(parsed)
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _guards = logging::init(&logging::LogConfig::from_env());

    let args = parse_args(env::args().skip(1)).unwrap_or_else(|e| fail(e));
    if env::var("DATABASE_URL").is_err() {
        fail("DATABASE_URL must be set");
    }

    let pool = db::init_pool(None)
        .await
        .unwrap_or_else(|e| fail(format!("Error connecting to database: {}", e)));
    if let Err(e) = db::run_migrations(&pool).await {
        fail(format!("Error preparing schema: {}", e));
    }
    let store = PgStore::new(pool);

    if args.seed {
        match migration::seed_default_templates(&store).await {
            Ok(n) => println!("Seeded {} templates", n),
            Err(e) => fail(format!("Error seeding templates: {}", e)),
        }
    }

    let report = migration::run_migration(&store, &args.options)
        .await
        .unwrap_or_else(|e| fail(format!("Error listing templates: {}", e)));

    println!("\nProcessed : {}", report.processed);
    println!("Updated   : {}", report.updated.len());
    println!("Unchanged : {}", report.unchanged.len());
    println!("Failed    : {}", report.failed.len());
    for failure in &report.failed {
        println!("  {} -> {}", failure.id, failure.error);
    }

    if !report.failed.is_empty() {
        std::process::exit(2);
    }
}
