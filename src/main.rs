use anyhow::{Context, Result};
use powerplay_extract::{
    cli::{Cli, Commands, StoreArgs},
    config::StoreConfig,
    pipeline::{run_power_query, CancelToken, RunOptions},
    result::ResultSet,
    schema::SYSTEM_FIELDS,
    store::import_collection,
};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("powerplay_extract=info".parse()?),
        )
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Query {
            store,
            power,
            states,
            workers,
            batch_size,
            timeout_secs,
            best_effort,
            json,
        } => {
            let config = store_config(store)?;
            let options = RunOptions {
                decode_workers: workers,
                batch_size,
                best_effort,
            };
            let cancel = match timeout_secs {
                Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
                None => CancelToken::new(),
            };

            match run_power_query(&config, &power, &states, options, &cancel) {
                Ok(results) => print_results(&results, json)?,
                Err(err) => {
                    if let Some(partial) = err.partial() {
                        println!("Partial results before failure:");
                        print_results(partial, json)?;
                    }
                    return Err(err).with_context(|| {
                        format!("Query on {:?} failed", config.database_path())
                    });
                }
            }
        }

        Commands::Import {
            input,
            store,
            replace,
        } => {
            let start = Instant::now();
            let config = store_config(store)?;

            println!("Importing {:?}...", input);
            let count = import_collection(&config, &input, replace)?;

            println!(
                "\nImported {} documents into {:?} in {:.1}s",
                count,
                config.database_path(),
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Fields => {
            println!("Filterable fields:\n");
            for field in SYSTEM_FIELDS {
                let kind = if field.multi {
                    format!("{}[]", field.field_type)
                } else {
                    field.field_type.to_string()
                };
                println!("  {:32} {:10} {}", field.path, kind, field.description);
            }
        }
    }

    Ok(())
}

fn store_config(args: StoreArgs) -> Result<StoreConfig> {
    StoreConfig::resolve(args.endpoint, args.database, args.collection)
}

fn print_results(results: &ResultSet, json: bool) -> Result<()> {
    if json {
        for system in results {
            println!("{}", serde_json::to_string(system)?);
        }
    } else {
        println!("Retrieved systems:");
        for system in results {
            println!(
                "Name: {}, Population: {}, Economy: {}",
                system.name,
                system.population,
                system.primary_economy.as_deref().unwrap_or("None")
            );
        }
    }

    for diagnostic in results.diagnostics() {
        eprintln!("Skipped document #{}: {}", diagnostic.position, diagnostic.error);
    }

    if results.is_truncated() {
        eprintln!("Output is truncated");
    }

    Ok(())
}
