use dotenvy::dotenv;
use financeflow::{
    api::{self, Method},
    config::{self, catalog},
    errors::{Error, Result},
};
use std::io::Read;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: financeflow <GET|POST|PUT|DELETE> <path> [body.json | -]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load .env file; env vars can be set externally
    dotenv().ok();

    // 3. Parse the request before touching the database
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (method, path, body_source) = match args.as_slice() {
        [method, path] => (method.parse::<Method>()?, path.clone(), None),
        [method, path, source] => (method.parse::<Method>()?, path.clone(), Some(source.clone())),
        _ => {
            return Err(Error::Config {
                message: USAGE.to_string(),
            });
        }
    };
    let body = body_source.map(|source| read_body(&source)).transpose()?;

    // 4. Connect and make sure the schema exists
    let db = config::database::create_connection()
        .await
        .inspect(|_| info!("Database connected."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    config::database::create_tables(&db).await?;

    // 5. Seed the template catalog when a config file is present
    let catalog_path = catalog::config_path();
    if catalog_path.exists() {
        let loaded = catalog::load_catalog(&catalog_path)?;
        catalog::seed_catalog(&db, &loaded)
            .await
            .inspect(|created| info!("Catalog seeded, {} new template(s).", created))
            .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;
    } else {
        info!("No catalog at {}, skipping seed.", catalog_path.display());
    }

    // 6. Run the request
    let response = api::dispatch(&db, method, &path, body.as_deref()).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

fn read_body(source: &str) -> Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(source).map_err(Into::into)
    }
}
