use std::error::Error;

mod telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file when one exists.
    let dotenv = dotenvy::dotenv();

    telemetry::init()?;

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => tracing::debug!("no .env file; using process environment"),
        Err(e) => return Err(e.into()),
    }

    api::start().await?;

    Ok(())
}
