// Start of file: src/main.rs

use sentinel_chat_api::core::logging::init_tracing;
use sentinel_chat_api::{run, AppState, EnvironmentVariables};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🚀 Starting API server...");

    // Logging first; configuration parsing reports missing values through it
    init_tracing(EnvironmentVariables::load_dotenv());

    let env: EnvironmentVariables = EnvironmentVariables::load()?;
    tracing::debug!("Loaded environment configuration: {:#?}", env);

    let state: AppState = AppState::new(env)?;
    run(state).await
}

// End of file: src/main.rs
