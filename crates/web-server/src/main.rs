use std::path::Path;

// Entry point for `cargo run -p web-server`. Loads `config.toml` from the
// working directory and serves the API against Postgres.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = configuration::load_config(Path::new("config.toml"))?;
    let _guard = configuration::init_tracing(&config.logging)?;

    let state = web_server::AppState::connect(&config.database).await?;
    web_server::run_server(&config, state).await
}
