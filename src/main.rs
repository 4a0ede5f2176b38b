use std::sync::Arc;

use coach_gateway::gateway::{self, GatewayConfig};
use coach_gateway::llm::GeminiProvider;
use coach_gateway::logging::{self, LogConfig};
use coach_gateway::persona::default_system_prompt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging first so configuration problems are reported
    let _log_guard = logging::init_logging(&LogConfig::from_env()?)?;

    tracing::info!("=== Coach Gateway v{} Starting ===", env!("CARGO_PKG_VERSION"));

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        "Environment: {}, session TTL: {}s",
        config.environment,
        config.session_ttl.as_secs()
    );

    // Gemini provider with the coach persona
    let llm = GeminiProvider::from_env()?.with_system_instruction(default_system_prompt());

    // Serve until Ctrl-C
    gateway::serve(config, Arc::new(llm)).await?;

    tracing::info!("=== Coach Gateway Stopped ===");

    Ok(())
}
