/// Quiz Server binary
use quiz_server::{config::ServerConfig, context::AppContext, error::QuizResult, jobs, server};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> QuizResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let filter = config.logging.env_filter();
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    print_banner();

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   ____        _
  / __ \__  __(_)___
 / / / / / / / /_  /
/ /_/ / /_/ / / / /_
\___\_\__,_/_/ /___/

        Quiz Server v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
