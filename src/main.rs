use family_finance::config::Config;
use family_finance::server;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "family_finance=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let address = config.address();
    tracing::info!(
        "Starting family-finance {} on {}",
        family_finance::VERSION,
        address
    );

    let (_state, app) = server::build_app(config).expect("Failed to initialise application");

    server::serve(app, &address, server::shutdown_signal())
        .await
        .expect("Server error");
}
