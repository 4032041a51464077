//! # Shopfront
//!
//! Cart, order and payment API for the storefront.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export CALLBACK_SECRET=$(openssl rand -hex 32)
//! export SSLCOMMERZ_STORE_ID=teststore
//! export SSLCOMMERZ_STORE_PASSWORD=teststore@ssl
//!
//! # Run the server
//! shopfront
//! ```

use shop_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Print banner
    print_banner();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.products.len());
    info!("Users loaded: {}", state.users.len());
    info!("Payment provider: {}", state.payments.provider_name());

    // Create router
    let app = routes::create_router(state);

    info!("🛒 Shopfront starting on http://{}", addr);

    if !is_prod {
        info!("📝 Health: http://{}/health", addr);
        info!("🧺 Carts: POST http://{}/api/v1/carts/", addr);
        info!("💳 Payment: POST http://{}/api/v1/payment/initiate/", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

fn print_banner() {
    println!(
        r#"
  🛒 Shopfront 🛒
  ━━━━━━━━━━━━━━━━━━━━━━━
  Carts, orders and payments
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
