//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wallet_core::config::Environment;

/// Default filter directives per environment; `RUST_LOG` replaces them
fn default_filter(env: Environment) -> &'static str {
    match env {
        Environment::Local | Environment::Dev => "walletd=debug,wallet_core=debug,tower_http=debug",
        Environment::Prod => "walletd=info,wallet_core=info,tower_http=info",
    }
}

/// Install the global subscriber.
///
/// `local` logs human-readable lines, `dev` and `prod` log JSON. Output goes
/// to stderr so `--json` command output on stdout stays clean.
pub fn init(env: Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(env)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match env {
        Environment::Local => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        Environment::Dev | Environment::Prod => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}
