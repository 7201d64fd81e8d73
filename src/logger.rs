use tracing_subscriber::EnvFilter;

use crate::env;

/// Initializes the global subscriber. `level` comes from `-v`/`-q` flags and
/// wins over `DROVER_LOG`.
pub fn init(level: Option<log::LevelFilter>) {
    let level = level.unwrap_or(*env::DROVER_LOG);
    let filter = EnvFilter::new(level.to_string().to_lowercase());
    let _ = tracing_log::LogTracer::init();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
