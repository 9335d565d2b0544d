use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Output goes to stderr so that `status`
/// JSON on stdout stays machine-readable.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "reelpipe=debug" } else { "reelpipe=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
