use env_logger::Env;

/// Level-gated logging via RUST_LOG; defaults to `info`. Predicate
/// snapshots from the classifiers only appear at `trace`.
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}
