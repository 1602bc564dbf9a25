//! Runtime setup: worker pool and logging.

use tracing_subscriber::EnvFilter;

/// Rayon thread stack size (8MB for deeply nested expression trees)
const RAYON_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Configure rayon global thread pool once at startup
pub fn configure_thread_pool(jobs: usize) {
    let mut builder = rayon::ThreadPoolBuilder::new().stack_size(RAYON_STACK_SIZE);

    if jobs > 0 {
        builder = builder.num_threads(jobs);
    }

    if let Err(e) = builder.build_global() {
        // Already configured; keep the existing pool.
        tracing::debug!("Thread pool already configured: {}", e);
    }
}

/// Get the number of worker threads to use
pub fn get_worker_count(jobs: usize) -> usize {
    if jobs == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    } else {
        jobs
    }
}

/// Filter directive for a `-v` count.
fn directive_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "cwefix=warn",
        1 => "cwefix=info",
        2 => "cwefix=debug",
        _ => "cwefix=trace",
    }
}

/// Log to stderr. `-v` flags win over `RUST_LOG`; without them `RUST_LOG`
/// applies and falls back to warnings only.
pub fn init_logging(verbosity: u8) {
    let filter = if verbosity > 0 {
        EnvFilter::new(directive_for(verbosity))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive_for(0)))
    };
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_worker_count_explicit() {
        assert_eq!(get_worker_count(4), 4);
        assert_eq!(get_worker_count(8), 8);
    }

    #[test]
    fn test_get_worker_count_auto() {
        assert!(get_worker_count(0) > 0);
    }

    #[test]
    fn test_verbosity_directives() {
        assert_eq!(directive_for(0), "cwefix=warn");
        assert_eq!(directive_for(2), "cwefix=debug");
        assert_eq!(directive_for(7), "cwefix=trace");
    }
}
