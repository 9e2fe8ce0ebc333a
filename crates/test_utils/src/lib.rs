//! Test utilities for tilefetch.

/// Enable tracing with the RUST_LOG environment variable.
///
/// This is intended to be used in tests, so it defaults to DEBUG level.
pub fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .try_init();
}

/// Generate some random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    use rand::Rng;
    let mut out = vec![0; len];
    rand::thread_rng().fill(&mut out[..]);
    out
}

/// Poll a block until it breaks out or a timeout elapses.
///
/// The block is re-run every millisecond; break out of it when the awaited
/// condition holds. Panics when the timeout (default 1 s) is exceeded.
#[macro_export]
macro_rules! iter_check {
    ($timeout_ms:expr, $code:block) => {{
        let timeout = std::time::Duration::from_millis($timeout_ms);
        let start = std::time::Instant::now();
        loop {
            $code

            if start.elapsed() > timeout {
                panic!("iter_check timed out after {timeout:?}");
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }};
    ($code:block) => {
        $crate::iter_check!(1000, $code)
    };
}

pub mod collection;
pub mod source;
