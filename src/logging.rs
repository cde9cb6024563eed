//! Global tracing subscriber setup

use std::sync::Once;

static INIT: Once = Once::new();

/// Install a tracing subscriber for this crate's log output.
///
/// On wasm32 events go to the browser console through `tracing-wasm`, and
/// panics are reported there too. Elsewhere a `fmt` subscriber filtered by
/// `RUST_LOG` (default `info`) writes to stderr. Calling this more than once
/// is harmless, as is calling it after another subscriber was installed.
pub fn init_logging() {
    INIT.call_once(|| {
        #[cfg(target_arch = "wasm32")]
        {
            console_error_panic_hook::set_once();
            let _ = tracing_wasm::try_set_as_global_default();
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            use tracing_subscriber::EnvFilter;

            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }

        tracing::debug!("Logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging();
        init_logging();
    }
}
