//! Profiling utilities based on the `puffin` crate.
//!
//! Atlas generation is a burst of work rather than a render loop, so puffin
//! "frames" are used to delimit one generation each: call
//! [`finish_generation`] after an atlas is built and every scope recorded
//! while building it lands in the same frame of the viewer.
//!
//! Without the `profiling` feature the scope macros expand to nothing.

#[cfg(feature = "profiling")]
pub use puffin::{profile_function, profile_scope};

#[cfg(not(feature = "profiling"))]
pub use crate::{profile_function, profile_scope};

/// Profiling backend options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilingBackend {
    /// Serve profiling data to `puffin_viewer` over HTTP.
    PuffinHttp {
        /// Address the server binds to, e.g. `"127.0.0.1:8585"`.
        bind_address: String,
    },
}

impl Default for ProfilingBackend {
    fn default() -> Self {
        Self::PuffinHttp {
            bind_address: format!("127.0.0.1:{}", DEFAULT_PUFFIN_PORT),
        }
    }
}

/// Port `puffin_viewer` connects to by default.
pub const DEFAULT_PUFFIN_PORT: u16 = 8585;

#[cfg(feature = "profiling")]
static PROFILING_SERVER: std::sync::OnceLock<puffin_http::Server> = std::sync::OnceLock::new();

/// Turn on scope collection and start the requested backend.
///
/// Returns `true` when the backend is running. Calling this again after a
/// successful start is a no-op that returns `true`.
#[cfg(feature = "profiling")]
pub fn init_profiling(backend: ProfilingBackend) -> bool {
    if PROFILING_SERVER.get().is_some() {
        return true;
    }

    match backend {
        ProfilingBackend::PuffinHttp { bind_address } => {
            puffin::set_scopes_on(true);

            match puffin_http::Server::new(&bind_address) {
                Ok(server) => {
                    tracing::info!("Puffin profiler listening on http://{}", bind_address);
                    let _ = PROFILING_SERVER.set(server);
                    true
                }
                Err(e) => {
                    tracing::error!("Failed to start puffin server on {}: {}", bind_address, e);
                    false
                }
            }
        }
    }
}

/// Profiling is compiled out; nothing to start.
#[cfg(not(feature = "profiling"))]
pub fn init_profiling(_backend: ProfilingBackend) -> bool {
    false
}

/// Enable or disable scope collection without starting a server.
///
/// Useful for benchmarks that want to measure instrumented code with the
/// scopes switched on.
pub fn set_scopes_enabled(enabled: bool) {
    #[cfg(feature = "profiling")]
    puffin::set_scopes_on(enabled);
    #[cfg(not(feature = "profiling"))]
    let _ = enabled;
}

/// Close the current puffin frame.
///
/// Call once after each atlas generation so the viewer shows one frame per
/// generated atlas.
#[inline]
pub fn finish_generation() {
    #[cfg(feature = "profiling")]
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
#[doc(hidden)]
macro_rules! profile_function {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
#[doc(hidden)]
macro_rules! profile_scope {
    ($($arg:tt)*) => {};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_uses_default_port() {
        let ProfilingBackend::PuffinHttp { bind_address } = ProfilingBackend::default();
        assert!(bind_address.ends_with(&DEFAULT_PUFFIN_PORT.to_string()));
    }

    #[test]
    fn test_scopes_compile_in_plain_functions() {
        fn instrumented() -> u32 {
            profile_function!();
            profile_scope!("inner");
            7
        }

        set_scopes_enabled(true);
        assert_eq!(instrumented(), 7);
        finish_generation();
        set_scopes_enabled(false);
    }
}
