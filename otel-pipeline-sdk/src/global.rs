//! Process-wide provider slot.
//!
//! The slot is set once at startup. Exit hooks call [`shutdown_provider`] to
//! flush whatever is still queued.
use crate::error::{SdkError, SdkResult};
use crate::otel_debug;
use crate::provider::Provider;
use std::sync::{OnceLock, RwLock};

static GLOBAL_PROVIDER: OnceLock<RwLock<Option<Provider>>> = OnceLock::new();

#[inline]
fn slot() -> &'static RwLock<Option<Provider>> {
    GLOBAL_PROVIDER.get_or_init(|| RwLock::new(None))
}

/// Install `provider` as the process-wide provider.
///
/// Fails if a provider is already installed; the existing one stays.
pub fn set_provider(provider: Provider) -> SdkResult {
    let mut global = slot().write()?;
    if global.is_some() {
        return Err(SdkError::InternalFailure(
            "a global provider is already installed".into(),
        ));
    }
    *global = Some(provider);
    otel_debug!(name: "Global.ProviderSet");
    Ok(())
}

/// The installed provider, if any.
pub fn provider() -> Option<Provider> {
    slot().read().ok().and_then(|global| global.clone())
}

/// Shut down the installed provider. Safe to call from exit hooks and more
/// than once. Returns `Ok` when no provider is installed.
pub fn shutdown_provider() -> SdkResult {
    match provider() {
        Some(provider) => provider.shutdown(),
        None => Ok(()),
    }
}

/// Empty the slot so that tests can install another provider.
#[doc(hidden)]
pub fn reset_for_tests() {
    if let Ok(mut global) = slot().write() {
        global.take();
    }
}
