//! Providers shipped with the worker.

mod url;

use std::sync::Arc;

use protocol::PluginId;

use crate::{RegistryError, SearchProvider};

pub use self::url::UrlProvider;

/// Every built-in provider, in registration order.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidPluginId`] if a built-in id is empty.
pub fn providers() -> Result<Vec<Arc<dyn SearchProvider>>, RegistryError> {
    let url = PluginId::try_from(url::PLUGIN_ID.to_string())?;
    Ok(vec![Arc::new(UrlProvider::new(url))])
}
