//! Provider table
//!
//! Plugins are made available by submitting a [`ProviderEntry`] into a link-time
//! table with the [`plugin_provider!`](crate::plugin_provider) macro. Each entry pairs
//! the plugin's co-located manifest text with a construction function. The catalog
//! reads the table through the [`ProviderRegistry`] trait so that embedders and tests
//! can supply an explicit list instead.

use crate::plugin::fault::BoxError;
use crate::plugin::traits::Plugin;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Construction function stored in the link-time table
pub type ProviderFactory = fn() -> Result<Arc<dyn Plugin>, BoxError>;

/// Entry in the link-time provider table
pub struct ProviderEntry {
    /// Module that submitted the entry, used in construction fault messages
    pub origin: &'static str,
    /// Manifest text (TOML)
    pub manifest: &'static str,
    pub factory: ProviderFactory,
}

inventory::collect!(ProviderEntry);

/// Register a plugin provider in the link-time table
///
/// ```ignore
/// plughost::plugin_provider!(include_str!("plugin.toml"), || Ok(Arc::new(MyPlugin::new())));
/// ```
#[macro_export]
macro_rules! plugin_provider {
    ($manifest:expr, $factory:expr) => {
        $crate::inventory::submit! {
            $crate::plugin::api::ProviderEntry {
                origin: module_path!(),
                manifest: $manifest,
                factory: $factory,
            }
        }
    };
}

type DynFactory = dyn Fn() -> Result<Arc<dyn Plugin>, BoxError> + Send + Sync;

/// A provider as seen by the catalog
#[derive(Clone)]
pub struct Provider {
    origin: Cow<'static, str>,
    manifest: Cow<'static, str>,
    factory: Arc<DynFactory>,
}

impl Provider {
    pub fn new<F>(
        origin: impl Into<Cow<'static, str>>,
        manifest: impl Into<Cow<'static, str>>,
        factory: F,
    ) -> Self
    where
        F: Fn() -> Result<Arc<dyn Plugin>, BoxError> + Send + Sync + 'static,
    {
        Self {
            origin: origin.into(),
            manifest: manifest.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn manifest(&self) -> &str {
        &self.manifest
    }

    pub fn construct(&self) -> Result<Arc<dyn Plugin>, BoxError> {
        (self.factory)()
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl From<&'static ProviderEntry> for Provider {
    fn from(entry: &'static ProviderEntry) -> Self {
        let factory = entry.factory;
        Self {
            origin: Cow::Borrowed(entry.origin),
            manifest: Cow::Borrowed(entry.manifest),
            factory: Arc::new(factory),
        }
    }
}

/// Source of providers for the catalog
pub trait ProviderRegistry: Send + Sync {
    fn providers(&self) -> Vec<Provider>;
}

/// Every provider linked into the binary via `plugin_provider!`
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkedProviders;

impl ProviderRegistry for LinkedProviders {
    fn providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = inventory::iter::<ProviderEntry>()
            .map(Provider::from)
            .collect();
        // Link order is unspecified; keep discovery deterministic
        providers.sort_by(|a, b| a.origin.cmp(&b.origin));
        providers
    }
}

/// An explicit, ordered provider list
#[derive(Debug, Default, Clone)]
pub struct StaticProviders {
    providers: Vec<Provider>,
}

impl StaticProviders {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub fn with(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }
}

impl ProviderRegistry for StaticProviders {
    fn providers(&self) -> Vec<Provider> {
        self.providers.clone()
    }
}
