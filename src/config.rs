//! Process-wide configuration block (§4.13, §6): callbacks and supported-application-type mask,
//! passed explicitly into every top-level entry point rather than held in a global singleton
//! (§9 "Global callbacks in a configuration singleton").

use std::sync::Arc;

use crate::browse::BrowseEvent;
use crate::error::Error;
use crate::service::ServiceResponse;
use crate::subscription::{Notification, SubscriptionId};

/// The four application roles a session can advertise (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationType {
    Server,
    Client,
    ClientAndServer,
    DiscoveryServer,
}

impl ApplicationType {
    const fn bit(self) -> u8 {
        match self {
            Self::Server => 1 << 0,
            Self::Client => 1 << 1,
            Self::ClientAndServer => 1 << 2,
            Self::DiscoveryServer => 1 << 3,
        }
    }
}

/// Bit mask over [`ApplicationType`] (§6 `supportedApplicationTypes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplicationTypeMask(u8);

impl ApplicationTypeMask {
    pub const ALL: Self = Self(0b1111);

    #[must_use]
    pub const fn of(application_type: ApplicationType) -> Self {
        Self(application_type.bit())
    }

    #[must_use]
    pub const fn with(self, application_type: ApplicationType) -> Self {
        Self(self.0 | application_type.bit())
    }

    #[must_use]
    pub const fn contains(self, application_type: ApplicationType) -> bool {
        (self.0 & application_type.bit()) != 0
    }
}

/// Security mode for a channel (§6); security policy URIs themselves are opaque to the core and
/// passed through to the transport stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    None,
    Sign,
    SignAndEncrypt,
}

/// One entry of a `GetEndpoints` response (§6 GLOSSARY "Endpoint").
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub endpoint_uri: String,
    pub security_mode: SecurityMode,
    pub security_policy_uri: String,
}

/// One entry of a `FindServers` response (§4.9).
#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    pub application_uri: String,
    pub product_uri: String,
    pub application_name: String,
    pub application_type: ApplicationType,
    pub gateway_uri: String,
    pub discovery_profile_uri: String,
    pub discovery_urls: Vec<String>,
}

/// The callback set (§6). Every callback receives an immutable view of its payload; there is no
/// way to mutate fabric- or dispatcher-owned state through a callback.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub response: Option<Arc<dyn Fn(&ServiceResponse) + Send + Sync>>,
    pub monitored_item: Option<Arc<dyn Fn(SubscriptionId, &Notification) + Send + Sync>>,
    pub error: Option<Arc<dyn Fn(&Error) + Send + Sync>>,
    pub browse: Option<Arc<dyn Fn(&BrowseEvent) + Send + Sync>>,
    pub start: Option<Arc<dyn Fn() + Send + Sync>>,
    pub stop: Option<Arc<dyn Fn() + Send + Sync>>,
    pub network: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub endpoint_found: Option<Arc<dyn Fn(&Endpoint) + Send + Sync>>,
    pub device_found: Option<Arc<dyn Fn(&ApplicationConfig) + Send + Sync>>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

/// Application-wide configuration (§4.13, §6). Built with [`ConfigBuilder`]; immutable once built.
#[derive(Debug, Clone)]
pub struct Config {
    pub supported_application_types: ApplicationTypeMask,
    pub request_timeout_ms: u64,
    pub bind_address: String,
    pub bind_port: u16,
    pub server_name: String,
    pub application_uri: String,
    pub product_uri: String,
    pub application_name: String,
    /// Auto-start a session for each endpoint returned by `getEndpointInfo` (§4.9); default off.
    pub auto_connect_after_discovery: bool,
    pub callbacks: Callbacks,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supported_application_types: ApplicationTypeMask::of(ApplicationType::ClientAndServer),
            request_timeout_ms: 60_000,
            bind_address: "0.0.0.0".to_owned(),
            bind_port: 4840,
            server_name: String::new(),
            application_uri: String::new(),
            product_uri: String::new(),
            application_name: String::new(),
            auto_connect_after_discovery: false,
            callbacks: Callbacks::default(),
        }
    }
}

/// Builder for [`Config`], in the crate's usual consuming-builder style.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn supported_application_types(mut self, mask: ApplicationTypeMask) -> Self {
        self.config.supported_application_types = mask;
        self
    }

    #[must_use]
    pub const fn request_timeout_ms(mut self, request_timeout_ms: u64) -> Self {
        self.config.request_timeout_ms = request_timeout_ms;
        self
    }

    #[must_use]
    pub fn bind_address(mut self, bind_address: impl Into<String>) -> Self {
        self.config.bind_address = bind_address.into();
        self
    }

    #[must_use]
    pub const fn bind_port(mut self, bind_port: u16) -> Self {
        self.config.bind_port = bind_port;
        self
    }

    #[must_use]
    pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
        self.config.server_name = server_name.into();
        self
    }

    #[must_use]
    pub fn application_uri(mut self, application_uri: impl Into<String>) -> Self {
        self.config.application_uri = application_uri.into();
        self
    }

    #[must_use]
    pub fn product_uri(mut self, product_uri: impl Into<String>) -> Self {
        self.config.product_uri = product_uri.into();
        self
    }

    #[must_use]
    pub fn application_name(mut self, application_name: impl Into<String>) -> Self {
        self.config.application_name = application_name.into();
        self
    }

    #[must_use]
    pub const fn auto_connect_after_discovery(mut self, enabled: bool) -> Self {
        self.config.auto_connect_after_discovery = enabled;
        self
    }

    #[must_use]
    pub fn on_response(mut self, callback: impl Fn(&ServiceResponse) + Send + Sync + 'static) -> Self {
        self.config.callbacks.response = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_monitored_item(mut self, callback: impl Fn(SubscriptionId, &Notification) + Send + Sync + 'static) -> Self {
        self.config.callbacks.monitored_item = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.config.callbacks.error = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_browse(mut self, callback: impl Fn(&BrowseEvent) + Send + Sync + 'static) -> Self {
        self.config.callbacks.browse = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationType, ApplicationTypeMask, Config, ConfigBuilder};

    #[test]
    fn default_request_timeout_is_60_seconds() {
        assert_eq!(Config::default().request_timeout_ms, 60_000);
    }

    #[test]
    fn auto_connect_after_discovery_defaults_off() {
        assert!(!Config::default().auto_connect_after_discovery);
    }

    #[test]
    fn builder_sets_application_type_mask() {
        let config = ConfigBuilder::new()
            .supported_application_types(ApplicationTypeMask::of(ApplicationType::Client))
            .build();
        assert!(config.supported_application_types.contains(ApplicationType::Client));
        assert!(!config.supported_application_types.contains(ApplicationType::Server));
    }
}
