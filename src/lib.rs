// Error types shared by every layer
pub mod error;

// Ephemeral key/value storage (memory or Redis)
pub mod store;

// OAuth2 authorization code flow
pub mod oauth;

// Normalized item model and connector trait
pub mod item;
pub mod connector;

// Provider connectors
pub mod connectors;

// Service configuration
pub mod config;

// HTTP API
pub mod api;

pub use connector::Connector;
pub use error::ConnectorError;
pub use item::IntegrationItem;
