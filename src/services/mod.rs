//! External service integrations

pub mod artwork;
pub mod composer;
pub mod logging;
pub mod met;
pub mod oauth;
pub mod rate_limiter;
pub mod rijksmuseum;
pub mod sources;
pub mod twitter;

pub use artwork::{ArtworkRecord, ImageAcquirer, StoredImage};
pub use composer::{ComposedPost, MAX_POST_CHARS, PostTemplate};
pub use logging::init_tracing;
pub use met::MetClient;
pub use oauth::OAuthSigner;
pub use rijksmuseum::RijksmuseumClient;
pub use sources::{Source, SourceKind, SourceRegistry};
pub use twitter::{PublishedPost, Publisher, TwitterPublisher};
