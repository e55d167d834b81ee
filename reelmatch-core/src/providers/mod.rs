pub mod omdb_api_provider;
pub mod traits;

pub use omdb_api_provider::{OmdbApiProvider, ProviderSettings};
pub use traits::{MetadataProvider, ProviderError, SearchCandidate};
