//! External signal ingestion: source connectors and normalization to the
//! canonical event schema.

pub mod connector;
pub mod connectors;
pub mod normalizer;

pub use connector::{Connector, RawItem};
pub use connectors::newsapi::NewsApiConnector;
pub use normalizer::{fingerprint, normalize, validate};
