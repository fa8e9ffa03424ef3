//! Concrete catalog provider implementations.
//!
//! Each submodule wraps a single external API and implements the
//! [`MovieProvider`](super::MovieProvider) trait.

pub mod http;
pub mod omdb;
pub mod tmdb;
pub mod tvmaze;

pub use omdb::OmdbProvider;
pub use tmdb::TmdbProvider;
pub use tvmaze::TvmazeProvider;
