//! Moviehub-Common: Shared types and errors.
//!
//! This crate provides the data model every other part of moviehub speaks:
//!
//! - **Movie model**: [`Movie`], [`Rating`], [`ExternalIds`], [`AggregatedRating`]
//! - **Provider contract types**: [`ProviderResponse`], [`SearchParams`], [`ExternalIdKind`]
//! - **Watchlist model**: [`User`], [`WatchlistItem`], [`WatchStatus`]
//! - **Error Handling**: a unified [`Error`] with HTTP status mapping
//!
//! # Examples
//!
//! ```
//! use moviehub_common::{Error, Movie, Rating, Result};
//!
//! let mut movie = Movie::new("tmdb-603", "The Matrix");
//! movie.year = Some(1999);
//! movie.ratings.push(Rating::new("tmdb", 8.2, 10.0).with_votes(24_000));
//!
//! fn lookup() -> Result<Movie> {
//!     Err(Error::not_found("movie", "tmdb-0"))
//! }
//! assert!(lookup().is_err());
//! ```

pub mod error;
pub mod types;
pub mod watchlist;

pub use error::{Error, Result};
pub use types::*;
pub use watchlist::*;
