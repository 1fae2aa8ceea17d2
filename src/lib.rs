//! Extraction of Powerplay-controlled star systems from a document store.
//!
//! A [`QueryFilter`] is run against a collection through a [`Pipeline`], which
//! drains the store's cursor and decodes every matching document into a typed
//! [`System`]. Documents that fail to decode are skipped and reported as
//! diagnostics on the [`ResultSet`].

pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod parser;
pub mod pipeline;
pub mod result;
pub mod schema;
pub mod store;

pub use cli::{Cli, Commands};
pub use config::StoreConfig;
pub use error::{CursorError, DecodeError, DecodeErrorKind, QueryBuildError, RunError, StoreError};
pub use filter::{FilterValue, QueryFilter};
pub use pipeline::{run_power_query, CancelToken, Pipeline, RunOptions, RunState};
pub use result::{Diagnostic, ResultSet};
pub use schema::System;
