//! HTTP client layer for the shopkit admin API.
//!
//! Builds the full read/write path on top of `shopkit-data`:
//!
//! - [`HttpTransport`] — reqwest wrapper with status mapping and a
//!   refresh-token-and-retry-once response to 401s
//! - [`GrantType`] / [`AdminAuth`] — OAuth token acquisition
//! - [`api`] — thin endpoint wrappers (info, sync, user, state machine)
//! - [`Repository`] — search/save orchestration per entity type, speaking
//!   direct REST or the batched sync protocol
//! - [`Application`] — bootstrap: context, schema load, authentication,
//!   repository construction
//!
//! # Example
//!
//! ```no_run
//! use shopkit_client::{Application, ApplicationOptions, GrantType};
//! use shopkit_data::Criteria;
//!
//! # async fn run() -> Result<(), shopkit_client::ApiError> {
//! let app = Application::new(ApplicationOptions::new("https://shop.example.com"));
//! app.authenticate(&GrantType::password("admin", "secret")).await?;
//!
//! let products = app.repository("product")?;
//! let shirts = products.search(&Criteria::new(), app.context()).await?;
//! println!("{} products", shirts.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
mod application;
mod auth;
mod error;
mod repository;
mod transport;

pub use application::{Application, ApplicationOptions};
pub use auth::{ADMINISTRATION_CLIENT_ID, AdminAuth, GrantScope, GrantType, request_token};
pub use error::{ApiError, ApiResult};
pub use repository::{IdSearchResult, Repository, RepositoryOptions};
pub use transport::HttpTransport;
