//! HTTP handlers for the five collection endpoints
//!
//! | method   | path                    | handler                 |
//! |----------|-------------------------|-------------------------|
//! | `GET`    | `/{collection}`         | [`collection::list`]    |
//! | `POST`   | `/{collection}`         | [`collection::create`]  |
//! | `GET`    | `/{collection}/{id}`    | [`collection::get`]     |
//! | `PUT`    | `/{collection}/{id}`    | [`collection::replace`] |
//! | `DELETE` | `/{collection}/{id}`    | [`collection::delete`]  |
//!
//! Handlers are generic over the [`DocumentStore`](crate::store::DocumentStore)
//! and share an `Arc<RestConfig<S>>` as axum state. Mount them with
//! [`rest_router`](crate::router::rest_router) rather than by hand.

pub mod collection;
mod error;

pub use error::{ApiError, ApiErrorKind, ApiOperation, ApiResult};
