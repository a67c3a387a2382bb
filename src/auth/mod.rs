//! Token guard for the configuration endpoints.
//!
//! `/api/config` is protected by a shared secret sent in the `X-Token`
//! header and compared against `CONFIG_TOKEN`:
//!
//! ```ignore
//! let config_routes = Router::new()
//!     .route("/config", get(get_config).post(update_config))
//!     .route_layer(middleware::from_fn_with_state(state, require_config_token));
//! ```

pub mod middleware;

pub use middleware::{require_config_token, CONFIG_TOKEN_HEADER};
