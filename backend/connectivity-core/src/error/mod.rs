pub mod auth;
pub mod config;
pub mod http;
pub mod socket;

pub use auth::AuthError;
pub use config::ConfigError;
pub use http::HttpError;
pub use socket::SocketError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Http(#[from] http::HttpError),

    #[error(transparent)]
    Socket(#[from] socket::SocketError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Auth(#[from] auth::AuthError),
}
