// Library root
// ------------
// A blocking client for the Ghost Admin API plus a directory-based deploy
// workflow for posts and pages. The binary (`main.rs`) wraps it in an
// interactive menu.
//
// Module responsibilities:
// - `config`: site URL, API version and admin credentials.
// - `auth`: signs and verifies the short-lived admin tokens.
// - `transport`: the HTTP seam every request goes through.
// - `api`: the client itself, session login and site info.
// - `resource`: get/create/update/delete for posts and pages.
// - `image`: image uploads.
// - `deploy`: turns a local directory into a published post or page.
// - `ui`: terminal flows used by the binary.
pub mod api;
pub mod auth;
pub mod config;
pub mod deploy;
pub mod error;
pub mod image;
pub mod resource;
pub mod transport;
pub mod ui;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use deploy::{DeployDir, DeployMode};
pub use error::{GhostError, Result};
pub use image::UploadedImage;
pub use resource::{Fields, ResourceKind, SearchBy};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
