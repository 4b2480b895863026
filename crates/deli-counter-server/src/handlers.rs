//! Static page served to browser viewers.
//!
//! `GET /` returns a fixed HTML document whose script opens the viewer
//! socket and renders every value it receives. The page never reads the
//! counter itself; the socket's welcome message fills it in.

use axum::response::{Html, IntoResponse};

/// The viewer page, embedded at compile time.
pub const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Serve the "Deli Now Serving" viewer page.
///
/// # Route
///
/// `GET /`
pub async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}
