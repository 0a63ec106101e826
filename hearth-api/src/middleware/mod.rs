/// Tower middleware for the API server
///
/// Identity resolution lives in `hearth_shared::auth::middleware`; this
/// module holds the HTTP-only layers.

pub mod security;
