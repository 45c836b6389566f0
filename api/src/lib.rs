pub mod api;

pub use api::{build_rocket, start_webserver, ApiState};
