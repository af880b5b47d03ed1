pub mod cors;

pub use cors::{AllowedOrigins, cors_gate, ensure_origin_allowed};
