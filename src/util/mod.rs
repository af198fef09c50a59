pub mod http;
pub mod text;
