pub mod fixture;
pub mod http_json;
