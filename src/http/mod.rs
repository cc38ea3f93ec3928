pub mod dns_resolver;
pub mod handler;
