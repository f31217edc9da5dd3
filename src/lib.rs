pub mod check;
pub mod config;
pub mod infrastructure;
pub mod optimizer;
pub mod output;
pub mod scenario;
pub mod server;
