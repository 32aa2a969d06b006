pub mod api;
pub mod core_config;
pub mod entry;
pub mod errors;
pub mod member;
pub mod path_ops;
pub mod privilege;
pub mod sort;
