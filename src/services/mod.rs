pub mod data_store;
pub mod session_store;
