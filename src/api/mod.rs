pub mod form_state;
pub mod request;
pub mod response;
