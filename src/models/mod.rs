pub mod goals;
pub mod oauth;
pub mod sheets;
