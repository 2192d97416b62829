pub mod codegen;
pub mod extract;
pub mod oauth;
pub mod sheets;
