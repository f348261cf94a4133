pub mod auth;
pub mod codigos;
pub mod locales;
pub mod planes;
