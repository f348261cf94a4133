pub mod error;
pub mod reloj;
