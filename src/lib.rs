//! Núcleo administrativo de Nightly.
//!
//! Este crate concentra la lógica de decisión del panel: resolución de
//! rol (super admin o propietario), evaluación de permisos sobre
//! locales, el alta de propietarios por código de invitación y el
//! cliente tipado del backend privilegiado. La capa de vistas consume
//! estos servicios y no decide nada por su cuenta.
//!
//! El almacenamiento (cuentas, perfiles, locales, códigos) y las
//! identidades viven en un backend gestionado; acá solo existen detrás
//! de los traits de [`db`].

pub mod common;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

pub use common::error::AppError;
pub use config::{AppState, Configuracion};
