pub mod auth;
pub mod gateway;
pub mod locales;
pub mod permisos;
pub mod registro;
pub mod roles;

pub use auth::{AuthService, EstadoAuth, EventoAuth, SesionStore};
pub use gateway::BackendGateway;
pub use locales::LocalesService;
pub use permisos::{Permisos, separar_por_creador};
pub use registro::{PasoRegistro, RegistroExitoso, RegistroService, SolicitudRegistro};
pub use roles::RolesService;
