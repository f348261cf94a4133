use thiserror::Error;

// Nuestro tipo de error, con `thiserror` para mejor ergonomía.
// Cada variante corresponde a una clase de fallo que el panel trata
// distinto: los errores de resolución de rol fuerzan cierre de sesión,
// los de registro se muestran al usuario tal cual, y los del gateway
// llegan con el mensaje que mandó el servidor.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de validación")]
    Validacion(#[from] validator::ValidationErrors),

    // La identidad autenticada no aparece ni en super_admins ni en
    // perfiles con rol propietario. Terminal: sin rol no hay acceso.
    #[error("Usuario sin permisos de acceso al panel")]
    SinRol,

    // La consulta de rol en sí falló (red, servicio caído). Distinto de
    // "no encontrado": también fuerza logout para no quedar a medias.
    #[error("Error al verificar permisos: {0}")]
    ConsultaPermisos(String),

    #[error("Código de invitación inválido o ya usado")]
    CodigoInvalido,

    #[error("Código no asociado a ningún local")]
    CodigoHuerfano,

    // Rechazo del alta de identidad; el mensaje viene del servicio de
    // auth (ej. email duplicado) y se pasa al usuario sin tocar.
    #[error("Error al crear cuenta: {0}")]
    Registro(String),

    #[error("No se pudo crear tu perfil. Intenta de nuevo o contacta soporte")]
    PerfilNoMaterializado,

    // Falló la asignación del local después de crear la identidad.
    // La cuenta queda creada; ver DESIGN.md.
    #[error("Error asignando local al propietario: {0}")]
    AsignacionLocal(String),

    #[error("E-mail o contraseña inválidos")]
    CredencialesInvalidas,

    #[error("No hay sesión activa")]
    SinSesion,

    // Cualquier mutación privilegiada rechazada por el backend.
    #[error("{0}")]
    Operacion(String),

    // Fallo genérico del servicio de datos remoto.
    #[error("Error del servicio de datos: {0}")]
    Datos(String),

    #[error("Error de red: {0}")]
    Http(#[from] reqwest::Error),

    // Variante genérica para cualquier otro error inesperado.
    #[error("Error interno")]
    Interno(#[from] anyhow::Error),
}
