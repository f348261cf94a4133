// src/db/mod.rs
//
// Fronteras hacia los dos servicios gestionados: el relacional
// (tablas + RPC) y el de identidades. El resto del crate solo conoce
// estos traits; la implementación HTTP vive en `supabase`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::auth::{MetadataRegistro, Propietario, Sesion, SuperAdmin, Usuario};
use crate::models::codigos::CodigoInvitacion;
use crate::models::locales::Local;

pub mod supabase;
pub use supabase::SupabaseCliente;

// Servicio de datos relacional remoto. Las operaciones que corren en
// nombre de un usuario reciben su token; las filas visibles dependen de
// las reglas de acceso del lado remoto.
#[async_trait]
pub trait ClienteDatos: Send + Sync {
    async fn buscar_super_admin(&self, token: &str, user_id: Uuid) -> Result<Option<SuperAdmin>, AppError>;

    async fn buscar_perfil(&self, token: &str, user_id: Uuid) -> Result<Option<Propietario>, AppError>;

    /// Sondeo liviano: ¿ya materializó el trigger remoto el perfil?
    async fn existe_perfil(&self, token: &str, user_id: Uuid) -> Result<bool, AppError>;

    /// Busca un código con `usado = false`. Un código consumido es,
    /// a todos los efectos, inexistente.
    async fn buscar_codigo_sin_usar(&self, codigo: &str) -> Result<Option<CodigoInvitacion>, AppError>;

    async fn asignar_local_a_perfil(
        &self,
        token: &str,
        user_id: Uuid,
        local_id: Uuid,
        nombre_completo: &str,
    ) -> Result<(), AppError>;

    async fn consumir_codigo(
        &self,
        token: &str,
        codigo: &str,
        usado_por: Uuid,
        fecha_uso: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// RPC del lado remoto que genera y ata un código de 6 caracteres
    /// al local indicado.
    async fn generar_codigo_invitacion(&self, token: &str, local_id: Uuid) -> Result<String, AppError>;

    async fn listar_locales(&self, token: &str) -> Result<Vec<Local>, AppError>;

    async fn obtener_local(&self, token: &str, id: Uuid) -> Result<Option<Local>, AppError>;
}

// Servicio de identidades remoto.
#[async_trait]
pub trait ClienteAuth: Send + Sync {
    /// Alta de identidad con metadatos. Devuelve la sesión recién
    /// emitida; el rechazo llega como `AppError::Registro` con el
    /// mensaje del servicio.
    async fn registrar(
        &self,
        email: &str,
        password: &str,
        metadata: MetadataRegistro,
    ) -> Result<Sesion, AppError>;

    async fn iniciar_sesion(&self, email: &str, password: &str) -> Result<Sesion, AppError>;

    /// `None` cuando el token ya no identifica a nadie (revocado o
    /// vencido); `Err` solo ante fallos de transporte.
    async fn validar_token(&self, access_token: &str) -> Result<Option<Usuario>, AppError>;

    async fn cerrar_sesion(&self, access_token: &str) -> Result<(), AppError>;
}
