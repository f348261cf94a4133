// src/services/roles.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::ClienteDatos;
use crate::models::auth::{ROL_PROPIETARIO, Rol};

// Resolución de rol: dada una identidad autenticada, exactamente una
// variante de `Rol` o error. Consulta pura, sin reintentos; quien llama
// decide qué hacer ante el fallo (en la práctica, cerrar la sesión).
#[derive(Clone)]
pub struct RolesService {
    datos: Arc<dyn ClienteDatos>,
}

impl RolesService {
    pub fn new(datos: Arc<dyn ClienteDatos>) -> Self {
        Self { datos }
    }

    pub async fn resolver(&self, token: &str, user_id: Uuid) -> Result<Rol, AppError> {
        // 1. ¿Es super admin? Esta tabla se consulta primero: si una
        //    identidad aparece en ambas, gana super admin.
        let admin = self
            .datos
            .buscar_super_admin(token, user_id)
            .await
            .map_err(|e| {
                tracing::error!(%user_id, error = %e, "error consultando super_admins");
                AppError::ConsultaPermisos("Error al verificar permisos de administrador".into())
            })?;

        if let Some(mut admin) = admin {
            // Garantiza un nivel válido aunque la migración que agregó
            // la columna no haya corrido todavía.
            admin.nivel = Some(admin.nivel_efectivo());
            return Ok(Rol::SuperAdmin(admin));
        }

        // 2. ¿Es propietario?
        let perfil = self
            .datos
            .buscar_perfil(token, user_id)
            .await
            .map_err(|e| {
                tracing::error!(%user_id, error = %e, "error consultando perfiles");
                AppError::ConsultaPermisos("Error al verificar perfil de propietario".into())
            })?;

        if let Some(perfil) = perfil
            && perfil.rol == ROL_PROPIETARIO
        {
            // Aunque no tenga local asignado: la vista distingue ese
            // caso con su propio mensaje, no es un fallo de resolución.
            return Ok(Rol::Propietario(perfil));
        }

        // 3. Sin rol reconocido.
        Err(AppError::SinRol)
    }
}
