// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::planes::TipoPlan;

// Valor del campo `rol` en perfiles que habilita el panel de propietario.
pub const ROL_PROPIETARIO: &str = "propietario";

// Identidad mínima que entrega el servicio de auth. Solo lectura:
// el alta y la gestión de cuentas viven en el servicio externo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usuario {
    pub id: Uuid,
    pub email: String,
}

// Sesión activa contra el servicio de auth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sesion {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expira_en: Option<DateTime<Utc>>,
    pub usuario: Usuario,
}

/// Subnivel de super admin.
/// `Admin` es el administrador principal con todos los permisos;
/// `Pasante` queda limitado a los locales que él mismo creó.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nivel {
    Admin,
    Pasante,
}

// Registro de la tabla super_admins tal cual viene del servicio de datos.
// `nivel` es nullable porque hay filas anteriores a la migración que lo
// introdujo; la resolución de rol lo normaliza a pasante.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperAdmin {
    pub user_id: Uuid,
    pub nombre: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub nivel: Option<Nivel>,
}

impl SuperAdmin {
    // Nivel efectivo: pasante si la fila todavía no tiene el campo.
    pub fn nivel_efectivo(&self) -> Nivel {
        self.nivel.unwrap_or(Nivel::Pasante)
    }
}

// Registro de la tabla perfiles para un propietario de local.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Propietario {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub nombre_completo: Option<String>,
    pub rol: String,
    #[serde(default)]
    pub local_asignado_id: Option<Uuid>,
    #[serde(default)]
    pub plan: Option<TipoPlan>,
    #[serde(default)]
    pub plan_vence_en: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rol resuelto para una identidad autenticada.
///
/// Es una unión discriminada y no una jerarquía: las formas de datos y
/// los permisos de cada variante son disjuntos, y todo consumidor hace
/// `match` exhaustivo. Una identidad resuelve exactamente a una variante
/// o a ninguna (sin rol no hay acceso, no existe modo invitado).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Rol {
    SuperAdmin(SuperAdmin),
    Propietario(Propietario),
}

impl Rol {
    pub fn user_id(&self) -> Uuid {
        match self {
            Rol::SuperAdmin(admin) => admin.user_id,
            Rol::Propietario(perfil) => perfil.id,
        }
    }

    // Lista estática de capacidades del rol. El refinamiento por `nivel`
    // no vive acá: lo calcula el evaluador de permisos local por local.
    pub fn permisos(&self) -> &'static [Permiso] {
        match self {
            Rol::SuperAdmin(_) => PERMISOS_SUPER_ADMIN,
            Rol::Propietario(_) => PERMISOS_PROPIETARIO,
        }
    }

    pub fn tiene_permiso(&self, permiso: Permiso) -> bool {
        self.permisos().contains(&permiso)
    }
}

// Capacidades enumeradas, con los nombres que usa el resto de la
// plataforma en la base de datos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permiso {
    #[serde(rename = "create_local")]
    CrearLocal,
    #[serde(rename = "read_all_locales")]
    LeerTodosLosLocales,
    #[serde(rename = "update_all_locales")]
    ActualizarTodosLosLocales,
    #[serde(rename = "delete_local")]
    EliminarLocal,
    #[serde(rename = "manage_users")]
    GestionarUsuarios,
    #[serde(rename = "generate_codes")]
    GenerarCodigos,
    #[serde(rename = "read_own_local")]
    LeerLocalPropio,
    #[serde(rename = "update_own_local")]
    ActualizarLocalPropio,
}

pub const PERMISOS_SUPER_ADMIN: &[Permiso] = &[
    Permiso::CrearLocal,
    Permiso::LeerTodosLosLocales,
    Permiso::ActualizarTodosLosLocales,
    Permiso::EliminarLocal,
    Permiso::GestionarUsuarios,
    Permiso::GenerarCodigos,
];

pub const PERMISOS_PROPIETARIO: &[Permiso] = &[
    Permiso::LeerLocalPropio,
    Permiso::ActualizarLocalPropio,
];

// Metadatos que viajan con el alta de identidad; el trigger remoto los
// copia al perfil recién materializado.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataRegistro {
    pub nombre_completo: String,
    pub rol: String,
}
