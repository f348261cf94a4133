// src/models/codigos.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const LONGITUD_CODIGO: usize = 6;

// Código de invitación de un solo uso, atado a exactamente un local.
// El registro vive en el servicio de datos remoto; al consumirse quedan
// asentados quién lo usó y cuándo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodigoInvitacion {
    pub codigo: String,
    #[serde(default)]
    pub local_id: Option<Uuid>,
    pub usado: bool,
    #[serde(default)]
    pub usado_por: Option<Uuid>,
    #[serde(default)]
    pub fecha_uso: Option<DateTime<Utc>>,
}

impl CodigoInvitacion {
    // Los códigos se comparan siempre en mayúsculas y sin espacios
    // alrededor; el formulario acepta cualquier capitalización.
    pub fn normalizar(entrada: &str) -> String {
        entrada.trim().to_uppercase()
    }
}
