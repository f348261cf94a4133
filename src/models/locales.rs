// src/models/locales.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Nivel de ocupación del local, derivado de `capacidad_actual`.
/// Umbrales: menos de 20 vacío, 20–49 medio, 50–79 caliente, 80+ fuego.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstadoLocal {
    Vacio,
    Medio,
    Caliente,
    Fuego,
}

impl EstadoLocal {
    pub fn desde_capacidad(capacidad: u8) -> Self {
        if capacidad >= 80 {
            EstadoLocal::Fuego
        } else if capacidad >= 50 {
            EstadoLocal::Caliente
        } else if capacidad >= 20 {
            EstadoLocal::Medio
        } else {
            EstadoLocal::Vacio
        }
    }
}

// Copia de exhibición de un local. El servicio de datos remoto es el
// dueño del registro; esta estructura vive lo que dura la vista y las
// escrituras concurrentes se resuelven allá (gana la última).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Local {
    pub id: Uuid,
    pub nombre: String,
    pub tipo: String,
    pub direccion: String,
    pub latitud: f64,
    pub longitud: f64,
    pub capacidad_actual: u8,
    pub estado: EstadoLocal,
    #[serde(default)]
    pub tiempo_espera: u32,
    #[serde(default)]
    pub tiene_musica_en_vivo: bool,
    #[serde(default)]
    pub musica_actual: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub horario_apertura: Option<String>,
    #[serde(default)]
    pub horario_cierre: Option<String>,
    #[serde(default)]
    pub rango_precio: Option<String>,
    #[serde(default)]
    pub fotos: Vec<String>,
    // Quién dio de alta el local (admin o pasante); base del alcance
    // de edición de los pasantes.
    #[serde(default)]
    pub creado_por_id: Option<Uuid>,
    pub activo: bool,
    pub verificado: bool,
    #[serde(default)]
    pub codigo_invitacion: Option<String>,
    #[serde(default)]
    pub codigo_usado: bool,
    pub fecha_creacion: DateTime<Utc>,
}

// Datos del formulario de alta de local.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NuevoLocal {
    #[validate(length(min = 2, message = "El nombre debe tener al menos 2 caracteres."))]
    pub nombre: String,
    #[validate(length(min = 1, message = "El tipo de local es obligatorio."))]
    pub tipo: String,
    #[validate(length(min = 5, message = "La dirección debe tener al menos 5 caracteres."))]
    pub direccion: String,
    #[validate(range(min = -90.0, max = 90.0, message = "La latitud debe estar entre -90 y 90."))]
    pub latitud: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "La longitud debe estar entre -180 y 180."))]
    pub longitud: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
}

impl NuevoLocal {
    // Cuerpo que espera el backend al crear: el formulario más los
    // valores iniciales fijos de todo local nuevo.
    pub fn cuerpo_alta(&self) -> AltaLocal<'_> {
        AltaLocal {
            datos: self,
            estado: EstadoLocal::Vacio,
            capacidad_actual: 0,
            activo: true,
            verificado: false,
            tiene_musica_en_vivo: false,
            es_zona_segura: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AltaLocal<'a> {
    #[serde(flatten)]
    datos: &'a NuevoLocal,
    estado: EstadoLocal,
    capacidad_actual: u8,
    activo: bool,
    verificado: bool,
    tiene_musica_en_vivo: bool,
    es_zona_segura: bool,
}

/// Cuerpo de un PATCH parcial sobre un local. Solo viajan los campos
/// presentes; `Some(None)` serializa un `null` explícito para limpiar
/// un campo anulable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActualizacionLocal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitud: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitud: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacidad_actual: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<EstadoLocal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiempo_espera: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiene_musica_en_vivo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub musica_actual: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horario_apertura: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horario_cierre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rango_precio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verificado: Option<bool>,
}

impl ActualizacionLocal {
    /// Patch típico del panel de propietario: capacidad y ambiente.
    /// El estado se recalcula siempre a partir de la capacidad.
    pub fn capacidad(capacidad: u8, tiempo_espera: u32, musica_en_vivo: bool, musica: Option<String>) -> Self {
        ActualizacionLocal {
            capacidad_actual: Some(capacidad),
            estado: Some(EstadoLocal::desde_capacidad(capacidad)),
            tiempo_espera: Some(tiempo_espera),
            tiene_musica_en_vivo: Some(musica_en_vivo),
            musica_actual: Some(musica.filter(|m| !m.trim().is_empty())),
            ..Default::default()
        }
    }
}
