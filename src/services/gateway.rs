// src/services/gateway.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::models::locales::{ActualizacionLocal, NuevoLocal};
use crate::models::planes::TipoPlan;
use crate::services::auth::SesionStore;

// Preflight de fotos del lado del panel; el backend vuelve a validar
// cupo y propiedad de todos modos.
const EXTENSIONES_PERMITIDAS: &[&str] = &["jpg", "jpeg", "png", "webp"];
pub const TAMANO_MAXIMO_FOTO: u64 = 5 * 1024 * 1024;

const TROZO_SUBIDA: usize = 64 * 1024;

/// Avance de una subida binaria: (bytes enviados, total).
pub type ProgresoSubida = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespuestaPresign {
    pub signed_url: String,
    pub path: String,
    pub public_url: String,
    pub fotos_actuales: u32,
    pub limite: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespuestaFotoConfirmada {
    pub url: String,
    pub fotos: Vec<String>,
    pub mensaje: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespuestaFotos {
    pub fotos: Vec<String>,
}

/// Cliente tipado del backend privilegiado.
///
/// Cada operación exige el token de la sesión vigente y un cuerpo
/// `{success: ...}` en la respuesta; estas mutaciones esquivan a
/// propósito las reglas de fila del servicio de datos porque el backend
/// aplica su propia autorización con la clave de servicio.
pub struct BackendGateway {
    http: reqwest::Client,
    base_url: String,
    sesiones: Arc<SesionStore>,
}

impl BackendGateway {
    pub fn new(base_url: &str, sesiones: Arc<SesionStore>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent("nightly-admin/0.1")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            sesiones,
        })
    }

    // Núcleo de toda operación: token, JSON y discriminador `success`.
    // Nunca sale una llamada privilegiada sin sesión.
    async fn solicitar<B: Serialize + ?Sized>(
        &self,
        metodo: Method,
        ruta: &str,
        cuerpo: Option<&B>,
    ) -> Result<Value, AppError> {
        let token = self.sesiones.token().await.ok_or(AppError::SinSesion)?;
        let url = format!("{}{}", self.base_url, ruta);

        let mut solicitud = self.http.request(metodo, &url).bearer_auth(token);
        if let Some(cuerpo) = cuerpo {
            solicitud = solicitud.json(cuerpo);
        }

        let respuesta = solicitud.send().await?;
        let status = respuesta.status();
        let cuerpo: Value = respuesta.json().await.unwrap_or(Value::Null);

        let exito = cuerpo
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !status.is_success() || !exito {
            let mensaje = cuerpo
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Error HTTP {}", status.as_u16()));
            return Err(AppError::Operacion(mensaje));
        }
        Ok(cuerpo)
    }

    // ── Rutas de administración ──────────────────────────────────

    pub async fn crear_local(&self, datos: &NuevoLocal) -> Result<Value, AppError> {
        datos.validate()?;
        self.solicitar(Method::POST, "/api/admin/locales", Some(&datos.cuerpo_alta()))
            .await
    }

    pub async fn actualizar_local(
        &self,
        id: Uuid,
        campos: &ActualizacionLocal,
    ) -> Result<Value, AppError> {
        self.solicitar(Method::PATCH, &format!("/api/admin/locales/{id}"), Some(campos))
            .await
    }

    pub async fn eliminar_local(&self, id: Uuid) -> Result<(), AppError> {
        self.solicitar::<()>(Method::DELETE, &format!("/api/admin/locales/{id}"), None)
            .await?;
        Ok(())
    }

    pub async fn asignar_plan(
        &self,
        propietario_id: Uuid,
        plan: TipoPlan,
        vence_en: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.solicitar(
            Method::PATCH,
            &format!("/api/admin/propietarios/{propietario_id}/plan"),
            Some(&json!({ "plan": plan, "plan_vence_en": vence_en })),
        )
        .await?;
        Ok(())
    }

    // ── Rutas de propietario ─────────────────────────────────────

    pub async fn actualizar_mi_local(&self, campos: &ActualizacionLocal) -> Result<Value, AppError> {
        self.solicitar(Method::PATCH, "/api/owner/local", Some(campos)).await
    }

    /// Paso (a) del protocolo de fotos: pedir el destino firmado. El
    /// backend valida acá el cupo de fotos del plan.
    pub async fn presign_foto(&self, extension: &str) -> Result<RespuestaPresign, AppError> {
        let extension = extension.to_ascii_lowercase();
        if !EXTENSIONES_PERMITIDAS.contains(&extension.as_str()) {
            return Err(AppError::Operacion(
                "Formato no permitido. Usa JPG, PNG o WebP".into(),
            ));
        }
        let cuerpo = self
            .solicitar(
                Method::POST,
                "/api/owner/local/fotos/presign",
                Some(&json!({ "extension": extension })),
            )
            .await?;
        Ok(serde_json::from_value(cuerpo).map_err(anyhow::Error::from)?)
    }

    /// Paso (b): subida binaria directa contra la URL firmada, fuera
    /// del camino JSON autenticado del gateway. El cuerpo viaja en
    /// trozos para poder reportar avance.
    pub async fn subir_foto(
        &self,
        destino: &RespuestaPresign,
        datos: Vec<u8>,
        content_type: &str,
        progreso: Option<ProgresoSubida>,
    ) -> Result<(), AppError> {
        let total = datos.len() as u64;
        if total > TAMANO_MAXIMO_FOTO {
            return Err(AppError::Operacion("La foto no puede superar 5MB".into()));
        }

        let cuerpo = match progreso {
            Some(avisar) => {
                let trozos: Vec<Vec<u8>> =
                    datos.chunks(TROZO_SUBIDA).map(|t| t.to_vec()).collect();
                let mut enviado: u64 = 0;
                let flujo = futures::stream::iter(trozos.into_iter().map(move |trozo| {
                    enviado += trozo.len() as u64;
                    avisar(enviado, total);
                    Ok::<_, std::io::Error>(trozo)
                }));
                reqwest::Body::wrap_stream(flujo)
            }
            None => reqwest::Body::from(datos),
        };

        let respuesta = self
            .http
            .put(&destino.signed_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(cuerpo)
            .send()
            .await?;

        let status = respuesta.status();
        if !status.is_success() {
            return Err(AppError::Operacion(format!(
                "La subida de la foto falló: HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }

    /// Paso (c): confirmar la subida. Recién acá el backend revalida la
    /// propiedad y agrega la foto a la lista persistida del local.
    pub async fn confirmar_foto(&self, path: &str) -> Result<RespuestaFotoConfirmada, AppError> {
        let cuerpo = self
            .solicitar(
                Method::POST,
                "/api/owner/local/fotos/confirm",
                Some(&json!({ "path": path })),
            )
            .await?;
        Ok(serde_json::from_value(cuerpo).map_err(anyhow::Error::from)?)
    }

    pub async fn eliminar_foto(&self, url: &str) -> Result<RespuestaFotos, AppError> {
        let cuerpo = self
            .solicitar(
                Method::DELETE,
                "/api/owner/local/fotos",
                Some(&json!({ "url": url })),
            )
            .await?;
        Ok(serde_json::from_value(cuerpo).map_err(anyhow::Error::from)?)
    }
}
