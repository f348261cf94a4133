// src/db/supabase.rs
//
// Implementación HTTP de los dos traits de `db` contra el backend
// gestionado: tablas y RPC por la superficie REST, identidades por los
// endpoints de auth. Las lecturas de una sola fila van como consulta
// con `limit=1` y se toma la primera.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::{ClienteAuth, ClienteDatos};
use crate::models::auth::{MetadataRegistro, Propietario, Sesion, SuperAdmin, Usuario};
use crate::models::codigos::CodigoInvitacion;
use crate::models::locales::Local;

const SELECT_SUPER_ADMIN: &str = "user_id,nombre,email,created_at,nivel";
const SELECT_PERFIL: &str =
    "id,email,nombre_completo,rol,local_asignado_id,plan,plan_vence_en,created_at,updated_at";
const SELECT_CODIGO: &str = "codigo,local_id,usado,usado_por,fecha_uso";

pub struct SupabaseCliente {
    http: reqwest::Client,
    url: String,
    anon_key: String,
}

impl SupabaseCliente {
    pub fn new(url: &str, anon_key: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent("nightly-admin/0.1")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn rest(&self, tabla: &str) -> String {
        format!("{}/rest/v1/{}", self.url, tabla)
    }

    fn auth(&self, ruta: &str) -> String {
        format!("{}/auth/v1/{}", self.url, ruta)
    }

    // GET sobre una tabla con el token indicado; devuelve las filas.
    async fn filas<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        tabla: &str,
        consulta: &[(&str, String)],
    ) -> Result<Vec<T>, AppError> {
        let respuesta = self
            .http
            .get(self.rest(tabla))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .query(consulta)
            .send()
            .await?
            .error_for_status()?;
        Ok(respuesta.json().await?)
    }

    async fn parchear(
        &self,
        token: &str,
        tabla: &str,
        consulta: &[(&str, String)],
        cuerpo: serde_json::Value,
    ) -> Result<(), AppError> {
        self.http
            .patch(self.rest(tabla))
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(token)
            .query(consulta)
            .json(&cuerpo)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

// Formas de las respuestas del servicio de auth.

#[derive(Debug, Deserialize)]
struct UsuarioWire {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SesionWire {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UsuarioWire,
}

impl SesionWire {
    fn a_sesion(self, email_solicitado: &str) -> Sesion {
        Sesion {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expira_en: self
                .expires_in
                .map(|segundos| Utc::now() + chrono::Duration::seconds(segundos)),
            usuario: Usuario {
                id: self.user.id,
                email: self.user.email.unwrap_or_else(|| email_solicitado.to_string()),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorAuthWire {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorAuthWire {
    fn mensaje(self, status: StatusCode) -> String {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    }
}

#[derive(Debug, Deserialize)]
struct IdWire {
    #[allow(dead_code)]
    id: Uuid,
}

#[async_trait]
impl ClienteDatos for SupabaseCliente {
    async fn buscar_super_admin(&self, token: &str, user_id: Uuid) -> Result<Option<SuperAdmin>, AppError> {
        let filas: Vec<SuperAdmin> = self
            .filas(
                token,
                "super_admins",
                &[
                    ("select", SELECT_SUPER_ADMIN.into()),
                    ("user_id", format!("eq.{user_id}")),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(filas.into_iter().next())
    }

    async fn buscar_perfil(&self, token: &str, user_id: Uuid) -> Result<Option<Propietario>, AppError> {
        let filas: Vec<Propietario> = self
            .filas(
                token,
                "perfiles",
                &[
                    ("select", SELECT_PERFIL.into()),
                    ("id", format!("eq.{user_id}")),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(filas.into_iter().next())
    }

    async fn existe_perfil(&self, token: &str, user_id: Uuid) -> Result<bool, AppError> {
        let filas: Vec<IdWire> = self
            .filas(
                token,
                "perfiles",
                &[
                    ("select", "id".into()),
                    ("id", format!("eq.{user_id}")),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(!filas.is_empty())
    }

    async fn buscar_codigo_sin_usar(&self, codigo: &str) -> Result<Option<CodigoInvitacion>, AppError> {
        // Corre antes de que exista usuario: va con la clave anónima.
        let filas: Vec<CodigoInvitacion> = self
            .filas(
                &self.anon_key,
                "codigos_invitacion",
                &[
                    ("select", SELECT_CODIGO.into()),
                    ("codigo", format!("eq.{codigo}")),
                    ("usado", "eq.false".into()),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(filas.into_iter().next())
    }

    async fn asignar_local_a_perfil(
        &self,
        token: &str,
        user_id: Uuid,
        local_id: Uuid,
        nombre_completo: &str,
    ) -> Result<(), AppError> {
        self.parchear(
            token,
            "perfiles",
            &[("id", format!("eq.{user_id}"))],
            json!({
                "local_asignado_id": local_id,
                "nombre_completo": nombre_completo,
            }),
        )
        .await
    }

    async fn consumir_codigo(
        &self,
        token: &str,
        codigo: &str,
        usado_por: Uuid,
        fecha_uso: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.parchear(
            token,
            "codigos_invitacion",
            &[("codigo", format!("eq.{codigo}"))],
            json!({
                "usado": true,
                "usado_por": usado_por,
                "fecha_uso": fecha_uso,
            }),
        )
        .await
    }

    async fn generar_codigo_invitacion(&self, token: &str, local_id: Uuid) -> Result<String, AppError> {
        let respuesta = self
            .http
            .post(self.rest("rpc/generar_codigo_invitacion"))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .json(&json!({ "p_local_id": local_id }))
            .send()
            .await?
            .error_for_status()?;
        Ok(respuesta.json().await?)
    }

    async fn listar_locales(&self, token: &str) -> Result<Vec<Local>, AppError> {
        self.filas(
            token,
            "locales",
            &[
                ("select", "*".into()),
                ("order", "fecha_creacion.desc".into()),
            ],
        )
        .await
    }

    async fn obtener_local(&self, token: &str, id: Uuid) -> Result<Option<Local>, AppError> {
        let filas: Vec<Local> = self
            .filas(
                token,
                "locales",
                &[
                    ("select", "*".into()),
                    ("id", format!("eq.{id}")),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(filas.into_iter().next())
    }
}

#[async_trait]
impl ClienteAuth for SupabaseCliente {
    async fn registrar(
        &self,
        email: &str,
        password: &str,
        metadata: MetadataRegistro,
    ) -> Result<Sesion, AppError> {
        let respuesta = self
            .http
            .post(self.auth("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": {
                    "nombre_completo": metadata.nombre_completo,
                    "rol": metadata.rol,
                },
            }))
            .send()
            .await?;

        let status = respuesta.status();
        if !status.is_success() {
            let detalle: ErrorAuthWire = respuesta.json().await.unwrap_or_default();
            return Err(AppError::Registro(detalle.mensaje(status)));
        }

        // Con confirmación por e-mail activada el alta no trae token;
        // este panel requiere autoconfirmación.
        let cuerpo: serde_json::Value = respuesta.json().await?;
        if cuerpo.get("access_token").is_none() {
            return Err(AppError::Registro(
                "La cuenta quedó pendiente de confirmación por e-mail".into(),
            ));
        }
        let sesion: SesionWire =
            serde_json::from_value(cuerpo).map_err(anyhow::Error::from)?;
        Ok(sesion.a_sesion(email))
    }

    async fn iniciar_sesion(&self, email: &str, password: &str) -> Result<Sesion, AppError> {
        let respuesta = self
            .http
            .post(self.auth("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = respuesta.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(AppError::CredencialesInvalidas);
        }
        if !status.is_success() {
            let detalle: ErrorAuthWire = respuesta.json().await.unwrap_or_default();
            return Err(AppError::Datos(detalle.mensaje(status)));
        }

        let sesion: SesionWire = respuesta.json().await?;
        Ok(sesion.a_sesion(email))
    }

    async fn validar_token(&self, access_token: &str) -> Result<Option<Usuario>, AppError> {
        let respuesta = self
            .http
            .get(self.auth("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = respuesta.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        let usuario: UsuarioWire = respuesta.error_for_status()?.json().await?;
        Ok(Some(Usuario {
            id: usuario.id,
            email: usuario.email.unwrap_or_default(),
        }))
    }

    async fn cerrar_sesion(&self, access_token: &str) -> Result<(), AppError> {
        let respuesta = self
            .http
            .post(self.auth("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        // Un token ya muerto cuenta como sesión cerrada.
        if respuesta.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        respuesta.error_for_status()?;
        Ok(())
    }
}
