// src/services/auth.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{RwLock, broadcast};

use crate::common::error::AppError;
use crate::db::ClienteAuth;
use crate::models::auth::{Rol, Sesion, Usuario};
use crate::services::roles::RolesService;

const CAPACIDAD_EVENTOS: usize = 16;

/// Notificaciones de cambio de sesión que emite el store.
#[derive(Debug, Clone)]
pub enum EventoAuth {
    SesionIniciada(Sesion),
    SesionCerrada,
    TokenRenovado(Sesion),
}

/// Estado de sesión de todo el proceso.
///
/// Escritor único: solo los métodos de este store tocan la sesión, y
/// cada cambio sale por el canal de eventos. Se arma una vez al inicio
/// de la aplicación y se comparte con `Arc`.
pub struct SesionStore {
    auth: Arc<dyn ClienteAuth>,
    sesion: RwLock<Option<Sesion>>,
    // Distingue "la sesión venció" de "credenciales inválidas" para el
    // mensaje del login.
    expirada: AtomicBool,
    eventos: broadcast::Sender<EventoAuth>,
}

impl SesionStore {
    pub fn new(auth: Arc<dyn ClienteAuth>) -> Self {
        let (eventos, _) = broadcast::channel(CAPACIDAD_EVENTOS);
        Self {
            auth,
            sesion: RwLock::new(None),
            expirada: AtomicBool::new(false),
            eventos,
        }
    }

    /// Al arrancar la aplicación: si la capa de persistencia restauró
    /// una sesión, revalida el token antes de darla por buena.
    pub async fn inicializar(&self, persistida: Option<Sesion>) -> Result<(), AppError> {
        let Some(sesion) = persistida else {
            return Ok(());
        };
        match self.auth.validar_token(&sesion.access_token).await? {
            Some(_) => {
                *self.sesion.write().await = Some(sesion.clone());
                let _ = self.eventos.send(EventoAuth::SesionIniciada(sesion));
            }
            None => {
                tracing::info!("sesión persistida ya no es válida; se descarta");
            }
        }
        Ok(())
    }

    pub async fn iniciar_sesion(&self, email: &str, password: &str) -> Result<Sesion, AppError> {
        let sesion = self.auth.iniciar_sesion(email, password).await?;
        self.expirada.store(false, Ordering::SeqCst);
        *self.sesion.write().await = Some(sesion.clone());
        let _ = self.eventos.send(EventoAuth::SesionIniciada(sesion.clone()));
        Ok(sesion)
    }

    /// Cierra la sesión local siempre; el aviso al servicio remoto es
    /// el mejor esfuerzo y su fallo solo se registra.
    pub async fn cerrar_sesion(&self) {
        let anterior = self.sesion.write().await.take();
        if let Some(sesion) = anterior {
            if let Err(e) = self.auth.cerrar_sesion(&sesion.access_token).await {
                tracing::error!(error = %e, "error al cerrar sesión en el servicio remoto");
            }
            let _ = self.eventos.send(EventoAuth::SesionCerrada);
        }
    }

    /// Notificación de token renovado silenciosamente: solo se
    /// actualiza la sesión, sin re-resolver nada.
    pub async fn renovar_token(&self, sesion: Sesion) {
        *self.sesion.write().await = Some(sesion.clone());
        let _ = self.eventos.send(EventoAuth::TokenRenovado(sesion));
    }

    /// Re-chequeo al volver a la pestaña: si había sesión y el token ya
    /// no valida, venció. Devuelve `true` cuando expiró.
    pub async fn verificar_al_volver(&self) -> bool {
        let actual = self.sesion.read().await.clone();
        let Some(sesion) = actual else {
            return false;
        };

        let sigue_viva = matches!(
            self.auth.validar_token(&sesion.access_token).await,
            Ok(Some(_))
        );
        if sigue_viva {
            return false;
        }

        // Había sesión y ahora no hay: expiró.
        self.expirada.store(true, Ordering::SeqCst);
        self.sesion.write().await.take();
        if let Err(e) = self.auth.cerrar_sesion(&sesion.access_token).await {
            tracing::debug!(error = %e, "cierre remoto tras expiración falló");
        }
        let _ = self.eventos.send(EventoAuth::SesionCerrada);
        true
    }

    pub async fn sesion(&self) -> Option<Sesion> {
        self.sesion.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.sesion.read().await.as_ref().map(|s| s.access_token.clone())
    }

    pub fn sesion_expirada(&self) -> bool {
        self.expirada.load(Ordering::SeqCst)
    }

    pub fn suscribir(&self) -> broadcast::Receiver<EventoAuth> {
        self.eventos.subscribe()
    }
}

/// Resultado de autenticación que consume la capa de vistas.
#[derive(Debug, Clone)]
pub enum EstadoAuth {
    NoAutenticado { expirada: bool },
    Autenticado { usuario: Usuario, rol: Rol },
}

// Orquesta sesión + rol. El rol se re-deriva desde cero en cada cambio
// de sesión; nunca se parchea uno viejo.
#[derive(Clone)]
pub struct AuthService {
    sesiones: Arc<SesionStore>,
    roles: RolesService,
}

impl AuthService {
    pub fn new(sesiones: Arc<SesionStore>, roles: RolesService) -> Self {
        Self { sesiones, roles }
    }

    /// Estado para la sesión vigente. Si la resolución de rol falla,
    /// fuerza el cierre de sesión antes de propagar el error: la vista
    /// no puede quedar a medio autorizar.
    pub async fn estado_actual(&self) -> Result<EstadoAuth, AppError> {
        let Some(sesion) = self.sesiones.sesion().await else {
            return Ok(EstadoAuth::NoAutenticado {
                expirada: self.sesiones.sesion_expirada(),
            });
        };

        match self
            .roles
            .resolver(&sesion.access_token, sesion.usuario.id)
            .await
        {
            Ok(rol) => Ok(EstadoAuth::Autenticado {
                usuario: sesion.usuario,
                rol,
            }),
            Err(e) => {
                tracing::error!(error = %e, "no se pudo resolver el rol; se cierra la sesión");
                self.sesiones.cerrar_sesion().await;
                Err(e)
            }
        }
    }

    /// Login de los paneles: inicia sesión y resuelve el rol en un
    /// paso. El mismo contrato que `estado_actual` ante fallos.
    pub async fn entrar(&self, email: &str, password: &str) -> Result<EstadoAuth, AppError> {
        self.sesiones.iniciar_sesion(email, password).await?;
        self.estado_actual().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::db::memoria::{AuthEnMemoria, DatosEnMemoria};
    use crate::models::auth::{Nivel, SuperAdmin};

    fn sesion_de(usuario: Usuario) -> Sesion {
        Sesion {
            access_token: "token-restaurado".into(),
            refresh_token: None,
            expira_en: None,
            usuario,
        }
    }

    #[tokio::test]
    async fn verificar_al_volver_marca_la_expiracion() {
        let auth = Arc::new(AuthEnMemoria::nueva());
        let store = SesionStore::new(auth.clone());
        let usuario = Usuario {
            id: Uuid::new_v4(),
            email: "admin@nightly.app".into(),
        };
        store.inicializar(Some(sesion_de(usuario))).await.unwrap();
        assert!(store.sesion().await.is_some());

        let mut eventos = store.suscribir();

        // el token muere mientras la pestaña estaba en segundo plano
        auth.token_valido.store(false, Ordering::SeqCst);
        assert!(store.verificar_al_volver().await);

        assert!(store.sesion().await.is_none());
        assert!(store.sesion_expirada());
        assert!(matches!(eventos.recv().await, Ok(EventoAuth::SesionCerrada)));
        // y el token se dio de baja del lado remoto
        assert_eq!(auth.tokens_cerrados.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sin_sesion_no_hay_expiracion_que_detectar() {
        let auth = Arc::new(AuthEnMemoria::nueva());
        let store = SesionStore::new(auth);
        assert!(!store.verificar_al_volver().await);
        assert!(!store.sesion_expirada());
    }

    #[tokio::test]
    async fn iniciar_sesion_limpia_la_marca_de_expirada() {
        let auth = Arc::new(AuthEnMemoria::nueva());
        let store = SesionStore::new(auth.clone());
        let usuario = Usuario {
            id: Uuid::new_v4(),
            email: "admin@nightly.app".into(),
        };
        store.inicializar(Some(sesion_de(usuario))).await.unwrap();

        auth.token_valido.store(false, Ordering::SeqCst);
        store.verificar_al_volver().await;
        assert!(store.sesion_expirada());

        auth.token_valido.store(true, Ordering::SeqCst);
        store.iniciar_sesion("admin@nightly.app", "secreta").await.unwrap();
        assert!(!store.sesion_expirada());
        assert!(store.sesion().await.is_some());
    }

    #[tokio::test]
    async fn un_fallo_de_rol_fuerza_el_cierre_de_sesion() {
        let auth = Arc::new(AuthEnMemoria::nueva());
        let datos = Arc::new(DatosEnMemoria::default());
        // identidad sin fila en ninguna tabla: resolución falla con SinRol

        let store = Arc::new(SesionStore::new(auth));
        let servicio = AuthService::new(store.clone(), RolesService::new(datos));

        let resultado = servicio.entrar("nadie@nightly.app", "secreta").await;
        assert!(matches!(resultado, Err(AppError::SinRol)));
        // la sesión no queda a medio autorizar
        assert!(store.sesion().await.is_none());
    }

    #[tokio::test]
    async fn entrar_resuelve_el_rol_de_un_super_admin() {
        let auth = Arc::new(AuthEnMemoria::nueva());
        let datos = Arc::new(DatosEnMemoria::default());

        // el alta define el id que luego emitirá el login
        let sesion_alta = auth
            .registrar(
                "admin@nightly.app",
                "secreta",
                crate::models::auth::MetadataRegistro {
                    nombre_completo: "Admin".into(),
                    rol: "super_admin".into(),
                },
            )
            .await
            .unwrap();
        datos.super_admins.lock().unwrap().push(SuperAdmin {
            user_id: sesion_alta.usuario.id,
            nombre: "Admin".into(),
            email: "admin@nightly.app".into(),
            created_at: Utc::now(),
            nivel: Some(Nivel::Admin),
        });

        let store = Arc::new(SesionStore::new(auth));
        let servicio = AuthService::new(store.clone(), RolesService::new(datos));

        match servicio.entrar("admin@nightly.app", "secreta").await.unwrap() {
            EstadoAuth::Autenticado { rol, .. } => assert!(matches!(rol, Rol::SuperAdmin(_))),
            otro => panic!("esperaba autenticado, vino {otro:?}"),
        }
    }
}
