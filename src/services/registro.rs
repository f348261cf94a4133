// src/services/registro.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::watch;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::common::reloj::Reloj;
use crate::db::{ClienteAuth, ClienteDatos};
use crate::models::auth::{MetadataRegistro, ROL_PROPIETARIO, Usuario};
use crate::models::codigos::CodigoInvitacion;
use crate::services::auth::SesionStore;

// Sondeo del perfil: 5 intentos con esperas 0, 200, 400, 800 y 1600 ms
// (~3 s acumulados antes del último intento).
const MAX_INTENTOS_PERFIL: u32 = 5;
const RETRASO_BASE_MS: u64 = 200;

/// Paso vigente del registro de propietario. Cada paso termina por
/// completo (incluidas sus esperas) antes de que empiece el siguiente;
/// `Fallido` es alcanzable desde cualquiera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasoRegistro {
    Inactivo,
    ValidandoCodigo,
    CreandoCuenta,
    EsperandoPerfil,
    AsignandoLocal,
    ConsumiendoCodigo,
    IniciandoSesion,
    Completado,
    Fallido,
}

// Formulario de registro con código de invitación.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SolicitudRegistro {
    #[validate(length(equal = 6, message = "El código debe tener 6 caracteres."))]
    pub codigo_invitacion: String,
    #[validate(length(min = 2, message = "El nombre debe tener al menos 2 caracteres."))]
    pub nombre_completo: String,
    #[validate(email(message = "El e-mail proporcionado es inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres."))]
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RegistroExitoso {
    pub usuario: Usuario,
    pub local_id: Uuid,
    /// `false` cuando el login automático falló: la cuenta quedó bien
    /// creada y vinculada, solo hace falta entrar a mano.
    pub sesion_iniciada: bool,
}

/// Alta de propietarios por código de invitación.
///
/// El flujo es secuencial y sin cancelación a mitad de camino: validar
/// código → crear identidad → esperar el perfil (el trigger que lo crea
/// corre en el servicio remoto) → vincular local → consumir código →
/// login automático.
pub struct RegistroService {
    datos: Arc<dyn ClienteDatos>,
    auth: Arc<dyn ClienteAuth>,
    sesiones: Arc<SesionStore>,
    reloj: Arc<dyn Reloj>,
    paso: watch::Sender<PasoRegistro>,
    // mantiene vivo el canal aunque nadie observe
    _paso_rx: watch::Receiver<PasoRegistro>,
}

impl RegistroService {
    pub fn new(
        datos: Arc<dyn ClienteDatos>,
        auth: Arc<dyn ClienteAuth>,
        sesiones: Arc<SesionStore>,
        reloj: Arc<dyn Reloj>,
    ) -> Self {
        let (paso, paso_rx) = watch::channel(PasoRegistro::Inactivo);
        Self {
            datos,
            auth,
            sesiones,
            reloj,
            paso,
            _paso_rx: paso_rx,
        }
    }

    /// Canal de observación del paso vigente, para la barra de progreso
    /// del formulario.
    pub fn observar_paso(&self) -> watch::Receiver<PasoRegistro> {
        self.paso.subscribe()
    }

    pub async fn registrar(&self, solicitud: SolicitudRegistro) -> Result<RegistroExitoso, AppError> {
        match self.ejecutar(solicitud).await {
            Ok(resultado) => {
                self.avanzar(PasoRegistro::Completado);
                Ok(resultado)
            }
            Err(e) => {
                self.avanzar(PasoRegistro::Fallido);
                Err(e)
            }
        }
    }

    async fn ejecutar(&self, solicitud: SolicitudRegistro) -> Result<RegistroExitoso, AppError> {
        solicitud.validate()?;
        let codigo = CodigoInvitacion::normalizar(&solicitud.codigo_invitacion);
        let email = solicitud.email.trim();
        let nombre = solicitud.nombre_completo.trim();

        // 1. Validar el código de invitación.
        self.avanzar(PasoRegistro::ValidandoCodigo);
        let registro_codigo = self
            .datos
            .buscar_codigo_sin_usar(&codigo)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "error validando código de invitación");
                AppError::Datos("Error al validar código de invitación".into())
            })?;
        let Some(registro_codigo) = registro_codigo else {
            return Err(AppError::CodigoInvalido);
        };
        let Some(local_id) = registro_codigo.local_id else {
            return Err(AppError::CodigoHuerfano);
        };

        // 2. Crear la identidad en el servicio de auth.
        self.avanzar(PasoRegistro::CreandoCuenta);
        let sesion_alta = self
            .auth
            .registrar(
                email,
                &solicitud.password,
                MetadataRegistro {
                    nombre_completo: nombre.to_string(),
                    rol: ROL_PROPIETARIO.to_string(),
                },
            )
            .await?;
        let usuario = sesion_alta.usuario.clone();

        // 3. Esperar a que el trigger remoto materialice el perfil.
        self.avanzar(PasoRegistro::EsperandoPerfil);
        if !self.esperar_perfil(&sesion_alta.access_token, usuario.id).await {
            // Sin perfil la cuenta es inutilizable: se cierra para no
            // dejar una identidad huérfana dando vueltas.
            if let Err(e) = self.auth.cerrar_sesion(&sesion_alta.access_token).await {
                tracing::error!(error = %e, "no se pudo cerrar la identidad huérfana");
            }
            return Err(AppError::PerfilNoMaterializado);
        }

        // 4. Vincular el local al perfil. Si esto falla la identidad ya
        //    creada NO se revierte; ver DESIGN.md.
        self.avanzar(PasoRegistro::AsignandoLocal);
        self.datos
            .asignar_local_a_perfil(&sesion_alta.access_token, usuario.id, local_id, nombre)
            .await
            .map_err(|e| AppError::AsignacionLocal(e.to_string()))?;

        // 5. Marcar el código como usado. No es fatal: la cuenta ya
        //    quedó creada y vinculada; peor sería frenar el alta acá.
        self.avanzar(PasoRegistro::ConsumiendoCodigo);
        if let Err(e) = self
            .datos
            .consumir_codigo(&sesion_alta.access_token, &codigo, usuario.id, Utc::now())
            .await
        {
            tracing::warn!(codigo = %codigo, error = %e, "no se pudo marcar el código como usado");
        }

        // 6. Login automático: las credenciales ya se conocen, no hace
        //    falta otra espera.
        self.avanzar(PasoRegistro::IniciandoSesion);
        let sesion_iniciada = match self.sesiones.iniciar_sesion(email, &solicitud.password).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "login automático falló; el propietario deberá entrar a mano");
                false
            }
        };

        tracing::info!(usuario = %usuario.id, local = %local_id, "propietario registrado");
        Ok(RegistroExitoso {
            usuario,
            local_id,
            sesion_iniciada,
        })
    }

    // Devuelve true apenas el perfil aparece. Un fallo transitorio del
    // sondeo consume el intento; el presupuesto no se estira.
    async fn esperar_perfil(&self, token: &str, usuario_id: Uuid) -> bool {
        for intento in 0..MAX_INTENTOS_PERFIL {
            if intento > 0 {
                let retraso = Duration::from_millis(RETRASO_BASE_MS << (intento - 1));
                self.reloj.dormir(retraso).await;
            }
            match self.datos.existe_perfil(token, usuario_id).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(intento, error = %e, "sondeo de perfil falló");
                }
            }
        }
        false
    }

    fn avanzar(&self, paso: PasoRegistro) {
        tracing::debug!(?paso, "registro: transición");
        let _ = self.paso.send(paso);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;

    use super::*;
    use crate::db::memoria::{AuthEnMemoria, DatosEnMemoria};

    // Reloj que no duerme: anota cada espera pedida.
    #[derive(Default)]
    struct RelojDePruebas {
        esperas: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Reloj for RelojDePruebas {
        async fn dormir(&self, duracion: Duration) {
            self.esperas.lock().unwrap().push(duracion);
        }
    }

    struct Escenario {
        datos: Arc<DatosEnMemoria>,
        auth: Arc<AuthEnMemoria>,
        sesiones: Arc<SesionStore>,
        reloj: Arc<RelojDePruebas>,
        servicio: RegistroService,
    }

    fn armar() -> Escenario {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("nightly_admin=debug")
            .try_init();
        let datos = Arc::new(DatosEnMemoria::default());
        let auth = Arc::new(AuthEnMemoria::nueva());
        let sesiones = Arc::new(SesionStore::new(auth.clone()));
        let reloj = Arc::new(RelojDePruebas::default());
        let servicio = RegistroService::new(
            datos.clone(),
            auth.clone(),
            sesiones.clone(),
            reloj.clone(),
        );
        Escenario {
            datos,
            auth,
            sesiones,
            reloj,
            servicio,
        }
    }

    fn codigo_para(local_id: Uuid) -> CodigoInvitacion {
        CodigoInvitacion {
            codigo: "ABC123".into(),
            local_id: Some(local_id),
            usado: false,
            usado_por: None,
            fecha_uso: None,
        }
    }

    fn solicitud_valida() -> SolicitudRegistro {
        SolicitudRegistro {
            codigo_invitacion: "abc123".into(),
            nombre_completo: "Dueña Nueva".into(),
            email: "duena@bar.com".into(),
            password: "secreta".into(),
        }
    }

    #[tokio::test]
    async fn el_flujo_completo_vincula_y_consume_el_codigo() {
        let e = armar();
        let local_id = Uuid::new_v4();
        e.datos.codigos.lock().unwrap().push(codigo_para(local_id));

        let resultado = e.servicio.registrar(solicitud_valida()).await.unwrap();

        assert_eq!(resultado.local_id, local_id);
        assert!(resultado.sesion_iniciada);
        assert_eq!(*e.servicio.observar_paso().borrow(), PasoRegistro::Completado);

        // el perfil quedó vinculado al local del código
        let asignaciones = e.datos.asignaciones.lock().unwrap();
        assert_eq!(asignaciones.len(), 1);
        assert_eq!(asignaciones[0].0, resultado.usuario.id);
        assert_eq!(asignaciones[0].1, local_id);
        assert_eq!(asignaciones[0].2, "Dueña Nueva");

        // el código quedó consumido, con consumidor asentado
        let codigos = e.datos.codigos.lock().unwrap();
        assert!(codigos[0].usado);
        assert_eq!(codigos[0].usado_por, Some(resultado.usuario.id));
        assert!(codigos[0].fecha_uso.is_some());

        // y la sesión quedó en el store
        assert!(e.sesiones.sesion().await.is_some());
    }

    #[tokio::test]
    async fn un_codigo_consumido_no_da_de_alta_a_nadie() {
        let e = armar();
        let mut codigo = codigo_para(Uuid::new_v4());
        codigo.usado = true;
        e.datos.codigos.lock().unwrap().push(codigo);

        let resultado = e.servicio.registrar(solicitud_valida()).await;
        assert!(matches!(resultado, Err(AppError::CodigoInvalido)));

        // no se llegó a crear ninguna identidad
        assert!(e.auth.emails_registrados.lock().unwrap().is_empty());
        assert_eq!(*e.servicio.observar_paso().borrow(), PasoRegistro::Fallido);
    }

    #[tokio::test]
    async fn un_codigo_inexistente_es_invalido() {
        let e = armar();
        let resultado = e.servicio.registrar(solicitud_valida()).await;
        assert!(matches!(resultado, Err(AppError::CodigoInvalido)));
    }

    #[tokio::test]
    async fn un_codigo_sin_local_es_huerfano() {
        let e = armar();
        let mut codigo = codigo_para(Uuid::new_v4());
        codigo.local_id = None;
        e.datos.codigos.lock().unwrap().push(codigo);

        let resultado = e.servicio.registrar(solicitud_valida()).await;
        assert!(matches!(resultado, Err(AppError::CodigoHuerfano)));
        assert!(e.auth.emails_registrados.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn el_rechazo_del_alta_llega_con_el_mensaje_original() {
        let e = armar();
        e.datos.codigos.lock().unwrap().push(codigo_para(Uuid::new_v4()));
        *e.auth.rechazo_registro.lock().unwrap() =
            Some("User already registered".into());

        match e.servicio.registrar(solicitud_valida()).await {
            Err(AppError::Registro(mensaje)) => {
                assert_eq!(mensaje, "User already registered")
            }
            otro => panic!("esperaba rechazo de registro, vino {otro:?}"),
        }
        // el código sigue libre para reintentar
        assert!(!e.datos.codigos.lock().unwrap()[0].usado);
    }

    #[tokio::test]
    async fn el_sondeo_agota_cinco_intentos_con_backoff_y_cierra_la_identidad() {
        let e = armar();
        e.datos.codigos.lock().unwrap().push(codigo_para(Uuid::new_v4()));
        // el trigger remoto nunca crea el perfil
        e.datos
            .existencia_perfil
            .lock()
            .unwrap()
            .extend([false; 8]);

        let resultado = e.servicio.registrar(solicitud_valida()).await;
        assert!(matches!(resultado, Err(AppError::PerfilNoMaterializado)));

        // exactamente 5 consultas de existencia
        assert_eq!(e.datos.intentos_existencia.load(Ordering::SeqCst), 5);

        // esperas exponenciales no decrecientes: 200, 400, 800, 1600
        let esperas = e.reloj.esperas.lock().unwrap().clone();
        let milis: Vec<u64> = esperas.iter().map(|d| d.as_millis() as u64).collect();
        assert_eq!(milis, vec![200, 400, 800, 1600]);

        // la identidad recién creada quedó cerrada, no huérfana
        assert_eq!(e.auth.tokens_cerrados.lock().unwrap().len(), 1);
        assert!(e.sesiones.sesion().await.is_none());

        // y no se llegó a vincular nada
        assert!(e.datos.asignaciones.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn el_perfil_puede_aparecer_en_un_intento_tardio() {
        let e = armar();
        let local_id = Uuid::new_v4();
        e.datos.codigos.lock().unwrap().push(codigo_para(local_id));
        e.datos
            .existencia_perfil
            .lock()
            .unwrap()
            .extend([false, false, true]);

        let resultado = e.servicio.registrar(solicitud_valida()).await.unwrap();
        assert_eq!(resultado.local_id, local_id);
        assert_eq!(e.datos.intentos_existencia.load(Ordering::SeqCst), 3);

        let esperas = e.reloj.esperas.lock().unwrap().clone();
        assert_eq!(esperas.len(), 2);
    }

    #[tokio::test]
    async fn el_fallo_de_vinculacion_no_revierte_la_identidad() {
        let e = armar();
        e.datos.codigos.lock().unwrap().push(codigo_para(Uuid::new_v4()));
        e.datos.falla_asignacion.store(true, Ordering::SeqCst);

        let resultado = e.servicio.registrar(solicitud_valida()).await;
        assert!(matches!(resultado, Err(AppError::AsignacionLocal(_))));

        // la cuenta existe y NO se cerró (asimetría documentada)
        assert_eq!(e.auth.emails_registrados.lock().unwrap().len(), 1);
        assert!(e.auth.tokens_cerrados.lock().unwrap().is_empty());
        // el código sigue sin consumir: el mismo e-mail no podrá
        // reintentar, pero el código no quedó quemado
        assert!(!e.datos.codigos.lock().unwrap()[0].usado);
    }

    #[tokio::test]
    async fn no_poder_consumir_el_codigo_no_frena_el_alta() {
        let e = armar();
        let local_id = Uuid::new_v4();
        e.datos.codigos.lock().unwrap().push(codigo_para(local_id));
        e.datos.falla_consumo.store(true, Ordering::SeqCst);

        let resultado = e.servicio.registrar(solicitud_valida()).await.unwrap();
        assert_eq!(resultado.local_id, local_id);
        assert!(resultado.sesion_iniciada);
        // el código quedó reutilizable: inconsistencia tolerada
        assert!(!e.datos.codigos.lock().unwrap()[0].usado);
    }

    #[tokio::test]
    async fn si_el_login_automatico_falla_el_alta_igual_termina_bien() {
        let e = armar();
        e.datos.codigos.lock().unwrap().push(codigo_para(Uuid::new_v4()));
        e.auth.falla_login.store(true, Ordering::SeqCst);

        let resultado = e.servicio.registrar(solicitud_valida()).await.unwrap();
        assert!(!resultado.sesion_iniciada);
        assert_eq!(*e.servicio.observar_paso().borrow(), PasoRegistro::Completado);
        assert!(e.sesiones.sesion().await.is_none());
    }

    #[tokio::test]
    async fn el_formulario_invalido_no_toca_ningun_servicio() {
        let e = armar();
        let solicitud = SolicitudRegistro {
            codigo_invitacion: "AB".into(),
            nombre_completo: "D".into(),
            email: "no-es-email".into(),
            password: "123".into(),
        };
        let resultado = e.servicio.registrar(solicitud).await;
        assert!(matches!(resultado, Err(AppError::Validacion(_))));
        assert!(e.auth.emails_registrados.lock().unwrap().is_empty());
        assert_eq!(e.datos.intentos_existencia.load(Ordering::SeqCst), 0);
    }
}
