// src/config.rs

use std::env;
use std::sync::Arc;

use anyhow::Context;

use crate::common::reloj::RelojTokio;
use crate::db::{ClienteAuth, ClienteDatos, SupabaseCliente};
use crate::services::auth::{AuthService, SesionStore};
use crate::services::gateway::BackendGateway;
use crate::services::locales::LocalesService;
use crate::services::registro::RegistroService;
use crate::services::roles::RolesService;

pub struct Configuracion {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub backend_url: String,
}

impl Configuracion {
    pub fn desde_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self {
            supabase_url: env::var("SUPABASE_URL").context("SUPABASE_URL debe estar definida")?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .context("SUPABASE_ANON_KEY debe estar definida")?,
            backend_url: env::var("BACKEND_URL").context("BACKEND_URL debe estar definida")?,
        })
    }
}

// Estado de la aplicación: los servicios ya armados, compartidos por
// toda la capa de vistas.
pub struct AppState {
    pub sesiones: Arc<SesionStore>,
    pub auth: AuthService,
    pub roles: RolesService,
    pub registro: RegistroService,
    pub locales: LocalesService,
    pub gateway: BackendGateway,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        Self::con_configuracion(Configuracion::desde_env()?)
    }

    pub fn con_configuracion(config: Configuracion) -> anyhow::Result<Self> {
        let supabase = Arc::new(SupabaseCliente::new(
            &config.supabase_url,
            &config.supabase_anon_key,
        )?);

        // --- Arma el grafo de dependencias ---
        let datos: Arc<dyn ClienteDatos> = supabase.clone();
        let cliente_auth: Arc<dyn ClienteAuth> = supabase;

        let sesiones = Arc::new(SesionStore::new(cliente_auth.clone()));
        let roles = RolesService::new(datos.clone());
        let auth = AuthService::new(sesiones.clone(), roles.clone());
        let registro = RegistroService::new(
            datos.clone(),
            cliente_auth,
            sesiones.clone(),
            Arc::new(RelojTokio),
        );
        let locales = LocalesService::new(datos, sesiones.clone());
        let gateway = BackendGateway::new(&config.backend_url, sesiones.clone())?;

        Ok(Self {
            sesiones,
            auth,
            roles,
            registro,
            locales,
            gateway,
        })
    }
}
