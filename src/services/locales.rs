// src/services/locales.rs

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::ClienteDatos;
use crate::models::auth::Propietario;
use crate::models::locales::{ActualizacionLocal, Local};
use crate::services::auth::SesionStore;

/// Lecturas de locales para los paneles.
///
/// Mantiene una instantánea de exhibición: tras una mutación exitosa en
/// el gateway se parchea la copia local en lugar de re-consultar, y el
/// próximo `refrescar` reconcilia contra el servicio de datos. No hay
/// bloqueo optimista: dos operadores editando el mismo local se pisan y
/// gana la última escritura, el backend remoto es la fuente de verdad.
pub struct LocalesService {
    datos: Arc<dyn ClienteDatos>,
    sesiones: Arc<SesionStore>,
    instantanea: RwLock<Vec<Local>>,
}

impl LocalesService {
    pub fn new(datos: Arc<dyn ClienteDatos>, sesiones: Arc<SesionStore>) -> Self {
        Self {
            datos,
            sesiones,
            instantanea: RwLock::new(Vec::new()),
        }
    }

    async fn token(&self) -> Result<String, AppError> {
        self.sesiones.token().await.ok_or(AppError::SinSesion)
    }

    /// Refresco completo desde el servicio de datos.
    pub async fn refrescar(&self) -> Result<Vec<Local>, AppError> {
        let token = self.token().await?;
        let locales = self.datos.listar_locales(&token).await?;
        *self.instantanea.write().await = locales.clone();
        Ok(locales)
    }

    pub async fn actuales(&self) -> Vec<Local> {
        self.instantanea.read().await.clone()
    }

    /// El local asignado al propietario. `Ok(None)` cuando el perfil no
    /// tiene local: la vista muestra "sin local asignado", no es error.
    pub async fn mi_local(&self, perfil: &Propietario) -> Result<Option<Local>, AppError> {
        let Some(local_id) = perfil.local_asignado_id else {
            return Ok(None);
        };
        let token = self.token().await?;
        self.datos.obtener_local(&token, local_id).await
    }

    /// Genera (en el servicio remoto) un código de invitación atado al
    /// local, y lo refleja en la instantánea.
    pub async fn generar_codigo(&self, local_id: Uuid) -> Result<String, AppError> {
        let token = self.token().await?;
        let codigo = self.datos.generar_codigo_invitacion(&token, local_id).await?;
        let mut locales = self.instantanea.write().await;
        if let Some(local) = locales.iter_mut().find(|l| l.id == local_id) {
            local.codigo_invitacion = Some(codigo.clone());
            local.codigo_usado = false;
        }
        Ok(codigo)
    }

    /// Parche local tras una mutación exitosa: solo se tocan los campos
    /// presentes, igual que en el PATCH que viajó al backend.
    pub async fn aplicar_parche(&self, id: Uuid, campos: &ActualizacionLocal) {
        let mut locales = self.instantanea.write().await;
        let Some(local) = locales.iter_mut().find(|l| l.id == id) else {
            return;
        };

        if let Some(nombre) = &campos.nombre {
            local.nombre = nombre.clone();
        }
        if let Some(tipo) = &campos.tipo {
            local.tipo = tipo.clone();
        }
        if let Some(direccion) = &campos.direccion {
            local.direccion = direccion.clone();
        }
        if let Some(latitud) = campos.latitud {
            local.latitud = latitud;
        }
        if let Some(longitud) = campos.longitud {
            local.longitud = longitud;
        }
        if let Some(capacidad) = campos.capacidad_actual {
            local.capacidad_actual = capacidad;
        }
        if let Some(estado) = campos.estado {
            local.estado = estado;
        }
        if let Some(tiempo) = campos.tiempo_espera {
            local.tiempo_espera = tiempo;
        }
        if let Some(musica) = campos.tiene_musica_en_vivo {
            local.tiene_musica_en_vivo = musica;
        }
        if let Some(musica_actual) = &campos.musica_actual {
            local.musica_actual = musica_actual.clone();
        }
        if let Some(descripcion) = &campos.descripcion {
            local.descripcion = Some(descripcion.clone());
        }
        if let Some(telefono) = &campos.telefono {
            local.telefono = Some(telefono.clone());
        }
        if let Some(instagram) = &campos.instagram {
            local.instagram = Some(instagram.clone());
        }
        if let Some(facebook) = &campos.facebook {
            local.facebook = Some(facebook.clone());
        }
        if let Some(apertura) = &campos.horario_apertura {
            local.horario_apertura = Some(apertura.clone());
        }
        if let Some(cierre) = &campos.horario_cierre {
            local.horario_cierre = Some(cierre.clone());
        }
        if let Some(rango) = &campos.rango_precio {
            local.rango_precio = Some(rango.clone());
        }
        if let Some(activo) = campos.activo {
            local.activo = activo;
        }
        if let Some(verificado) = campos.verificado {
            local.verificado = verificado;
        }
    }
}
