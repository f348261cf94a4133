// src/services/permisos.rs
//
// Evaluador de permisos sobre locales.
//
// CRITERIO DE ADMIN PRINCIPAL: se basa en `nivel == admin` tal como
// está persistido en super_admins, nunca en un e-mail cableado ni en
// nada que venga del cliente.

use uuid::Uuid;

use crate::models::auth::{Nivel, Rol};
use crate::models::locales::Local;

/// Instantánea de permisos para un rol ya resuelto (o ninguno).
/// Puro y síncrono; se recalcula en cada cambio de sesión y se vuelve a
/// consultar antes de cada mutación.
#[derive(Debug, Clone, Copy)]
pub struct Permisos {
    es_super_admin: bool,
    es_admin_principal: bool,
    user_id: Option<Uuid>,
}

impl Permisos {
    pub fn para(rol: Option<&Rol>) -> Self {
        match rol {
            None => Permisos {
                es_super_admin: false,
                es_admin_principal: false,
                user_id: None,
            },
            Some(Rol::SuperAdmin(admin)) => Permisos {
                es_super_admin: true,
                es_admin_principal: admin.nivel_efectivo() == Nivel::Admin,
                user_id: Some(admin.user_id),
            },
            Some(Rol::Propietario(perfil)) => Permisos {
                es_super_admin: false,
                es_admin_principal: false,
                user_id: Some(perfil.id),
            },
        }
    }

    /// ¿Puede crear locales? Cualquier super admin, incluso pasante.
    pub fn puede_crear_local(&self) -> bool {
        self.es_super_admin
    }

    /// ¿Puede editar este local? El admin principal puede todos; un
    /// pasante solo los que él mismo creó.
    pub fn puede_editar_local(&self, local: &Local) -> bool {
        if !self.es_super_admin {
            return false;
        }
        if self.es_admin_principal {
            return true;
        }
        match (local.creado_por_id, self.user_id) {
            (Some(creador), Some(user_id)) => creador == user_id,
            _ => false,
        }
    }

    /// ¿Puede eliminar locales? Solo el admin principal: un pasante no
    /// borra nada, ni siquiera lo que creó.
    pub fn puede_eliminar_local(&self, _local: &Local) -> bool {
        self.es_admin_principal
    }

    /// ¿Ve todos los locales sin filtro? Solo el admin principal; el
    /// pasante arranca con los suyos y puede destapar el resto en modo
    /// solo lectura.
    pub fn puede_ver_todos(&self) -> bool {
        self.es_admin_principal
    }

    pub fn es_admin(&self) -> bool {
        self.es_admin_principal
    }

    pub fn es_pasante(&self) -> bool {
        self.es_super_admin && !self.es_admin_principal
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }
}

/// Separa los locales entre los creados por el usuario actual y los del
/// resto. Sin usuario, todo va a "otros".
pub fn separar_por_creador(locales: Vec<Local>, user_id: Option<Uuid>) -> (Vec<Local>, Vec<Local>) {
    let Some(user_id) = user_id else {
        return (Vec::new(), locales);
    };
    locales
        .into_iter()
        .partition(|local| local.creado_por_id == Some(user_id))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::auth::{Propietario, ROL_PROPIETARIO, SuperAdmin};
    use crate::models::locales::EstadoLocal;

    fn rol_admin(user_id: Uuid, nivel: Nivel) -> Rol {
        Rol::SuperAdmin(SuperAdmin {
            user_id,
            nombre: "Admin".into(),
            email: "admin@nightly.app".into(),
            created_at: Utc::now(),
            nivel: Some(nivel),
        })
    }

    fn rol_propietario(id: Uuid) -> Rol {
        Rol::Propietario(Propietario {
            id,
            email: "dueno@bar.com".into(),
            nombre_completo: None,
            rol: ROL_PROPIETARIO.into(),
            local_asignado_id: None,
            plan: None,
            plan_vence_en: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn local_creado_por(creador: Option<Uuid>) -> Local {
        Local {
            id: Uuid::new_v4(),
            nombre: "Bar".into(),
            tipo: "bar".into(),
            direccion: "Calle 1".into(),
            latitud: 0.0,
            longitud: 0.0,
            capacidad_actual: 0,
            estado: EstadoLocal::Vacio,
            tiempo_espera: 0,
            tiene_musica_en_vivo: false,
            musica_actual: None,
            descripcion: None,
            telefono: None,
            instagram: None,
            facebook: None,
            horario_apertura: None,
            horario_cierre: None,
            rango_precio: None,
            fotos: Vec::new(),
            creado_por_id: creador,
            activo: true,
            verificado: false,
            codigo_invitacion: None,
            codigo_usado: false,
            fecha_creacion: Utc::now(),
        }
    }

    #[test]
    fn el_admin_principal_puede_todo() {
        let id = Uuid::new_v4();
        let permisos = Permisos::para(Some(&rol_admin(id, Nivel::Admin)));
        let ajeno = local_creado_por(Some(Uuid::new_v4()));

        assert!(permisos.puede_crear_local());
        assert!(permisos.puede_editar_local(&ajeno));
        assert!(permisos.puede_eliminar_local(&ajeno));
        assert!(permisos.puede_ver_todos());
        assert!(permisos.es_admin());
        assert!(!permisos.es_pasante());
    }

    #[test]
    fn el_pasante_edita_solo_lo_suyo_y_nunca_elimina() {
        let id = Uuid::new_v4();
        let permisos = Permisos::para(Some(&rol_admin(id, Nivel::Pasante)));
        let propio = local_creado_por(Some(id));
        let ajeno = local_creado_por(Some(Uuid::new_v4()));
        let sin_creador = local_creado_por(None);

        assert!(permisos.puede_crear_local());
        assert!(permisos.es_pasante());

        assert!(permisos.puede_editar_local(&propio));
        assert!(!permisos.puede_editar_local(&ajeno));
        assert!(!permisos.puede_editar_local(&sin_creador));

        // nunca, ni siquiera sobre lo propio
        assert!(!permisos.puede_eliminar_local(&propio));
        assert!(!permisos.puede_eliminar_local(&ajeno));
        assert!(!permisos.puede_ver_todos());
    }

    #[test]
    fn el_propietario_no_gestiona_locales_del_panel_admin() {
        let id = Uuid::new_v4();
        let permisos = Permisos::para(Some(&rol_propietario(id)));
        let propio = local_creado_por(Some(id));

        assert!(!permisos.puede_crear_local());
        assert!(!permisos.puede_editar_local(&propio));
        assert!(!permisos.puede_eliminar_local(&propio));
        assert!(!permisos.puede_ver_todos());
        assert_eq!(permisos.user_id(), Some(id));
    }

    #[test]
    fn sin_rol_no_hay_ningun_permiso() {
        let permisos = Permisos::para(None);
        let local = local_creado_por(None);

        assert!(!permisos.puede_crear_local());
        assert!(!permisos.puede_editar_local(&local));
        assert!(!permisos.puede_eliminar_local(&local));
        assert!(!permisos.puede_ver_todos());
        assert!(permisos.user_id().is_none());
    }

    #[test]
    fn separa_mis_locales_de_los_del_resto() {
        let yo = Uuid::new_v4();
        let locales = vec![
            local_creado_por(Some(yo)),
            local_creado_por(Some(Uuid::new_v4())),
            local_creado_por(Some(yo)),
            local_creado_por(None),
        ];

        let (mios, otros) = separar_por_creador(locales, Some(yo));
        assert_eq!(mios.len(), 2);
        assert_eq!(otros.len(), 2);
        assert!(mios.iter().all(|l| l.creado_por_id == Some(yo)));
    }

    #[test]
    fn sin_usuario_todo_queda_en_otros() {
        let locales = vec![local_creado_por(Some(Uuid::new_v4()))];
        let (mios, otros) = separar_por_creador(locales, None);
        assert!(mios.is_empty());
        assert_eq!(otros.len(), 1);
    }
}
