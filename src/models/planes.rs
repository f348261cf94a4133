// src/models/planes.rs

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// Nivel de suscripción de un propietario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipoPlan {
    Basico,
    Profesional,
    Premium,
}

// Ficha estática de un plan: precio fijo y listas de qué incluye y qué
// no. Es catálogo, no comportamiento; el backend valida cupos con sus
// propios datos.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: TipoPlan,
    pub nombre: &'static str,
    pub precio: u32,
    pub badge: &'static str,
    pub descripcion: &'static str,
    pub features: &'static [&'static str],
    pub features_no_incluidas: &'static [&'static str],
    pub limite_fotos: u32,
}

// Duraciones que ofrece el panel al asignar un plan.
pub const MESES_ASIGNABLES: &[u32] = &[1, 2, 3, 6];

impl TipoPlan {
    pub fn plan(&self) -> Plan {
        match self {
            TipoPlan::Basico => Plan {
                id: TipoPlan::Basico,
                nombre: "Básico",
                precio: 20,
                badge: "",
                descripcion: "Presencia esencial en el mapa",
                features: &[
                    "Aparecer en el mapa",
                    "Actualizar capacidad en tiempo real",
                    "Una promoción activa",
                ],
                features_no_incluidas: &[
                    "Posición destacada",
                    "Fotos del local",
                    "Estadísticas semanales",
                    "Badge visible",
                    "Boost al #1",
                ],
                limite_fotos: 0,
            },
            TipoPlan::Profesional => Plan {
                id: TipoPlan::Profesional,
                nombre: "Profesional",
                precio: 120,
                badge: "⭐",
                descripcion: "Más visibilidad, más clientes",
                features: &[
                    "Todo lo del plan Básico",
                    "Badge ⭐ Destacado visible",
                    "Posición normal (sobre básicos)",
                    "Hasta 3 promociones activas",
                    "Hasta 5 fotos del local",
                    "Estadísticas semanales básicas",
                ],
                features_no_incluidas: &[
                    "Posición Top fija",
                    "Boost al #1",
                    "WhatsApp directo",
                    "Stats completas",
                ],
                limite_fotos: 5,
            },
            TipoPlan::Premium => Plan {
                id: TipoPlan::Premium,
                nombre: "Premium",
                precio: 280,
                badge: "👑",
                descripcion: "Máxima visibilidad en tu ciudad",
                features: &[
                    "Todo lo del plan Profesional",
                    "Badge 👑 Premium visible",
                    "Top fijo en tu ciudad",
                    "Promociones ilimitadas",
                    "Hasta 15 fotos del local",
                    "Estadísticas completas",
                    "Boost al #1 (4 veces/mes, 2 horas)",
                    "Botón WhatsApp directo",
                ],
                features_no_incluidas: &[],
                limite_fotos: 15,
            },
        }
    }

    pub fn limite_fotos(&self) -> u32 {
        self.plan().limite_fotos
    }
}

/// Vencimiento de un plan asignado por N meses calendario a partir de
/// `desde`. La fecha es informativa: nada revoca capacidades solo, el
/// panel muestra el aviso de vencido.
pub fn vencimiento(desde: DateTime<Utc>, meses: u32) -> DateTime<Utc> {
    desde
        .checked_add_months(Months::new(meses))
        .unwrap_or(desde)
}

/// Sin fecha de vencimiento el plan es vigente indefinidamente.
pub fn plan_vigente(vence_en: Option<DateTime<Utc>>, ahora: DateTime<Utc>) -> bool {
    match vence_en {
        None => true,
        Some(vence) => vence > ahora,
    }
}

/// Días que le quedan al plan, redondeados hacia arriba y nunca
/// negativos. `None` cuando el plan no vence.
pub fn dias_restantes(vence_en: Option<DateTime<Utc>>, ahora: DateTime<Utc>) -> Option<i64> {
    let vence = vence_en?;
    let restante = vence.signed_duration_since(ahora);
    let segundos = restante.num_seconds();
    if segundos <= 0 {
        return Some(0);
    }
    Some((segundos as u64).div_ceil(86_400) as i64)
}
