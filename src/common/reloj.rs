use std::time::Duration;

use async_trait::async_trait;

// Reloj inyectable: la espera del perfil usa backoff exponencial y los
// tests necesitan recorrer los 5 intentos sin dormir de verdad.
#[async_trait]
pub trait Reloj: Send + Sync {
    async fn dormir(&self, duracion: Duration);
}

// Implementación real sobre el runtime.
pub struct RelojTokio;

#[async_trait]
impl Reloj for RelojTokio {
    async fn dormir(&self, duracion: Duration) {
        tokio::time::sleep(duracion).await;
    }
}
