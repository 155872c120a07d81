use axum::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::casas::repo_types::{Casa, NuevaCasa, UsuarioMesa};

#[cfg(test)]
pub mod memory;
mod pg;

pub use pg::PgStore;

/// Another household already owns this `id_unico`.
#[derive(Error, Debug)]
#[error("id_unico already registered: {0}")]
pub struct IdUnicoDuplicado(pub String);

/// Backing store for `casas` and `usuarios_mesa`.
#[async_trait]
pub trait MesaStore: Send + Sync {
    async fn find_casa_by_whatsapp(&self, whatsapp: &str) -> anyhow::Result<Option<Casa>>;

    async fn find_casa_by_id_unico(&self, id_unico: &str) -> anyhow::Result<Option<Casa>>;

    /// Fails with [`IdUnicoDuplicado`] when the key is taken.
    async fn insert_casa(&self, casa: &NuevaCasa) -> anyhow::Result<Casa>;

    async fn find_usuario_mesa(
        &self,
        rol: &str,
        vecino_id: Uuid,
    ) -> anyhow::Result<Option<UsuarioMesa>>;

    async fn find_usuario_mesa_by_auth_user(
        &self,
        auth_user_id: Uuid,
    ) -> anyhow::Result<Option<UsuarioMesa>>;

    /// Inserts an account for `rol` linked to the household, profile marked complete.
    async fn insert_usuario_mesa(&self, rol: &str, vecino_id: Uuid) -> anyhow::Result<UsuarioMesa>;

    /// Links the household and marks the profile complete. Returns rows updated.
    async fn link_casa_to_auth_user(&self, auth_user_id: Uuid, vecino_id: Uuid)
        -> anyhow::Result<u64>;
}
