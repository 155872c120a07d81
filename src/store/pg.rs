use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{IdUnicoDuplicado, MesaStore};
use crate::casas::repo_types::{Casa, CasaRow, NuevaCasa, UsuarioMesa};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MesaStore for PgStore {
    async fn find_casa_by_whatsapp(&self, whatsapp: &str) -> anyhow::Result<Option<Casa>> {
        let row = sqlx::query_as::<_, CasaRow>(
            r#"
            SELECT id, id_unico, whatsapp, nombre, apellido, calle, numero,
                   tipo_casa, tenencia, interior, created_at
            FROM casas
            WHERE whatsapp = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(whatsapp)
        .fetch_optional(&self.db)
        .await
        .context("select casa by whatsapp")?;
        row.map(Casa::try_from).transpose()
    }

    async fn find_casa_by_id_unico(&self, id_unico: &str) -> anyhow::Result<Option<Casa>> {
        let row = sqlx::query_as::<_, CasaRow>(
            r#"
            SELECT id, id_unico, whatsapp, nombre, apellido, calle, numero,
                   tipo_casa, tenencia, interior, created_at
            FROM casas
            WHERE id_unico = $1
            "#,
        )
        .bind(id_unico)
        .fetch_optional(&self.db)
        .await
        .context("select casa by id_unico")?;
        row.map(Casa::try_from).transpose()
    }

    async fn insert_casa(&self, casa: &NuevaCasa) -> anyhow::Result<Casa> {
        let res = sqlx::query_as::<_, CasaRow>(
            r#"
            INSERT INTO casas (id_unico, whatsapp, nombre, apellido, calle, numero,
                               tipo_casa, tenencia, interior)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, id_unico, whatsapp, nombre, apellido, calle, numero,
                      tipo_casa, tenencia, interior, created_at
            "#,
        )
        .bind(&casa.id_unico)
        .bind(&casa.whatsapp)
        .bind(&casa.nombre)
        .bind(&casa.apellido)
        .bind(&casa.calle)
        .bind(&casa.numero)
        .bind(casa.tipo_casa.as_str())
        .bind(&casa.tenencia)
        .bind(&casa.interior)
        .fetch_one(&self.db)
        .await;

        let row = match res {
            Ok(row) => row,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(IdUnicoDuplicado(casa.id_unico.clone()).into());
            }
            Err(e) => return Err(anyhow::Error::new(e).context("insert casa")),
        };
        debug!(casa_id = %row.id, id_unico = %row.id_unico, "casa inserted");
        Casa::try_from(row)
    }

    async fn find_usuario_mesa(
        &self,
        rol: &str,
        vecino_id: Uuid,
    ) -> anyhow::Result<Option<UsuarioMesa>> {
        let usuario = sqlx::query_as::<_, UsuarioMesa>(
            r#"
            SELECT id, rol, vecino_id, auth_user_id, perfil_vecino_completo, created_at
            FROM usuarios_mesa
            WHERE rol = $1 AND vecino_id = $2
            LIMIT 1
            "#,
        )
        .bind(rol)
        .bind(vecino_id)
        .fetch_optional(&self.db)
        .await
        .context("select usuario_mesa by rol and vecino")?;
        Ok(usuario)
    }

    async fn find_usuario_mesa_by_auth_user(
        &self,
        auth_user_id: Uuid,
    ) -> anyhow::Result<Option<UsuarioMesa>> {
        let usuario = sqlx::query_as::<_, UsuarioMesa>(
            r#"
            SELECT id, rol, vecino_id, auth_user_id, perfil_vecino_completo, created_at
            FROM usuarios_mesa
            WHERE auth_user_id = $1
            "#,
        )
        .bind(auth_user_id)
        .fetch_optional(&self.db)
        .await
        .context("select usuario_mesa by auth user")?;
        Ok(usuario)
    }

    async fn insert_usuario_mesa(&self, rol: &str, vecino_id: Uuid) -> anyhow::Result<UsuarioMesa> {
        let usuario = sqlx::query_as::<_, UsuarioMesa>(
            r#"
            INSERT INTO usuarios_mesa (rol, vecino_id, perfil_vecino_completo)
            VALUES ($1, $2, TRUE)
            RETURNING id, rol, vecino_id, auth_user_id, perfil_vecino_completo, created_at
            "#,
        )
        .bind(rol)
        .bind(vecino_id)
        .fetch_one(&self.db)
        .await
        .context("insert usuario_mesa")?;
        Ok(usuario)
    }

    async fn link_casa_to_auth_user(
        &self,
        auth_user_id: Uuid,
        vecino_id: Uuid,
    ) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE usuarios_mesa
            SET vecino_id = $1, perfil_vecino_completo = TRUE
            WHERE auth_user_id = $2
            "#,
        )
        .bind(vecino_id)
        .bind(auth_user_id)
        .execute(&self.db)
        .await
        .context("update usuario_mesa")?;
        Ok(res.rows_affected())
    }
}
