use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{IdUnicoDuplicado, MesaStore};
use crate::casas::repo_types::{Casa, NuevaCasa, TipoCasa, UsuarioMesa};

/// Store operations, for targeted fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    FindCasaByWhatsapp,
    FindCasaByIdUnico,
    InsertCasa,
    FindUsuarioMesa,
    FindUsuarioMesaByAuthUser,
    InsertUsuarioMesa,
    LinkCasa,
}

const ALL_OPS: [Op; 7] = [
    Op::FindCasaByWhatsapp,
    Op::FindCasaByIdUnico,
    Op::InsertCasa,
    Op::FindUsuarioMesa,
    Op::FindUsuarioMesaByAuthUser,
    Op::InsertUsuarioMesa,
    Op::LinkCasa,
];

#[derive(Default)]
struct Tables {
    casas: Vec<Casa>,
    usuarios: Vec<UsuarioMesa>,
}

/// In-process store used by tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<Op>>,
    // id_unico lookups miss, as if another request inserted concurrently
    stale_id_unico: AtomicBool,
    // updates match no rows, as if the account vanished concurrently
    lost_updates: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails from now on.
    pub fn fail(&self) {
        self.failing.lock().unwrap().extend(ALL_OPS);
    }

    /// Calls to `op` fail from now on.
    pub fn fail_on(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn stale_id_unico_lookups(&self) {
        self.stale_id_unico.store(true, Ordering::SeqCst);
    }

    pub fn lose_updates(&self) {
        self.lost_updates.store(true, Ordering::SeqCst);
    }

    fn check(&self, op: Op) -> anyhow::Result<()> {
        if self.failing.lock().unwrap().contains(&op) {
            anyhow::bail!("store unavailable during {op:?}");
        }
        Ok(())
    }

    pub fn seed_casa(&self, whatsapp: &str, id_unico: &str) -> Casa {
        let casa = Casa {
            id: Uuid::new_v4(),
            id_unico: id_unico.into(),
            whatsapp: whatsapp.into(),
            nombre: "Ana".into(),
            apellido: "Lopez".into(),
            calle: "Roble".into(),
            numero: "4".into(),
            tipo_casa: TipoCasa::Casa,
            tenencia: "PROPIETARIO".into(),
            interior: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.lock().unwrap().casas.push(casa.clone());
        casa
    }

    pub fn seed_usuario_mesa(
        &self,
        rol: &str,
        vecino_id: Option<Uuid>,
        auth_user_id: Option<Uuid>,
        perfil_vecino_completo: bool,
    ) -> UsuarioMesa {
        let usuario = UsuarioMesa {
            id: Uuid::new_v4(),
            rol: rol.into(),
            vecino_id,
            auth_user_id,
            perfil_vecino_completo,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.lock().unwrap().usuarios.push(usuario.clone());
        usuario
    }

    pub fn casas(&self) -> Vec<Casa> {
        self.tables.lock().unwrap().casas.clone()
    }

    pub fn usuarios(&self) -> Vec<UsuarioMesa> {
        self.tables.lock().unwrap().usuarios.clone()
    }
}

#[async_trait]
impl MesaStore for MemoryStore {
    async fn find_casa_by_whatsapp(&self, whatsapp: &str) -> anyhow::Result<Option<Casa>> {
        self.check(Op::FindCasaByWhatsapp)?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.casas.iter().find(|c| c.whatsapp == whatsapp).cloned())
    }

    async fn find_casa_by_id_unico(&self, id_unico: &str) -> anyhow::Result<Option<Casa>> {
        self.check(Op::FindCasaByIdUnico)?;
        if self.stale_id_unico.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let tables = self.tables.lock().unwrap();
        Ok(tables.casas.iter().find(|c| c.id_unico == id_unico).cloned())
    }

    async fn insert_casa(&self, nueva: &NuevaCasa) -> anyhow::Result<Casa> {
        self.check(Op::InsertCasa)?;
        let mut tables = self.tables.lock().unwrap();
        if tables.casas.iter().any(|c| c.id_unico == nueva.id_unico) {
            return Err(IdUnicoDuplicado(nueva.id_unico.clone()).into());
        }
        let casa = Casa {
            id: Uuid::new_v4(),
            id_unico: nueva.id_unico.clone(),
            whatsapp: nueva.whatsapp.clone(),
            nombre: nueva.nombre.clone(),
            apellido: nueva.apellido.clone(),
            calle: nueva.calle.clone(),
            numero: nueva.numero.clone(),
            tipo_casa: nueva.tipo_casa,
            tenencia: nueva.tenencia.clone(),
            interior: nueva.interior.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.casas.push(casa.clone());
        Ok(casa)
    }

    async fn find_usuario_mesa(
        &self,
        rol: &str,
        vecino_id: Uuid,
    ) -> anyhow::Result<Option<UsuarioMesa>> {
        self.check(Op::FindUsuarioMesa)?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .usuarios
            .iter()
            .find(|u| u.rol == rol && u.vecino_id == Some(vecino_id))
            .cloned())
    }

    async fn find_usuario_mesa_by_auth_user(
        &self,
        auth_user_id: Uuid,
    ) -> anyhow::Result<Option<UsuarioMesa>> {
        self.check(Op::FindUsuarioMesaByAuthUser)?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .usuarios
            .iter()
            .find(|u| u.auth_user_id == Some(auth_user_id))
            .cloned())
    }

    async fn insert_usuario_mesa(&self, rol: &str, vecino_id: Uuid) -> anyhow::Result<UsuarioMesa> {
        self.check(Op::InsertUsuarioMesa)?;
        let usuario = UsuarioMesa {
            id: Uuid::new_v4(),
            rol: rol.into(),
            vecino_id: Some(vecino_id),
            auth_user_id: None,
            perfil_vecino_completo: true,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.lock().unwrap().usuarios.push(usuario.clone());
        Ok(usuario)
    }

    async fn link_casa_to_auth_user(
        &self,
        auth_user_id: Uuid,
        vecino_id: Uuid,
    ) -> anyhow::Result<u64> {
        self.check(Op::LinkCasa)?;
        if self.lost_updates.load(Ordering::SeqCst) {
            return Ok(0);
        }
        let mut tables = self.tables.lock().unwrap();
        let mut updated = 0;
        for u in tables
            .usuarios
            .iter_mut()
            .filter(|u| u.auth_user_id == Some(auth_user_id))
        {
            u.vecino_id = Some(vecino_id);
            u.perfil_vecino_completo = true;
            updated += 1;
        }
        Ok(updated)
    }
}
