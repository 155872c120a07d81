use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// House type; a duplex carries an interior unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TipoCasa {
    Casa,
    Duplex,
}

impl TipoCasa {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoCasa::Casa => "CASA",
            TipoCasa::Duplex => "DUPLEX",
        }
    }
}

impl fmt::Display for TipoCasa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TipoCasa {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASA" => Ok(TipoCasa::Casa),
            "DUPLEX" => Ok(TipoCasa::Duplex),
            other => anyhow::bail!("unknown tipo_casa {other:?}"),
        }
    }
}

/// Row of `casas` as stored.
#[derive(Debug, Clone, FromRow)]
pub struct CasaRow {
    pub id: Uuid,
    pub id_unico: String,
    pub whatsapp: String,
    pub nombre: String,
    pub apellido: String,
    pub calle: String,
    pub numero: String,
    pub tipo_casa: String,
    pub tenencia: String,
    pub interior: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Household record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Casa {
    pub id: Uuid,
    pub id_unico: String,
    pub whatsapp: String,
    pub nombre: String,
    pub apellido: String,
    pub calle: String,
    pub numero: String,
    pub tipo_casa: TipoCasa,
    pub tenencia: String,
    pub interior: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TryFrom<CasaRow> for Casa {
    type Error = anyhow::Error;

    fn try_from(r: CasaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            id_unico: r.id_unico,
            whatsapp: r.whatsapp,
            nombre: r.nombre,
            apellido: r.apellido,
            calle: r.calle,
            numero: r.numero,
            tipo_casa: r.tipo_casa.parse()?,
            tenencia: r.tenencia,
            interior: r.interior,
            created_at: r.created_at,
        })
    }
}

/// Validated household ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NuevaCasa {
    pub id_unico: String,
    pub whatsapp: String,
    pub nombre: String,
    pub apellido: String,
    pub calle: String,
    pub numero: String,
    pub tipo_casa: TipoCasa,
    pub tenencia: String,
    pub interior: Option<String>,
}

/// Board-table account, optionally linked to a household and to an external auth user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UsuarioMesa {
    pub id: Uuid,
    pub rol: String,
    pub vecino_id: Option<Uuid>,
    pub auth_user_id: Option<Uuid>,
    pub perfil_vecino_completo: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
