use serde::{Deserialize, Serialize};

use crate::auth::dto::MesaSession;
use crate::casas::repo_types::Casa;

/// Household fields as typed on the form. Missing fields arrive empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatosCasa {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub calle: String,
    #[serde(default)]
    pub numero: String,
    #[serde(default)]
    pub tipo_casa: String,
    #[serde(default)]
    pub tenencia: String,
    #[serde(default)]
    pub interior: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub rol: String,
    #[serde(default)]
    pub whatsapp: String,
}

#[derive(Debug, Deserialize)]
pub struct RegistroRequest {
    #[serde(default)]
    pub rol: String,
    #[serde(default)]
    pub whatsapp: String,
    #[serde(flatten)]
    pub casa: DatosCasa,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginResponse {
    Authenticated {
        /// Clients keep this object under their `mesa_session` storage key.
        mesa_session: MesaSession,
        token: String,
    },
    RegistrationRequired,
}

#[derive(Debug, Deserialize)]
pub struct BuscarCasaQuery {
    #[serde(default)]
    pub whatsapp: String,
}

#[derive(Debug, Serialize)]
pub struct BuscarCasaResponse {
    pub casa: Option<Casa>,
}

#[derive(Debug, Serialize)]
pub struct EstadoPerfilResponse {
    pub perfil_vecino_completo: bool,
}

#[derive(Debug, Deserialize)]
pub struct PerfilRequest {
    #[serde(default)]
    pub whatsapp: String,
    #[serde(flatten)]
    pub casa: DatosCasa,
}

/// `sign_out` asks the client to drop its user token and log in again.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PerfilResponse {
    Completado { casa: Casa, sign_out: bool },
    YaCompleto { sign_out: bool },
}
