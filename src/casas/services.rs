use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::dto::MesaSession;
use crate::casas::dto::DatosCasa;
use crate::casas::id_unico::{generate_id_unico, normalize_whatsapp};
use crate::casas::repo_types::{Casa, NuevaCasa, TipoCasa, UsuarioMesa};
use crate::error::AppError;
use crate::store::{IdUnicoDuplicado, MesaStore};

pub const MSG_ROL_REQUERIDO: &str = "Selecciona un rol.";
pub const MSG_WHATSAPP_INVALIDO: &str = "Ingresa un WhatsApp valido.";
pub const MSG_CAMPOS_OBLIGATORIOS: &str = "Completa todos los campos obligatorios.";
pub const MSG_TIPO_CASA_INVALIDO: &str = "Tipo de casa invalido.";
pub const MSG_NO_AUTORIZADO: &str = "Usuario no autorizado. Solicita alta al admin.";
pub const MSG_ACCESO_DENEGADO: &str = "Acceso denegado. Usuario no autorizado.";
pub const MSG_DOMICILIO_DUPLICADO: &str = "Ya existe una casa con ese domicilio.";
pub const MSG_ERROR_VALIDAR_WHATSAPP: &str = "Error al validar el WhatsApp.";
pub const MSG_ERROR_VALIDAR_DOMICILIO: &str = "Error al validar el domicilio.";
pub const MSG_ERROR_GUARDAR_VECINO: &str = "Error al guardar el perfil de vecino.";
pub const MSG_ERROR_GUARDAR_PERFIL: &str = "Error al guardar el perfil.";
pub const MSG_ERROR_BUSCAR_CASA: &str = "Error al buscar la casa.";
pub const MSG_ERROR_VALIDAR_SESION: &str = "Error al validar la sesión.";
pub const MSG_ERROR_ACTUALIZAR_USUARIO: &str = "Error al actualizar el usuario de mesa.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(MesaSession),
    RegistrationRequired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistroOutcome {
    /// The phone already had a household; the caller is logged in with it.
    Existente(MesaSession),
    Creada { session: MesaSession, casa: Casa },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerfilOutcome {
    YaCompleto,
    Completado(Casa),
}

fn internal(message: &str) -> impl Fn(anyhow::Error) -> AppError + '_ {
    move |e| {
        error!(error = %e, "{message}");
        AppError::Internal(message.to_string())
    }
}

fn require_rol(rol: &str) -> Result<String, AppError> {
    let rol = rol.trim();
    if rol.is_empty() {
        return Err(AppError::BadRequest(MSG_ROL_REQUERIDO.into()));
    }
    Ok(rol.to_string())
}

fn require_whatsapp(raw: &str) -> Result<String, AppError> {
    let whatsapp = normalize_whatsapp(raw.trim());
    if whatsapp.is_empty() {
        return Err(AppError::BadRequest(MSG_WHATSAPP_INVALIDO.into()));
    }
    Ok(whatsapp)
}

/// Checks the household form and derives its `id_unico`.
pub fn validate_casa(whatsapp: &str, datos: &DatosCasa) -> Result<NuevaCasa, AppError> {
    let nombre = datos.nombre.trim();
    let apellido = datos.apellido.trim();
    let calle = datos.calle.trim();
    let numero = datos.numero.trim();
    let tipo = datos.tipo_casa.trim();
    let tenencia = datos.tenencia.trim();
    let interior = datos
        .interior
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if [nombre, apellido, calle, numero, tipo, tenencia]
        .iter()
        .any(|v| v.is_empty())
    {
        return Err(AppError::BadRequest(MSG_CAMPOS_OBLIGATORIOS.into()));
    }

    let tipo_casa: TipoCasa = tipo
        .to_uppercase()
        .parse()
        .map_err(|_| AppError::BadRequest(MSG_TIPO_CASA_INVALIDO.into()))?;

    let id_unico = generate_id_unico(calle, numero, tipo_casa, interior)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(NuevaCasa {
        id_unico,
        whatsapp: whatsapp.to_string(),
        nombre: nombre.to_string(),
        apellido: apellido.to_string(),
        calle: calle.to_string(),
        numero: numero.to_string(),
        tipo_casa,
        tenencia: tenencia.to_string(),
        interior: interior.map(str::to_string),
    })
}

/// Session for a phone whose household exists, if `rol` has an account on it.
async fn session_for_casa(
    store: &dyn MesaStore,
    rol: &str,
    whatsapp: &str,
    casa: &Casa,
    failure: &'static str,
) -> Result<MesaSession, AppError> {
    let usuario = store
        .find_usuario_mesa(rol, casa.id)
        .await
        .map_err(internal(failure))?;
    if usuario.is_none() {
        warn!(%rol, casa_id = %casa.id, "no usuario_mesa for role");
        return Err(AppError::Forbidden(MSG_NO_AUTORIZADO.into()));
    }
    Ok(MesaSession {
        rol: rol.to_string(),
        whatsapp: whatsapp.to_string(),
    })
}

/// Inserts the household after checking its address key is free.
async fn create_casa(store: &dyn MesaStore, nueva: &NuevaCasa) -> Result<Casa, AppError> {
    let existente = store
        .find_casa_by_id_unico(&nueva.id_unico)
        .await
        .map_err(internal(MSG_ERROR_VALIDAR_DOMICILIO))?;
    if existente.is_some() {
        warn!(id_unico = %nueva.id_unico, "address already registered");
        return Err(AppError::Conflict(MSG_DOMICILIO_DUPLICADO.into()));
    }

    match store.insert_casa(nueva).await {
        Ok(casa) => {
            info!(casa_id = %casa.id, id_unico = %casa.id_unico, "casa created");
            Ok(casa)
        }
        // lost the race against a concurrent registration
        Err(e) if e.downcast_ref::<IdUnicoDuplicado>().is_some() => {
            warn!(id_unico = %nueva.id_unico, "address registered concurrently");
            Err(AppError::Conflict(MSG_DOMICILIO_DUPLICADO.into()))
        }
        Err(e) => Err(internal(MSG_ERROR_GUARDAR_VECINO)(e)),
    }
}

async fn ensure_usuario_mesa(
    store: &dyn MesaStore,
    rol: &str,
    vecino_id: Uuid,
) -> anyhow::Result<UsuarioMesa> {
    if let Some(existente) = store.find_usuario_mesa(rol, vecino_id).await? {
        return Ok(existente);
    }
    store.insert_usuario_mesa(rol, vecino_id).await
}

/// Phone login: session when the household and the role account exist,
/// registration when the phone is unknown, forbidden otherwise.
pub async fn login(
    store: &dyn MesaStore,
    rol: &str,
    whatsapp: &str,
) -> Result<LoginOutcome, AppError> {
    let rol = require_rol(rol)?;
    let whatsapp = require_whatsapp(whatsapp)?;

    let casa = store
        .find_casa_by_whatsapp(&whatsapp)
        .await
        .map_err(internal(MSG_ERROR_VALIDAR_WHATSAPP))?;

    match casa {
        Some(casa) => {
            let session =
                session_for_casa(store, &rol, &whatsapp, &casa, MSG_ERROR_VALIDAR_WHATSAPP).await?;
            info!(%rol, casa_id = %casa.id, "mesa login");
            Ok(LoginOutcome::Authenticated(session))
        }
        None => {
            info!(%rol, "unknown whatsapp, registration required");
            Ok(LoginOutcome::RegistrationRequired)
        }
    }
}

/// Registers a household for the phone and gives `rol` an account on it.
pub async fn registrar(
    store: &dyn MesaStore,
    rol: &str,
    whatsapp: &str,
    datos: &DatosCasa,
) -> Result<RegistroOutcome, AppError> {
    let rol = require_rol(rol)?;
    let whatsapp = require_whatsapp(whatsapp)?;
    let nueva = validate_casa(&whatsapp, datos)?;

    let existente = store
        .find_casa_by_whatsapp(&whatsapp)
        .await
        .map_err(internal(MSG_ERROR_GUARDAR_PERFIL))?;
    if let Some(casa) = existente {
        let session =
            session_for_casa(store, &rol, &whatsapp, &casa, MSG_ERROR_GUARDAR_PERFIL).await?;
        info!(%rol, casa_id = %casa.id, "registro for known whatsapp, logged in");
        return Ok(RegistroOutcome::Existente(session));
    }

    let casa = create_casa(store, &nueva).await?;
    ensure_usuario_mesa(store, &rol, casa.id)
        .await
        .map_err(internal(MSG_ERROR_GUARDAR_PERFIL))?;

    Ok(RegistroOutcome::Creada {
        session: MesaSession { rol, whatsapp },
        casa,
    })
}

/// Looks a household up by phone.
pub async fn buscar_casa(store: &dyn MesaStore, whatsapp: &str) -> Result<Option<Casa>, AppError> {
    let whatsapp = require_whatsapp(whatsapp)?;
    store
        .find_casa_by_whatsapp(&whatsapp)
        .await
        .map_err(internal(MSG_ERROR_BUSCAR_CASA))
}

async fn usuario_for_auth_user(
    store: &dyn MesaStore,
    auth_user_id: Uuid,
    failure: &'static str,
) -> Result<UsuarioMesa, AppError> {
    store
        .find_usuario_mesa_by_auth_user(auth_user_id)
        .await
        .map_err(internal(failure))?
        .ok_or_else(|| {
            warn!(%auth_user_id, "auth user without usuario_mesa");
            AppError::Forbidden(MSG_ACCESO_DENEGADO.into())
        })
}

/// Whether the user behind `auth_user_id` already linked a household.
pub async fn estado_perfil(store: &dyn MesaStore, auth_user_id: Uuid) -> Result<bool, AppError> {
    let usuario = usuario_for_auth_user(store, auth_user_id, MSG_ERROR_VALIDAR_SESION).await?;
    Ok(usuario.perfil_vecino_completo)
}

/// Links the user's account to the household for `whatsapp`, registering the
/// household first when the phone is unknown.
pub async fn completar_perfil(
    store: &dyn MesaStore,
    auth_user_id: Uuid,
    whatsapp: &str,
    datos: &DatosCasa,
) -> Result<PerfilOutcome, AppError> {
    let whatsapp = require_whatsapp(whatsapp)?;

    let usuario = usuario_for_auth_user(store, auth_user_id, MSG_ERROR_GUARDAR_PERFIL).await?;
    if usuario.perfil_vecino_completo {
        return Ok(PerfilOutcome::YaCompleto);
    }

    let encontrada = store
        .find_casa_by_whatsapp(&whatsapp)
        .await
        .map_err(internal(MSG_ERROR_GUARDAR_PERFIL))?;
    let casa = match encontrada {
        Some(casa) => casa,
        None => {
            let nueva = validate_casa(&whatsapp, datos)?;
            create_casa(store, &nueva).await?
        }
    };

    let updated = store
        .link_casa_to_auth_user(auth_user_id, casa.id)
        .await
        .map_err(internal(MSG_ERROR_ACTUALIZAR_USUARIO))?;
    if updated == 0 {
        error!(%auth_user_id, casa_id = %casa.id, "usuario_mesa vanished before link");
        return Err(AppError::Internal(MSG_ERROR_ACTUALIZAR_USUARIO.into()));
    }
    info!(%auth_user_id, casa_id = %casa.id, updated, "perfil vecino completed");

    Ok(PerfilOutcome::Completado(casa))
}
