use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    auth::{
        dto::{JwtKeys, MesaSession},
        extractors::AuthUser,
    },
    casas::{
        dto::{
            BuscarCasaQuery, BuscarCasaResponse, EstadoPerfilResponse, LoginRequest,
            LoginResponse, PerfilRequest, PerfilResponse, RegistroRequest,
        },
        services::{self, LoginOutcome, PerfilOutcome, RegistroOutcome},
    },
    error::AppError,
    state::AppState,
};

pub fn mesa_routes() -> Router<AppState> {
    Router::new()
        .route("/mesa/login", post(login))
        .route("/mesa/registro", post(registro))
}

pub fn vecino_routes() -> Router<AppState> {
    Router::new()
        .route("/vecino/casa", get(buscar_casa))
        .route("/vecino/estado", get(estado))
        .route("/vecino/perfil", post(perfil))
}

fn authenticated(
    state: &AppState,
    session: MesaSession,
    failure: &str,
) -> Result<LoginResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    match keys.sign_session(&session) {
        Ok(token) => Ok(LoginResponse::Authenticated {
            mesa_session: session,
            token,
        }),
        Err(e) => {
            error!(error = %e, "jwt sign session failed");
            Err(AppError::Internal(failure.to_string()))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    match services::login(state.store.as_ref(), &payload.rol, &payload.whatsapp).await? {
        LoginOutcome::Authenticated(session) => Ok(Json(authenticated(
            &state,
            session,
            services::MSG_ERROR_VALIDAR_WHATSAPP,
        )?)),
        LoginOutcome::RegistrationRequired => Ok(Json(LoginResponse::RegistrationRequired)),
    }
}

#[instrument(skip(state, payload))]
pub async fn registro(
    State(state): State<AppState>,
    Json(payload): Json<RegistroRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let outcome = services::registrar(
        state.store.as_ref(),
        &payload.rol,
        &payload.whatsapp,
        &payload.casa,
    )
    .await?;

    let (status, session) = match outcome {
        RegistroOutcome::Existente(session) => (StatusCode::OK, session),
        RegistroOutcome::Creada { session, casa } => {
            info!(casa_id = %casa.id, rol = %session.rol, "vecino registered");
            (StatusCode::CREATED, session)
        }
    };
    let body = authenticated(&state, session, services::MSG_ERROR_GUARDAR_PERFIL)?;
    Ok((status, Json(body)))
}

/// Household lookup for a signed-in user about to complete their profile.
#[instrument(skip(state, query))]
pub async fn buscar_casa(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<BuscarCasaQuery>,
) -> Result<Json<BuscarCasaResponse>, AppError> {
    let casa = services::buscar_casa(state.store.as_ref(), &query.whatsapp).await?;
    Ok(Json(BuscarCasaResponse { casa }))
}

#[instrument(skip(state))]
pub async fn estado(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<EstadoPerfilResponse>, AppError> {
    let perfil_vecino_completo = services::estado_perfil(state.store.as_ref(), user_id).await?;
    Ok(Json(EstadoPerfilResponse {
        perfil_vecino_completo,
    }))
}

#[instrument(skip(state, payload))]
pub async fn perfil(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<PerfilRequest>,
) -> Result<Json<PerfilResponse>, AppError> {
    let outcome = services::completar_perfil(
        state.store.as_ref(),
        user_id,
        &payload.whatsapp,
        &payload.casa,
    )
    .await?;
    Ok(Json(match outcome {
        PerfilOutcome::Completado(casa) => PerfilResponse::Completado {
            casa,
            sign_out: true,
        },
        PerfilOutcome::YaCompleto => PerfilResponse::YaCompleto { sign_out: false },
    }))
}

#[cfg(test)]
mod handler_tests {
    use super::*;
    use crate::casas::dto::DatosCasa;
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;
    use uuid::Uuid;

    const WA: &str = "5215512345678";

    fn state_with(store: &Arc<MemoryStore>) -> AppState {
        AppState::with_store(store.clone())
    }

    #[tokio::test]
    async fn login_issues_verifiable_token() {
        let store = Arc::new(MemoryStore::new());
        let casa = store.seed_casa(WA, "ROBLE-4");
        store.seed_usuario_mesa("PRESIDENTE", Some(casa.id), None, true);
        let state = state_with(&store);

        let Json(body) = login(
            State(state.clone()),
            Json(LoginRequest {
                rol: "PRESIDENTE".into(),
                whatsapp: WA.into(),
            }),
        )
        .await
        .unwrap();

        let LoginResponse::Authenticated {
            mesa_session,
            token,
        } = body
        else {
            panic!("expected authenticated");
        };
        let verified = JwtKeys::from_ref(&state).verify_session(&token).unwrap();
        assert_eq!(verified, mesa_session);
    }

    #[tokio::test]
    async fn login_response_shapes() {
        let state = AppState::fake();
        let Json(body) = login(
            State(state),
            Json(LoginRequest {
                rol: "PRESIDENTE".into(),
                whatsapp: WA.into(),
            }),
        )
        .await
        .unwrap();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "registration_required");

        let session = MesaSession {
            rol: "VOCAL".into(),
            whatsapp: WA.into(),
        };
        let json = serde_json::to_value(LoginResponse::Authenticated {
            mesa_session: session,
            token: "t".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "authenticated");
        assert_eq!(json["mesa_session"]["rol"], "VOCAL");
    }

    #[tokio::test]
    async fn registro_returns_created_then_conflict() {
        let store = Arc::new(MemoryStore::new());
        let state = state_with(&store);
        let payload = || {
            serde_json::from_value::<RegistroRequest>(serde_json::json!({
                "rol": "PRESIDENTE",
                "whatsapp": WA,
                "nombre": "Maria",
                "apellido": "Perez",
                "calle": "Roble",
                "numero": "4",
                "tipo_casa": "CASA",
                "tenencia": "INQUILINO"
            }))
            .unwrap()
        };

        let (status, _) = registro(State(state.clone()), Json(payload()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        // same phone again logs in with the existing casa
        let (status, _) = registro(State(state.clone()), Json(payload()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);

        let mut other = payload();
        other.whatsapp = "5215500000001".into();
        let err = registro(State(state), Json(other)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn perfil_flow_for_auth_user() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        store.seed_usuario_mesa("VOCAL", None, Some(user), false);
        let state = state_with(&store);

        let Json(estado_body) = estado(State(state.clone()), AuthUser(user)).await.unwrap();
        assert!(!estado_body.perfil_vecino_completo);

        let Json(body) = perfil(
            State(state.clone()),
            AuthUser(user),
            Json(PerfilRequest {
                whatsapp: WA.into(),
                casa: DatosCasa {
                    nombre: "Luis".into(),
                    apellido: "Ruiz".into(),
                    calle: "Pino".into(),
                    numero: "9".into(),
                    tipo_casa: "CASA".into(),
                    tenencia: "PROPIETARIO".into(),
                    interior: None,
                },
            }),
        )
        .await
        .unwrap();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "completado");
        assert_eq!(json["sign_out"], true);
        assert_eq!(json["casa"]["id_unico"], "PINO-9");

        let Json(estado_body) = estado(State(state), AuthUser(user)).await.unwrap();
        assert!(estado_body.perfil_vecino_completo);
    }

    #[tokio::test]
    async fn buscar_casa_returns_null_when_missing() {
        let state = AppState::fake();
        let Json(body) = buscar_casa(
            State(state),
            AuthUser(Uuid::new_v4()),
            Query(BuscarCasaQuery {
                whatsapp: WA.into(),
            }),
        )
        .await
        .unwrap();
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["casa"].is_null());
    }
}
