/*
 * REST API used by the language-model front-end
 */

use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, post, routes, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::catalog::ToolDefinition;
use crate::config::Config;
use crate::conversation::Message;
use crate::dispatcher::{DispatchRequest, DispatchResult};
use crate::service::GridService;
use crate::utils::checksum;

pub struct ApiState {
    pub config: Config,
    /// One intent at a time: a dispatch holds the lock until its receipt arrives.
    pub service: Arc<Mutex<GridService>>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantReply {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub chain_id: u64,
    pub signer: String,
    pub grid_hook: String,
    pub swap_router: String,
    pub pool_id: String,
}

#[get("/api/v1/actions")]
pub async fn list_actions(state: &State<ApiState>) -> Json<Vec<ToolDefinition>> {
    let service = state.service.lock().await;
    Json(service.manifest())
}

#[post("/api/v1/dispatch", format = "json", data = "<request>")]
pub async fn dispatch(
    request: Json<DispatchRequest>,
    state: &State<ApiState>,
) -> std::result::Result<Json<DispatchResult>, Custom<String>> {
    let request = request.into_inner();
    if request.action.trim().is_empty() {
        return Err(Custom(Status::BadRequest, "action must not be empty".to_string()));
    }

    let mut service = state.service.lock().await;
    Ok(Json(service.handle(request).await))
}

#[post("/api/v1/conversation/assistant", format = "json", data = "<reply>")]
pub async fn record_reply(
    reply: Json<AssistantReply>,
    state: &State<ApiState>,
) -> std::result::Result<Json<Message>, Custom<String>> {
    let mut service = state.service.lock().await;
    service
        .record_reply(&reply.content)
        .map(|message| Json(message.clone()))
        .map_err(|e| Custom(Status::BadRequest, e.to_string()))
}

#[get("/api/v1/conversation")]
pub async fn conversation(state: &State<ApiState>) -> Json<Vec<Message>> {
    let service = state.service.lock().await;
    Json(service.conversation().messages().to_vec())
}

#[get("/api/v1/info")]
pub async fn info(state: &State<ApiState>) -> Json<ServiceInfo> {
    let service = state.service.lock().await;
    let deployment = service.deployment();
    Json(ServiceInfo {
        chain_id: state.config.chain.chain_id,
        signer: checksum(&service.signer()),
        grid_hook: checksum(&deployment.grid_hook),
        swap_router: checksum(&deployment.swap_router),
        pool_id: deployment.pool_key.to_id().to_string(),
    })
}

#[must_use]
pub fn create_rocket(state: ApiState) -> rocket::Rocket<rocket::Build> {
    let figment = rocket::Config::figment()
        .merge(("address", state.config.server.host.clone()))
        .merge(("port", state.config.server.port));

    rocket::custom(figment).manage(state).mount(
        "/",
        routes![list_actions, dispatch, record_reply, conversation, info, health_check],
    )
}

#[get("/health")]
pub async fn health_check() -> &'static str {
    "OK"
}
