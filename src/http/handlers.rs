use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::caller::Caller;
use crate::domain::task::TaskStatus;
use crate::error::{AppError, AppResult};

use super::dto::{CreateTaskRequest, ListTasksQuery, SubscriptionWebhookEvent, TaskListResponse, TaskResponse};
use super::signature::verify_hmac_signature;
use super::state::AppState;

fn caller_from_request(req: &HttpRequest) -> AppResult<Caller> {
    if let Some(user_id) = req.headers().get("X-User-Id") {
        let user_id = user_id.to_str().map_err(|_| AppError::Unauthorized("invalid X-User-Id header".to_string()))?;
        let user_id = Uuid::parse_str(user_id).map_err(|_| AppError::Unauthorized("invalid X-User-Id header".to_string()))?;
        return Ok(Caller::authenticated(user_id));
    }
    if let Some(anon_id) = req.headers().get("X-Anon-Id") {
        let anon_id = anon_id.to_str().map_err(|_| AppError::Unauthorized("invalid X-Anon-Id header".to_string()))?;
        return Ok(Caller::anonymous(anon_id.to_string()));
    }
    Err(AppError::Unauthorized("missing X-User-Id or X-Anon-Id header".to_string()))
}

#[instrument(skip(state, body))]
pub async fn create_task(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateTaskRequest>,
) -> AppResult<HttpResponse> {
    let caller = caller_from_request(&req)?;
    let body = body.into_inner();

    let task = state
        .admission
        .create_task(&caller, body.source_type, body.source_url, body.params, body.is_trial)
        .await?;

    state.dispatcher.dispatch(task.id).await?;

    Ok(HttpResponse::Accepted().json(TaskResponse::from(task)))
}

#[instrument(skip(state))]
pub async fn get_task(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let task = state.storage.get_task(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TaskResponse::from(task)))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ListTasksQuery>,
) -> AppResult<HttpResponse> {
    let caller = caller_from_request(&req)?;
    let query = query.into_inner();
    let status: Option<TaskStatus> = query.status;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let tasks = state.storage.list_tasks(caller.owner_key(), status, query.cursor, limit).await?;
    let tasks = tasks.into_iter().map(TaskResponse::from).collect();
    Ok(HttpResponse::Ok().json(TaskListResponse { tasks }))
}

/// Sync STT async-mode webhook (spec.md S6): verifies the `dg-signature`
/// HMAC-SHA256 header and acquires the idempotency lock before accepting.
#[instrument(skip(state, body))]
pub async fn sync_stt_webhook(req: HttpRequest, state: web::Data<AppState>, body: web::Bytes) -> AppResult<HttpResponse> {
    let signature = req
        .headers()
        .get("dg-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing dg-signature header".to_string()))?;

    if !verify_hmac_signature(&state.settings.providers.sync_stt_webhook_secret, &body, signature) {
        return Err(AppError::Unauthorized("invalid dg-signature".to_string()));
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)?;
    let event_id = payload
        .get("request_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::InvalidInput("webhook payload missing request_id".to_string()))?;

    let acquired = state.storage.try_acquire_webhook_lock("sync_stt", event_id).await?;
    if !acquired {
        info!(event_id, "sync STT webhook already processed, skipping");
        return Ok(HttpResponse::Ok().finish());
    }

    state.storage.mark_webhook_completed("sync_stt", event_id).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Subscription lifecycle webhook (spec.md S6): binds a trial usage record
/// to the user account once they sign up or subscribe.
#[instrument(skip(state, body))]
pub async fn subscription_webhook(req: HttpRequest, state: web::Data<AppState>, body: web::Bytes) -> AppResult<HttpResponse> {
    let signature = req
        .headers()
        .get("X-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing X-Signature header".to_string()))?;

    if !verify_hmac_signature(&state.settings.providers.subscription_webhook_secret, &body, signature) {
        return Err(AppError::Unauthorized("invalid X-Signature".to_string()));
    }

    let event: SubscriptionWebhookEvent = serde_json::from_slice(&body)?;

    let acquired = state.storage.try_acquire_webhook_lock("subscription", &event.event_id).await?;
    if !acquired {
        info!(event_id = %event.event_id, "subscription webhook already processed, skipping");
        return Ok(HttpResponse::Ok().finish());
    }

    if event.event_type == "user.signed_up" {
        if let Some(anon_id) = &event.anon_id {
            state.billing.bind_trial_to_user(event.user_id, anon_id).await?;
        }
    } else {
        warn!(event_type = %event.event_type, "unhandled subscription webhook event type");
    }

    state.storage.mark_webhook_completed("subscription", &event.event_id).await?;
    Ok(HttpResponse::Ok().finish())
}
