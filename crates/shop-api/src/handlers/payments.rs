use super::json_body;
use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        Query, State,
    },
    response::Redirect,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use shop_core::{CallbackOutcome, GatewayCallback, InitiatePayment, Operation};
use tracing::{debug, info, instrument};

/// Where the storefront sends the shopper next
#[derive(Debug, Serialize)]
pub struct PaymentUrlResponse {
    pub payment_url: String,
}

/// Signature appended to the callback URLs handed to the gateway
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub sig: Option<String>,
}

/// The gateway posts form fields; a missing or unreadable body counts as empty.
fn callback_fields(form: Result<Form<GatewayCallback>, FormRejection>) -> GatewayCallback {
    match form {
        Ok(Form(callback)) => callback,
        Err(rejection) => {
            debug!("Unreadable callback body: {}", rejection);
            GatewayCallback::default()
        }
    }
}

#[instrument(skip(state, caller, body))]
pub async fn initiate_payment(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<InitiatePayment>, JsonRejection>,
) -> ApiResult<Json<PaymentUrlResponse>> {
    let user = state.authorize_user(Operation::PaymentInitiate, &caller)?;
    let request = json_body(body)?;
    let session = state.payments.initiate(user, request).await?;
    Ok(Json(PaymentUrlResponse {
        payment_url: session.gateway_url,
    }))
}

/// Gateway success callback: marks the order paid
#[instrument(skip_all)]
pub async fn payment_success(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<CallbackQuery>,
    form: Result<Form<GatewayCallback>, FormRejection>,
) -> ApiResult<Redirect> {
    state.authorize(Operation::PaymentSuccess, &caller)?;
    let callback = callback_fields(form);
    let order = state
        .payments
        .confirm_success(&callback, query.sig.as_deref())
        .await?;
    info!("Order {} paid, redirecting to dashboard", order.id);
    Ok(Redirect::to(&state.config.dashboard_url()))
}

#[instrument(skip_all)]
pub async fn payment_fail(
    State(state): State<AppState>,
    caller: Caller,
    form: Result<Form<GatewayCallback>, FormRejection>,
) -> ApiResult<Redirect> {
    state.authorize(Operation::PaymentFail, &caller)?;
    state
        .payments
        .record_outcome(CallbackOutcome::Failed, &callback_fields(form));
    Ok(Redirect::to(&state.config.dashboard_url()))
}

#[instrument(skip_all)]
pub async fn payment_cancel(
    State(state): State<AppState>,
    caller: Caller,
    form: Result<Form<GatewayCallback>, FormRejection>,
) -> ApiResult<Redirect> {
    state.authorize(Operation::PaymentCancel, &caller)?;
    state
        .payments
        .record_outcome(CallbackOutcome::Canceled, &callback_fields(form));
    Ok(Redirect::to(&state.config.dashboard_url()))
}
