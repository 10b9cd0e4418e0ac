use axum::{
    Json, Router,
    extract::Query,
    response::Json as ResponseJson,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use services::services::currency::{format_brl, mask_brl_input, parse_brl};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{Deployment, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ParseAmount {
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    pub cents: i64,
}

#[derive(Debug, Deserialize, TS)]
pub struct MaskInput {
    pub input: String,
}

#[derive(Debug, Serialize, TS)]
pub struct Amount {
    pub cents: i64,
    pub formatted: String,
}

pub async fn parse_amount(
    Json(payload): Json<ParseAmount>,
) -> Result<ResponseJson<ApiResponse<Amount>>, ApiError> {
    let cents = parse_brl(&payload.amount)?;
    Ok(ResponseJson(ApiResponse::success(Amount {
        cents,
        formatted: format_brl(cents),
    })))
}

pub async fn format_amount(Query(query): Query<FormatQuery>) -> ResponseJson<ApiResponse<Amount>> {
    ResponseJson(ApiResponse::success(Amount {
        cents: query.cents,
        formatted: format_brl(query.cents),
    }))
}

/// Reformat a value as it is being typed into a currency field
pub async fn mask_input(Json(payload): Json<MaskInput>) -> ResponseJson<ApiResponse<String>> {
    ResponseJson(ApiResponse::success(mask_brl_input(&payload.input)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/currency/parse", post(parse_amount))
        .route("/currency/format", get(format_amount))
        .route("/currency/mask", post(mask_input))
}
