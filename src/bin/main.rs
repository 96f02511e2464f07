// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! REST API server for the points ledger.
//!
//! ## Endpoints
//!
//! - `POST /transactions` - Ingest a payer transaction (credit or debit)
//! - `POST /spend` - Spend points across payers, oldest first
//! - `GET /balances` - Snapshot of all payer balances
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/transactions \
//!   -H "Content-Type: application/json" \
//!   -d '{"payer": "FETCH", "points": 300, "timestamp": "2022-10-14T00:00:00Z"}'
//!
//! curl -X POST http://localhost:3000/spend \
//!   -H "Content-Type: application/json" \
//!   -d '{"points": 100}'
//!
//! curl http://localhost:3000/balances
//! ```

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use clap::Parser;
use points_ledger_rs::{Ledger, LedgerError, PayerId, SpendShare};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Points Ledger - Reward-points tracking service
///
/// Serves a JSON API for ingesting payer transactions, spending points
/// oldest-first across payers, and reading balances. All state is held in
/// memory and lost on restart.
#[derive(Parser, Debug)]
#[command(name = "points-ledger")]
#[command(about = "A reward-points ledger served over HTTP", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
}

// === Request/Response DTOs ===

/// Request body for ingesting a transaction.
///
/// ```json
/// {"payer": "FETCH", "points": 300, "timestamp": "2022-10-14T00:00:00Z"}
/// ```
#[derive(Debug, Deserialize)]
struct TransactionRequest {
    payer: String,
    points: i64,
    timestamp: DateTime<Utc>,
}

/// Response body for an ingested transaction.
#[derive(Debug, Serialize)]
struct TransactionResponse {
    payer: String,
    balance: i64,
}

/// Request body for spending points.
#[derive(Debug, Deserialize)]
struct SpendRequest {
    points: i64,
}

/// One payer's share of a spend, rendered as a negative delta.
#[derive(Debug, Serialize)]
struct SpendShareResponse {
    payer: String,
    points: i64,
}

impl From<SpendShare> for SpendShareResponse {
    fn from(share: SpendShare) -> Self {
        SpendShareResponse {
            payer: share.payer_id.0,
            points: -share.points,
        }
    }
}

/// Response body for errors.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

// === Application State ===

#[derive(Clone)]
struct AppState {
    ledger: Arc<Ledger>,
}

// === Error Handling ===

/// Wrapper for converting [`LedgerError`] into HTTP responses.
struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LedgerError::EmptyPayerId => (StatusCode::BAD_REQUEST, "EMPTY_PAYER_ID"),
            LedgerError::InvalidSpendAmount => (StatusCode::BAD_REQUEST, "INVALID_SPEND_AMOUNT"),
            LedgerError::UnknownPayer | LedgerError::MissingTransaction => {
                (StatusCode::INTERNAL_SERVER_ERROR, "LEDGER_DESYNC")
            }
        };

        if self.0.is_internal() {
            error!(code, "internal ledger inconsistency: {}", self.0);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /transactions - Ingest a transaction.
async fn create_transaction(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let payer = request.payer.clone();
    let balance = state
        .ledger
        .ingest(PayerId(request.payer), request.points, request.timestamp)?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse { payer, balance }),
    ))
}

/// POST /spend - Spend points across payers, oldest first.
async fn spend_points(
    State(state): State<AppState>,
    Json(request): Json<SpendRequest>,
) -> Result<Json<Vec<SpendShareResponse>>, AppError> {
    let shares = state.ledger.spend(request.points)?;
    Ok(Json(shares.into_iter().map(Into::into).collect()))
}

/// GET /balances - Snapshot of all payer balances.
async fn get_balances(State(state): State<AppState>) -> Json<BTreeMap<PayerId, i64>> {
    Json(state.ledger.balances())
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/transactions", post(create_transaction))
        .route("/spend", post(spend_points))
        .route("/balances", get(get_balances))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let state = AppState {
        ledger: Arc::new(Ledger::new()),
    };
    let app = create_router(state);

    let listener = match TcpListener::bind(args.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {}: {}", args.listen, e);
            process::exit(1);
        }
    };
    info!("points ledger listening on http://{}", args.listen);

    if let Err(e) = axum::serve(listener, app).await {
        error!("server error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_share_renders_negative_delta() {
        let share = SpendShare {
            payer_id: PayerId::from("FETCH"),
            points: 200,
        };
        let rendered = SpendShareResponse::from(share);
        assert_eq!(rendered.payer, "FETCH");
        assert_eq!(rendered.points, -200);
    }

    #[test]
    fn validation_errors_map_to_bad_request() {
        let response = AppError(LedgerError::InvalidSpendAmount).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError(LedgerError::EmptyPayerId).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_map_to_server_error() {
        let response = AppError(LedgerError::UnknownPayer).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn transaction_request_parses_rfc3339_timestamp() {
        let request: TransactionRequest = serde_json::from_str(
            r#"{"payer": "FETCH", "points": 300, "timestamp": "2022-10-14T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(request.payer, "FETCH");
        assert_eq!(request.points, 300);
        assert_eq!(request.timestamp.timestamp(), 1_665_705_600);
    }
}
