use crate::Client;
use arena_types::tournament::{Payout, ResultUpload, TournamentResult};
use reqwest::Method;

impl Client {
    /// Upload final standings for a tournament the user hosts.
    pub async fn upload_results(&self, tournament_id: &str, upload: ResultUpload) -> bool {
        self.command(
            "upload_results",
            Method::POST,
            self.endpoint(&["api", "tournaments", tournament_id, "results", "upload"]),
            Ok(Some(upload)),
        )
        .await
    }

    pub async fn tournament_results(&self, tournament_id: &str) -> Option<TournamentResult> {
        self.fetch_one(
            "tournament_results",
            self.endpoint(&["api", "tournaments", tournament_id, "results"]),
        )
        .await
    }

    pub async fn tournament_payouts(&self, tournament_id: &str) -> Vec<Payout> {
        self.fetch_list(
            "tournament_payouts",
            self.endpoint(&["api", "tournaments", tournament_id, "payouts"]),
        )
        .await
    }

    pub async fn mark_payout_sent(&self, payout_id: &str) -> bool {
        self.command::<()>(
            "mark_payout_sent",
            Method::PATCH,
            self.endpoint(&["api", "payouts", payout_id, "mark-sent"]),
            Ok(None),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{serve_router, signed_in_client};
    use arena_types::tournament::{
        Payout, PayoutStatus, Placement, ResultUpload, TournamentResult,
    };
    use axum::{
        extract::{Path, State as AxumState},
        http::StatusCode as AxumStatusCode,
        response::IntoResponse,
        routing::{get, patch, post},
        Json, Router,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Ledger {
        results: Option<TournamentResult>,
        payouts: Vec<Payout>,
    }

    type Shared = Arc<Mutex<Ledger>>;

    fn placement(user_id: &str, rank: u32) -> Placement {
        Placement {
            team_id: None,
            user_id: Some(user_id.to_string()),
            rank,
            kills: Some(rank * 2),
        }
    }

    fn router(ledger: Shared) -> Router {
        Router::new()
            .route(
                "/api/tournaments/:id/results/upload",
                post(
                    |AxumState(ledger): AxumState<Shared>,
                     Path(id): Path<String>,
                     Json(upload): Json<ResultUpload>| async move {
                        let mut ledger = ledger.lock().unwrap();
                        ledger.payouts = upload
                            .placements
                            .iter()
                            .filter(|p| p.rank <= 2)
                            .map(|p| Payout {
                                id: format!("payout-{}", p.rank),
                                tournament_id: id.clone(),
                                user_id: p.user_id.clone().unwrap_or_default(),
                                amount: 1_000 / i64::from(p.rank),
                                status: PayoutStatus::Pending,
                            })
                            .collect();
                        ledger.results = Some(TournamentResult {
                            tournament_id: id,
                            placements: upload.placements,
                            uploaded_at_ms: 7,
                        });
                        AxumStatusCode::CREATED
                    },
                ),
            )
            .route(
                "/api/tournaments/:id/results",
                get(|AxumState(ledger): AxumState<Shared>| async move {
                    match ledger.lock().unwrap().results.clone() {
                        Some(results) => Json(results).into_response(),
                        None => AxumStatusCode::NOT_FOUND.into_response(),
                    }
                }),
            )
            .route(
                "/api/tournaments/:id/payouts",
                get(|AxumState(ledger): AxumState<Shared>| async move {
                    Json(ledger.lock().unwrap().payouts.clone())
                }),
            )
            .route(
                "/api/payouts/:id/mark-sent",
                patch(
                    |AxumState(ledger): AxumState<Shared>, Path(id): Path<String>| async move {
                        let mut ledger = ledger.lock().unwrap();
                        match ledger.payouts.iter_mut().find(|p| p.id == id) {
                            Some(payout) => {
                                payout.status = PayoutStatus::Sent;
                                AxumStatusCode::OK
                            }
                            None => AxumStatusCode::NOT_FOUND,
                        }
                    },
                ),
            )
            .with_state(ledger)
    }

    #[tokio::test]
    async fn test_results_and_payouts() {
        let ledger = Shared::default();
        let (base_url, handle) = serve_router(router(ledger.clone())).await;
        let client = signed_in_client(&base_url);

        assert_eq!(client.tournament_results("t-1").await, None);
        assert!(client.tournament_payouts("t-1").await.is_empty());

        let upload = ResultUpload::new(vec![
            placement("a", 1),
            placement("b", 2),
            placement("c", 3),
        ])
        .unwrap();
        assert!(client.upload_results("t-1", upload).await);

        let results = client.tournament_results("t-1").await.unwrap();
        assert_eq!(results.winner().and_then(|p| p.user_id.as_deref()), Some("a"));

        let payouts = client.tournament_payouts("t-1").await;
        assert_eq!(payouts.len(), 2);
        assert!(payouts.iter().all(|p| p.status == PayoutStatus::Pending));

        assert!(client.mark_payout_sent("payout-1").await);
        assert!(!client.mark_payout_sent("payout-9").await);
        let payouts = client.tournament_payouts("t-1").await;
        assert_eq!(payouts[0].status, PayoutStatus::Sent);
        assert_eq!(payouts[1].status, PayoutStatus::Pending);

        handle.abort();
    }
}
