use crate::Client;
use arena_types::wallet::{Wallet, WalletTransaction};

impl Client {
    /// Fetch a user's wallet. Unknown users and failures yield `None`.
    pub async fn wallet(&self, user_id: &str) -> Option<Wallet> {
        self.fetch_one("wallet", self.endpoint(&["api", "wallet", user_id]))
            .await
    }

    /// Wallet history, newest first as served.
    pub async fn wallet_transactions(&self, user_id: &str) -> Vec<WalletTransaction> {
        self.fetch_list(
            "wallet_transactions",
            self.endpoint(&["api", "wallet", user_id, "transactions"]),
        )
        .await
    }
}
