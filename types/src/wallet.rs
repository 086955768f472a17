use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub user_id: String,
    /// Balance in minor units of `currency`.
    pub balance: i64,
    pub currency: String,
    pub updated_at_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Entry,
    Prize,
    Bet,
    Payout,
}

impl TransactionKind {
    /// Whether the transaction adds funds to the wallet.
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            TransactionKind::Deposit | TransactionKind::Prize | TransactionKind::Payout
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: String,
    pub kind: TransactionKind,
    pub amount: i64,
    pub created_at_ms: u64,
}

impl WalletTransaction {
    /// Amount with the sign applied from the wallet's point of view.
    pub fn signed_amount(&self) -> i64 {
        if self.kind.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}
