//! Readiness gate over the external identity provider.
//!
//! The identity provider reports asynchronously whether a user is signed in.
//! Calls that need a bearer token must wait for that report first. [AuthGate]
//! subscribes to the report exactly once and hands every caller, concurrent
//! or later, the same pending (or resolved) answer.

use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};
use tracing::{debug, info};

/// The user reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

/// Client-side handle to the external identity provider.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Subscribe to the provider's ready state. Resolves once the provider
    /// knows whether a user is signed in.
    fn on_ready(&self) -> BoxFuture<'static, Option<AuthUser>>;

    /// Current ID token of the signed-in user, `None` when signed out.
    fn id_token(&self) -> BoxFuture<'_, Result<Option<String>>>;
}

type Pending = Shared<BoxFuture<'static, bool>>;

/// One-shot latch over [IdentityProvider::on_ready].
#[derive(Default)]
pub struct AuthGate {
    latch: Mutex<Option<Pending>>,
    subscriptions: AtomicUsize,
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the provider is ready and report whether a user is signed
    /// in. Only the first call subscribes.
    pub async fn ready(&self, provider: &dyn IdentityProvider) -> bool {
        let pending = {
            let mut latch = self.latch.lock().unwrap_or_else(PoisonError::into_inner);
            match latch.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let count = self.subscriptions.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!(subscriptions = count, "subscribing to identity provider");
                    let pending = provider
                        .on_ready()
                        .map(|user| user.is_some())
                        .boxed()
                        .shared();
                    *latch = Some(pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    /// Clear the latch so the next [AuthGate::ready] subscribes again.
    pub fn reset(&self) {
        let mut latch = self.latch.lock().unwrap_or_else(PoisonError::into_inner);
        *latch = None;
    }

    /// Number of subscriptions created so far.
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

/// An identity provider together with its readiness gate.
pub struct Session {
    provider: Arc<dyn IdentityProvider>,
    gate: AuthGate,
}

impl Session {
    pub fn new(provider: impl IdentityProvider) -> Self {
        Self::from_arc(Arc::new(provider))
    }

    pub fn from_arc(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            gate: AuthGate::new(),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.gate.ready(self.provider.as_ref()).await
    }

    /// Bearer token for the signed-in user, waiting for the provider first.
    pub async fn bearer(&self) -> Result<String> {
        if !self.is_authenticated().await {
            return Err(Error::Unauthenticated);
        }
        let token = self
            .provider
            .id_token()
            .await?
            .ok_or(Error::Unauthenticated)?;
        if token.trim().is_empty() {
            return Err(Error::Identity(
                "provider returned an empty id token".to_string(),
            ));
        }
        Ok(token)
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub fn reset(&self) {
        info!("resetting auth session");
        self.gate.reset();
    }
}

/// Provider with a fixed user and token, for tools and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticToken {
    user: Option<AuthUser>,
    token: Option<String>,
}

impl StaticToken {
    pub fn signed_in(uid: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: Some(AuthUser {
                uid: uid.into(),
                email: None,
            }),
            token: Some(token.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticToken {
    fn on_ready(&self) -> BoxFuture<'static, Option<AuthUser>> {
        futures::future::ready(self.user.clone()).boxed()
    }

    fn id_token(&self) -> BoxFuture<'_, Result<Option<String>>> {
        futures::future::ready(Ok(self.token.clone())).boxed()
    }
}
