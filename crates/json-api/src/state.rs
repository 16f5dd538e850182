//! State

use std::sync::Arc;

use atelier_app::{context::AppContext, secrets::SecretString};

#[derive(Clone)]
pub(crate) struct State {
    pub(crate) app: AppContext,
    pub(crate) admin_token: SecretString,
}

impl State {
    #[must_use]
    pub(crate) fn new(app: AppContext, admin_token: SecretString) -> Self {
        Self { app, admin_token }
    }

    #[must_use]
    pub(crate) fn shared(app: AppContext, admin_token: SecretString) -> Arc<Self> {
        Arc::new(Self::new(app, admin_token))
    }
}
