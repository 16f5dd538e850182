//! Admin Config

use atelier_app::secrets::SecretString;
use clap::Args;

/// Admin API settings.
#[derive(Debug, Args)]
pub struct AdminConfig {
    /// Bearer token required on every `/admin` request
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: SecretString,
}
