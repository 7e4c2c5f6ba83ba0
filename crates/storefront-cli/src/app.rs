//! Wiring of the shared services used by every command.

use api_transport::ApiClient;
use auth_session::{AuthSession, IdentityProvider, OidcClient, TokenProvider};
use client_config_and_utils::{Config, Paths};
use http_problem::MessageCatalog;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct App {
    pub config: Config,
    pub catalog: Arc<MessageCatalog>,
    /// Present only when an OIDC authority and client ID are configured.
    pub session: Option<AuthSession>,
    pub client: ApiClient,
}

impl App {
    pub fn init(config: Config, paths: Paths) -> Result<Self, Box<dyn std::error::Error>> {
        let catalog = Arc::new(load_catalog(&config, &paths));
        let tokens = Arc::new(TokenProvider::new());

        let session = match config.oidc() {
            Ok((authority, client_id)) => {
                let store = session_storage::create_session_store(&paths, authority, client_id)?;
                let provider: Arc<dyn IdentityProvider> =
                    Arc::new(OidcClient::new(authority, client_id, &config.oidc_scope)?);
                let session = AuthSession::new(store, provider, tokens.clone());
                session.set_state_callback(Box::new(|payload| {
                    if payload.reauthentication_required {
                        warn!(state = %payload.state, "Session expired, sign in again");
                    } else {
                        debug!(state = %payload.state, user_id = ?payload.user_id, "Auth state changed");
                    }
                }));
                session.restore()?;
                Some(session)
            }
            Err(e) => {
                info!(reason = %e, "Sign-in not configured, requests go out without a token");
                None
            }
        };

        let client = ApiClient::from_config(&config, tokens, catalog.clone())?;

        Ok(Self {
            config,
            catalog,
            session,
            client,
        })
    }

    /// The session, or a configuration error explaining how to enable it.
    pub fn session(&self) -> Result<&AuthSession, Box<dyn std::error::Error>> {
        self.session.as_ref().ok_or_else(|| {
            "sign-in is not configured: set STOREFRONT_OIDC_AUTHORITY and STOREFRONT_OIDC_CLIENT_ID"
                .into()
        })
    }
}

fn load_catalog(config: &Config, paths: &Paths) -> MessageCatalog {
    let catalog = MessageCatalog::new();
    if let Err(e) = catalog.set_locale(&config.locale) {
        warn!(error = %e, "Falling back to the default locale");
    }

    let dir = paths.locales_dir();
    if dir.is_dir() {
        match catalog.load_dir(&dir) {
            Ok(count) => debug!(count, dir = %dir.display(), "Loaded extra translations"),
            Err(e) => warn!(error = %e, dir = %dir.display(), "Failed to load translations"),
        }
    }
    catalog
}
