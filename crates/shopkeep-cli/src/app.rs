//! Application shell: wires config, storage, HTTP client and the session
//! manager together and implements each CLI command on top of them.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Local, Utc};
use tracing::{debug, error, info, warn};

use shopkeep_core::api::ADMIN_ONLY_MESSAGE;
use shopkeep_core::auth::validation;
use shopkeep_core::{guard, ApiClient, Config, ErrorKind, GuardDecision, Route, SessionManager};

/// Email/password from the environment skip the interactive prompts
const EMAIL_ENV: &str = "SHOPKEEP_EMAIL";
const PASSWORD_ENV: &str = "SHOPKEEP_PASSWORD";

pub struct App {
    pub config: Config,
    api: Arc<ApiClient>,
    session: Arc<SessionManager>,
}

impl App {
    /// Build the shell and restore any stored session.
    pub async fn new(config: Config) -> Result<Self> {
        let api_url = config.effective_api_url();
        debug!(api_url = %api_url, storage = ?config.storage, "Config loaded");

        let api = Arc::new(ApiClient::new(api_url)?);
        let store = config.open_store()?;
        let session = Arc::new(SessionManager::new(store, api.clone()));
        session.load_user_data().await;

        Ok(Self {
            config,
            api,
            session,
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn login_interactive(&mut self, email_arg: Option<String>) -> Result<()> {
        if let Some(user) = self.session.state().user {
            println!("Already logged in as {}.", user.email);
            return Ok(());
        }

        println!("\n=== Shopkeep Admin Login ===\n");

        let email = match email_arg.or_else(|| std::env::var(EMAIL_ENV).ok()) {
            Some(email) => email,
            None => self.prompt_email()?,
        };
        if let Some(problem) = validation::email_error(&email) {
            bail!(problem);
        }

        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) if !password.is_empty() => password,
            _ => rpassword::prompt_password("Password: ")?,
        };

        println!("\nAuthenticating...");

        match self.session.login(&email, &password).await {
            Ok(user) => {
                self.config.last_email = Some(user.email.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                println!("Welcome, {}!\n", user.display_name());
                Ok(())
            }
            Err(e) => {
                error!(error = %e, kind = ?e.kind(), "Login failed");
                bail!("Login failed: {}", e.user_message())
            }
        }
    }

    fn prompt_email(&self) -> Result<String> {
        match self.config.last_email {
            Some(ref last) => print!("Email [{}]: ", last),
            None => print!("Email: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        Ok(match (input.is_empty(), &self.config.last_email) {
            (true, Some(last)) => last.clone(),
            _ => input.to_string(),
        })
    }

    pub async fn logout(&self) {
        self.session.logout().await;
        println!("Logged out.");
    }

    pub async fn forgot_password(&self, email_arg: Option<String>) -> Result<()> {
        let email = match email_arg.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => self.prompt_email()?,
        };

        if let Err(e) = self.session.forgot_password(&email).await {
            bail!(e.user_message());
        }
        println!("If {} belongs to an account, a reset link is on its way.", email.trim());
        Ok(())
    }

    // =========================================================================
    // Session inspection
    // =========================================================================

    pub async fn status(&self) -> Result<()> {
        let state = self.session.state();
        let Some(user) = state.user else {
            println!("Not logged in.");
            return Ok(());
        };

        println!("Logged in as {} <{}> ({:?})", user.display_name(), user.email, user.role);
        println!("Backend:       {}", self.api.base_url());

        let credentials = self.session.credentials();
        if let Some(expires_at) = credentials.access_token_expires_at().await {
            let remaining = expires_at - Utc::now().timestamp_millis();
            if remaining > 0 {
                println!("Access token:  expires in {}", format_duration(Duration::milliseconds(remaining)));
            } else {
                println!("Access token:  expired (renewed on next use)");
            }
        }
        if let Some(last_login) = credentials.last_login().await {
            let ends = last_login + Duration::hours(shopkeep_core::auth::SESSION_MAX_AGE_HOURS);
            println!("Signed in at:  {}", format_local(last_login));
            println!("Session ends:  {}", format_local(ends));
        }
        Ok(())
    }

    /// Print a live access token, renewing it first if needed.
    pub async fn print_token(&self) -> Result<()> {
        let token = self.authorize(&Route::Protected("token".to_string())).await?;
        println!("{}", token);
        Ok(())
    }

    /// GET a backend path with the session's bearer token and pretty-print the JSON.
    pub async fn get(&self, path: &str) -> Result<()> {
        let route = Route::from_path(path);
        let token = self.authorize(&route).await?;

        match self.api.get_authorized::<serde_json::Value>(path, &token).await {
            Ok(body) => {
                println!("{}", serde_json::to_string_pretty(&body)?);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::Unauthorized => {
                warn!(error = %e, "Backend rejected the access token");
                bail!("The server rejected your session: {}", e.user_message())
            }
            Err(e) => bail!(e),
        }
    }

    /// Run the route guard for `route` and obtain a bearer token.
    async fn authorize(&self, route: &Route) -> Result<String> {
        match guard::evaluate(&self.session.state(), route) {
            GuardDecision::Allow => {}
            GuardDecision::RedirectToLogin => bail!("Not logged in. Run `shopkeep login` first."),
            GuardDecision::ForceLogout => {
                self.session.enforce_admin().await;
                bail!(ADMIN_ONLY_MESSAGE);
            }
            other => bail!("Cannot open {:?} right now ({:?})", route, other),
        }

        match self.session.tokens().get_valid_access_token().await {
            Some(token) => Ok(token),
            None => {
                self.session.check_session_validity().await;
                bail!("Your session has expired. Please log in again.")
            }
        }
    }

    // =========================================================================
    // Foreground session
    // =========================================================================

    /// Keep the session alive in the foreground: renew the access token and
    /// run the validity check every interval until the session ends or the
    /// user presses Ctrl-C.
    pub async fn watch(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not logged in. Run `shopkeep login` first.");
        }

        let period = self.config.session_check_interval();
        let checker = self.session.clone().spawn_validity_check(period);
        let mut state_rx = self.session.subscribe();
        let mut renew = tokio::time::interval(period);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        info!(period_secs = period.as_secs(), "Watching session");
        println!("Watching session (Ctrl-C to stop)...");

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    println!("\nStopped.");
                    break;
                }
                _ = renew.tick() => {
                    if self.session.tokens().get_valid_access_token().await.is_none() {
                        debug!("No valid access token; waiting for validity check");
                    }
                }
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if !state_rx.borrow_and_update().is_authenticated {
                        println!("Session ended. Run `shopkeep login` to sign in again.");
                        break;
                    }
                }
            }
        }

        checker.abort();
        Ok(())
    }
}

fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%b %d, %Y %H:%M").to_string()
}

/// "1h 05m", "14m", "45s"
fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    let (hours, minutes) = (secs / 3600, (secs % 3600) / 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", secs)
    }
}
