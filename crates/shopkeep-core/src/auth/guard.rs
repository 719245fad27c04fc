//! Route guarding for whatever navigation layer sits on top of the session.
//!
//! The router calls [`evaluate`] on every navigation and acts on the
//! decision. `ForceLogout` should be unreachable because login and restore
//! already refuse non-admins, but it is checked anyway.

use super::SessionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Protected(String),
}

impl Route {
    /// Map a path such as `/login` or `/products` to a route. The root path
    /// counts as the login page.
    pub fn from_path(path: &str) -> Self {
        match path.trim_matches('/').split('/').next().unwrap_or("") {
            "" | "login" => Route::Login,
            first => Route::Protected(first.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still loading; show a neutral placeholder.
    Wait,
    Allow,
    RedirectToLogin,
    /// Authenticated but not an admin: log out, then go to login.
    ForceLogout,
    /// Already signed in and sitting on the login page.
    RedirectToDashboard,
}

pub fn evaluate(state: &SessionState, route: &Route) -> GuardDecision {
    if state.is_loading {
        return GuardDecision::Wait;
    }

    let on_login = matches!(route, Route::Login);
    if !state.is_authenticated {
        return if on_login {
            GuardDecision::Allow
        } else {
            GuardDecision::RedirectToLogin
        };
    }

    if !state.user.as_ref().is_some_and(|u| u.is_admin()) {
        return GuardDecision::ForceLogout;
    }

    if on_login {
        GuardDecision::RedirectToDashboard
    } else {
        GuardDecision::Allow
    }
}
