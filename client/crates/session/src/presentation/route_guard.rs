//! Route Guards
//!
//! Decide whether a navigation may proceed. A guard never decides while the
//! session or the needed role answer is still unknown; it reports
//! `Resolving` instead.

use std::sync::Arc;
use std::time::Duration;

use crate::application::config::SessionConfig;
use crate::application::role_resolver::{RoleQuery, RoleResolver};
use crate::application::session_state::{SessionSnapshot, SessionState};
use crate::domain::navigation::{Location, Navigator};
use crate::domain::repository::RoleRepository;
use crate::domain::value_object::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// Any signed-in user
    Private,
    Admin,
    Hr,
    Employee,
}

impl RouteKind {
    pub fn required_role(&self) -> Option<Role> {
        match self {
            RouteKind::Private => None,
            RouteKind::Admin => Some(Role::Admin),
            RouteKind::Hr => Some(Role::Hr),
            RouteKind::Employee => Some(Role::Employee),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show a loading indicator; decide later
    Resolving,
    Allowed,
    Denied { redirect: Location },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allowed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPaths {
    pub login: String,
    pub home: String,
}

impl GuardPaths {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            login: config.login_path.clone(),
            home: config.home_path.clone(),
        }
    }
}

/// Decide from state alone.
///
/// `role` is the answer for `kind`'s role and the signed-in email; it is
/// ignored for private routes.
pub fn evaluate(
    kind: RouteKind,
    attempted: &str,
    session: &SessionSnapshot,
    role: Option<&RoleQuery>,
    paths: &GuardPaths,
) -> GuardDecision {
    if session.phase.is_resolving() {
        return GuardDecision::Resolving;
    }

    let to_login = || GuardDecision::Denied {
        redirect: Location::returning_to(paths.login.clone(), attempted),
    };

    if !session.is_authenticated() {
        return to_login();
    }

    if kind.required_role().is_none() {
        return GuardDecision::Allowed;
    }

    let Some(query) = role else {
        return GuardDecision::Resolving;
    };

    match query.value {
        Some(true) => GuardDecision::Allowed,
        Some(false) => GuardDecision::Denied {
            redirect: Location::new(paths.home.clone()),
        },
        None if query.error.is_some() && !query.fetching => GuardDecision::Denied {
            redirect: Location::new(paths.home.clone()),
        },
        None => GuardDecision::Resolving,
    }
}

pub struct RouteGuard<R>
where
    R: RoleRepository,
{
    state: Arc<SessionState>,
    roles: Arc<RoleResolver<R>>,
    navigator: Arc<dyn Navigator>,
    paths: GuardPaths,
    resolve_timeout: Duration,
}

impl<R> RouteGuard<R>
where
    R: RoleRepository,
{
    pub fn new(
        state: Arc<SessionState>,
        roles: Arc<RoleResolver<R>>,
        navigator: Arc<dyn Navigator>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            state,
            roles,
            navigator,
            paths: GuardPaths::from_config(config),
            resolve_timeout: config.resolve_timeout,
        }
    }

    /// Decision from what is known right now. Never fetches, never redirects.
    pub fn check(&self, kind: RouteKind, attempted: &str) -> GuardDecision {
        let session = self.state.snapshot();
        let role = self.cached_role(kind, &session);
        evaluate(kind, attempted, &session, role.as_ref(), &self.paths)
    }

    /// Wait for a terminal decision and perform the redirect on denial.
    pub async fn authorize(&self, kind: RouteKind, attempted: &str) -> GuardDecision {
        let decision = match tokio::time::timeout(self.resolve_timeout, self.settle(kind, attempted))
            .await
        {
            Ok(decision) => decision,
            Err(_) => {
                tracing::warn!(?kind, attempted, "Route guard timed out while resolving");
                GuardDecision::Denied {
                    redirect: Location::returning_to(self.paths.login.clone(), attempted),
                }
            }
        };

        if let GuardDecision::Denied { redirect } = &decision {
            tracing::info!(?kind, attempted, to = %redirect.path, "Route denied");
            self.navigator.navigate(redirect);
        }
        decision
    }

    async fn settle(&self, kind: RouteKind, attempted: &str) -> GuardDecision {
        loop {
            let mut rx = self.state.subscribe();
            let session = rx
                .wait_for(|snap| !snap.phase.is_resolving())
                .await
                .map(|snap| snap.clone())
                .unwrap_or_else(|_| self.state.snapshot());

            let role = match (kind.required_role(), session.email()) {
                (Some(role), Some(email)) if session.is_authenticated() => {
                    Some(self.roles.resolve(role, email).await)
                }
                _ => None,
            };

            // The session may have changed while the role answer was in flight.
            let current = self.state.snapshot();
            if current.epoch != session.epoch || current.phase != session.phase {
                continue;
            }

            let decision = evaluate(kind, attempted, &current, role.as_ref(), &self.paths);
            if decision != GuardDecision::Resolving {
                return decision;
            }
        }
    }

    fn cached_role(&self, kind: RouteKind, session: &SessionSnapshot) -> Option<RoleQuery> {
        let role = kind.required_role()?;
        let email = session.email()?;
        Some(self.roles.query(role, email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session_state::SessionPhase;
    use crate::domain::entity::{
        application_user::ApplicationUser, provider_identity::ProviderIdentity,
    };
    use crate::domain::value_object::{account_status::AccountStatus, email::Email};

    fn paths() -> GuardPaths {
        GuardPaths {
            login: "/login".into(),
            home: "/".into(),
        }
    }

    fn session(phase: SessionPhase, signed_in: bool) -> SessionSnapshot {
        let user = signed_in.then(|| {
            ApplicationUser::vetted(
                &ProviderIdentity::new("u1", Some("a@x.com".into())),
                Email::new("a@x.com").unwrap(),
                &AccountStatus::unknown_account(),
            )
        });
        SessionSnapshot {
            phase,
            user,
            epoch: 1,
            pending_registration: None,
            last_invalidation: None,
        }
    }

    fn answer(value: Option<bool>, loading: bool, error: bool) -> RoleQuery {
        RoleQuery {
            value,
            loading,
            fetching: loading,
            error: error.then(|| "role check failed".to_string()),
            fetched_at: None,
        }
    }

    #[test]
    fn resolving_while_identity_unknown() {
        for phase in [SessionPhase::Unknown, SessionPhase::Authenticating] {
            for kind in [RouteKind::Private, RouteKind::Admin] {
                assert_eq!(
                    evaluate(kind, "/dashboard", &session(phase, false), None, &paths()),
                    GuardDecision::Resolving
                );
            }
        }
    }

    #[test]
    fn private_denial_remembers_attempted_location() {
        let decision = evaluate(
            RouteKind::Private,
            "/dashboard",
            &session(SessionPhase::Unauthenticated, false),
            None,
            &paths(),
        );
        assert_eq!(
            decision,
            GuardDecision::Denied {
                redirect: Location::returning_to("/login", "/dashboard")
            }
        );
    }

    #[test]
    fn no_user_is_denied_even_with_cached_role() {
        let granted = answer(Some(true), false, false);
        for kind in [RouteKind::Admin, RouteKind::Hr, RouteKind::Employee] {
            let decision = evaluate(
                kind,
                "/x",
                &session(SessionPhase::Unauthenticated, false),
                Some(&granted),
                &paths(),
            );
            assert!(matches!(decision, GuardDecision::Denied { .. }));
        }
    }

    #[test]
    fn role_answers_decide_role_routes() {
        let signed_in = session(SessionPhase::Authenticated, true);
        let home = GuardDecision::Denied {
            redirect: Location::new("/"),
        };

        let yes = answer(Some(true), false, false);
        let no = answer(Some(false), false, false);
        let loading = answer(None, true, false);
        let failed = answer(None, false, true);
        let failed_with_value = answer(Some(true), false, true);

        let decide = |q: Option<&RoleQuery>| evaluate(RouteKind::Hr, "/hr", &signed_in, q, &paths());
        assert_eq!(decide(Some(&yes)), GuardDecision::Allowed);
        assert_eq!(decide(Some(&no)), home);
        assert_eq!(decide(Some(&loading)), GuardDecision::Resolving);
        assert_eq!(decide(None), GuardDecision::Resolving);
        assert_eq!(decide(Some(&failed)), home);
        assert_eq!(decide(Some(&failed_with_value)), GuardDecision::Allowed);
    }

    #[test]
    fn private_route_ignores_roles() {
        let decision = evaluate(
            RouteKind::Private,
            "/profile",
            &session(SessionPhase::Authenticated, true),
            Some(&answer(Some(false), false, false)),
            &paths(),
        );
        assert_eq!(decision, GuardDecision::Allowed);
    }
}
