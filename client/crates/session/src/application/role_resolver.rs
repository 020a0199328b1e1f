//! Role Resolver
//!
//! Asks the server whether the signed-in email holds each role and caches
//! the answers per `(role, email)` for the current session. The three roles
//! are independent queries; nothing here assumes they are exclusive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::application::session_state::SessionState;
use crate::domain::repository::RoleRepository;
use crate::domain::value_object::{email::Email, role::Role};
use crate::error::{AuthError, SessionCause};

/// One role answer. `value == None` means unknown, never "no".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleQuery {
    pub value: Option<bool>,
    /// First fetch in flight, no value yet
    pub loading: bool,
    /// Any fetch in flight (including refreshes)
    pub fetching: bool,
    pub error: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl RoleQuery {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.value.is_some()
    }

    pub fn granted(&self) -> bool {
        self.value == Some(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleClassification {
    pub admin: RoleQuery,
    pub hr: RoleQuery,
    pub employee: RoleQuery,
}

impl RoleClassification {
    pub fn get(&self, role: Role) -> &RoleQuery {
        match role {
            Role::Admin => &self.admin,
            Role::Hr => &self.hr,
            Role::Employee => &self.employee,
        }
    }

    pub fn is_loading(&self) -> bool {
        Role::ALL.iter().any(|r| self.get(*r).loading)
    }

    /// Every role the server confirmed
    pub fn granted_roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|r| self.get(*r).granted())
            .collect()
    }

    /// Highest confirmed role (admin > HR > employee)
    pub fn effective_role(&self) -> Option<Role> {
        self.granted_roles()
            .into_iter()
            .max_by_key(|r| r.precedence())
    }
}

type Key = (Role, Email);

#[derive(Debug)]
struct Entry {
    query: RoleQuery,
    epoch: u64,
    /// Latest request issued for this key
    issued: u64,
    /// Latest request whose outcome was applied
    applied: u64,
    /// Publishes `applied` to callers sharing an in-flight request
    settled: watch::Sender<u64>,
}

impl Entry {
    fn new(epoch: u64) -> Self {
        let (settled, _) = watch::channel(0);
        Self {
            query: RoleQuery::idle(),
            epoch,
            issued: 0,
            applied: 0,
            settled,
        }
    }

    /// Record the outcome of request `seq`. Older outcomes never overwrite
    /// newer ones.
    fn apply(&mut self, seq: u64, outcome: Option<Result<bool, String>>) -> bool {
        if seq <= self.applied {
            return false;
        }
        self.applied = seq;

        let query = &mut self.query;
        match outcome {
            Some(Ok(value)) => {
                query.value = Some(value);
                query.error = None;
                query.fetched_at = Some(Utc::now());
            }
            Some(Err(error)) => query.error = Some(error),
            None => {}
        }
        query.fetching = self.issued > seq;
        query.loading = query.fetching && query.value.is_none();

        self.settled.send_replace(seq);
        true
    }
}

/// The entry for `(role, email)` in session `epoch`; answers from an
/// earlier session are discarded.
fn current_entry<'a>(
    entries: &'a mut HashMap<Key, Entry>,
    role: Role,
    email: &Email,
    epoch: u64,
) -> &'a mut Entry {
    let entry = entries
        .entry((role, email.clone()))
        .or_insert_with(|| Entry::new(epoch));
    if entry.epoch != epoch {
        *entry = Entry::new(epoch);
    }
    entry
}

/// How a `resolve` call gets its answer
enum Claim {
    /// Send request `seq`
    Fetch { epoch: u64, seq: u64 },
    /// Wait for request `seq`, already in flight
    Join { settled: watch::Receiver<u64>, seq: u64 },
}

/// Settles a request as abandoned if its future is dropped before the
/// server answers, so callers sharing it are not left waiting.
struct InFlight<'a> {
    entries: &'a Mutex<HashMap<Key, Entry>>,
    key: Key,
    epoch: u64,
    seq: u64,
    done: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(&self.key).filter(|e| e.epoch == self.epoch) {
            if entry.apply(self.seq, None) {
                tracing::debug!(role = %self.key.0, "Role check abandoned");
            }
        }
    }
}

pub struct RoleResolver<R>
where
    R: RoleRepository,
{
    repo: Arc<R>,
    state: Arc<SessionState>,
    ttl: Duration,
    entries: Mutex<HashMap<Key, Entry>>,
    next_seq: AtomicU64,
}

impl<R> RoleResolver<R>
where
    R: RoleRepository,
{
    pub fn new(repo: Arc<R>, state: Arc<SessionState>, ttl: Duration) -> Self {
        Self {
            repo,
            state,
            ttl,
            entries: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Current answer without fetching. Answers from an earlier session
    /// are not returned.
    pub fn query(&self, role: Role, email: &Email) -> RoleQuery {
        let epoch = self.state.epoch();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(role, email.clone()))
            .filter(|entry| entry.epoch == epoch)
            .map(|entry| entry.query.clone())
            .unwrap_or_default()
    }

    pub fn classification(&self, email: &Email) -> RoleClassification {
        RoleClassification {
            admin: self.query(Role::Admin, email),
            hr: self.query(Role::Hr, email),
            employee: self.query(Role::Employee, email),
        }
    }

    /// Cached answer if fresh, otherwise fetch it. Callers arriving while
    /// a request for the same key is in flight share its answer.
    pub async fn resolve(&self, role: Role, email: &Email) -> RoleQuery {
        let cached = self.query(role, email);
        if cached.is_known() && !cached.fetching && self.is_fresh(&cached) {
            tracing::debug!(%role, email = %email, "Role answer served from cache");
            return cached;
        }

        match self.claim(role, email) {
            Claim::Fetch { epoch, seq } => self.fetch(role, email, epoch, seq).await,
            Claim::Join { mut settled, seq } => {
                tracing::debug!(%role, email = %email, "Waiting on in-flight role check");
                if settled.wait_for(|applied| *applied >= seq).await.is_err() {
                    tracing::debug!(%role, "Shared role check was discarded");
                }
                self.query(role, email)
            }
        }
    }

    /// Always ask the server.
    pub async fn refresh(&self, role: Role, email: &Email) -> RoleQuery {
        let (epoch, seq) = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let epoch = self.state.epoch();
            (epoch, self.issue(current_entry(&mut entries, role, email, epoch)))
        };
        self.fetch(role, email, epoch, seq).await
    }

    /// Resolve all three roles concurrently.
    pub async fn resolve_all(&self, email: &Email) -> RoleClassification {
        let (admin, hr, employee) = tokio::join!(
            self.resolve(Role::Admin, email),
            self.resolve(Role::Hr, email),
            self.resolve(Role::Employee, email),
        );
        RoleClassification {
            admin,
            hr,
            employee,
        }
    }

    /// Forget every answer for `email`.
    pub fn invalidate(&self, email: &Email) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(_, cached), _| cached != email);
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn is_fresh(&self, query: &RoleQuery) -> bool {
        let Some(fetched_at) = query.fetched_at else {
            return false;
        };
        let age = Utc::now().signed_duration_since(fetched_at);
        age.to_std().map(|age| age < self.ttl).unwrap_or(true)
    }

    /// Join the request in flight for this key, or issue a new one.
    fn claim(&self, role: Role, email: &Email) -> Claim {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let epoch = self.state.epoch();
        let entry = current_entry(&mut entries, role, email, epoch);

        if entry.query.fetching {
            return Claim::Join {
                settled: entry.settled.subscribe(),
                seq: entry.issued,
            };
        }
        Claim::Fetch {
            epoch,
            seq: self.issue(entry),
        }
    }

    fn issue(&self, entry: &mut Entry) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        entry.issued = seq;
        entry.query.fetching = true;
        entry.query.loading = entry.query.value.is_none();
        seq
    }

    async fn fetch(&self, role: Role, email: &Email, epoch: u64, seq: u64) -> RoleQuery {
        let mut in_flight = InFlight {
            entries: &self.entries,
            key: (role, email.clone()),
            epoch,
            seq,
            done: false,
        };
        let result = self.repo.has_role(role, email).await;
        in_flight.done = true;
        self.settle(role, email, epoch, seq, result)
    }

    fn settle(
        &self,
        role: Role,
        email: &Email,
        epoch: u64,
        seq: u64,
        result: Result<bool, AuthError>,
    ) -> RoleQuery {
        let outcome = result.map_err(|e| {
            let cause = match e {
                AuthError::Session { cause } => cause,
                AuthError::Authorization { status } => SessionCause::Status(status.as_u16()),
                other => SessionCause::Transport(other.to_string()),
            };
            let err = AuthError::RoleQuery { role, cause };
            err.log();
            err.to_string()
        });

        let key = (role, email.clone());
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        // The session ended while this request was in flight.
        if self.state.epoch() != epoch {
            tracing::debug!(%role, "Dropping role answer from an ended session");
            if entries.get(&key).is_some_and(|entry| entry.epoch == epoch) {
                entries.remove(&key);
            }
            return RoleQuery::idle();
        }

        let Some(entry) = entries.get_mut(&key).filter(|entry| entry.epoch == epoch) else {
            return RoleQuery::idle();
        };

        if !entry.apply(seq, Some(outcome)) {
            tracing::debug!(%role, "Dropping outdated role answer");
        }
        entry.query.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::SessionConfig;
    use crate::application::token_store::TokenStore;
    use crate::error::AuthResult;
    use crate::presentation::navigation::RecordingNavigator;
    use platform::storage::MemoryStore;
    use std::collections::VecDeque;

    /// Answers from a script; `None` produces an error.
    #[derive(Default)]
    struct ScriptedRoles {
        answers: Mutex<HashMap<Role, VecDeque<Option<bool>>>>,
        calls: AtomicU64,
        delay: Duration,
    }

    impl ScriptedRoles {
        fn push(&self, role: Role, answer: Option<bool>) {
            self.answers
                .lock()
                .unwrap()
                .entry(role)
                .or_default()
                .push_back(answer);
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RoleRepository for ScriptedRoles {
        async fn has_role(&self, role: Role, _email: &Email) -> AuthResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let answer = self
                .answers
                .lock()
                .unwrap()
                .get_mut(&role)
                .and_then(|q| q.pop_front())
                .flatten();
            answer.ok_or(AuthError::session(SessionCause::Status(500)))
        }
    }

    fn resolver(ttl: Duration) -> (RoleResolver<ScriptedRoles>, Arc<ScriptedRoles>, Arc<SessionState>) {
        resolver_over(ScriptedRoles::default(), ttl)
    }

    fn resolver_over(
        repo: ScriptedRoles,
        ttl: Duration,
    ) -> (RoleResolver<ScriptedRoles>, Arc<ScriptedRoles>, Arc<SessionState>) {
        let state = Arc::new(SessionState::new(
            TokenStore::load(Arc::new(MemoryStore::new()), "access-token"),
            Arc::new(RecordingNavigator::new()),
            &SessionConfig::default(),
        ));
        let repo = Arc::new(repo);
        (RoleResolver::new(repo.clone(), state.clone(), ttl), repo, state)
    }

    fn slow_roles() -> ScriptedRoles {
        ScriptedRoles {
            delay: Duration::from_millis(50),
            ..ScriptedRoles::default()
        }
    }

    fn email() -> Email {
        Email::new("a@x.com").unwrap()
    }

    #[tokio::test]
    async fn roles_are_independent() {
        let (resolver, repo, _) = resolver(Duration::from_secs(60));
        repo.push(Role::Admin, Some(true));
        repo.push(Role::Hr, Some(true));
        repo.push(Role::Employee, Some(false));

        let roles = resolver.resolve_all(&email()).await;
        assert!(roles.admin.granted());
        assert!(roles.hr.granted());
        assert_eq!(roles.employee.value, Some(false));
        assert_eq!(roles.granted_roles().len(), 2);
        assert_eq!(roles.effective_role(), Some(Role::Admin));
    }

    #[tokio::test]
    async fn fresh_answers_come_from_cache() {
        let (resolver, repo, _) = resolver(Duration::from_secs(60));
        repo.push(Role::Employee, Some(true));

        assert!(resolver.resolve(Role::Employee, &email()).await.granted());
        assert!(resolver.resolve(Role::Employee, &email()).await.granted());
        assert_eq!(repo.calls(), 1);
    }

    #[tokio::test]
    async fn expired_answers_are_refetched() {
        let (resolver, repo, _) = resolver(Duration::ZERO);
        repo.push(Role::Hr, Some(true));
        repo.push(Role::Hr, Some(false));

        assert!(resolver.resolve(Role::Hr, &email()).await.granted());
        assert_eq!(resolver.resolve(Role::Hr, &email()).await.value, Some(false));
        assert_eq!(repo.calls(), 2);
    }

    #[tokio::test]
    async fn error_keeps_last_known_value() {
        let (resolver, repo, _) = resolver(Duration::from_secs(60));
        repo.push(Role::Admin, Some(true));
        repo.push(Role::Admin, None);

        resolver.resolve(Role::Admin, &email()).await;
        let query = resolver.refresh(Role::Admin, &email()).await;
        assert_eq!(query.value, Some(true));
        assert!(query.error.is_some());
        assert!(!query.loading);
        assert!(!query.fetching);
    }

    #[tokio::test]
    async fn error_without_value_stays_unknown() {
        let (resolver, _repo, _) = resolver(Duration::from_secs(60));
        let query = resolver.resolve(Role::Employee, &email()).await;
        assert_eq!(query.value, None);
        assert!(query.error.is_some());
        assert!(!query.loading);
    }

    #[tokio::test]
    async fn answers_do_not_outlive_the_session() {
        let (resolver, repo, state) = resolver(Duration::from_secs(60));
        repo.push(Role::Admin, Some(true));
        resolver.resolve(Role::Admin, &email()).await;
        assert!(resolver.query(Role::Admin, &email()).granted());

        state.begin_authenticating();
        assert_eq!(resolver.query(Role::Admin, &email()), RoleQuery::idle());
    }

    #[test]
    fn effective_role_precedence() {
        let mut roles = RoleClassification::default();
        assert_eq!(roles.effective_role(), None);
        roles.employee.value = Some(true);
        assert_eq!(roles.effective_role(), Some(Role::Employee));
        roles.hr.value = Some(true);
        assert_eq!(roles.effective_role(), Some(Role::Hr));
        roles.admin.value = Some(false);
        assert_eq!(roles.effective_role(), Some(Role::Hr));
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_request() {
        let (resolver, repo, _) = resolver_over(slow_roles(), Duration::from_secs(60));
        repo.push(Role::Admin, Some(true));

        let late = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            resolver.resolve(Role::Admin, &email()).await
        };
        let first_email = email();
        let (first, second) = tokio::join!(resolver.resolve(Role::Admin, &first_email), late);

        assert!(first.granted());
        assert!(second.granted());
        assert!(!second.fetching);
        assert_eq!(repo.calls(), 1);
    }

    #[tokio::test]
    async fn older_answer_still_applies_under_a_newer_request() {
        let (resolver, repo, _) = resolver_over(slow_roles(), Duration::from_secs(60));
        repo.push(Role::Hr, Some(true));
        repo.push(Role::Hr, Some(true));

        let late = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            resolver.refresh(Role::Hr, &email()).await
        };
        let first_email = email();
        let (first, second) = tokio::join!(resolver.resolve(Role::Hr, &first_email), late);

        // The first answer lands while the refresh is still out.
        assert_eq!(first.value, Some(true));
        assert!(first.fetching);
        assert!(!first.loading);
        assert!(second.granted());
        assert!(!second.fetching);
        assert_eq!(repo.calls(), 2);
    }

    #[tokio::test]
    async fn dropped_request_releases_waiting_callers() {
        let (resolver, repo, _) = resolver_over(slow_roles(), Duration::from_secs(60));
        repo.push(Role::Employee, Some(true));
        repo.push(Role::Employee, Some(true));

        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            resolver.resolve(Role::Employee, &email()),
        )
        .await;
        assert!(cancelled.is_err());
        assert!(!resolver.query(Role::Employee, &email()).fetching);

        let query = resolver.resolve(Role::Employee, &email()).await;
        assert!(query.granted());
        assert_eq!(repo.calls(), 2);
    }
}
