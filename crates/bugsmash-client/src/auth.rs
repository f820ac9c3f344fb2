//! Session handling and the identity-provider seam.
//!
//! Authentication is delegated to a managed identity service behind the
//! [`IdentityProvider`] trait.  [`MemoryIdentityProvider`] is the in-process
//! stand-in used by tests and local development; it reports failures with
//! the same provider codes a hosted service would, so the code-to-category
//! mapping in `bugsmash_shared::AuthError` stays exercised.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;

use bugsmash_shared::{AuthError, AuthUser, UserId};

/// The signed-in account, as threaded through every command that needs an
/// author.  Commands take the session explicitly; nothing infers the actor
/// from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&AuthUser> for Session {
    fn from(user: &AuthUser) -> Self {
        Self {
            user_id: user.uid.clone(),
            name: user.display_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// The identity service, as seen by the client commands.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account and sign it in.
    async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError>;

    /// Authenticate an existing account and sign it in.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    /// Drop the current session, if any.  Signing out twice is a no-op.
    fn sign_out(&self);

    /// Watch the signed-in account.  `None` means signed out.
    fn watch(&self) -> watch::Receiver<Option<AuthUser>>;

    /// The currently signed-in account, if any.
    fn current(&self) -> Option<AuthUser> {
        self.watch().borrow().clone()
    }
}

// ---------------------------------------------------------------------------
// In-process provider
// ---------------------------------------------------------------------------

struct Account {
    password: String,
    user: AuthUser,
}

/// In-process [`IdentityProvider`].  Accounts live only as long as the
/// process; emails are matched case-insensitively like the hosted service.
pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    current_tx: watch::Sender<Option<AuthUser>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        let (current_tx, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            current_tx,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Account>> {
        self.accounts.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn email_is_plausible(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        if !email_is_plausible(email) {
            return Err(AuthError::from_code("auth/invalid-email"));
        }
        if password.chars().count() < 6 {
            return Err(AuthError::from_code("auth/weak-password"));
        }

        let key = email.to_lowercase();
        let mut accounts = self.lock();
        if accounts.contains_key(&key) {
            return Err(AuthError::from_code("auth/email-already-in-use"));
        }

        let user = AuthUser {
            uid: UserId::new(),
            email: email.to_string(),
            display_name: name.to_string(),
        };
        accounts.insert(
            key,
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        drop(accounts);

        info!(uid = %user.uid, "account created");
        // send_replace: the session must be recorded even when nobody holds
        // a watch receiver at this moment.
        self.current_tx.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let key = email.to_lowercase();
        let accounts = self.lock();
        // A missing account and a wrong password both yield the same code,
        // like the hosted service.
        let account = accounts
            .get(&key)
            .ok_or_else(|| AuthError::from_code("auth/user-not-found"))?;
        if account.password != password {
            return Err(AuthError::from_code("auth/wrong-password"));
        }

        let user = account.user.clone();
        drop(accounts);

        info!(uid = %user.uid, "signed in");
        self.current_tx.send_replace(Some(user.clone()));
        Ok(user)
    }

    fn sign_out(&self) {
        self.current_tx.send_replace(None);
    }

    fn watch(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current_tx.subscribe()
    }
}
