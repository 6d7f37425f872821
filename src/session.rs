//! Session and credential handling.
//!
//! Logged-in sessions are identified by a `token` value in the cookie
//! session, pointing into an in-memory session store. Passwords are hashed
//! with Argon2id.

use crate::db::get_db_pool;
use crate::user::Profile;
use argon2::password_hash::{PasswordHash, PasswordVerifier};
use argon2::Argon2;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use uuid::Uuid;

#[derive(Clone, Copy, Debug)]
pub struct Session {
    pub user_id: i32,
}

static ARGON2: OnceCell<Argon2<'static>> = OnceCell::new();
static SESSIONS: OnceCell<DashMap<Uuid, Session>> = OnceCell::new();

/// Initialize module statics. Safe to call more than once.
pub fn init() {
    ARGON2.get_or_init(Argon2::default);
    SESSIONS.get_or_init(DashMap::new);
}

pub fn get_argon2() -> &'static Argon2<'static> {
    ARGON2.get().expect("session::init() has not been called.")
}

pub fn get_sess() -> &'static DashMap<Uuid, Session> {
    SESSIONS.get().expect("session::init() has not been called.")
}

/// Create a session for the user and return its token.
pub fn new_session(store: &DashMap<Uuid, Session>, user_id: i32) -> Uuid {
    let token = Uuid::new_v4();
    store.insert(token, Session { user_id });
    token
}

/// Drop a session. Returns false when the token was already gone.
pub fn remove_session(store: &DashMap<Uuid, Session>, token: Uuid) -> bool {
    store.remove(&token).is_some()
}

/// Resolve the `token` cookie to a live session, if any.
pub fn authenticate_by_cookie(cookies: &actix_session::Session) -> Option<(Uuid, Session)> {
    let token = match cookies.get::<String>("token") {
        Ok(Some(token)) => token,
        _ => return None,
    };
    let token = Uuid::parse_str(&token).ok()?;
    get_sess().get(&token).map(|s| (token, *s.value()))
}

/// Resolve the cookie session to a user profile.
pub async fn authenticate_client_by_session(cookies: &actix_session::Session) -> Option<Profile> {
    let (_, session) = authenticate_by_cookie(cookies)?;
    match Profile::get_by_id(get_db_pool(), session.user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            log::error!("authenticate_client_by_session: {}", e);
            None
        }
    }
}

/// Check a plaintext password against a stored Argon2 PHC string.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = match PasswordHash::new(password_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::error!("verify_password: unparseable hash: {}", e);
            return false;
        }
    };
    get_argon2()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
