//! Session cookie handling.
//!
//! The cookie only carries an opaque [`SessionId`]; the batch it points at
//! lives server-side in [`SessionBindings`].

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use imageforged_common::{BatchId, SessionId};

use crate::config::MAX_SESSION_TIMEOUT_HOURS;
use crate::store::SessionBindings;

pub const SESSION_COOKIE_NAME: &str = "imageforged_session";

/// Session id carried by the request, if the cookie is present and well-formed.
pub fn session_id(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE_NAME)
        .and_then(|c| c.value().parse().ok())
}

/// Reuse the caller's session id or mint a new one, refreshing the cookie.
pub fn ensure_session(jar: CookieJar, timeout_hours: u64) -> (CookieJar, SessionId) {
    let session_id = session_id(&jar).unwrap_or_default();

    let cookie = Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(cookie_max_age_hours(timeout_hours)))
        .build();

    (jar.add(cookie), session_id)
}

fn cookie_max_age_hours(timeout_hours: u64) -> i64 {
    let hours = timeout_hours.clamp(1, MAX_SESSION_TIMEOUT_HOURS);
    i64::try_from(hours).unwrap_or(1)
}

/// The batch bound to the caller's session, if any.
pub fn current_batch(jar: &CookieJar, sessions: &SessionBindings) -> Option<BatchId> {
    session_id(jar).and_then(|id| sessions.current(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cookie_has_no_session() {
        assert!(session_id(&CookieJar::new()).is_none());
    }

    #[test]
    fn malformed_cookie_is_ignored() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE_NAME, "garbage"));
        assert!(session_id(&jar).is_none());
    }

    #[test]
    fn ensure_session_reuses_existing_id() {
        let existing = SessionId::new();
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE_NAME, existing.to_string()));
        let (jar, id) = ensure_session(jar, 24);
        assert_eq!(id, existing);
        assert_eq!(session_id(&jar), Some(existing));
    }

    #[test]
    fn ensure_session_mints_new_id() {
        let (jar, id) = ensure_session(CookieJar::new(), 24);
        assert_eq!(session_id(&jar), Some(id));
        let cookie = jar.get(SESSION_COOKIE_NAME).unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn extreme_timeouts_are_clamped() {
        let (jar, _) = ensure_session(CookieJar::new(), u64::MAX);
        let max_age = jar.get(SESSION_COOKIE_NAME).unwrap().max_age().unwrap();
        assert_eq!(max_age.whole_hours(), MAX_SESSION_TIMEOUT_HOURS as i64);

        let (jar, _) = ensure_session(CookieJar::new(), 0);
        let max_age = jar.get(SESSION_COOKIE_NAME).unwrap().max_age().unwrap();
        assert_eq!(max_age.whole_hours(), 1);
    }

    #[test]
    fn current_batch_follows_binding() {
        let sessions = SessionBindings::new(60);
        let (jar, id) = ensure_session(CookieJar::new(), 24);
        assert!(current_batch(&jar, &sessions).is_none());

        let batch = BatchId::new();
        sessions.bind(id, batch);
        assert_eq!(current_batch(&jar, &sessions), Some(batch));
    }
}
