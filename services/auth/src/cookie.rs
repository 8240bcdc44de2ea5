//! Session cookie builder.
//!
//! The cookie carries only the opaque session token; identity claims live in
//! the sessions table and are looked up per request.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the session token.
pub const CONECTA_SESSION: &str = "conecta_session";

/// Set the session cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use conecta_auth::cookie::{set_session_cookie, CONECTA_SESSION};
///
/// let jar = CookieJar::new();
/// let jar = set_session_cookie(jar, "token_value".to_string(), "example.com".to_string(), 604800);
/// let cookie = jar.get(CONECTA_SESSION).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.domain(), Some("example.com"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(604800)));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_session_cookie(
    jar: CookieJar,
    value: String,
    domain: String,
    max_age_secs: i64,
) -> CookieJar {
    let cookie = Cookie::build((CONECTA_SESSION, value))
        .path("/")
        .domain(domain)
        .max_age(Duration::seconds(max_age_secs))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Clear the session cookie by setting Max-Age to 0.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use conecta_auth::cookie::{clear_session_cookie, set_session_cookie, CONECTA_SESSION};
///
/// let jar = CookieJar::new();
/// let jar = set_session_cookie(jar, "t".to_string(), "example.com".to_string(), 604800);
/// let jar = clear_session_cookie(jar, "example.com".to_string());
/// let cookie = jar.get(CONECTA_SESSION).unwrap();
/// assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_session_cookie(jar: CookieJar, domain: String) -> CookieJar {
    let cookie = Cookie::build((CONECTA_SESSION, ""))
        .path("/")
        .domain(domain)
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}
