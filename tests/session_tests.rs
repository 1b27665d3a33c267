use chrono::{Duration, Utc};
use jobify_portal::{
    AppConfig,
    config::Env,
    cookie::{CookieConfig, find_cookie},
    models::{Role, User},
    session::{SessionClaim, issue_token, resolve_session, sign, verify_token},
};

const SECRET: &str = "session-test-secret";

fn test_user() -> User {
    User {
        id: 7,
        name: "Rimi Akter".to_string(),
        email: "rimi@example.com".to_string(),
        phone: Some("01700000000".to_string()),
        role: Role::Tutor,
        password_hash: String::new(),
        created_at: Utc::now(),
    }
}

#[test]
fn test_issued_token_resolves_to_the_same_claim() {
    let token = issue_token(&test_user(), SECRET, 3600).expect("signing failed");
    let header = format!("theme=dark; token={token}");

    let claim = resolve_session(Some(&header), "token", SECRET).expect("claim should resolve");

    assert_eq!(claim.user_id, 7);
    assert_eq!(claim.name, "Rimi Akter");
    assert_eq!(claim.email, "rimi@example.com");
    assert_eq!(claim.role, Some(Role::Tutor));
    assert_eq!(claim.exp - claim.iat, 3600);
}

#[test]
fn test_claim_uses_camel_case_wire_names() {
    let claim = SessionClaim::for_user(&test_user(), 60);
    let json = serde_json::to_value(&claim).unwrap();

    assert_eq!(json["userId"], 7);
    assert_eq!(json["role"], "tutor");
    assert!(json.get("user_id").is_none());
}

#[test]
fn test_tampered_token_is_rejected() {
    let token = issue_token(&test_user(), SECRET, 3600).unwrap();
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    // Swap the payload for one claiming a different user, keeping the old signature.
    let mut forged = SessionClaim::for_user(&test_user(), 3600);
    forged.user_id = 1;
    let forged_token = sign(&forged, "another-secret").unwrap();
    parts[1] = forged_token.split('.').nth(1).unwrap().to_string();
    let tampered = parts.join(".");

    assert!(verify_token(&tampered, SECRET).is_none());
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let token = issue_token(&test_user(), "not-the-server-secret", 3600).unwrap();
    assert!(verify_token(&token, SECRET).is_none());
}

#[test]
fn test_expired_token_is_rejected() {
    let now = Utc::now();
    let claim = SessionClaim {
        name: "Old".to_string(),
        user_id: 7,
        email: "old@example.com".to_string(),
        role: Some(Role::Admin),
        iat: (now - Duration::hours(2)).timestamp(),
        exp: (now - Duration::hours(1)).timestamp(),
    };
    let token = sign(&claim, SECRET).unwrap();

    assert!(verify_token(&token, SECRET).is_none());
}

#[test]
fn test_claim_without_role_still_verifies() {
    let now = Utc::now().timestamp();
    let claim = SessionClaim {
        name: "Legacy".to_string(),
        user_id: 3,
        email: "legacy@example.com".to_string(),
        role: None,
        iat: now,
        exp: now + 600,
    };
    let token = sign(&claim, SECRET).unwrap();

    assert_eq!(verify_token(&token, SECRET), Some(claim));
}

#[test]
fn test_missing_or_malformed_cookie_resolves_to_none() {
    assert!(resolve_session(None, "token", SECRET).is_none());
    assert!(resolve_session(Some("theme=dark"), "token", SECRET).is_none());
    assert!(resolve_session(Some("token="), "token", SECRET).is_none());
    assert!(resolve_session(Some("token=not.a.jwt"), "token", SECRET).is_none());
}

#[test]
fn test_find_cookie_matches_exact_names() {
    let raw = "xtoken=wrong; token=right; other=1";
    assert_eq!(find_cookie(raw, "token"), Some("right"));
    assert_eq!(find_cookie(raw, "missing"), None);
}

#[test]
fn test_set_cookie_attributes() {
    let cookie = CookieConfig::default().build_set_cookie("abc");
    assert_eq!(
        cookie,
        "token=abc; HttpOnly; SameSite=Strict; Path=/; Max-Age=3600"
    );
}

#[test]
fn test_delete_cookie_expires_immediately() {
    let cookie = CookieConfig::default().build_delete_cookie();
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("Path=/"));
}

#[test]
fn test_production_cookie_is_secure() {
    let config = AppConfig {
        env: Env::Production,
        session_ttl_secs: 900,
        ..AppConfig::default()
    };
    let cookie = config.cookie().build_set_cookie("abc");

    assert!(cookie.contains("; Secure"));
    assert!(cookie.ends_with("Max-Age=900"));
}
