//! Phone + one-time-password sign in and the session extractors.

use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use chrono::{Duration, Utc};
use ledgerlite_core::{Company, LedgerError, OtpChallenge, Session, User};
use ledgerlite_platform::{
    RequestOtpRequest, RequestOtpResponse, SessionResponse, UserView, VerifyOtpRequest,
};
use rand::{Rng, distr::Alphanumeric};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiJson, ApiResult},
    state::{AppState, SESSION_COOKIE},
};

const OTP_MAX_ATTEMPTS: i32 = 5;
const SESSION_TOKEN_LEN: usize = 32;
const NIGERIA_COUNTRY_CODE: &str = "234";

/// Normalizes a phone number to E.164. Nigerian local numbers
/// (`0XXXXXXXXXX`) get the `+234` country code.
pub fn normalize_phone(raw: &str) -> Result<String, LedgerError> {
    let invalid = || LedgerError::validation("phone must be a valid phone number");

    let trimmed = raw.trim();
    let international = trimmed.starts_with('+');
    let digits: String = trimmed
        .chars()
        .filter(|character| !matches!(character, ' ' | '-' | '(' | ')' | '+'))
        .collect();
    if digits.is_empty() || !digits.chars().all(|character| character.is_ascii_digit()) {
        return Err(invalid());
    }

    let normalized = if international {
        format!("+{digits}")
    } else if digits.len() == 11 && digits.starts_with('0') {
        format!("+{NIGERIA_COUNTRY_CODE}{}", &digits[1..])
    } else if digits.len() == 13 && digits.starts_with(NIGERIA_COUNTRY_CODE) {
        format!("+{digits}")
    } else {
        return Err(invalid());
    };

    if !(8..=16).contains(&normalized.len()) {
        return Err(invalid());
    }
    Ok(normalized)
}

pub fn sha256_hex(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn otp_hash(phone: &str, code: &str) -> String {
    sha256_hex(&format!("{phone}:{code}"))
}

fn generate_otp() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

fn generate_session_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn user_view(user: &User) -> UserView {
    UserView {
        id: user.id,
        phone: user.phone.clone(),
        display_name: user.display_name.clone(),
    }
}

/// Bearer token first, then the session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
    })
}

pub async fn request_otp(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RequestOtpRequest>,
) -> ApiResult<Json<RequestOtpResponse>> {
    let phone = normalize_phone(&payload.phone)?;
    let code = generate_otp();
    let now = Utc::now();
    let challenge = OtpChallenge {
        phone: phone.clone(),
        code_hash: otp_hash(&phone, &code),
        attempts: 0,
        expires_at: now + Duration::seconds(state.auth.otp_ttl_seconds),
        created_at: now,
    };

    let mut tx = state.store.begin().await?;
    tx.upsert_otp(&challenge).await?;
    tx.commit().await?;

    debug!(%phone, %code, "otp issued");

    Ok(Json(RequestOtpResponse {
        success: true,
        phone,
        expires_at: challenge.expires_at,
        debug_code: state.auth.otp_debug_echo.then_some(code),
    }))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<VerifyOtpRequest>,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    let phone = normalize_phone(&payload.phone)?;
    let now = Utc::now();

    let mut tx = state.store.begin().await?;
    let Some(mut challenge) = tx.find_otp(&phone).await? else {
        return Err(LedgerError::unauthorized("no pending code for this phone").into());
    };

    let rejection = if challenge.attempts >= OTP_MAX_ATTEMPTS {
        Some("too many attempts, request a new code")
    } else if challenge.expires_at <= now {
        Some("code expired, request a new one")
    } else {
        None
    };
    if let Some(message) = rejection {
        tx.delete_otp(&phone).await?;
        tx.commit().await?;
        return Err(LedgerError::unauthorized(message).into());
    }

    if challenge.code_hash != otp_hash(&phone, payload.code.trim()) {
        challenge.attempts += 1;
        tx.upsert_otp(&challenge).await?;
        tx.commit().await?;
        return Err(LedgerError::unauthorized("invalid code").into());
    }
    tx.delete_otp(&phone).await?;

    let user = match tx.find_user_by_phone(&phone).await? {
        Some(user) => user,
        None => {
            let user = User {
                id: Uuid::new_v4(),
                phone: phone.clone(),
                display_name: payload
                    .name
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty()),
                created_at: now,
            };
            tx.insert_user(&user).await?;
            info!(user_id = %user.id, "user registered");
            user
        }
    };

    let token = generate_session_token();
    let session = Session {
        token_hash: sha256_hex(&token),
        user_id: user.id,
        created_at: now,
        expires_at: now + Duration::days(state.auth.session_ttl_days),
    };
    tx.insert_session(&session).await?;
    let has_company = tx.find_company_by_owner(user.id).await?.is_some();
    tx.commit().await?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.auth.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(state.auth.session_ttl_days))
        .build();

    Ok((
        jar.add(cookie),
        Json(SessionResponse {
            success: true,
            user: user_view(&user),
            token,
            expires_at: session.expires_at,
            has_company,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<Value>)> {
    if let Some(token) = session_token(&headers) {
        let mut tx = state.store.begin().await?;
        tx.delete_session(&sha256_hex(&token)).await?;
        tx.commit().await?;
    }

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(json!({ "success": true })),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let mut tx = state.store.begin().await?;
    let company = tx.find_company_by_owner(user.id).await?;

    Ok(Json(json!({
        "success": true,
        "user": user_view(&user),
        "company": company,
    })))
}

/// The signed-in user. Rejects with 401 when the session is missing,
/// unknown or expired.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| LedgerError::unauthorized("not signed in"))?;

        let mut tx = state.store.begin().await?;
        let session = tx
            .find_session(&sha256_hex(&token))
            .await?
            .ok_or_else(|| LedgerError::unauthorized("session not found"))?;
        if session.is_expired(Utc::now()) {
            tx.delete_session(&session.token_hash).await?;
            tx.commit().await?;
            return Err(LedgerError::unauthorized("session expired").into());
        }

        let user = tx
            .get_user(session.user_id)
            .await?
            .ok_or_else(|| LedgerError::unauthorized("user not found"))?;
        Ok(Self(user))
    }
}

/// The company owned by the signed-in user; 404 until one is created.
pub struct CurrentCompany(pub Company);

impl FromRequestParts<AppState> for CurrentCompany {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        let company = state.ledger.company_for_user(user.id).await?;
        Ok(Self(company))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nigerian_local_numbers_get_country_code() {
        assert_eq!(normalize_phone("08012345678").unwrap(), "+2348012345678");
        assert_eq!(normalize_phone("0801 234 5678").unwrap(), "+2348012345678");
        assert_eq!(normalize_phone("2348012345678").unwrap(), "+2348012345678");
        assert_eq!(normalize_phone("+44 20 7946 0958").unwrap(), "+442079460958");
    }

    #[test]
    fn junk_phone_numbers_are_rejected() {
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("call me").is_err());
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("+1").is_err());
    }

    #[test]
    fn codes_and_tokens_have_expected_shape() {
        let code = generate_otp();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|character| character.is_ascii_digit()));

        let token = generate_session_token();
        assert_eq!(token.len(), SESSION_TOKEN_LEN);
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn hashes_are_hex_sha256() {
        let hash = sha256_hex("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(otp_hash("+2348012345678", "123456"), otp_hash("+2348012345679", "123456"));
    }
}
