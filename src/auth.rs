use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::api::JsonBody;
use crate::config::{AdminConfig, JwtConfig};
use crate::models::{Role, User};
use crate::service::UserService;
use crate::{breaks, proceeds, AppState, Error, Payload};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Identity of the bearer, inserted into request extensions by
/// [`authenticate`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

pub fn issue_token(user: &User, jwt: &JwtConfig) -> Result<String, Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(jwt.expiry_hours)).timestamp(),
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )?)
}

pub fn verify_token(token: &str, jwt: &JwtConfig) -> Result<Claims, Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Pbkdf2.hash_password(password.as_bytes(), &salt)?.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    let hash = PasswordHash::new(hash)?;
    Ok(Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok())
}

pub async fn authenticate(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let TypedHeader(authorization) = bearer.ok_or_else(|| Error::Unauthorized {
        message: "Missing bearer token".to_string(),
    })?;
    let claims = verify_token(authorization.token(), &state.config.jwt)?;

    request.extensions_mut().insert(CurrentUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    });
    Ok(next.run(request).await)
}

fn current_user(request: &Request) -> Result<&CurrentUser, Error> {
    request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| Error::Unauthorized {
            message: "Authentication required".to_string(),
        })
}

/// Admins and sub-admins.
pub async fn require_sub_admin(request: Request, next: Next) -> Result<Response, Error> {
    let user = current_user(&request)?;
    if !user.role.is_sub_admin() {
        log::warn!("User {} denied sub-admin route", user.email);
        return Err(Error::Forbidden {
            message: "Sub admin role required".to_string(),
        });
    }
    Ok(next.run(request).await)
}

/// Admins only.
pub async fn require_full_admin(request: Request, next: Next) -> Result<Response, Error> {
    let user = current_user(&request)?;
    if !user.role.is_full_admin() {
        log::warn!("User {} denied admin route", user.email);
        return Err(Error::Forbidden {
            message: "Admin role required".to_string(),
        });
    }
    Ok(next.run(request).await)
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(login): JsonBody<LoginUser>,
) -> Payload<LoggedInUser> {
    if login.email.is_empty() || login.password.is_empty() {
        return breaks(Error::empty("`email` and `password` are required"));
    }

    let user = match state.users.find_by_email(&login.email).await? {
        Some(user) => user,
        None => {
            log::warn!("Login attempt for unknown email {}", login.email);
            return breaks(Error::Unauthorized {
                message: "Invalid email or password".to_string(),
            });
        }
    };

    if !verify_password(&login.password, &user.password)? {
        log::warn!("Wrong password for {}", login.email);
        return breaks(Error::Unauthorized {
            message: "Invalid email or password".to_string(),
        });
    }

    let access_token = issue_token(&user, &state.config.jwt)?;
    log::info!("User {} logged in", user.email);
    proceeds(LoggedInUser { access_token, user })
}

/// Creates the configured administrator unless one with that email exists.
pub async fn ensure_admin(users: &dyn UserService, admin: &AdminConfig) -> Result<(), Error> {
    if users.find_by_email(&admin.email).await?.is_some() {
        return Ok(());
    }
    let hash = hash_password(&admin.password)?;
    let id = users
        .create(&admin.username, &admin.email, &hash, Role::Admin)
        .await?;
    log::info!("Created administrator {} with id {}", admin.email, id);
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedInUser {
    pub access_token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiry_hours: 1,
        }
    }

    fn user(role: Role) -> User {
        User {
            id: 7,
            username: "moe".to_string(),
            email: "moe@example.com".to_string(),
            password: String::new(),
            role,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn token_round_trip_keeps_role() {
        let token = issue_token(&user(Role::SubAdmin), &jwt()).unwrap();
        let claims = verify_token(&token, &jwt()).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, Role::SubAdmin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&user(Role::Admin), &jwt()).unwrap();
        let other = JwtConfig {
            secret: "another".to_string(),
            expiry_hours: 1,
        };
        assert!(matches!(
            verify_token(&token, &other),
            Err(Error::Unauthorized { .. })
        ));
    }

    #[test]
    fn passwords_verify_against_their_hash() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn role_tiers() {
        assert!(Role::Admin.is_full_admin());
        assert!(Role::Admin.is_sub_admin());
        assert!(Role::SubAdmin.is_sub_admin());
        assert!(!Role::SubAdmin.is_full_admin());
        assert!(!Role::Donator.is_sub_admin());
    }
}
