//! Account and address book commands.
//!
//! # Usage
//!
//! ```bash
//! keylab auth register -n "Ana Pérez" -e ana@example.com -p secreto1 -c secreto1
//! keylab auth login -e ana@example.com -p secreto1
//! keylab auth login-offline -e ana@example.com -p secreto1
//! keylab auth whoami
//! keylab address add --alias Casa --street "Av. Matta" --number 123 \
//!     --commune Santiago --phone "+56 9 1234 5678"
//! ```

use keylab_core::AddressId;
use keylab_storefront::error::AppError;
use keylab_storefront::models::{NewAddress, User};
use keylab_storefront::services::{AddressService, AuthService};
use keylab_storefront::state::AppState;
use tracing::info;

/// Create an account.
///
/// # Errors
///
/// Returns `AppError::Auth` for invalid input or a rejected sign-up.
pub async fn register(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
    confirmation: &str,
) -> Result<(), AppError> {
    let user = AuthService::new(state)
        .register(name, email, password, confirmation)
        .await?;
    info!("Welcome, {}", user.name);
    Ok(())
}

/// Sign in against the backend.
///
/// # Errors
///
/// Returns `AppError::Auth` if the credentials are rejected.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(), AppError> {
    let user = AuthService::new(state).login(email, password).await?;
    greet(state, &user).await
}

/// Sign in using the local cache only.
///
/// # Errors
///
/// Returns `AppError::Auth` if the credentials do not match.
pub async fn login_offline(state: &AppState, email: &str, password: &str) -> Result<(), AppError> {
    let user = AuthService::new(state).login_offline(email, password).await?;
    greet(state, &user).await
}

/// Sign in with a Google id token.
///
/// # Errors
///
/// Returns `AppError::Auth` if the token is rejected.
pub async fn google(state: &AppState, id_token: &str) -> Result<(), AppError> {
    let user = AuthService::new(state).login_with_id_token(id_token).await?;
    greet(state, &user).await
}

/// Send a password reset email.
///
/// # Errors
///
/// Returns `AppError::Auth` for a malformed address or a failed request.
pub async fn recover(state: &AppState, email: &str) -> Result<(), AppError> {
    AuthService::new(state).recover_password(email).await?;
    info!("Password reset email sent to {email}");
    Ok(())
}

/// Sign out.
///
/// # Errors
///
/// Returns `AppError::Database` if the session cannot be cleared.
pub async fn logout(state: &AppState) -> Result<(), AppError> {
    AuthService::new(state).logout().await?;
    info!("Signed out");
    Ok(())
}

/// Show the signed-in user.
///
/// # Errors
///
/// Returns `AppError::Database` if the session cannot be read.
pub async fn whoami(state: &AppState) -> Result<(), AppError> {
    let auth = AuthService::new(state);
    let Some(session) = auth.current_session().await? else {
        info!("Not signed in");
        return Ok(());
    };
    let name = auth
        .current_user()
        .await?
        .map_or_else(|| session.email.local_part().to_string(), |u| u.name);

    info!("{name} <{}>", session.email);
    info!(
        "  {}{}",
        if session.is_online() { "online" } else { "offline" },
        if session.is_admin { ", admin" } else { "" }
    );
    Ok(())
}

/// List saved addresses.
///
/// # Errors
///
/// Returns `AppError::NotLoggedIn` without a session.
pub async fn addresses(state: &AppState) -> Result<(), AppError> {
    let addresses = AddressService::new(state).list().await?;
    if addresses.is_empty() {
        info!("No saved addresses");
    }
    for address in addresses {
        let apartment = address
            .apartment
            .as_deref()
            .map(|a| format!(", {a}"))
            .unwrap_or_default();
        info!(
            "#{:<4} {}: {} {}{apartment}, {}, {} ({})",
            address.id.to_string(),
            address.alias,
            address.street,
            address.number,
            address.commune,
            address.region,
            address.phone
        );
    }
    Ok(())
}

/// Save a new address.
///
/// # Errors
///
/// Returns `AppError::Validation` if a required field is blank.
pub async fn add_address(state: &AppState, address: NewAddress) -> Result<(), AppError> {
    let address = AddressService::new(state).add(address).await?;
    info!("Saved address #{} ({})", address.id, address.alias);
    Ok(())
}

/// Delete an address.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the address does not belong to the user.
pub async fn remove_address(state: &AppState, id: AddressId) -> Result<(), AppError> {
    AddressService::new(state).delete(id).await?;
    info!("Deleted address #{id}");
    Ok(())
}

async fn greet(state: &AppState, user: &User) -> Result<(), AppError> {
    info!("Signed in as {} <{}>", user.name, user.email);
    if let Some(session) = state.session().await?
        && session.is_admin
    {
        info!("Admin access enabled");
    }
    Ok(())
}
