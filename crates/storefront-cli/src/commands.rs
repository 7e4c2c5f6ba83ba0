//! Subcommand implementations.

use crate::app::App;
use api_transport::api::{ChatApi, ChatProvider, UserApi};
use api_transport::{error_message, ClientError};
use auth_session::{OAuthCallbackServer, DEFAULT_CALLBACK_TIMEOUT_SECS};
use std::time::Duration;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Print the localized message for an API failure and turn it into the
/// command's error.
fn report(app: &App, error: ClientError) -> Box<dyn std::error::Error> {
    let message = error_message(&error, &app.catalog);
    if let Some(http) = error.as_http_error() {
        tracing::debug!(report = %http.to_json(), "API call failed");
    }
    message.into()
}

pub async fn login(app: &App) -> CommandResult {
    let session = app.session()?;

    let server = OAuthCallbackServer::bind(
        app.config.callback_port,
        Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS),
    )
    .await?;
    let request = session.begin_sign_in(&server.redirect_uri()).await?;

    println!("Open this URL in your browser to sign in:\n\n  {}\n", request.url);
    println!("Waiting for the sign-in to complete...");

    let callback = server.wait_for_callback().await?;
    let profile = session.complete_sign_in(&request, callback).await?;

    println!("Signed in as {}", profile.display_name());
    Ok(())
}

pub async fn logout(app: &App, redirect: Option<&str>) -> CommandResult {
    let session = app.session()?;
    match session.sign_out(redirect).await? {
        Some(url) => println!("Signed out. To end the provider session, open:\n\n  {url}"),
        None => println!("Signed out."),
    }
    Ok(())
}

pub fn status(app: &App) -> CommandResult {
    let Some(session) = &app.session else {
        println!("Sign-in is not configured");
        println!("API: {}", app.client.base_url());
        return Ok(());
    };

    println!("State: {}", session.state());
    match session.current_session()? {
        Some(stored) => {
            println!("User: {} ({})", stored.profile.display_name(), stored.profile.sub);
            if let Some(email) = &stored.profile.email {
                println!("Email: {email}");
            }
            match stored.expires_in_secs() {
                Some(secs) if secs > 0 => println!("Access token expires in {secs}s"),
                _ => println!("Access token expired, it will be renewed on the next request"),
            }
        }
        None => println!("Not signed in"),
    }
    println!("API: {}", app.client.base_url());
    Ok(())
}

pub async fn user(app: &App, id: &str) -> CommandResult {
    let user = UserApi::new(app.client.clone())
        .get_user_by_id(id)
        .await
        .map_err(|e| report(app, e))?;
    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}

pub async fn me(app: &App) -> CommandResult {
    let session = app.session()?;
    let profile = session
        .current_user()?
        .ok_or("not signed in, run `storefront login` first")?;

    let user = UserApi::new(app.client.clone())
        .get_current_user(&profile.sub)
        .await
        .map_err(|e| report(app, e))?;
    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}

pub async fn chat(app: &App, question: &str, provider: ChatProvider) -> CommandResult {
    if question.trim().is_empty() {
        return Err("question must not be empty".into());
    }

    let reply = ChatApi::new(app.client.clone())
        .ask(question, Some(provider))
        .await
        .map_err(|e| report(app, e))?;
    println!("[{}] {}", reply.provider, reply.answer);
    Ok(())
}
