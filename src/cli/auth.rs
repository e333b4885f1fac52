use anyhow::Result;

use super::open_database;
use super::ui::status;
use crate::auth::{AuthClient, GoogleProvider, IdentityProvider, PROVIDER_GOOGLE};
use crate::config::AppConfig;

pub fn run_login(config: &AppConfig) -> Result<()> {
    let auth = AuthClient::new(open_database(config)?);
    if let Some(session) = auth.get_session()? {
        status(&format!("Already signed in as {}.", session.email));
        return Ok(());
    }

    let provider = GoogleProvider::from_config(&config.google)?;
    let session = auth.sign_in_with_oauth(&provider)?;
    status(&format!("Signed in as {}.", session.email));
    Ok(())
}

pub fn run_logout(config: &AppConfig) -> Result<()> {
    let auth = AuthClient::new(open_database(config)?);
    // Without credentials the session is still dropped, only revocation is skipped
    let provider = GoogleProvider::from_config(&config.google).ok();
    let provider = provider.as_ref().map(|p| p as &dyn IdentityProvider);

    if auth.sign_out(provider)? {
        status("Signed out.");
    } else {
        status("Not signed in.");
    }
    Ok(())
}

pub fn run_whoami(config: &AppConfig) -> Result<()> {
    let auth = AuthClient::new(open_database(config)?);
    match auth.get_session()? {
        Some(session) if session.provider == PROVIDER_GOOGLE => {
            println!("{} (Google)", session.email)
        }
        Some(session) => println!("{} ({})", session.email, session.provider),
        None => status("Not signed in."),
    }
    Ok(())
}
