use diary_core::actions::{Action, ActionInput};
use diary_core::session::ProfileCard;
use diary_core::Role;

use super::common::{read_secret, Session, SessionOptions};
use crate::error::CliError;

pub async fn run_signup(
    options: &SessionOptions,
    name: String,
    email: String,
    password: Option<String>,
) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    let password = read_secret("Password", password)?;

    let form = session.app.auth_form_mut();
    form.name = name;
    form.email = email;
    form.password = password;
    session.perform(Action::SignUp, ActionInput::none()).await?;
    print_signed_in(&session);
    Ok(())
}

pub async fn run_login(
    options: &SessionOptions,
    email: Option<String>,
    password: Option<String>,
    google: bool,
) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    if google {
        session
            .perform(Action::FederatedSignIn, ActionInput::none())
            .await?;
    } else {
        let password = read_secret("Password", password)?;
        let form = session.app.auth_form_mut();
        form.email = email.unwrap_or_default();
        form.password = password;
        session.perform(Action::SignIn, ActionInput::none()).await?;
    }
    print_signed_in(&session);
    Ok(())
}

pub async fn run_admin_login(
    options: &SessionOptions,
    email: String,
    password: Option<String>,
) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    let password = read_secret("Admin password", password)?;

    let form = session.app.auth_form_mut();
    form.admin_email = email;
    form.admin_password = password;
    session
        .perform(Action::AdminSignIn, ActionInput::none())
        .await?;
    print_signed_in(&session);
    Ok(())
}

pub async fn run_logout(options: &SessionOptions) -> Result<(), CliError> {
    let mut session = Session::open(options).await?;
    if session.app.current_identity().is_none() {
        println!("Not signed in");
        return Ok(());
    }
    session.perform(Action::SignOut, ActionInput::none()).await?;
    println!("Signed out");
    Ok(())
}

pub async fn run_whoami(options: &SessionOptions) -> Result<(), CliError> {
    let session = Session::open(options).await?;
    let Some(identity) = session.app.current_identity() else {
        return Err(CliError::NotSignedIn);
    };
    let card = ProfileCard::for_identity(identity);
    println!("{}", card.name);
    println!("{}", card.email);
    println!("role: {}", role_label(session.app.role()));
    println!("avatar: {}", card.avatar_url);
    Ok(())
}

fn print_signed_in(session: &Session) {
    if let Some(identity) = session.app.current_identity() {
        let card = ProfileCard::for_identity(identity);
        println!(
            "Signed in as {} <{}> ({})",
            card.name,
            card.email,
            role_label(session.app.role())
        );
    }
}

pub const fn role_label(role: Role) -> &'static str {
    match role {
        Role::Anonymous => "signed out",
        Role::User => "user",
        Role::Administrator => "administrator",
    }
}
