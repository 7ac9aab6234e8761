// UI layer: provides a simple interactive menu using `dialoguer`.
// The functions are small and synchronous; every remote call is delegated to
// `ApiClient` and its failures are printed rather than ending the session.

use crate::api::ApiClient;
use crate::deploy::DeployMode;
use crate::resource::{ResourceKind, SearchBy};
use crate::transport::Transport;
use anyhow::Result;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

const MENU: [&str; 9] = [
    "Login",
    "Deploy post",
    "Deploy page",
    "List posts",
    "List pages",
    "Delete post",
    "Delete page",
    "Site info",
    "Exit",
];

/// Main interactive menu. Receives an `ApiClient` instance and runs a
/// select loop until the user chooses "Exit".
pub fn main_menu<T: Transport>(mut api: ApiClient<T>) -> Result<()> {
    loop {
        let selection = Select::new().items(&MENU).default(0).interact()?;
        if selection == 0 {
            handle_login(&mut api)?;
            continue;
        }
        if selection == MENU.len() - 1 {
            break;
        }
        // Everything else needs a session.
        if !api.is_logged_in() {
            println!("You should login first.");
            continue;
        }
        match selection {
            1 => handle_deploy(&api, ResourceKind::Posts)?,
            2 => handle_deploy(&api, ResourceKind::Pages)?,
            3 => handle_list(&api, ResourceKind::Posts)?,
            4 => handle_list(&api, ResourceKind::Pages)?,
            5 => handle_delete(&api, ResourceKind::Posts)?,
            6 => handle_delete(&api, ResourceKind::Pages)?,
            7 => handle_site(&api)?,
            _ => {}
        }
    }
    Ok(())
}

/// Spinner shown while a blocking call is in flight.
fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Collect credentials and open a session. `GHOST_USERNAME`, when set, is
/// offered as the default user name.
fn handle_login<T: Transport>(api: &mut ApiClient<T>) -> Result<()> {
    let mut prompt = Input::<String>::new();
    prompt.with_prompt("Username (email)");
    if let Ok(default) = std::env::var("GHOST_USERNAME") {
        prompt.default(default);
    }
    let username = prompt.interact_text()?;
    let password = Password::new().with_prompt("Password").interact()?;

    let spinner = spinner("Logging in...")?;
    let result = api.login(&username, &password);
    spinner.finish_and_clear();

    match result {
        Ok(()) => println!("Welcome {}!", username),
        Err(e) => println!("Login failed: {}", e),
    }
    Ok(())
}

fn handle_deploy<T: Transport>(api: &ApiClient<T>, kind: ResourceKind) -> Result<()> {
    let dir: String = Input::new()
        .with_prompt(format!("{} directory", kind.singular()))
        .default(".".to_string())
        .interact_text()?;
    let update = Confirm::new()
        .with_prompt(format!("Update an existing {}?", kind.singular()))
        .default(false)
        .interact()?;
    let mode = if update {
        DeployMode::Update
    } else {
        DeployMode::Create
    };

    let spinner = spinner("Deploying...")?;
    let result = api.deploy(kind, &PathBuf::from(dir), mode);
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            let record = kind.first_record(&response);
            let field = |name: &str| {
                record
                    .and_then(|r| r.get(name))
                    .and_then(Value::as_str)
                    .unwrap_or("?")
                    .to_string()
            };
            println!(
                "Deployed {} \"{}\" (id {}, status {})",
                kind.singular(),
                field("title"),
                field("id"),
                field("status")
            );
        }
        Err(e) => println!("Deploy failed: {}", e),
    }
    Ok(())
}

fn handle_list<T: Transport>(api: &ApiClient<T>, kind: ResourceKind) -> Result<()> {
    let spinner = spinner("Fetching...")?;
    let result = api.get(kind, None, SearchBy::Id, &[("limit", "all")]);
    spinner.finish_and_clear();

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            println!("Listing {} failed: {}", kind, e);
            return Ok(());
        }
    };
    let records = response
        .get(kind.collection())
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if records.is_empty() {
        println!("No {} found.", kind);
    }
    for record in records {
        let text = |name: &str| {
            record
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        println!(
            "{}  {:<10} {}  ({})",
            text("id"),
            text("status"),
            text("title"),
            text("slug")
        );
    }
    Ok(())
}

fn handle_delete<T: Transport>(api: &ApiClient<T>, kind: ResourceKind) -> Result<()> {
    let id: String = Input::new()
        .with_prompt(format!("{} id", kind.singular()))
        .interact_text()?;
    let sure = Confirm::new()
        .with_prompt(format!("Really delete {} {}?", kind.singular(), id))
        .default(false)
        .interact()?;
    if !sure {
        return Ok(());
    }

    match api.delete(kind, &id) {
        Ok(_) => println!("Deleted {} {}", kind.singular(), id),
        Err(e) => println!("Delete failed: {}", e),
    }
    Ok(())
}

fn handle_site<T: Transport>(api: &ApiClient<T>) -> Result<()> {
    match api.get_site() {
        Ok(site) => println!("{}", serde_json::to_string_pretty(&site)?),
        Err(e) => println!("Fetching site info failed: {}", e),
    }
    Ok(())
}
