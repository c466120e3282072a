// Store menu: log in with exported credentials, show the account, push a
// file to the storage or drop the stored credentials. Errors are printed
// and the menu keeps running.

use crate::api::Client;
use anyhow::Result;
use dialoguer::{Confirm, Input, Password, Select};
use std::path::PathBuf;

/// Main interactive menu. Receives a store `Client` and runs a simple
/// select loop until the user chooses "Exit".
pub fn main_menu(client: Client) -> Result<()> {
    loop {
        let items = vec!["Log in", "Who am I", "Upload file", "Log out", "Exit"];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => handle_login(&client)?,
            1 => match client.whoami() {
                Ok(whoami) => {
                    println!("username: {}", whoami.account.username);
                    if let Some(name) = &whoami.account.name {
                        println!("name:     {}", name);
                    }
                    println!("id:       {}", whoami.account.id);
                    if !whoami.permissions.is_empty() {
                        println!("permissions: {}", whoami.permissions.join(", "));
                    }
                }
                Err(e) => println!("Could not get account details: {}", e),
            },
            2 => handle_upload(&client)?,
            3 => {
                if Confirm::new().with_prompt("Remove the stored credentials?").interact()? {
                    match client.logout() {
                        Ok(()) => println!("Credentials cleared."),
                        Err(e) => println!("Logout failed: {}", e),
                    }
                }
            }
            4 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Ask for exported credentials (as produced by `charmcraft login --export`)
/// and store them if the store accepts them.
fn handle_login(client: &Client) -> Result<()> {
    let exported: String = Password::new().with_prompt("Exported credentials").interact()?;
    match client.login_with_credentials(&exported) {
        Ok(whoami) => println!("Logged in as {}.", whoami.account.username),
        Err(e) => println!("Login failed: {}", e),
    }
    Ok(())
}

/// Push a file to the storage and show the resulting upload id.
fn handle_upload(client: &Client) -> Result<()> {
    let path: String = Input::new().with_prompt("File to upload").interact_text()?;
    let path = PathBuf::from(path.trim());
    match client.push_file(&path) {
        Ok(upload_id) => println!("Upload successful, id: {}", upload_id),
        Err(e) => println!("Upload failed: {}", e),
    }
    Ok(())
}
