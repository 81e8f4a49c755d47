use anyhow::{Context, Result, anyhow};
use occloud::store::{KEY_DISPLAY_NAME, KEY_OC_BASE_URL, KEY_SUPPORTS_OAUTH2};
use occloud::{Account, AuthTokenType, Credentials, OcClient};
use std::env;
use std::io::{self, BufRead, Write};

const USAGE: &str = "Usage: occloud login <server-url> <username> [--token] [--display-name <name>]\n\nThe password (or OAuth2 token with --token) is read from OCCLOUD_PASSWORD / OCCLOUD_TOKEN, or from stdin.";

#[derive(Debug, PartialEq, Eq)]
struct LoginArgs {
    server: String,
    username: String,
    token: bool,
    display_name: Option<String>,
}

fn parse_args(args: &[String]) -> Result<LoginArgs> {
    let mut positional = Vec::new();
    let mut token = false;
    let mut display_name = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--token" => token = true,
            "--display-name" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--display-name requires a value\n{USAGE}"))?;
                display_name = Some(value.clone());
            }
            _ if arg.starts_with("--display-name=") => {
                display_name = Some(arg["--display-name=".len()..].to_string());
            }
            _ if arg.starts_with('-') => {
                return Err(anyhow!("unknown option for login: {arg}\n{USAGE}"));
            }
            _ => positional.push(arg.clone()),
        }
    }

    match <[String; 2]>::try_from(positional) {
        Ok([server, username]) if !username.trim().is_empty() => Ok(LoginArgs {
            server,
            username,
            token,
            display_name,
        }),
        _ => Err(anyhow!(USAGE)),
    }
}

fn read_secret(token: bool) -> Result<String> {
    let var = if token { "OCCLOUD_TOKEN" } else { "OCCLOUD_PASSWORD" };
    if let Ok(secret) = env::var(var) {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    eprint!("{}: ", if token { "Token" } else { "Password" });
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read secret from stdin")?;
    let secret = line.trim_end_matches(['\r', '\n']).to_string();
    if secret.is_empty() {
        return Err(anyhow!("{} is empty", var));
    }
    Ok(secret)
}

pub fn run(args: &[String]) -> Result<()> {
    let parsed = parse_args(args)?;
    let mut config = super::cli_config()?;
    let secret = read_secret(parsed.token)?;

    let credentials = if parsed.token {
        Credentials::bearer(&parsed.username, secret.as_str())
    } else {
        Credentials::basic(&parsed.username, secret.as_str())
    };
    let account = Account::from_endpoint(&parsed.server, Some(credentials))?;
    let client = OcClient::new(account, &config)?;
    if !client.check_credentials()? {
        return Err(anyhow!("{} rejected the credentials", parsed.server));
    }

    let name = client
        .account()
        .name()
        .ok_or_else(|| anyhow!("account has no username"))?
        .to_string();

    let mut store = super::cli_store(&config)?;
    let handle = store.add_account(&name)?;
    store.set_user_data(&handle, KEY_OC_BASE_URL, Some(parsed.server.as_str()))?;
    store.set_user_data(&handle, KEY_DISPLAY_NAME, parsed.display_name.as_deref())?;
    store.set_user_data(&handle, KEY_SUPPORTS_OAUTH2, parsed.token.then_some("TRUE"))?;
    let token_type = if parsed.token {
        AuthTokenType::AccessToken
    } else {
        AuthTokenType::Password
    };
    store.set_auth_token(&handle, token_type, Some(secret.as_str()))?;
    store.save()?;

    config.default_account = Some(name.clone());
    config.save()?;

    println!(
        "Logged in as {} ({})",
        client.account().display_name().unwrap_or(&name),
        name
    );
    Ok(())
}
