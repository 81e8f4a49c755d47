use anyhow::{Result, anyhow};
use occloud::{Account, Platform};

pub fn run(args: &[String]) -> Result<()> {
    if let Some(arg) = args.first() {
        return Err(anyhow!("unexpected argument: {}\nUsage: occloud accounts", arg));
    }

    let config = super::cli_config()?;
    let store = super::cli_store(&config)?;
    let handles = store.accounts();
    if handles.is_empty() {
        println!("No saved accounts. Run `occloud login <server-url> <username>`.");
        return Ok(());
    }

    let platform = Platform::with_stored_credentials(&store);
    for handle in handles {
        let marker = if config.default_account.as_deref() == Some(handle.name()) {
            "*"
        } else {
            " "
        };
        match Account::from_persisted(handle.clone(), &platform) {
            Ok(account) => println!(
                "{} {}  \x1b[2m{}\x1b[0m  {}",
                marker,
                account.display_name().unwrap_or("-"),
                handle.name(),
                account.base_url()
            ),
            Err(e) => println!(
                "{} {}  \x1b[31m(unusable: {})\x1b[0m",
                marker,
                handle.name(),
                e
            ),
        }
    }
    Ok(())
}
