use anyhow::{Result, anyhow};

pub fn run(args: &[String]) -> Result<()> {
    let [name] = args else {
        return Err(anyhow!("Usage: occloud logout <account>"));
    };

    let mut config = super::cli_config()?;
    let mut store = super::cli_store(&config)?;
    let handle = store
        .find(name)
        .ok_or_else(|| anyhow!("account '{}' not found", name))?;

    store.remove_account(&handle);
    store.save()?;

    if config.default_account.as_deref() == Some(name.as_str()) {
        config.default_account = None;
        config.save()?;
    }

    println!("Removed account '{}'", name);
    Ok(())
}
