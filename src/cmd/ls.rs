use anyhow::{Result, anyhow};
use occloud::{Depth, OcClient, PropfindOutcome};

use super::SortField;

const USAGE: &str = "Usage: occloud ls [-l|--long] [--json] [-d|--depth=<0|1|infinity>] [-s|--sort=<field>] [-r|--reverse] [-a|--account=<name>] [path]\n\nSort fields: name, size, modified, none";

#[derive(Debug, PartialEq, Eq)]
struct LsArgs {
    path: String,
    long: bool,
    json: bool,
    depth: Depth,
    sort_field: SortField,
    reverse: bool,
    account: Option<String>,
}

fn parse_depth(s: &str) -> Result<Depth> {
    Depth::parse(s).ok_or_else(|| anyhow!("invalid depth: {s}\nValid depths: 0, 1, infinity"))
}

fn parse_args(args: &[String]) -> Result<LsArgs> {
    let mut path: Option<String> = None;
    let mut long = false;
    let mut json = false;
    let mut depth = Depth::One;
    let mut sort_field = SortField::default();
    let mut reverse = false;
    let mut account = None;
    let mut options_done = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if !options_done {
            let mut value_for = |flag: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| anyhow!("{flag} requires a value\n{USAGE}"))
            };
            match arg.as_str() {
                "-l" | "--long" => {
                    long = true;
                    continue;
                }
                "--json" => {
                    json = true;
                    continue;
                }
                "-r" | "--reverse" => {
                    reverse = true;
                    continue;
                }
                "-s" | "--sort" => {
                    sort_field = super::parse_sort_field(&value_for("--sort")?)?;
                    continue;
                }
                "-d" | "--depth" => {
                    depth = parse_depth(&value_for("--depth")?)?;
                    continue;
                }
                "-a" | "--account" => {
                    account = Some(value_for("--account")?);
                    continue;
                }
                "--" => {
                    options_done = true;
                    continue;
                }
                _ if arg.starts_with("--sort=") => {
                    sort_field = super::parse_sort_field(&arg["--sort=".len()..])?;
                    continue;
                }
                _ if arg.starts_with("--depth=") => {
                    depth = parse_depth(&arg["--depth=".len()..])?;
                    continue;
                }
                _ if arg.starts_with("--account=") => {
                    account = Some(arg["--account=".len()..].to_string());
                    continue;
                }
                _ if arg.starts_with('-') => {
                    return Err(anyhow!("unknown option for ls: {arg}\n{USAGE}"));
                }
                _ => {}
            }
        }

        if path.is_some() {
            return Err(anyhow!("ls accepts at most one path\n{USAGE}"));
        }
        path = Some(arg.clone());
    }

    Ok(LsArgs {
        path: path.unwrap_or_else(|| "/".to_string()),
        long,
        json,
        depth,
        sort_field,
        reverse,
        account,
    })
}

pub fn run(args: &[String]) -> Result<()> {
    let parsed = parse_args(args)?;
    let config = super::cli_config()?;
    let store = super::cli_store(&config)?;
    let account = super::cli_account(&config, &store, parsed.account.as_deref())?;
    let client = OcClient::new(account, &config)?;

    let method = client.list(&parsed.path, parsed.depth)?;
    let mut members = match method.into_outcome() {
        Some(PropfindOutcome::Listed { members, .. }) => members,
        Some(PropfindOutcome::Unauthorized { exchange }) => {
            return Err(anyhow!(
                "not authorized to list {} (HTTP {}). Run `occloud login` again",
                exchange.url,
                exchange.status
            ));
        }
        None => return Err(anyhow!("listing did not run")),
    };
    super::sort_members(&mut members, parsed.sort_field, parsed.reverse);

    if parsed.json {
        super::print_members_json(&members);
        return Ok(());
    }

    if members.is_empty() {
        println!("(empty)");
        return Ok(());
    }

    if parsed.long {
        super::print_members_long(&members);
    } else {
        super::print_members_short(&members);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LsArgs, parse_args};
    use crate::cmd::SortField;
    use occloud::Depth;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn defaults() -> LsArgs {
        LsArgs {
            path: "/".to_string(),
            long: false,
            json: false,
            depth: Depth::One,
            sort_field: SortField::Name,
            reverse: false,
            account: None,
        }
    }

    #[test]
    fn parse_defaults_to_root_depth_one() {
        assert_eq!(parse_args(&s(&[])).unwrap(), defaults());
    }

    #[test]
    fn parse_supports_path_and_long_in_any_order() {
        let expected = LsArgs {
            path: "/Docs".to_string(),
            long: true,
            ..defaults()
        };
        assert_eq!(parse_args(&s(&["/Docs", "-l"])).unwrap(), expected);
        assert_eq!(parse_args(&s(&["-l", "/Docs"])).unwrap(), expected);
    }

    #[test]
    fn parse_depth_and_account() {
        assert_eq!(
            parse_args(&s(&["-d", "0", "--account=alice@cloud.example"])).unwrap(),
            LsArgs {
                depth: Depth::Zero,
                account: Some("alice@cloud.example".to_string()),
                ..defaults()
            }
        );
        assert_eq!(
            parse_args(&s(&["--depth=infinity", "-a", "bob@h"])).unwrap(),
            LsArgs {
                depth: Depth::Infinity,
                account: Some("bob@h".to_string()),
                ..defaults()
            }
        );
        let err = parse_args(&s(&["--depth=2"])).unwrap_err();
        assert!(err.to_string().contains("invalid depth"));
    }

    #[test]
    fn parse_sort_and_reverse() {
        assert_eq!(
            parse_args(&s(&["-r", "--sort=size", "--json"])).unwrap(),
            LsArgs {
                sort_field: SortField::Size,
                reverse: true,
                json: true,
                ..defaults()
            }
        );
        let err = parse_args(&s(&["--sort"])).unwrap_err();
        assert!(err.to_string().contains("--sort requires a value"));
    }

    #[test]
    fn parse_double_dash_allows_dash_paths() {
        assert_eq!(
            parse_args(&s(&["--", "-weird"])).unwrap(),
            LsArgs {
                path: "-weird".to_string(),
                ..defaults()
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_options_and_extra_paths() {
        let err = parse_args(&s(&["-x"])).unwrap_err();
        assert!(err.to_string().contains("unknown option for ls"));
        let err = parse_args(&s(&["/a", "/b"])).unwrap_err();
        assert!(err.to_string().contains("at most one path"));
    }
}
