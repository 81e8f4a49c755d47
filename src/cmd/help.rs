use anyhow::Result;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

pub fn run() -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{BOLD}{CYAN}occloud{RESET} {DIM}v{version}{RESET}  {DIM}─{RESET}  Accounts and WebDAV listings for ownCloud servers"
    );
    println!();
    println!("{BOLD}Usage:{RESET}  {GREEN}occloud{RESET} {DIM}<command> [args...]{RESET}");
    println!();
    println!("{BOLD}Commands:{RESET}");

    let commands: &[(&str, &str)] = &[
        ("login <url> <user> [--token]", "Verify and save an account"),
        ("accounts",                     "List saved accounts (* = default)"),
        ("ls [-l] [-d depth] [path]",    "List a folder over WebDAV"),
        ("logout <account>",             "Forget a saved account"),
        ("help",                         "Show this help message"),
    ];

    for (cmd, desc) in commands {
        let (name, args) = match cmd.find(' ') {
            Some(i) => (&cmd[..i], &cmd[i..]),
            None => (*cmd, ""),
        };
        println!(
            "  {GREEN}{name}{RESET}{DIM}{args}{RESET}  {:>width$}{DIM}{desc}{RESET}",
            "",
            width = 30usize.saturating_sub(cmd.len()),
        );
    }

    println!();
    println!("{BOLD}Environment:{RESET}");
    println!("  {GREEN}OCCLOUD_PASSWORD{RESET}, {GREEN}OCCLOUD_TOKEN{RESET}   Secret used by login");
    println!("  {GREEN}OCCLOUD_ACCOUNTS_FILE{RESET}              Override the account store path");
    println!("  {GREEN}OCCLOUD_LOG{RESET}                        Log filter, e.g. occloud=debug");
    println!();
    println!("{BOLD}Options:{RESET}");
    println!("  {GREEN}-h{RESET}, {GREEN}--help{RESET}                         Show this help message");
    println!("  {GREEN}-V{RESET}, {GREEN}--version{RESET}                      Show version");

    Ok(())
}
