pub mod accounts;
pub mod help;
pub mod login;
pub mod logout;
pub mod ls;

use anyhow::{Context, Result, anyhow};
use occloud::dav::DavMember;
use occloud::{Account, AppConfig, FileAccountStore, Platform};
use std::cmp::Ordering;

pub fn cli_config() -> Result<AppConfig> {
    AppConfig::load()
}

pub fn cli_store(config: &AppConfig) -> Result<FileAccountStore> {
    let path = config.accounts_path()?;
    FileAccountStore::open(&path)
        .with_context(|| format!("failed to open account store {}", path.display()))
}

/// Picks `requested`, else the configured default, else the only saved account.
pub fn cli_account(
    config: &AppConfig,
    store: &FileAccountStore,
    requested: Option<&str>,
) -> Result<Account> {
    let name = match requested.or(config.default_account.as_deref()) {
        Some(name) => name.to_string(),
        None => {
            let all = store.accounts();
            match all.as_slice() {
                [only] => only.name().to_string(),
                [] => {
                    return Err(anyhow!(
                        "no saved accounts. Run `occloud login <server-url> <username>` first"
                    ));
                }
                _ => return Err(anyhow!("several accounts saved; pick one with --account")),
            }
        }
    };

    let handle = store
        .find(&name)
        .ok_or_else(|| anyhow!("account '{}' not found", name))?;
    let platform = Platform::with_stored_credentials(store);
    Account::from_persisted(handle, &platform)
        .with_context(|| format!("failed to load account '{}'", name))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Name,
    Size,
    Modified,
    None,
}

pub fn parse_sort_field(s: &str) -> Result<SortField> {
    match s {
        "name" => Ok(SortField::Name),
        "size" => Ok(SortField::Size),
        "modified" | "mtime" => Ok(SortField::Modified),
        "none" => Ok(SortField::None),
        _ => Err(anyhow!("unknown sort field: {s}\nValid fields: name, size, modified, none")),
    }
}

/// Collections first, then by `field`; `reverse` flips order within each group.
pub fn sort_members(members: &mut [DavMember], field: SortField, reverse: bool) {
    if field == SortField::None {
        return;
    }
    members.sort_by(|a, b| {
        let group = b.is_collection.cmp(&a.is_collection);
        if group != Ordering::Equal {
            return group;
        }
        let ord = match field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Size => b.content_length.cmp(&a.content_length),
            SortField::Modified => modified_key(b).cmp(&modified_key(a)),
            SortField::None => Ordering::Equal,
        };
        if reverse { ord.reverse() } else { ord }
    });
}

/// Sortable `YYYY-MM-DD HH:MM:SS` from an RFC 1123 `getlastmodified`.
fn modified_key(m: &DavMember) -> String {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let Some(raw) = m.last_modified.as_deref() else {
        return String::new();
    };
    // "Tue, 15 Nov 1994 12:45:26 GMT"
    let parts: Vec<&str> = raw.split_whitespace().collect();
    match parts.as_slice() {
        [_, day, month, year, time, ..] => {
            let month = MONTHS
                .iter()
                .position(|m| m.eq_ignore_ascii_case(month))
                .map_or(0, |i| i + 1);
            format!("{year}-{month:02}-{:0>2} {time}", day)
        }
        _ => raw.to_string(),
    }
}

pub fn format_date(m: &DavMember) -> String {
    let key = modified_key(m);
    if key.is_empty() {
        "-".to_string()
    } else {
        key.chars().take(16).collect()
    }
}

/// eza-style grid output (column-major) for a list of members.
pub fn print_members_short(members: &[DavMember]) {
    use unicode_width::UnicodeWidthStr;

    let term_width = crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(80);

    let labels: Vec<String> = members.iter().map(label).collect();
    let display_widths: Vec<usize> = labels
        .iter()
        .map(|l| UnicodeWidthStr::width(l.as_str()))
        .collect();

    let max_width = display_widths.iter().copied().max().unwrap_or(1);
    let col_width = max_width + 2;
    let num_cols = (term_width / col_width).max(1);
    let num_rows = members.len().div_ceil(num_cols);

    for row in 0..num_rows {
        for col in 0..num_cols {
            let idx = col * num_rows + row;
            if idx >= members.len() {
                break;
            }
            let colored = colored(&labels[idx], &members[idx]);
            let is_last_col = col + 1 == num_cols || (col + 1) * num_rows + row >= members.len();
            if is_last_col {
                print!("{}", colored);
            } else {
                let padding = col_width.saturating_sub(display_widths[idx]);
                print!("{}{}", colored, " ".repeat(padding));
            }
        }
        println!();
    }
}

/// eza-style long format output: size, date, name.
pub fn print_members_long(members: &[DavMember]) {
    for m in members {
        let size_str = match (m.is_collection, m.content_length) {
            (false, Some(len)) => format!("{:>9}", format_size(len)),
            _ => format!("{:>9}", "-"),
        };
        let colored_size = format!("\x1b[1;32m{}\x1b[0m", size_str);
        let colored_date = format!("\x1b[34m{:16}\x1b[0m", format_date(m));
        println!(
            "{}  {}  {}",
            colored_size,
            colored_date,
            colored(&label(m), m)
        );
    }
}

pub fn print_members_json(members: &[DavMember]) {
    let json = serde_json::to_string_pretty(members).unwrap_or_else(|_| "[]".into());
    println!("{}", json);
}

fn label(m: &DavMember) -> String {
    if m.is_collection {
        format!("{}/", m.name)
    } else {
        m.name.clone()
    }
}

fn colored(text: &str, m: &DavMember) -> String {
    if m.is_collection {
        format!("\x1b[1;34m{}\x1b[0m", text)
    } else {
        text.to_string()
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
