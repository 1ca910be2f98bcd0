use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use folio_core::model::{BookId, UserId};

const DEFAULT_DB_URL: &str = "sqlite://folio.sqlite3";
const DEFAULT_THROTTLE_MS: u64 = 300;

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required for this command"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Record,
    Show,
    Reset,
    Library,
    Add,
    Remove,
    Stats,
}

impl Command {
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "record" => Some(Self::Record),
            "show" => Some(Self::Show),
            "reset" => Some(Self::Reset),
            "library" => Some(Self::Library),
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }
}

/// Settings resolved from `FOLIO_*` environment variables, then CLI flags.
#[derive(Debug)]
pub struct Args {
    pub db_url: String,
    pub user_id: Option<UserId>,
    pub book_id: Option<BookId>,
    pub book_file: Option<PathBuf>,
    pub chapter: usize,
    pub scroll: f64,
    pub height: f64,
    pub throttle: Duration,
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

impl Args {
    pub fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("FOLIO_DB_URL")
                .ok()
                .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url),
            user_id: std::env::var("FOLIO_USER_ID")
                .ok()
                .and_then(|value| value.parse().ok()),
            book_id: None,
            book_file: None,
            chapter: 0,
            scroll: 0.0,
            height: 0.0,
            throttle: Duration::from_millis(
                std::env::var("FOLIO_THROTTLE_MS")
                    .ok()
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(DEFAULT_THROTTLE_MS),
            ),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    parsed.user_id = Some(UserId::new(parse_number("--user", value)?));
                }
                "--book" => {
                    let value = require_value(args, "--book")?;
                    parsed.book_id = Some(BookId::new(parse_number("--book", value)?));
                }
                "--book-file" => {
                    parsed.book_file = Some(PathBuf::from(require_value(args, "--book-file")?));
                }
                "--chapter" => {
                    parsed.chapter = parse_number("--chapter", require_value(args, "--chapter")?)?;
                }
                "--scroll" => {
                    parsed.scroll = parse_number("--scroll", require_value(args, "--scroll")?)?;
                }
                "--height" => {
                    parsed.height = parse_number("--height", require_value(args, "--height")?)?;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    pub fn book_id(&self) -> Result<BookId, ArgsError> {
        self.book_id.ok_or(ArgsError::MissingFlag { flag: "--book" })
    }

    pub fn book_file(&self) -> Result<&PathBuf, ArgsError> {
        self.book_file
            .as_ref()
            .ok_or(ArgsError::MissingFlag { flag: "--book-file" })
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its directory exist before sqlx opens it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn parses_sample_flags() {
        let args = parse(&[
            "--db", "sqlite::memory:", "--user", "3", "--book", "7", "--chapter", "2",
            "--scroll", "480.5", "--height", "1200",
        ])
        .unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.user_id, Some(UserId::new(3)));
        assert_eq!(args.book_id().unwrap(), BookId::new(7));
        assert_eq!(args.chapter, 2);
        assert_eq!(args.scroll, 480.5);
        assert_eq!(args.height, 1200.0);
    }

    #[test]
    fn rejects_unknown_and_malformed_flags() {
        assert!(matches!(parse(&["--nope"]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(
            parse(&["--chapter", "two"]),
            Err(ArgsError::InvalidNumber { flag: "--chapter", .. })
        ));
        assert!(matches!(
            parse(&["--user"]),
            Err(ArgsError::MissingValue { flag: "--user" })
        ));
        assert!(matches!(
            parse(&[]).unwrap().book_file(),
            Err(ArgsError::MissingFlag { flag: "--book-file" })
        ));
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(
            normalize_sqlite_url("sqlite://already.db".into()),
            "sqlite://already.db"
        );
        assert!(normalize_sqlite_url("data/folio.db".into()).ends_with("/data/folio.db"));
    }
}
