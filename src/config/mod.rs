use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use config::{Config as config_config, File as config_file};
use serde::{Deserialize, Serialize};

use crate::util::text;

const CONFIG_PATH: &str = "app.json";
const DEFAULT_PRICE_DB: &str = "price-db";
const DEFAULT_GIT: &str = "git";

const PRICE_LEDGER_REPO: &str = "PRICE_LEDGER_REPO";
const PRICE_LEDGER_FILE: &str = "PRICE_LEDGER_FILE";
const PRICE_LEDGER_URL: &str = "PRICE_LEDGER_URL";
const PRICE_LEDGER_IDENT: &str = "PRICE_LEDGER_IDENT";
const PRICE_LEDGER_GIT: &str = "PRICE_LEDGER_GIT";
const PRICE_LEDGER_REMOTE: &str = "PRICE_LEDGER_REMOTE";
const PRICE_LEDGER_HTTP_TIMEOUT: &str = "PRICE_LEDGER_HTTP_TIMEOUT";

/// Fetch a fund price and append it to a git-tracked price-db when it changes
#[derive(Parser, Debug, Default, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (default: app.json when it exists)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Path to the git workdir containing the price-db file
    #[arg(long)]
    pub repo: Option<String>,
    /// URL of the page from which to fetch the price
    #[arg(long)]
    pub url: Option<String>,
    /// Price identifier to use in price-db, e.g. ZERO
    #[arg(long)]
    pub ident: Option<String>,
    /// The name of the price-db file
    #[arg(long)]
    pub pricedb: Option<String>,
    /// git executable
    #[arg(long)]
    pub git: Option<String>,
    /// Remote to push to (default: the branch's upstream)
    #[arg(long)]
    pub remote: Option<String>,
    /// Overall HTTP timeout in seconds, 0 waits forever
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct App {
    #[serde(default)]
    pub repository: Repository,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub git: Git,
    #[serde(default)]
    pub http: Http,
}

/// 存放 price-db 的 git 工作目錄
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Repository {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for Repository {
    fn default() -> Self {
        Repository {
            path: String::new(),
            file_name: default_file_name(),
        }
    }
}

/// 價格來源
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Source {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub ident: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Git {
    #[serde(default = "default_git")]
    pub program: String,
    /// 空字串代表直接 `git push`
    #[serde(default)]
    pub remote: String,
}

impl Default for Git {
    fn default() -> Self {
        Git {
            program: default_git(),
            remote: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Http {
    /// 0 代表不限制
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_file_name() -> String {
    DEFAULT_PRICE_DB.to_string()
}

fn default_git() -> String {
    DEFAULT_GIT.to_string()
}

impl App {
    /// Builds the settings for one run: config file, then env, then command line.
    ///
    /// The result is validated; nothing has touched the file system or network yet
    /// when an error comes back.
    pub fn load(args: &Args) -> Result<Self> {
        let app = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        app.override_with_env()?.override_with_args(args).validate()
    }

    fn from_file(path: &Path) -> Result<Self> {
        config_config::builder()
            .add_source(config_file::from(path))
            .build()
            .and_then(|c| c.try_deserialize::<App>())
            .map_err(|why| {
                anyhow!(
                    "I can't read the config {} because {:?}",
                    path.display(),
                    why
                )
            })
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(self) -> Result<Self> {
        self.override_with_vars(|key| env::var(key).ok())
    }

    /// A value that is present but cannot be parsed is an error, not a fallback.
    fn override_with_vars<F>(mut self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var(PRICE_LEDGER_REPO) {
            self.repository.path = path;
        }

        if let Some(file_name) = var(PRICE_LEDGER_FILE) {
            self.repository.file_name = file_name;
        }

        if let Some(url) = var(PRICE_LEDGER_URL) {
            self.source.url = url;
        }

        if let Some(ident) = var(PRICE_LEDGER_IDENT) {
            self.source.ident = ident;
        }

        if let Some(program) = var(PRICE_LEDGER_GIT) {
            self.git.program = program;
        }

        if let Some(remote) = var(PRICE_LEDGER_REMOTE) {
            self.git.remote = remote;
        }

        if let Some(timeout) = var(PRICE_LEDGER_HTTP_TIMEOUT) {
            self.http.timeout_secs = u64::from_str(timeout.trim()).map_err(|why| {
                anyhow!(
                    "Failed to parse {}={:?} because {:?}",
                    PRICE_LEDGER_HTTP_TIMEOUT,
                    timeout,
                    why
                )
            })?;
        }

        Ok(self)
    }

    /// 命令列參數的優先權最高
    fn override_with_args(mut self, args: &Args) -> Self {
        if let Some(path) = &args.repo {
            self.repository.path.clone_from(path);
        }

        if let Some(file_name) = &args.pricedb {
            self.repository.file_name.clone_from(file_name);
        }

        if let Some(url) = &args.url {
            self.source.url.clone_from(url);
        }

        if let Some(ident) = &args.ident {
            self.source.ident.clone_from(ident);
        }

        if let Some(program) = &args.git {
            self.git.program.clone_from(program);
        }

        if let Some(remote) = &args.remote {
            self.git.remote.clone_from(remote);
        }

        if let Some(secs) = args.timeout {
            self.http.timeout_secs = secs;
        }

        self
    }

    /// Trims every value and rejects the ones a run cannot do without.
    pub fn validate(mut self) -> Result<Self> {
        self.repository.path = text::trim(&self.repository.path);
        self.repository.file_name = text::trim(&self.repository.file_name);
        self.source.url = text::trim(&self.source.url);
        self.source.ident = text::trim(&self.source.ident);
        self.git.program = text::trim(&self.git.program);
        self.git.remote = text::trim(&self.git.remote);

        if self.repository.path.is_empty() {
            bail!("Need repo, something like '/path/to/valid/git/repo/'");
        }
        self.repository.path = text::normalize_dir(&self.repository.path);

        if self.source.url.is_empty() {
            bail!("Need URL, something like 'https://www.avanza.se/fonder/om-fonden.html/41567/avanza-zero'");
        }

        if self.source.ident.is_empty() {
            bail!("Need ident, something like 'ZERO'");
        }

        // 代號會被寫進以空白分隔的 price-db
        if self.source.ident.chars().any(char::is_whitespace) {
            bail!(
                "The ident {:?} must not contain whitespace",
                self.source.ident
            );
        }

        if self.repository.file_name.is_empty() {
            bail!("Need pricedb, something like 'price-db'");
        }

        if self.git.program.is_empty() {
            bail!("Need git, something like 'git'");
        }

        Ok(self)
    }

    /// 工作目錄
    pub fn repo_dir(&self) -> PathBuf {
        PathBuf::from(&self.repository.path)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        match self.http.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
