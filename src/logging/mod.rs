use std::{
    env,
    fmt::Write as _,
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::PathBuf,
    thread,
    time::Duration,
};

use chrono::{format::DelayedFormat, DateTime, Local};
use crossbeam_channel::{bounded, unbounded, Sender};
use once_cell::sync::Lazy;

/// 預設的日誌目錄
const LOG_DIR: &str = "log";
const LOG_DIR_ENV: &str = "PRICE_LEDGER_LOG_DIR";
/// 累積到這個大小就寫入檔案
const BATCH_SIZE: usize = 4096;
/// flush 最多等待的時間
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

enum Command {
    Write(LogMessage),
    Flush(Sender<()>),
}

pub struct Logger {
    writer: Sender<Command>,
}

impl Logger {
    fn new(log_name: &str) -> Self {
        let (tx, rx) = unbounded::<Command>();
        let log_path = Self::get_log_path(log_name);

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut writer = log_path.and_then(|path| {
                match OpenOptions::new().create(true).append(true).open(&path) {
                    Ok(file) => Some(BufWriter::new(file)),
                    Err(why) => {
                        error_console(format!(
                            "Failed to open log file {} because {:?}",
                            path.display(),
                            why
                        ));
                        None
                    }
                }
            });
            let mut line = String::with_capacity(BATCH_SIZE);

            while let Ok(command) = rx.recv() {
                match command {
                    Command::Write(received) => {
                        if writeln!(
                            &mut line,
                            "{} {} {}",
                            received.created_at.format("%F %X%.6f"),
                            received.level,
                            received.msg
                        )
                        .is_err()
                        {
                            continue;
                        }

                        if rx.is_empty() || line.len() >= BATCH_SIZE {
                            write_out(&mut writer, &mut line);
                        }
                    }
                    Command::Flush(done) => {
                        write_out(&mut writer, &mut line);
                        let _ = done.send(());
                    }
                }
            }
        });

        Logger { writer: tx }
    }

    fn info(&self, log: String) {
        self.send(log::Level::Info, log);
    }

    fn warn(&self, log: String) {
        self.send(log::Level::Warn, log);
    }

    fn error(&self, log: String) {
        self.send(log::Level::Error, log);
    }

    fn send(&self, level: log::Level, msg: String) {
        if let Err(why) = self.writer.send(Command::Write(LogMessage::new(level, msg))) {
            error_console(why.to_string());
        }
    }

    /// 等待背景線程把目前排隊中的訊息都寫完
    fn flush(&self) {
        let (tx, rx) = bounded::<()>(1);
        if self.writer.send(Command::Flush(tx)).is_ok() {
            let _ = rx.recv_timeout(FLUSH_TIMEOUT);
        }
    }

    fn get_log_path(name: &str) -> Option<PathBuf> {
        let path = PathBuf::from(env::var(LOG_DIR_ENV).unwrap_or_else(|_| LOG_DIR.to_string()));

        if !path.exists() {
            if let Err(why) = fs::create_dir_all(&path) {
                error_console(format!(
                    "Failed to create log directory {} because {:?}",
                    path.display(),
                    why
                ));
                return None;
            }
        }

        let mut log_path = path;
        log_path.push(format!("{}_{}.log", name, Local::now().format("%Y-%m-%d")));

        Some(log_path)
    }
}

fn write_out(writer: &mut Option<BufWriter<File>>, line: &mut String) {
    write_out_or(writer, &mut io::stderr(), line);
}

/// 寫不進日誌檔時，原樣寫到 `fallback`，保留每一行自己的等級
fn write_out_or<W: Write>(
    writer: &mut Option<BufWriter<File>>,
    fallback: &mut W,
    line: &mut String,
) {
    if line.is_empty() {
        return;
    }

    let written = match writer {
        Some(w) => w.write_all(line.as_bytes()).and_then(|_| w.flush()).is_ok(),
        None => false,
    };

    if !written {
        let _ = fallback.write_all(line.as_bytes());
        let _ = fallback.flush();
    }

    line.clear();
}

pub struct LogMessage {
    pub level: log::Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: log::Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

/// Blocks until every message queued so far has reached the log file.
pub fn flush() {
    LOGGER.flush();
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
