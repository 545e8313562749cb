#![forbid(unsafe_code)]

use pf_service::{Config, JsonLinesSink, SessionLog, WorkflowService, handle_line};
use std::io::{BufRead, BufReader, Write};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn usage() -> &'static str {
    "plantflow - incident workflow engine (JSON lines over stdio)\n\n\
USAGE:\n\
  plantflow [--storage-dir DIR] [--templates FILE.yaml]\n\
            [--search-window N] [--store-timeout-ms MS]\n\
\n\
Each stdin line is one request: {\"op\": \"...\", \"args\": {...}}.\n\
Each response is one line: {\"success\", \"op\", \"result\", \"error\"}.\n\
\n\
ENV:\n\
  PLANTFLOW_STORAGE_DIR, PLANTFLOW_TEMPLATES,\n\
  PLANTFLOW_SEARCH_WINDOW, PLANTFLOW_STORE_TIMEOUT_MS\n"
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().collect::<Vec<_>>();
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print!("{}", usage());
        return Ok(());
    }
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        println!("plantflow {VERSION}");
        return Ok(());
    }

    let config = Config::from_process()?;
    let mut session_log = SessionLog::new(&config.storage_dir);
    let sink = Box::new(JsonLinesSink::new(&config.storage_dir));
    let mut service = match WorkflowService::open(&config, sink) {
        Ok(service) => service,
        Err(err) => {
            session_log.note_error(&err.to_string());
            session_log.note_exit("open failed");
            return Err(err.into());
        }
    };

    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut stdout = std::io::stdout().lock();
    let mut line = String::new();
    loop {
        line.clear();
        let read = match reader.read_line(&mut line) {
            Ok(read) => read,
            Err(err) => {
                session_log.note_exit(&format!("stdin error: {err}"));
                return Err(err.into());
            }
        };
        if read == 0 {
            break;
        }
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }

        let outcome = handle_line(&mut service, raw);
        if let Some(op) = &outcome.op {
            session_log.note_op(op);
        }
        if let Some(err) = &outcome.error {
            session_log.note_error(&err.to_string());
        }
        if let Some(failure) = service.take_notify_failure() {
            session_log.note_error(&format!("notification: {failure}"));
        }
        writeln!(stdout, "{}", serde_json::to_string(&outcome.response)?)?;
        stdout.flush()?;
    }

    session_log.note_exit("stdin closed");
    Ok(())
}
