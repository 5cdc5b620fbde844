use std::io::{self, Write};
use std::sync::mpsc::{self, Sender};
use std::thread;

use serde::Serialize;

use crate::error::WormbaitError;
use crate::pipeline::{ProgressEvent, ProgressSink, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Console,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(result: &RunSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

struct ChannelSink {
    tx: Sender<ProgressEvent>,
}

impl ProgressSink for ChannelSink {
    fn event(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Runs a pipeline job on a worker thread and echoes its progress lines to
/// stderr as they arrive.
pub struct Console;

impl Console {
    pub fn run<F, R>(f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, WormbaitError> + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let sink = ChannelSink { tx };
            f(&sink)
        });

        let mut stderr = io::stderr();
        for event in rx {
            let line = match event.elapsed {
                Some(elapsed) => format!("{} [{} ms]", event.message, elapsed.as_millis()),
                None => event.message,
            };
            let _ = writeln!(stderr, "{line}");
        }

        let result = handle
            .join()
            .map_err(|_| miette::Report::msg("worker thread panicked"))?;
        result.map_err(miette::Report::new)
    }

    pub fn print_summary(result: &RunSummary) {
        let green = "\x1b[32m";
        let yellow = "\x1b[33m";
        let cyan = "\x1b[36m";
        let reset = "\x1b[0m";

        println!("{cyan}WormBait summary{reset}");
        println!(
            "{green}Identifiers processed: {}{reset}",
            result.identifiers.len() - result.missing.len()
        );
        println!("{green}Rows written: {}{reset}", result.records);
        if !result.missing.is_empty() {
            println!(
                "{yellow}Not found in database: {}{reset}",
                result.missing.join(", ")
            );
        }
        println!("{cyan}Output: {}{reset}", result.output);
    }
}
