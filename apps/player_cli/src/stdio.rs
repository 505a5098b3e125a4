use std::{
    io::{self, BufRead, Write},
    thread,
};

use anyhow::Result;
use async_trait::async_trait;
use client_core::Terminal;
use tokio::sync::mpsc;

const LINE_BUFFER: usize = 16;

/// Terminal over the process stdio.
///
/// Lines are read on a plain OS thread and handed over through a channel.
/// A blocking read parked there never holds up runtime shutdown, and
/// `recv` is cancel safe, so an abandoned prompt loses nothing.
pub struct StdioTerminal {
    lines: mpsc::Receiver<io::Result<String>>,
}

impl StdioTerminal {
    pub fn spawn() -> io::Result<Self> {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    pub fn from_reader<R>(reader: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, lines) = mpsc::channel(LINE_BUFFER);
        thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
            })?;
        Ok(Self { lines })
    }
}

#[async_trait]
impl Terminal for StdioTerminal {
    fn show(&mut self, line: &str) {
        println!("{line}");
    }

    fn clear(&mut self) {
        print!("\x1B[2J\x1B[1;1H");
        let _ = io::stdout().flush();
    }

    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;
        match self.lines.recv().await {
            Some(line) => Ok(Some(line?)),
            None => Ok(None),
        }
    }
}
