//! Subprocess boundary and the native PTY implementation.
//!
//! `Terminal` talks to its child only through [`Subprocess`]; tests swap
//! in a scripted fake via [`Spawner`]. The native implementation reads the
//! PTY on a background thread and hands chunks over a channel, so the
//! frame loop only ever does a non-blocking `try_recv`.

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};

use super::TerminalError;

/// Read chunk size for the PTY reader thread.
const READ_CHUNK: usize = 4096;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `$SHELL`, falling back to `sh` (`cmd.exe` on Windows).
    pub fn default_shell() -> Self {
        #[cfg(target_os = "windows")]
        {
            Self::new("cmd.exe")
        }
        #[cfg(not(target_os = "windows"))]
        {
            Self::new(std::env::var("SHELL").unwrap_or_else(|_| "sh".to_owned()))
        }
    }

    /// Split a command line on whitespace. `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self {
            program: program.to_owned(),
            args: parts.map(str::to_owned).collect(),
        })
    }
}

/// A running child attached to a pseudo-terminal.
pub trait Subprocess {
    /// Append output that has already arrived. Never blocks. Returns
    /// `false` once the output stream is closed and fully drained.
    fn read_available(&mut self, out: &mut Vec<u8>) -> bool;

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()>;

    fn resize(&mut self, cols: u16, lines: u16) -> io::Result<()>;

    /// `Ok(Some(code))` once the child has exited.
    fn try_wait(&mut self) -> io::Result<Option<u32>>;

    fn kill(&mut self) -> io::Result<()>;

    fn pid(&self) -> Option<u32>;
}

/// Creates subprocesses for `Terminal::start`.
pub trait Spawner {
    fn spawn(
        &self,
        command: &ShellCommand,
        cols: u16,
        lines: u16,
    ) -> Result<Box<dyn Subprocess>, TerminalError>;
}

/// Spawns children on the platform PTY (`openpty` / ConPTY).
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePtySpawner;

impl Spawner for NativePtySpawner {
    fn spawn(
        &self,
        command: &ShellCommand,
        cols: u16,
        lines: u16,
    ) -> Result<Box<dyn Subprocess>, TerminalError> {
        NativePty::spawn(command, cols, lines).map(|pty| Box::new(pty) as Box<dyn Subprocess>)
    }
}

/// Child process on a native PTY.
pub struct NativePty {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    output: Receiver<Vec<u8>>,
    closed: bool,
}

impl NativePty {
    pub fn spawn(command: &ShellCommand, cols: u16, lines: u16) -> Result<Self, TerminalError> {
        let spawn_err = |source: Box<dyn std::error::Error + Send + Sync>| TerminalError::Spawn {
            program: command.program.clone(),
            source,
        };

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: lines,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| spawn_err(e.into()))?;

        let mut cmd = CommandBuilder::new(&command.program);
        for arg in &command.args {
            cmd.arg(arg);
        }
        cmd.env("TERM", "xterm-256color");

        let child = pair.slave.spawn_command(cmd).map_err(|e| spawn_err(e.into()))?;
        // Drop the slave side so the reader sees EOF when the child exits.
        drop(pair.slave);

        let reader = pair.master.try_clone_reader().map_err(|e| spawn_err(e.into()))?;
        let writer = pair.master.take_writer().map_err(|e| spawn_err(e.into()))?;

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("pty-reader".to_owned())
            .spawn(move || read_loop(reader, &tx))
            .map_err(TerminalError::Io)?;

        log::info!(
            "spawned {} (pid {:?}) on {cols}x{lines} pty",
            command.program,
            child.process_id()
        );

        Ok(Self {
            master: pair.master,
            writer,
            child,
            output: rx,
            closed: false,
        })
    }
}

impl Drop for NativePty {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            if let Err(e) = self.child.kill() {
                log::debug!("kill on drop failed: {e}");
            }
        }
    }
}

fn read_loop(mut reader: Box<dyn Read + Send>, tx: &mpsc::Sender<Vec<u8>>) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                log::debug!("pty reader stopped: {e}");
                break;
            }
        }
    }
}

impl Subprocess for NativePty {
    fn read_available(&mut self, out: &mut Vec<u8>) -> bool {
        if self.closed {
            return false;
        }
        loop {
            match self.output.try_recv() {
                Ok(chunk) => out.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    return false;
                }
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.writer.write(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn resize(&mut self, cols: u16, lines: u16) -> io::Result<()> {
        self.master
            .resize(PtySize {
                rows: lines,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(io::Error::other)
    }

    fn try_wait(&mut self) -> io::Result<Option<u32>> {
        Ok(self.child.try_wait()?.map(|status| status.exit_code()))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }

    fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }
}
