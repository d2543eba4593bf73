use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use tracing::{debug, trace};

use crate::error::Error;
use crate::model::SaveFormat;

/// Truncate `path` and write every entry as `key=value`.
///
/// Nothing is escaped. A value containing `\n` splits into extra lines that
/// reload as separate entries, and keys or values with surrounding
/// whitespace, `=` in the key or a leading `#` do not survive a reload
/// unchanged either.
///
/// Stops at the first failed write.
pub fn write_entries(
    path: &Path,
    entries: &BTreeMap<String, String>,
    format: SaveFormat,
) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for (key, value) in entries {
        out.write_all(key.as_bytes())?;
        out.write_all(b"=")?;
        out.write_all(value.as_bytes())?;
        if format == SaveFormat::LineSeparated {
            out.write_all(b"\n")?;
        }
    }
    out.flush()
}

/// Pending result of a queued save.
///
/// Dropping the handle discards the outcome; the save still runs.
#[derive(Debug)]
#[must_use = "call `wait` for the result or `discard` to drop it explicitly"]
pub struct SaveHandle {
    rx: Receiver<Result<(), Error>>,
}

impl SaveHandle {
    pub(crate) fn ready(result: Result<(), Error>) -> Self {
        let (tx, rx) = flume::bounded(1);
        // The receiver is alive and the slot is free, so this cannot fail.
        let _ = tx.send(result);
        Self { rx }
    }

    /// Block until the save finished and return its result.
    pub fn wait(self) -> Result<(), Error> {
        self.rx.recv().map_err(|_| Error::PersisterStopped)?
    }

    /// Give up on the result. Failures are only visible as `debug` logs.
    pub fn discard(self) {}
}

#[derive(Debug)]
struct SaveJob {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    format: SaveFormat,
    reply: Sender<Result<(), Error>>,
}

/// Single worker thread that writes queued snapshots in submission order.
///
/// Dropping it closes the queue and waits for pending saves.
#[derive(Debug)]
pub(crate) struct Persister {
    jobs: Option<Sender<SaveJob>>,
    worker: Option<JoinHandle<()>>,
}

impl Persister {
    pub(crate) fn spawn() -> std::io::Result<Self> {
        let (jobs, queue) = flume::unbounded::<SaveJob>();
        let worker = thread::Builder::new()
            .name("envkeep-persist".to_owned())
            .spawn(move || run_worker(queue))?;
        debug!("started persistence worker");

        Ok(Self {
            jobs: Some(jobs),
            worker: Some(worker),
        })
    }

    pub(crate) fn submit(
        &self,
        path: PathBuf,
        entries: BTreeMap<String, String>,
        format: SaveFormat,
    ) -> SaveHandle {
        let (reply, rx) = flume::bounded(1);
        let job = SaveJob {
            path,
            entries,
            format,
            reply,
        };

        // A failed send drops the reply sender, so `wait` reports `PersisterStopped`.
        let sent = self.jobs.as_ref().map(|jobs| jobs.send(job).is_ok());
        if sent != Some(true) {
            debug!("persistence worker is gone, save dropped");
        }
        SaveHandle { rx }
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            debug!("persistence worker panicked");
        }
    }
}

fn run_worker(queue: Receiver<SaveJob>) {
    for job in queue.iter() {
        let result = write_entries(&job.path, &job.entries, job.format).map_err(Error::from);
        trace!(
            path = %job.path.display(),
            entries = job.entries.len(),
            ok = result.is_ok(),
            "save finished"
        );

        if let Err(flume::SendError(Err(err))) = job.reply.send(result) {
            debug!(path = %job.path.display(), error = %err, "unobserved background save failed");
        }
    }
}
