use crate::index::RecordIndex;
use crate::store::{OpenError, RepairError, StoreEngine, StoreSession};
use log::{debug, error};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Requests handled by the store worker, in order
#[derive(Debug)]
pub(crate) enum Command {
    Open { generation: u64, path: PathBuf },
    Repair { generation: u64, path: PathBuf },
    Close,
}

/// Completed store operation, tagged with the generation it was requested under
#[derive(Debug)]
pub enum Outcome {
    Opened {
        generation: u64,
        path: PathBuf,
        result: Result<RecordIndex, OpenError>,
        elapsed: Duration,
    },
    Repaired {
        generation: u64,
        path: PathBuf,
        result: Result<(), RepairError>,
    },
}

impl Outcome {
    pub fn generation(&self) -> u64 {
        match self {
            Outcome::Opened { generation, .. } | Outcome::Repaired { generation, .. } => *generation,
        }
    }
}

/// Background thread that owns the [`StoreSession`].
///
/// Engine handles need not be `Send`, so the session is built on the worker
/// thread and never leaves it. Commands go in over one channel, outcomes come
/// back over another.
pub struct StoreWorker {
    commands: Option<Sender<Command>>,
    outcomes: Receiver<Outcome>,
    thread: Option<JoinHandle<()>>,
}

impl StoreWorker {
    pub fn spawn<E>(engine: E) -> io::Result<Self>
    where
        E: StoreEngine + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel::<Command>();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("store-worker".to_string())
            .spawn(move || {
                let mut session = StoreSession::new(engine);
                for command in command_rx {
                    let outcome = match command {
                        Command::Open { generation, path } => {
                            let start = Instant::now();
                            let result = session.open(&path);
                            Outcome::Opened {
                                generation,
                                path,
                                result,
                                elapsed: start.elapsed(),
                            }
                        }
                        Command::Repair { generation, path } => {
                            let result = session.repair(&path);
                            Outcome::Repaired {
                                generation,
                                path,
                                result,
                            }
                        }
                        Command::Close => {
                            session.close();
                            continue;
                        }
                    };

                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
                debug!("store worker exiting");
            })?;

        Ok(Self {
            commands: Some(command_tx),
            outcomes: outcome_rx,
            thread: Some(thread),
        })
    }

    /// Queue a command. Returns false if the worker is gone.
    pub(crate) fn send(&self, command: Command) -> bool {
        match &self.commands {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        }
    }

    pub fn try_recv(&self) -> Result<Outcome, TryRecvError> {
        self.outcomes.try_recv()
    }
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop, which drops the session
        self.commands.take();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("store worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryEngine, MemoryStore};

    fn recv(worker: &StoreWorker) -> Outcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match worker.try_recv() {
                Ok(outcome) => return outcome,
                Err(TryRecvError::Empty) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(2))
                }
                Err(e) => panic!("no outcome: {:?}", e),
            }
        }
    }

    #[test]
    fn test_worker_opens_in_background() {
        let engine = MemoryEngine::new();
        engine.insert("/db", MemoryStore::with_records([("a", "1"), ("b", "2")]));
        let worker = StoreWorker::spawn(engine).unwrap();

        assert!(worker.send(Command::Open {
            generation: 7,
            path: PathBuf::from("/db"),
        }));

        match recv(&worker) {
            Outcome::Opened { generation, result, .. } => {
                assert_eq!(generation, 7);
                assert_eq!(result.unwrap().len(), 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_worker_processes_commands_in_order() {
        let engine = MemoryEngine::new();
        engine.insert("/db", MemoryStore::with_records([("k", "v")]));
        let worker = StoreWorker::spawn(engine).unwrap();

        worker.send(Command::Repair {
            generation: 1,
            path: PathBuf::from("/db"),
        });
        worker.send(Command::Close);
        worker.send(Command::Open {
            generation: 2,
            path: PathBuf::from("/missing"),
        });

        assert_eq!(recv(&worker).generation(), 1);
        match recv(&worker) {
            Outcome::Opened { generation: 2, result, .. } => {
                assert!(matches!(result, Err(OpenError::NotFound { .. })));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
