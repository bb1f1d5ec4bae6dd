//! Compile Worker
//!
//! Runs the platform-compile half of a shader request. Code generation and
//! everything that touches the caches stay on the owning thread; a job only
//! carries one candidate's generated source and defines, and a result only
//! carries bytes or errors. Falling back to the next candidate is decided by
//! the owning thread once the result comes back.
//!
//! - [`CompileWorker::Inline`]: jobs queue up and run on the owning thread
//!   the first time results are collected.
//! - [`CompileWorker::Background`]: a dedicated thread fed through `flume`
//!   channels.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use super::platform::{PlatformCompiler, ProgramOutput, StageProfiles, compile_program};
use crate::errors::{Result, ShaderError};
use crate::renderer::settings::CompileMode;
use crate::resources::ShaderDefines;

/// The platform-compile input of one candidate.
#[derive(Debug, Clone)]
pub struct StageJob {
    pub source: Arc<str>,
    pub defines: ShaderDefines,
    /// The persistent cache already holds a program for this exact source.
    pub persistent_hit: bool,
}

/// Where the winning candidate's program comes from.
#[derive(Debug, Clone)]
pub enum ProgramSource {
    Persistent,
    Fresh(ProgramOutput),
}

#[derive(Debug)]
pub struct CompileJob {
    pub ticket: u64,
    pub stage: StageJob,
}

#[derive(Debug)]
pub struct JobResult {
    pub ticket: u64,
    pub outcome: std::result::Result<ProgramSource, Vec<String>>,
}

fn execute(job: CompileJob, compiler: &dyn PlatformCompiler, profiles: &StageProfiles) -> JobResult {
    let stage = &job.stage;
    let outcome = if stage.persistent_hit {
        Ok(ProgramSource::Persistent)
    } else {
        compile_program(compiler, &stage.source, &stage.defines, profiles).map(ProgramSource::Fresh)
    };
    JobResult {
        ticket: job.ticket,
        outcome,
    }
}

pub enum CompileWorker {
    Inline {
        compiler: Arc<dyn PlatformCompiler>,
        profiles: StageProfiles,
        queue: VecDeque<CompileJob>,
    },
    Background {
        jobs: Option<flume::Sender<CompileJob>>,
        results: flume::Receiver<JobResult>,
        thread: Option<JoinHandle<()>>,
    },
}

impl CompileWorker {
    pub fn new(
        mode: CompileMode,
        compiler: Arc<dyn PlatformCompiler>,
        profiles: StageProfiles,
    ) -> Result<Self> {
        match mode {
            CompileMode::Inline => Ok(Self::Inline {
                compiler,
                profiles,
                queue: VecDeque::new(),
            }),
            CompileMode::Background => {
                let (job_tx, job_rx) = flume::unbounded::<CompileJob>();
                let (result_tx, result_rx) = flume::unbounded::<JobResult>();

                let thread = std::thread::Builder::new()
                    .name("shader-compile".to_string())
                    .spawn(move || {
                        while let Ok(job) = job_rx.recv() {
                            let result = execute(job, compiler.as_ref(), &profiles);
                            if result_tx.send(result).is_err() {
                                break;
                            }
                        }
                        log::debug!("Shader compile worker exiting");
                    })?;

                Ok(Self::Background {
                    jobs: Some(job_tx),
                    results: result_rx,
                    thread: Some(thread),
                })
            }
        }
    }

    pub fn submit(&mut self, job: CompileJob) -> Result<()> {
        match self {
            Self::Inline { queue, .. } => {
                queue.push_back(job);
                Ok(())
            }
            Self::Background { jobs, .. } => jobs
                .as_ref()
                .ok_or(ShaderError::WorkerDisconnected)?
                .send(job)
                .map_err(|_| ShaderError::WorkerDisconnected),
        }
    }

    /// Results available without blocking. Inline workers run their whole
    /// queue here.
    pub fn drain(&mut self) -> Result<Vec<JobResult>> {
        match self {
            Self::Inline {
                compiler,
                profiles,
                queue,
            } => Ok(queue
                .drain(..)
                .map(|job| execute(job, compiler.as_ref(), profiles))
                .collect()),
            Self::Background { results, .. } => {
                let mut ready = Vec::new();
                loop {
                    match results.try_recv() {
                        Ok(result) => ready.push(result),
                        Err(flume::TryRecvError::Empty) => return Ok(ready),
                        Err(flume::TryRecvError::Disconnected) => {
                            return Err(ShaderError::WorkerDisconnected);
                        }
                    }
                }
            }
        }
    }

    /// Blocks for the next result. `None` when an inline queue is empty.
    pub fn wait_next(&mut self) -> Result<Option<JobResult>> {
        match self {
            Self::Inline {
                compiler,
                profiles,
                queue,
            } => Ok(queue
                .pop_front()
                .map(|job| execute(job, compiler.as_ref(), profiles))),
            Self::Background { results, .. } => results
                .recv()
                .map(Some)
                .map_err(|_| ShaderError::WorkerDisconnected),
        }
    }

    #[must_use]
    pub fn mode(&self) -> CompileMode {
        match self {
            Self::Inline { .. } => CompileMode::Inline,
            Self::Background { .. } => CompileMode::Background,
        }
    }
}

impl Drop for CompileWorker {
    fn drop(&mut self) {
        if let Self::Background { jobs, thread, .. } = self {
            // Closing the job channel ends the worker loop
            jobs.take();
            if let Some(handle) = thread.take()
                && handle.join().is_err()
            {
                log::error!("Shader compile worker panicked");
            }
        }
    }
}
