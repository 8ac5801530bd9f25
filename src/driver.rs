//! Ephemeris driver
//!
//! [`EphemerisDriver`] walks the time samples of a request in order. Within a
//! step every body is computed in parallel into its own 17-field slot of a
//! buffer owned by that step, so workers never share mutable state.
//!
//! The driver moves through three states: `Idle` before the first step,
//! `Running` while steps remain, and `Done` once the last step has been
//! produced, after which [`EphemerisDriver::next_step`] returns `None`.

use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::bodies::BodySource;
use crate::engine::{compute_record, OrbitalSource, PositionSource, TabulatedSource};
use crate::errors::{EphemError, Result};
use crate::jplephem::names::indices;
use crate::jplephem::EphemerisFile;
use crate::output::{OutputRecord, N_FIELDS};
use crate::settings::{EphemerisMode, EphemerisRequest};

/// Where the driver is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No step computed yet
    Idle,
    /// `completed` of `total` steps done
    Running { completed: usize, total: usize },
    /// Every step has been produced
    Done,
}

/// A recoverable failure for one body at one step
#[derive(Debug)]
pub struct BodyError {
    /// Position of the body in the request
    pub body_index: usize,
    /// Name of the body
    pub body: String,
    /// What went wrong
    pub error: EphemError,
}

/// Records of every body at one time sample
#[derive(Debug)]
pub struct StepResult {
    /// Sample number, from 0
    pub index: usize,
    /// Julian date (TT) of the sample
    pub jd: f64,
    /// One record per body, in request order; failed bodies hold NaN
    pub records: Vec<OutputRecord>,
    /// Per-body failures of this step
    pub errors: Vec<BodyError>,
}

/// Receives steps in time order
pub trait EphemerisSink {
    /// Consume one step
    fn write_step(&mut self, step: StepResult) -> Result<()>;

    /// Called once after the last step
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps every step in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub steps: Vec<StepResult>,
}

impl EphemerisSink for CollectingSink {
    fn write_step(&mut self, step: StepResult) -> Result<()> {
        self.steps.push(step);
        Ok(())
    }
}

/// Totals of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Steps written
    pub steps: usize,
    /// Records written
    pub records: usize,
    /// Records replaced by NaN sentinels
    pub failed_samples: usize,
}

/// Batch ephemeris computation over a request
pub struct EphemerisDriver {
    request: EphemerisRequest,
    ephemeris: Option<EphemerisFile>,
    pool: Option<ThreadPool>,
    total_steps: usize,
    next_index: usize,
}

impl EphemerisDriver {
    /// Prepare a run, loading the ephemeris file in tabulated mode
    pub fn new(request: EphemerisRequest) -> Result<Self> {
        let ephemeris = match request.mode {
            EphemerisMode::Tabulated => {
                Some(EphemerisFile::load(&request.settings.ephemeris_path)?)
            }
            EphemerisMode::OrbitalElements => None,
        };
        Self::build(request, ephemeris)
    }

    /// Prepare a tabulated run over an already loaded ephemeris
    pub fn with_ephemeris(request: EphemerisRequest, ephemeris: EphemerisFile) -> Result<Self> {
        if request.mode != EphemerisMode::Tabulated {
            return Err(EphemError::InvalidSettings(
                "an ephemeris file was supplied for an orbital-elements run".to_string(),
            ));
        }
        Self::build(request, Some(ephemeris))
    }

    fn build(request: EphemerisRequest, ephemeris: Option<EphemerisFile>) -> Result<Self> {
        request.settings.validate()?;

        if let Some(file) = &ephemeris {
            check_tables(&request, file)?;
        }

        let pool = match request.settings.threads {
            Some(threads) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| EphemError::InvalidSettings(format!("thread pool: {}", e)))?,
            ),
            None => None,
        };

        let total_steps = request.settings.step_count();
        debug!(
            "Driver ready: {} steps x {} bodies",
            total_steps,
            request.bodies.len()
        );

        Ok(Self {
            request,
            ephemeris,
            pool,
            total_steps,
            next_index: 0,
        })
    }

    /// The request being run
    pub fn request(&self) -> &EphemerisRequest {
        &self.request
    }

    /// The loaded ephemeris, in tabulated mode
    pub fn ephemeris(&self) -> Option<&EphemerisFile> {
        self.ephemeris.as_ref()
    }

    /// Number of time samples in the run
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn state(&self) -> DriverState {
        if self.next_index == 0 {
            DriverState::Idle
        } else if self.next_index >= self.total_steps {
            DriverState::Done
        } else {
            DriverState::Running {
                completed: self.next_index,
                total: self.total_steps,
            }
        }
    }

    /// Compute the next time step
    ///
    /// Returns `Ok(None)` once every step has been produced. Out-of-range
    /// samples and Kepler failures are reported in the step; any other error
    /// aborts the run.
    pub fn next_step(&mut self) -> Result<Option<StepResult>> {
        if self.next_index >= self.total_steps {
            return Ok(None);
        }

        let index = self.next_index;
        let jd = self.request.settings.sample_jd(index);
        let step = match &self.pool {
            Some(pool) => pool.install(|| self.compute_step(index, jd)),
            None => self.compute_step(index, jd),
        }?;

        self.next_index += 1;
        Ok(Some(step))
    }

    fn compute_step(&self, index: usize, jd: f64) -> Result<StepResult> {
        let tabulated;
        let source: &dyn PositionSource = match &self.ephemeris {
            Some(file) => {
                tabulated = TabulatedSource::new(file);
                &tabulated
            }
            None => &OrbitalSource,
        };

        let bodies = &self.request.bodies;
        let request = &self.request;
        let mut buffer = vec![0.0; bodies.len() * N_FIELDS];

        let failures: Vec<(usize, EphemError)> = buffer
            .par_chunks_mut(N_FIELDS)
            .zip(bodies.par_iter())
            .enumerate()
            .filter_map(|(i, (slot, body))| match compute_record(source, body, jd, request) {
                Ok(record) => {
                    slot.copy_from_slice(record.fields());
                    None
                }
                Err(error) => {
                    slot.fill(f64::NAN);
                    Some((i, error))
                }
            })
            .collect();

        let mut errors = Vec::with_capacity(failures.len());
        for (body_index, error) in failures {
            if error.is_fatal() {
                return Err(error);
            }
            warn!(
                "{} at JD {}: {}",
                bodies[body_index].name, jd, error
            );
            errors.push(BodyError {
                body_index,
                body: bodies[body_index].name.clone(),
                error,
            });
        }

        let records = buffer
            .chunks_exact(N_FIELDS)
            .map(OutputRecord::from_slice)
            .collect();

        debug!("Step {}/{} at JD {} done", index + 1, self.total_steps, jd);
        Ok(StepResult {
            index,
            jd,
            records,
            errors,
        })
    }

    /// Drive every remaining step into a sink
    pub fn run<S: EphemerisSink + ?Sized>(&mut self, sink: &mut S) -> Result<RunSummary> {
        info!(
            "Computing {} bodies over {} steps (JD {} to {}, step {})",
            self.request.bodies.len(),
            self.total_steps,
            self.request.settings.jd_min,
            self.request.settings.jd_max,
            self.request.settings.jd_step
        );

        let mut summary = RunSummary::default();
        while let Some(step) = self.next_step()? {
            summary.steps += 1;
            summary.records += step.records.len();
            summary.failed_samples += step.errors.len();
            sink.write_step(step)?;
        }
        sink.finish()?;

        info!(
            "Wrote {} records over {} steps ({} failed samples)",
            summary.records, summary.steps, summary.failed_samples
        );
        Ok(summary)
    }
}

/// Make sure the file holds every table a tabulated run will read
fn check_tables(request: &EphemerisRequest, file: &EphemerisFile) -> Result<()> {
    let mut needed = vec![
        indices::EARTH_MOON_BARYCENTER,
        indices::MOON,
        indices::SUN,
    ];
    for body in &request.bodies {
        match body.source {
            BodySource::Tabulated(index) => needed.push(index),
            _ => {
                return Err(EphemError::UnknownBody(format!(
                    "{} cannot be computed from the ephemeris file",
                    body.name
                )))
            }
        }
    }

    match needed.into_iter().find(|&index| !file.has_body(index)) {
        Some(missing) => Err(EphemError::UnknownBody(format!(
            "{} (table index {}) is not in the ephemeris file",
            crate::jplephem::names::table_name(missing).unwrap_or("unnamed body"),
            missing
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn orbital_settings() -> Settings {
        Settings {
            jd_min: 2_451_545.0,
            jd_max: 2_451_555.0,
            jd_step: 1.0,
            use_orbital_elements: 1,
            objects: "mercury venus mars jupiter".to_string(),
            output_format: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_state_machine() {
        let request = EphemerisRequest::from_settings(orbital_settings()).unwrap();
        let mut driver = EphemerisDriver::new(request).unwrap();
        assert_eq!(driver.total_steps(), 10);
        assert_eq!(driver.state(), DriverState::Idle);

        let first = driver.next_step().unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.jd, 2_451_545.0);
        assert_eq!(first.records.len(), 4);
        assert_eq!(
            driver.state(),
            DriverState::Running {
                completed: 1,
                total: 10
            }
        );

        let mut last_jd = first.jd;
        while let Some(step) = driver.next_step().unwrap() {
            assert!(step.jd > last_jd);
            last_jd = step.jd;
        }
        assert_eq!(last_jd, 2_451_554.0);
        assert_eq!(driver.state(), DriverState::Done);
        assert!(driver.next_step().unwrap().is_none());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let request = EphemerisRequest::from_settings(orbital_settings()).unwrap();
        let mut parallel = EphemerisDriver::new(request.clone()).unwrap();

        let mut settings = orbital_settings();
        settings.threads = Some(1);
        let mut single = EphemerisDriver::new(EphemerisRequest::from_settings(settings).unwrap()).unwrap();

        let mut a = CollectingSink::default();
        let mut b = CollectingSink::default();
        parallel.run(&mut a).unwrap();
        single.run(&mut b).unwrap();

        assert_eq!(a.steps.len(), b.steps.len());
        for (x, y) in a.steps.iter().zip(&b.steps) {
            assert_eq!(x.records, y.records);
        }

        // Records stay in request order
        let direct = compute_record(
            &OrbitalSource,
            &request.bodies[2],
            a.steps[3].jd,
            &request,
        )
        .unwrap();
        assert_eq!(a.steps[3].records[2], direct);
    }

    #[test]
    fn test_run_summary() {
        let request = EphemerisRequest::from_settings(orbital_settings()).unwrap();
        let mut driver = EphemerisDriver::new(request).unwrap();
        let summary = driver.run(&mut CollectingSink::default()).unwrap();
        assert_eq!(
            summary,
            RunSummary {
                steps: 10,
                records: 40,
                failed_samples: 0
            }
        );
    }

    #[test]
    fn test_missing_ephemeris_file_is_fatal() {
        let settings = Settings {
            ephemeris_path: "/nonexistent/DE430.bin".into(),
            ..Default::default()
        };
        let request = EphemerisRequest::from_settings(settings).unwrap();
        let err = EphemerisDriver::new(request).err().unwrap();
        assert!(matches!(err, EphemError::FileError { .. }));
        assert!(err.is_fatal());
    }
}
