// In-memory DeviceSource for coordinator and entity tests.
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use crate::error::CoreError;
use crate::model::{HubMode, HubState, MeasureStatus, ProbeMeasure};
use crate::source::{DeviceSource, Discovery};

pub(crate) fn probe_measure() -> ProbeMeasure {
    ProbeMeasure {
        chlorine: Some(0.31),
        ph: Some(7.01),
        temperature: Some(24.5),
        date_time: Utc.with_ymd_and_hms(2024, 7, 1, 9, 30, 0).unwrap(),
        red_ox: Some(474.0),
        ph_status: Some(MeasureStatus::Medium),
        chlorine_status: Some(MeasureStatus::TooLow),
        battery: Some(75.0),
    }
}

#[derive(Default)]
pub(crate) struct MockSource {
    discovery: Mutex<Discovery>,
    discovery_error: Mutex<Option<CoreError>>,
    discover_delay: Mutex<Duration>,
    hub_read_delay: Mutex<Duration>,
    probes: Mutex<HashMap<String, ProbeMeasure>>,
    probe_errors: Mutex<HashMap<String, CoreError>>,
    hubs: Mutex<HashMap<String, HubState>>,
    write_error: Mutex<Option<CoreError>>,
    /// When set, writes leave the hub untouched and report this instead.
    write_override: Mutex<Option<HubState>>,
    pub discover_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
    pub hub_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
}

impl MockSource {
    pub(crate) fn new(probes: &[&str], hubs: &[&str]) -> Self {
        let source = Self::default();
        *source.discovery.lock().unwrap() = Discovery {
            probes: probes.iter().map(ToString::to_string).collect(),
            hubs: hubs.iter().map(ToString::to_string).collect(),
        };
        for id in probes {
            source
                .probes
                .lock()
                .unwrap()
                .insert((*id).to_owned(), probe_measure());
        }
        for id in hubs {
            source.hubs.lock().unwrap().insert(
                (*id).to_owned(),
                HubState {
                    state: false,
                    mode: HubMode::Auto,
                },
            );
        }
        source
    }

    pub(crate) fn fail_discovery(&self, err: Option<CoreError>) {
        *self.discovery_error.lock().unwrap() = err;
    }

    pub(crate) fn fail_probe(&self, id: &str, err: CoreError) {
        self.probe_errors.lock().unwrap().insert(id.to_owned(), err);
    }

    pub(crate) fn fail_writes(&self, err: Option<CoreError>) {
        *self.write_error.lock().unwrap() = err;
    }

    pub(crate) fn override_writes(&self, reported: Option<HubState>) {
        *self.write_override.lock().unwrap() = reported;
    }

    pub(crate) fn set_discover_delay(&self, delay: Duration) {
        *self.discover_delay.lock().unwrap() = delay;
    }

    /// Hub reads sample the state immediately, then take `delay` to return.
    pub(crate) fn set_hub_read_delay(&self, delay: Duration) {
        *self.hub_read_delay.lock().unwrap() = delay;
    }

    /// Change a Hub upstream without going through the coordinator.
    pub(crate) fn set_hub(&self, id: &str, state: HubState) {
        self.hubs.lock().unwrap().insert(id.to_owned(), state);
    }

    pub(crate) fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn write(&self, id: &str, apply: impl FnOnce(&mut HubState)) -> Result<HubState, CoreError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.write_error.lock().unwrap().clone() {
            return Err(err);
        }
        if let Some(reported) = *self.write_override.lock().unwrap() {
            return Ok(reported);
        }
        let mut hubs = self.hubs.lock().unwrap();
        let hub = hubs.get_mut(id).ok_or_else(|| CoreError::Api {
            message: format!("unknown hub {id}"),
            status: Some(404),
        })?;
        apply(hub);
        Ok(*hub)
    }
}

impl DeviceSource for MockSource {
    async fn discover(&self) -> Result<Discovery, CoreError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.discover_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failure = self.discovery_error.lock().unwrap().clone();
        match failure {
            Some(err) => Err(err),
            None => Ok(self.discovery.lock().unwrap().clone()),
        }
    }

    async fn fetch_probe(&self, id: &str) -> Result<ProbeMeasure, CoreError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.probe_errors.lock().unwrap().get(id).cloned() {
            return Err(err);
        }
        self.probes
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::Api {
                message: format!("unknown probe {id}"),
                status: Some(404),
            })
    }

    async fn fetch_hub(&self, id: &str) -> Result<HubState, CoreError> {
        self.hub_calls.fetch_add(1, Ordering::SeqCst);
        let read = self.hubs.lock().unwrap().get(id).copied();
        let delay = *self.hub_read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        read.ok_or_else(|| CoreError::Api {
            message: format!("unknown hub {id}"),
            status: Some(404),
        })
    }

    async fn set_hub_state(&self, id: &str, on: bool) -> Result<HubState, CoreError> {
        self.write(id, |hub| {
            hub.state = on;
            hub.mode = HubMode::Manual;
        })
    }

    async fn set_hub_mode(&self, id: &str, mode: HubMode) -> Result<HubState, CoreError> {
        self.write(id, |hub| hub.mode = mode)
    }
}
