use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::SignalTiming;
use crate::control_system::traffic_light::{TrafficLight, TrafficLightPhase};
use crate::error::JunctionResult;
use crate::shared_data::{IntersectionId, StreetId, VehicleId};
use crate::simulation_engine::waiting_vehicles::{EntryPermit, WaitingVehicles};

/// What a vehicle went through to get into the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryReport {
    pub vehicle: VehicleId,
    /// Time spent in the admission queue.
    pub queue_wait: Duration,
    /// Time spent waiting for green after being granted.
    pub green_wait: Duration,
    /// Whether the light was red at the moment of the grant.
    pub entered_on_red: bool,
}

/// State touched by the admission thread.
struct AdmissionState {
    name: String,
    poll_interval: Duration,
    /// True while a granted vehicle has not yet left.
    is_blocked: AtomicBool,
    waiting_vehicles: WaitingVehicles,
    stop: AtomicBool,
}

/// A junction that lets one vehicle through at a time, in arrival order,
/// and only on green.
pub struct Intersection {
    id: IntersectionId,
    admission: Arc<AdmissionState>,
    streets: Mutex<Vec<StreetId>>,
    traffic_light: TrafficLight,
    started: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Intersection {
    /// Creates an idle intersection whose light starts red.
    pub fn new(id: IntersectionId, timing: SignalTiming) -> JunctionResult<Self> {
        Self::with_phase(id, TrafficLightPhase::Red, timing)
    }

    pub fn with_phase(
        id: IntersectionId,
        phase: TrafficLightPhase,
        timing: SignalTiming,
    ) -> JunctionResult<Self> {
        let name = id.to_string();
        let traffic_light = TrafficLight::with_phase(name.clone(), phase, timing)?;
        Ok(Self {
            id,
            admission: Arc::new(AdmissionState {
                name: name.clone(),
                poll_interval: timing.poll_interval(),
                is_blocked: AtomicBool::new(false),
                waiting_vehicles: WaitingVehicles::new(),
                stop: AtomicBool::new(false),
            }),
            streets: Mutex::new(Vec::new()),
            traffic_light,
            started: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> IntersectionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.admission.name
    }

    pub fn traffic_light(&self) -> &TrafficLight {
        &self.traffic_light
    }

    /// Connects a street to this intersection.
    pub fn add_street(&self, street: StreetId) {
        lock(&self.streets).push(street);
    }

    pub fn streets(&self) -> Vec<StreetId> {
        lock(&self.streets).clone()
    }

    /// Every connected street except `incoming`, in connection order.
    pub fn query_streets(&self, incoming: StreetId) -> Vec<StreetId> {
        lock(&self.streets)
            .iter()
            .copied()
            .filter(|street| *street != incoming)
            .collect()
    }

    /// Queues the vehicle without blocking. Once the permit resolves the
    /// vehicle holds the intersection and must call
    /// [`Intersection::vehicle_has_left`]; the light is not checked.
    pub fn request_entry(&self, vehicle: VehicleId) -> EntryPermit {
        log::debug!(
            "{}: {} queued on thread {:?}",
            self.name(),
            vehicle,
            thread::current().id()
        );
        self.admission.waiting_vehicles.push_back(vehicle)
    }

    /// Queues the vehicle and blocks until it may cross: first until the
    /// admission loop grants it, then, if the light is red, until green.
    ///
    /// There is no timeout. The only error is [`crate::error::JunctionError::Closed`]
    /// when the intersection is shut down while the vehicle waits. Inside an
    /// async runtime, call it from `spawn_blocking`; it parks the thread.
    pub fn add_vehicle_to_queue(&self, vehicle: VehicleId) -> JunctionResult<EntryReport> {
        let queued_at = Instant::now();
        self.request_entry(vehicle).wait()?;
        let queue_wait = queued_at.elapsed();
        log::info!("{}: {} is granted entry", self.name(), vehicle);

        let granted_at = Instant::now();
        let entered_on_red = !self.traffic_light_is_green();
        if entered_on_red {
            if let Err(e) = self.traffic_light.wait_for_green() {
                // Granted but never crossed; free the intersection again.
                self.admission.is_blocked.store(false, Ordering::Release);
                return Err(e);
            }
            log::debug!("{}: {} released by green", self.name(), vehicle);
        }

        Ok(EntryReport {
            vehicle,
            queue_wait,
            green_wait: if entered_on_red {
                granted_at.elapsed()
            } else {
                Duration::ZERO
            },
            entered_on_red,
        })
    }

    /// Marks the intersection free so the next queued vehicle can be granted.
    ///
    /// # Panics
    ///
    /// Panics if no vehicle currently occupies the intersection.
    pub fn vehicle_has_left(&self, vehicle: VehicleId) {
        let was_blocked = self.admission.is_blocked.swap(false, Ordering::AcqRel);
        assert!(
            was_blocked,
            "{}: {} left but no vehicle was in the intersection",
            self.name(),
            vehicle
        );
        log::debug!("{}: {} has left", self.name(), vehicle);
    }

    pub fn traffic_light_is_green(&self) -> bool {
        self.traffic_light.current_phase().is_green()
    }

    /// Number of vehicles waiting to be granted.
    pub fn queue_len(&self) -> usize {
        self.admission.waiting_vehicles.size()
    }

    pub fn is_blocked(&self) -> bool {
        self.admission.is_blocked.load(Ordering::Acquire)
    }

    /// Starts the traffic light cycle and the admission loop. Later calls do
    /// nothing.
    pub fn simulate(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            log::warn!("{}: already simulating", self.name());
            return;
        }
        self.traffic_light.simulate();

        let admission = Arc::clone(&self.admission);
        let spawned = thread::Builder::new()
            .name(format!("{} admission", admission.name))
            .spawn(move || process_vehicle_queue(admission));
        match spawned {
            Ok(handle) => lock(&self.workers).push(handle),
            Err(e) => log::error!("{}: failed to start admission loop: {}", self.name(), e),
        }
        log::info!("{}: simulation started", self.name());
    }

    /// Stops the admission loop and the light, wakes every blocked vehicle
    /// with `Closed` and joins the background threads. Safe to call more than
    /// once.
    pub fn shutdown(&self) {
        self.admission.stop.store(true, Ordering::Release);
        let dropped = self.admission.waiting_vehicles.close();
        if dropped > 0 {
            log::warn!(
                "{}: shutting down with {} vehicle(s) still queued",
                self.name(),
                dropped
            );
        }
        self.traffic_light.shutdown();

        let workers: Vec<_> = lock(&self.workers).drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                log::warn!("{}: admission thread panicked", self.name());
            }
        }
    }
}

impl Drop for Intersection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn process_vehicle_queue(admission: Arc<AdmissionState>) {
    while !admission.stop.load(Ordering::Acquire) {
        thread::sleep(admission.poll_interval);

        if admission.waiting_vehicles.size() > 0 && !admission.is_blocked.load(Ordering::Acquire)
        {
            admission.is_blocked.store(true, Ordering::Release);
            match admission.waiting_vehicles.try_permit_first() {
                Some(outcome) if outcome.delivered => {}
                Some(outcome) => {
                    log::warn!(
                        "{}: {} stopped waiting before its grant",
                        admission.name,
                        outcome.vehicle
                    );
                    admission.is_blocked.store(false, Ordering::Release);
                }
                // Closed underneath us.
                None => admission.is_blocked.store(false, Ordering::Release),
            }
        }
    }
}
