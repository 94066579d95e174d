//! Asynchronous readback of cascade 0's displacement into a CPU-side snapshot.
//!
//! [`ReadbackQueue::request`] copies the field on the calling thread, so the
//! snapshot reflects the field at request time. The background thread only
//! validates the copy and sends the completion back; completions are applied
//! when polled. The query buffer is only ever swapped wholesale, so readers
//! never observe a partially written snapshot.

use glam::Vec3;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, RwLock};
use std::thread;
use tracing::{debug, warn};

use crate::error::{OceanError, ReadbackError};
use crate::grid::Grid;

/// Immutable copy of a displacement field with its world-space tile size
#[derive(Debug, Clone)]
pub struct DisplacementSnapshot {
    id: u64,
    length_scale: f32,
    field: Grid<Vec3>,
}

impl DisplacementSnapshot {
    /// Placeholder used before the first readback lands (flat water)
    pub fn flat(length_scale: f32) -> Self {
        Self {
            id: 0,
            length_scale,
            field: Grid::new(1, Vec3::ZERO),
        }
    }

    /// Request id that produced this snapshot, `0` for the placeholder
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn length_scale(&self) -> f32 {
        self.length_scale
    }

    pub fn field(&self) -> &Grid<Vec3> {
        &self.field
    }

    /// Bilinear sample with repeat addressing at world `(x, z)`
    ///
    /// `uv = (x, z) / length_scale`; texel centres sit at `(i + 0.5) / size`.
    pub fn sample(&self, x: f32, z: f32) -> Vec3 {
        if self.length_scale.is_nan() || self.length_scale <= 0.0 {
            return Vec3::ZERO;
        }
        let size = self.field.size() as f32;
        let u = x / self.length_scale * size - 0.5;
        let v = z / self.length_scale * size - 0.5;
        if !(u.is_finite() && v.is_finite()) {
            return Vec3::ZERO;
        }

        let x0 = u.floor();
        let y0 = v.floor();
        let fx = u - x0;
        let fy = v - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self
            .field
            .get_wrapped(x0, y0)
            .lerp(self.field.get_wrapped(x0 + 1, y0), fx);
        let bottom = self
            .field
            .get_wrapped(x0, y0 + 1)
            .lerp(self.field.get_wrapped(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }

    /// Height at `point` after undoing the horizontal displacement
    ///
    /// Three fixed samples: `d0 = D(p)`, `d1 = D(p - d0)`, `d2 = D(p - d1)`.
    pub fn water_height(&self, point: Vec3) -> f32 {
        let d0 = self.sample(point.x, point.z);
        let d1 = self.sample(point.x - d0.x, point.z - d0.z);
        let d2 = self.sample(point.x - d1.x, point.z - d1.z);
        d2.y
    }
}

/// Cloneable read handle onto the most recently applied snapshot
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    latest: Arc<RwLock<Arc<DisplacementSnapshot>>>,
}

impl SnapshotReader {
    fn new(initial: DisplacementSnapshot) -> Self {
        Self {
            latest: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Current snapshot; stays valid even after a newer one is applied
    pub fn snapshot(&self) -> Arc<DisplacementSnapshot> {
        let guard = self.latest.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    pub fn displacement_at(&self, point: Vec3) -> Vec3 {
        self.snapshot().sample(point.x, point.z)
    }

    pub fn water_height(&self, point: Vec3) -> f32 {
        self.snapshot().water_height(point)
    }

    fn replace(&self, snapshot: DisplacementSnapshot) {
        let mut guard = self.latest.write().unwrap_or_else(|p| p.into_inner());
        *guard = Arc::new(snapshot);
    }
}

/// Copy request handed to the worker
struct ReadbackRequest {
    id: u64,
    size: usize,
    length_scale: f32,
    texels: Vec<Vec3>,
}

/// Result of one readback, as delivered back to the owner
#[derive(Debug, Clone)]
pub struct ReadbackCompletion {
    pub id: u64,
    pub result: Result<DisplacementSnapshot, ReadbackError>,
}

impl ReadbackCompletion {
    pub fn failed(id: u64, error: ReadbackError) -> Self {
        Self {
            id,
            result: Err(error),
        }
    }
}

/// Issue-order readback queue with last-issued-wins application
pub struct ReadbackQueue {
    requests: Option<Sender<ReadbackRequest>>,
    completions: Receiver<ReadbackCompletion>,
    worker: Option<thread::JoinHandle<()>>,
    reader: SnapshotReader,
    next_id: u64,
    in_flight: usize,
    last_applied: u64,
}

impl ReadbackQueue {
    /// Start the worker thread; queries return flat water until the first copy lands
    pub fn new(length_scale: f32) -> Result<Self, OceanError> {
        let (request_tx, request_rx) = mpsc::channel();
        let (completion_tx, completion_rx) = mpsc::channel();
        let worker = spawn_readback_thread(request_rx, completion_tx)?;

        Ok(Self {
            requests: Some(request_tx),
            completions: completion_rx,
            worker: Some(worker),
            reader: SnapshotReader::new(DisplacementSnapshot::flat(length_scale)),
            next_id: 1,
            in_flight: 0,
            last_applied: 0,
        })
    }

    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Id of the snapshot currently served to readers
    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    /// Copy `field` and queue it for validation; returns the request id
    ///
    /// The copy happens here. Only validation and completion are deferred.
    pub fn request(&mut self, field: &Grid<Vec3>, length_scale: f32) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let request = ReadbackRequest {
            id,
            size: field.size(),
            length_scale,
            texels: field.as_slice().to_vec(),
        };
        let sent = self
            .requests
            .as_ref()
            .map(|tx| tx.send(request).is_ok())
            .unwrap_or(false);
        if sent {
            self.in_flight += 1;
        } else {
            warn!(id, error = %ReadbackError::Disconnected, "readback request dropped");
        }
        id
    }

    /// Apply every completion that has arrived so far; returns how many were applied
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if self.complete(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until every in-flight request has completed, then apply them
    pub fn flush(&mut self) {
        while self.in_flight > 0 {
            match self.completions.recv() {
                Ok(completion) => {
                    self.in_flight -= 1;
                    self.complete(completion);
                }
                Err(_) => {
                    warn!(
                        in_flight = self.in_flight,
                        error = %ReadbackError::Disconnected,
                        "abandoning pending readbacks"
                    );
                    self.in_flight = 0;
                }
            }
        }
    }

    /// Apply one completion
    ///
    /// Errors are logged and dropped. Completions older than the applied
    /// snapshot are ignored, so the last-issued copy always wins.
    pub fn complete(&mut self, completion: ReadbackCompletion) -> bool {
        match completion.result {
            Ok(snapshot) if completion.id > self.last_applied => {
                self.last_applied = completion.id;
                self.reader.replace(snapshot);
                true
            }
            Ok(_) => {
                debug!(
                    id = completion.id,
                    last_applied = self.last_applied,
                    "stale readback ignored"
                );
                false
            }
            Err(error) => {
                warn!(id = completion.id, %error, "readback failed, keeping previous snapshot");
                false
            }
        }
    }
}

impl Drop for ReadbackQueue {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn spawn_readback_thread(
    requests: Receiver<ReadbackRequest>,
    completions: Sender<ReadbackCompletion>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("ocean-readback".into())
        .spawn(move || {
            for request in requests {
                let id = request.id;
                let completion = ReadbackCompletion {
                    id,
                    result: validate(request),
                };
                if completions.send(completion).is_err() {
                    break;
                }
            }
        })
}

fn validate(request: ReadbackRequest) -> Result<DisplacementSnapshot, ReadbackError> {
    let expected = request.size * request.size;
    let actual = request.texels.len();
    if request.texels.iter().any(|t| !t.is_finite()) {
        return Err(ReadbackError::NonFinite { id: request.id });
    }
    let field = Grid::from_vec(request.size, request.texels).ok_or(ReadbackError::SizeMismatch {
        id: request.id,
        expected,
        actual,
    })?;
    Ok(DisplacementSnapshot {
        id: request.id,
        length_scale: request.length_scale,
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(size: usize) -> Grid<Vec3> {
        Grid::from_fn(size, |x, y| Vec3::new(0.0, (x + y * size) as f32, 0.0))
    }

    fn snapshot(field: Grid<Vec3>, length_scale: f32) -> DisplacementSnapshot {
        DisplacementSnapshot {
            id: 1,
            length_scale,
            field,
        }
    }

    #[test]
    fn test_sample_hits_texel_centres() {
        let snap = snapshot(ramp(4), 4.0);
        // Texel (1, 2) centre sits at world (1.5, 2.5)
        assert_eq!(snap.sample(1.5, 2.5).y, 9.0);
        // Halfway between texels (1, 0) and (2, 0)
        assert!((snap.sample(2.0, 0.5).y - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_sample_wraps() {
        let snap = snapshot(ramp(4), 4.0);
        let a = snap.sample(1.5, 2.5);
        let b = snap.sample(1.5 + 4.0, 2.5 - 8.0);
        assert!((a - b).length() < 1e-5);
    }

    #[test]
    fn test_water_height_on_flat_snapshot() {
        let snap = DisplacementSnapshot::flat(100.0);
        assert_eq!(snap.water_height(Vec3::new(12.0, 5.0, -3.0)), 0.0);
    }

    #[test]
    fn test_water_height_uses_corrected_position() {
        // Uniform horizontal shift with height varying along x
        let size = 8;
        let field = Grid::from_fn(size, |x, _| Vec3::new(1.0, x as f32, 0.0));
        let snap = snapshot(field, 8.0);
        let p = Vec3::new(4.5, 0.0, 0.5);
        // d0 = D(4.5), d1 = D(3.5), d2 = D(3.5): height of texel 3
        assert_eq!(snap.water_height(p), 3.0);
    }

    #[test]
    fn test_request_then_flush_applies_snapshot() {
        let mut queue = ReadbackQueue::new(4.0).unwrap();
        let reader = queue.reader();
        assert_eq!(reader.snapshot().id(), 0);

        let id = queue.request(&ramp(4), 4.0);
        queue.flush();
        assert_eq!(queue.in_flight(), 0);
        assert_eq!(reader.snapshot().id(), id);
        assert_eq!(reader.displacement_at(Vec3::new(1.5, 0.0, 2.5)).y, 9.0);
    }

    #[test]
    fn test_request_captures_field_at_issue_time() {
        let mut queue = ReadbackQueue::new(4.0).unwrap();
        let mut field = ramp(4);
        let id = queue.request(&field, 4.0);

        // Later edits to the source field do not leak into the queued copy
        field.set(1, 2, Vec3::new(0.0, -100.0, 0.0));
        queue.flush();

        let snap = queue.reader().snapshot();
        assert_eq!(snap.id(), id);
        assert_eq!(snap.field(), &ramp(4));
    }

    #[test]
    fn test_last_issued_wins() {
        let mut queue = ReadbackQueue::new(4.0).unwrap();
        let first = queue.request(&ramp(4), 4.0);
        let second = queue.request(&Grid::new(4, Vec3::ONE), 4.0);
        queue.flush();
        assert!(second > first);
        assert_eq!(queue.last_applied(), second);

        // A late completion for an older id must not roll the snapshot back
        let stale = ReadbackCompletion {
            id: first,
            result: Ok(snapshot(ramp(4), 4.0)),
        };
        assert!(!queue.complete(stale));
        assert_eq!(queue.reader().snapshot().id(), second);
    }

    #[test]
    fn test_error_completion_keeps_previous_snapshot() {
        let mut queue = ReadbackQueue::new(4.0).unwrap();
        let id = queue.request(&ramp(4), 4.0);
        queue.flush();

        let applied = queue.complete(ReadbackCompletion::failed(
            id + 1,
            ReadbackError::NonFinite { id: id + 1 },
        ));
        assert!(!applied);
        assert_eq!(queue.reader().snapshot().id(), id);
    }

    #[test]
    fn test_non_finite_copy_is_rejected() {
        let mut queue = ReadbackQueue::new(4.0).unwrap();
        let mut field = ramp(4);
        field.set(2, 2, Vec3::new(f32::NAN, 0.0, 0.0));
        queue.request(&field, 4.0);
        queue.flush();
        assert_eq!(queue.last_applied(), 0);
    }

    #[test]
    fn test_size_mismatch_detected() {
        let request = ReadbackRequest {
            id: 9,
            size: 4,
            length_scale: 1.0,
            texels: vec![Vec3::ZERO; 15],
        };
        assert_eq!(
            validate(request).unwrap_err(),
            ReadbackError::SizeMismatch {
                id: 9,
                expected: 16,
                actual: 15
            }
        );
    }
}
