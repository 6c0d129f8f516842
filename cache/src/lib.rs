use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use log::debug;
use visit::DestinationId;

mod pressure;

pub use pressure::{MemoryPressureMonitor, MemoryPressureThresholds};

/// Coarse memory pressure signal.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum MemoryPressure {
    #[default]
    Low,
    Moderate,
    Severe,
}

struct ScreenshotEntry {
    destination: DestinationId,
    bytes: Vec<u8>,
}

/// In-memory screenshot store keyed by destination.
///
/// A screenshot bridges the gap while a restored page re-renders; losing one
/// degrades UX gracefully, so every failure path here swallows rather than
/// propagates. Entries evict oldest-first when the byte budget is exceeded.
pub struct ScreenshotStore {
    entries: RefCell<VecDeque<ScreenshotEntry>>,
    used: Cell<usize>,
    budget: Cell<usize>,
    base_budget: usize,
}

impl ScreenshotStore {
    pub const DEFAULT_BUDGET_BYTES: usize = 32 * 1024 * 1024;

    pub fn new(budget_bytes: usize) -> Self {
        Self {
            entries: RefCell::new(VecDeque::new()),
            used: Cell::new(0),
            budget: Cell::new(budget_bytes),
            base_budget: budget_bytes,
        }
    }

    /// Stores a screenshot for a destination, replacing any previous one.
    /// Oversized screenshots are dropped silently.
    pub fn put(&self, destination: DestinationId, bytes: Vec<u8>) {
        self.remove(destination);
        if bytes.len() > self.budget.get() {
            debug!(
                "dropping {} byte screenshot for destination {destination}: over budget",
                bytes.len()
            );
            return;
        }
        self.evict_to_fit(bytes.len());
        self.used.set(self.used.get() + bytes.len());
        self.entries.borrow_mut().push_back(ScreenshotEntry {
            destination,
            bytes,
        });
    }

    /// Removes and returns the screenshot for a destination, if present.
    pub fn take(&self, destination: DestinationId) -> Option<Vec<u8>> {
        let mut entries = self.entries.borrow_mut();
        let index = entries
            .iter()
            .position(|entry| entry.destination == destination)?;
        let entry = entries.remove(index)?;
        self.used.set(self.used.get() - entry.bytes.len());
        Some(entry.bytes)
    }

    pub fn remove(&self, destination: DestinationId) {
        let mut entries = self.entries.borrow_mut();
        if let Some(index) = entries
            .iter()
            .position(|entry| entry.destination == destination)
        {
            if let Some(entry) = entries.remove(index) {
                self.used.set(self.used.get() - entry.bytes.len());
            }
        }
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
        self.used.set(0);
    }

    pub fn used_bytes(&self) -> usize {
        self.used.get()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Applies a memory pressure signal: moderate pressure halves the byte
    /// budget, severe pressure clears the store outright. Low pressure
    /// restores the base budget but never resurrects evicted entries.
    pub fn trim(&self, pressure: MemoryPressure) {
        match pressure {
            MemoryPressure::Low => self.budget.set(self.base_budget),
            MemoryPressure::Moderate => {
                self.budget.set(self.base_budget / 2);
                self.evict_to_fit(0);
            }
            MemoryPressure::Severe => {
                debug!("severe memory pressure: clearing {} screenshots", self.len());
                self.clear();
            }
        }
    }

    fn evict_to_fit(&self, incoming: usize) {
        let mut entries = self.entries.borrow_mut();
        while self.used.get() + incoming > self.budget.get() {
            let Some(entry) = entries.pop_front() else {
                break;
            };
            debug!(
                "evicting {} byte screenshot for destination {}",
                entry.bytes.len(),
                entry.destination
            );
            self.used.set(self.used.get() - entry.bytes.len());
        }
    }
}

impl Default for ScreenshotStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUDGET_BYTES)
    }
}
