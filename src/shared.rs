//! Shared Graph Handle
//!
//! A [`Graph`] behind a single reader/writer lock so several threads can edit
//! and stream the same patch. Structural edits and sample iterations take the
//! write lock; lookups take the read lock. Units step while the write lock is
//! held and must never call back into the handle.

use crate::component::Component;
use crate::graph::{into_io_error, CableId, ComponentId, Graph, GraphError, PortAddress};
use crate::port::Direction;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::io;
use std::sync::Arc;

/// Cloneable, thread-safe handle to one graph
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<RwLock<Graph>>,
}

impl SharedGraph {
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Shared access for arbitrary queries
    pub fn read(&self) -> RwLockReadGuard<'_, Graph> {
        self.inner.read()
    }

    /// Exclusive access for batches of edits applied atomically
    pub fn write(&self) -> RwLockWriteGuard<'_, Graph> {
        self.inner.write()
    }

    pub fn add_component(&self, component: Box<dyn Component>) -> ComponentId {
        self.inner.write().add_component(component)
    }

    pub fn add<C: Component + 'static>(&self, component: C) -> ComponentId {
        self.add_component(Box::new(component))
    }

    pub fn delete_component(&self, id: ComponentId) -> Result<(), GraphError> {
        self.inner.write().delete_component(id)
    }

    pub fn resolve_port(
        &self,
        id: ComponentId,
        name: &str,
        direction: Direction,
    ) -> Result<PortAddress, GraphError> {
        self.inner.read().resolve_port(id, name, direction)
    }

    /// Resolution and insertion happen under one write lock
    pub fn add_cable(
        &self,
        source: ComponentId,
        source_port: &str,
        destination: ComponentId,
        destination_port: &str,
    ) -> Result<CableId, GraphError> {
        self.inner
            .write()
            .add_cable(source, source_port, destination, destination_port)
    }

    pub fn delete_cable(&self, id: CableId) -> Result<(), GraphError> {
        self.inner.write().delete_cable(id)
    }

    pub fn set_output(&self, id: ComponentId, port: &str) -> Result<(), GraphError> {
        self.inner.write().set_output(id, port)
    }

    pub fn set_sampling_frequency(&self, hz: u32) {
        self.inner.write().set_sampling_frequency(hz);
    }

    pub fn iterate(&self) -> Result<(), GraphError> {
        self.inner.write().iterate()
    }

    /// Stream frames into `buf`; see [`Graph::read_frames`]
    pub fn read_frames(&self, buf: &mut [u8]) -> Result<usize, GraphError> {
        self.inner.write().read_frames(buf)
    }

    /// Take the graph back once every other handle is gone
    pub fn try_unwrap(self) -> Result<Graph, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<Graph> for SharedGraph {
    fn from(graph: Graph) -> Self {
        Self::new(graph)
    }
}

impl io::Read for SharedGraph {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_frames(buf).map_err(into_io_error)
    }
}
