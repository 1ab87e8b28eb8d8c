mod lifecycle;
pub mod memory;
pub mod service;

pub use lifecycle::{Adapter, AdapterPhase};
pub use memory::{MemoryService, TreatmentRequest};
pub use service::{
    ConnectionSettings, EvaluationService, ServiceClient, ServiceConnector, ServiceEvent,
    ServiceEventCallback, ServiceEventKind, ServiceManager,
};
