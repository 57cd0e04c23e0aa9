//! Infrastructure layer: stores, capabilities, coordination, dispatch, config.

pub mod assembly;
pub mod auto_ship;
pub mod capabilities;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod retry;
pub mod store;


pub use assembly::{AppCoordinator, OrderBus, System, assemble};
pub use auto_ship::{AutoShipOnPaid, ManualIntervention, ManualInterventionQueue};
pub use capabilities::{
    PaymentGateway, ScriptedPayment, ScriptedShipping, ShippingError, ShippingGateway,
};
pub use config::{AppConfig, ConfigError, PaymentMode};
pub use coordinator::{
    CoordinatorConfig, CoordinatorError, ErrorKind, OrderCoordinator, OrderLine, OrderShipper,
};
pub use dispatcher::{DispatchError, EventDispatcher, SubscriberWorker, WorkerHandle};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use store::{
    ChangeSet, Committed, InMemoryStore, OrderStore, ProductStore, Store, StoreError, UnitOfWork,
};
