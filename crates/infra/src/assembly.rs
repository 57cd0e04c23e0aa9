//! Wires store, capabilities, bus, coordinator and subscribers together.

use std::sync::Arc;

use tracing::info;

use ordermgmt_events::{EventEnvelope, InMemoryEventBus};
use ordermgmt_orders::OrderEvent;

use crate::auto_ship::{AutoShipOnPaid, ManualInterventionQueue};
use crate::capabilities::{ScriptedPayment, ScriptedShipping};
use crate::config::{AppConfig, PaymentMode};
use crate::coordinator::OrderCoordinator;
use crate::dispatcher::{DispatchError, EventDispatcher};
use crate::store::InMemoryStore;

pub type OrderBus = Arc<InMemoryEventBus<EventEnvelope<OrderEvent>>>;
pub type AppCoordinator = OrderCoordinator<Arc<InMemoryStore>, OrderBus>;

/// A fully wired, in-process order system.
#[derive(Debug)]
pub struct System {
    pub store: Arc<InMemoryStore>,
    pub coordinator: Arc<AppCoordinator>,
    pub dispatcher: EventDispatcher<OrderBus>,
    pub manual_interventions: ManualInterventionQueue,
    pub payment: Arc<ScriptedPayment>,
    pub shipping: Arc<ScriptedShipping>,
}

impl System {
    /// Stop the subscriber workers.
    pub fn shutdown(self) {
        self.dispatcher.shutdown();
    }
}

pub fn payment_for(config: &AppConfig) -> ScriptedPayment {
    match config.payment_mode {
        PaymentMode::Approve => ScriptedPayment::approve_all(),
        PaymentMode::Decline => ScriptedPayment::decline_all(),
    }
}

pub fn shipping_for(config: &AppConfig) -> ScriptedShipping {
    if config.shipping_always_fail {
        ScriptedShipping::always_failing()
    } else {
        ScriptedShipping::failing_first(config.shipping_fail_first)
    }
}

/// Build the whole system from configuration.
pub fn assemble(config: &AppConfig) -> Result<System, DispatchError> {
    let store = Arc::new(InMemoryStore::new());
    let bus: OrderBus = Arc::new(InMemoryEventBus::new());
    let payment = Arc::new(payment_for(config));
    let shipping = Arc::new(shipping_for(config));

    let coordinator = Arc::new(
        OrderCoordinator::new(store.clone(), payment.clone(), shipping.clone(), bus.clone())
            .with_config(config.coordinator_config()),
    );

    let manual_interventions = ManualInterventionQueue::new();
    let mut dispatcher = EventDispatcher::new(bus);
    if config.auto_ship {
        dispatcher.subscribe::<EventEnvelope<OrderEvent>, _>(AutoShipOnPaid::new(
            coordinator.clone(),
            config.retry_policy(),
            manual_interventions.clone(),
        ))?;
    }

    info!(
        payment_mode = ?config.payment_mode,
        auto_ship = config.auto_ship,
        subscribers = dispatcher.subscribers().len(),
        "order system assembled"
    );

    Ok(System {
        store,
        coordinator,
        dispatcher,
        manual_interventions,
        payment,
        shipping,
    })
}
