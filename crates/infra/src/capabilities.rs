//! Payment and shipping capabilities consumed by the coordinator.
//!
//! Both are opaque pass/fail boundaries. The scripted implementations are
//! deterministic and are selected by configuration at assembly time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;

use ordermgmt_core::Money;
use ordermgmt_orders::Order;

/// Charges a customer.
pub trait PaymentGateway: Send + Sync {
    /// `true` if the charge went through.
    fn charge(&self, amount: Money) -> bool;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShippingError {
    #[error("shipping provider unavailable: {0}")]
    Unavailable(String),
}

/// Books a shipment and hands back its tracking reference.
pub trait ShippingGateway: Send + Sync {
    fn create_shipment(&self, order: &Order) -> Result<String, ShippingError>;
}

impl<P> PaymentGateway for Arc<P>
where
    P: PaymentGateway + ?Sized,
{
    fn charge(&self, amount: Money) -> bool {
        (**self).charge(amount)
    }
}

impl<S> ShippingGateway for Arc<S>
where
    S: ShippingGateway + ?Sized,
{
    fn create_shipment(&self, order: &Order) -> Result<String, ShippingError> {
        (**self).create_shipment(order)
    }
}

/// Payment gateway that plays back a script of outcomes, then a fallback.
#[derive(Debug)]
pub struct ScriptedPayment {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
    charges: Mutex<Vec<Money>>,
}

impl ScriptedPayment {
    pub fn scripted(outcomes: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            fallback,
            charges: Mutex::new(Vec::new()),
        }
    }

    pub fn approve_all() -> Self {
        Self::scripted([], true)
    }

    pub fn decline_all() -> Self {
        Self::scripted([], false)
    }

    /// Every amount charged so far, approved or not.
    pub fn charges(&self) -> Vec<Money> {
        self.charges
            .lock()
            .map(|charges| charges.clone())
            .unwrap_or_default()
    }
}

impl PaymentGateway for ScriptedPayment {
    fn charge(&self, amount: Money) -> bool {
        if let Ok(mut charges) = self.charges.lock() {
            charges.push(amount);
        }

        let approved = match self.script.lock() {
            Ok(mut script) => script.pop_front().unwrap_or(self.fallback),
            Err(_) => false,
        };
        debug!(amount = %amount, approved, "payment charged");
        approved
    }
}

/// Shipping gateway issuing sequential `TRACK-00000001` style references.
#[derive(Debug, Default)]
pub struct ScriptedShipping {
    issued: AtomicU64,
    calls: AtomicU32,
    fail_first: u32,
    always_fail: bool,
}

impl ScriptedShipping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` calls, then succeed.
    pub fn failing_first(n: u32) -> Self {
        Self {
            fail_first: n,
            ..Self::default()
        }
    }

    pub fn always_failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// Number of `create_shipment` calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ShippingGateway for ScriptedShipping {
    fn create_shipment(&self, order: &Order) -> Result<String, ShippingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.always_fail || call <= self.fail_first {
            debug!(call, "shipment rejected");
            return Err(ShippingError::Unavailable(format!(
                "carrier rejected shipment (call {call})"
            )));
        }

        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let reference = format!("TRACK-{n:08}");
        debug!(order_id = ?order.order_id(), tracking_reference = %reference, "shipment created");
        Ok(reference)
    }
}
