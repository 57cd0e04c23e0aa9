use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use rust_decimal::Decimal;
use tracing::{info, warn};

use ordermgmt_core::{CustomerId, Money, OrderId, ProductId};
use ordermgmt_infra::{AppConfig, OrderLine, ProductStore, System, assemble};
use ordermgmt_observability::LogFormat;
use ordermgmt_orders::OrderStatus;
use ordermgmt_products::Product;

fn main() -> anyhow::Result<()> {
    let format = std::env::var("ORDERMGMT_LOG_FORMAT").unwrap_or_default();
    ordermgmt_observability::init_with(LogFormat::from_name(&format));

    let config = AppConfig::from_env().context("loading configuration")?;
    let system = assemble(&config).context("assembling order system")?;

    let result = run(&system, config.auto_ship);
    system.shutdown();
    result
}

fn run(system: &System, auto_ship: bool) -> anyhow::Result<()> {
    let catalog = seed_catalog(system)?;
    for product in system.store.find_available(1)? {
        info!(
            product = product.name(),
            price = %product.price(),
            stock = product.stock_quantity(),
            "catalog entry"
        );
    }

    let customer = CustomerId::new();
    let coordinator = &system.coordinator;

    // Happy path: create, confirm, pay, ship, deliver.
    let order = coordinator.create_order(
        customer,
        &[OrderLine::new(catalog[0], 2), OrderLine::new(catalog[1], 1)],
    )?;
    let order_id = order.order_id().context("created order has no identity")?;
    info!(order_id = %order_id, total = %order.total_amount(), "order placed");

    coordinator.confirm_order(order_id)?;
    match coordinator.process_payment(order_id) {
        Ok(_) => {
            let shipped = if auto_ship {
                wait_until_shipped(system, order_id, Duration::from_secs(5))?
            } else {
                match coordinator.ship_order(order_id) {
                    Ok(_) => true,
                    Err(err) => {
                        warn!(order_id = %order_id, error = %err, "shipment failed");
                        false
                    }
                }
            };
            if shipped {
                let delivered = coordinator.deliver_order(order_id)?;
                info!(
                    order_id = %order_id,
                    tracking_reference = delivered.tracking_reference().unwrap_or_default(),
                    "order delivered"
                );
            }
        }
        Err(err) => {
            warn!(order_id = %order_id, error = %err, "payment failed, cancelling");
            coordinator.cancel_order(order_id)?;
        }
    }

    // More than the ledger holds is refused up front.
    if let Err(err) = coordinator.create_order(customer, &[OrderLine::new(catalog[2], 1_000)]) {
        info!(error = %err, "oversized order rejected");
    }

    for order in coordinator.find_orders_by_customer(customer)? {
        info!(
            order_id = ?order.order_id(),
            status = %order.status(),
            total = %order.total_amount(),
            "customer order"
        );
    }
    for product in system.store.list_products()? {
        info!(product = product.name(), stock = product.stock_quantity(), "final stock");
    }
    for parked in system.manual_interventions.list() {
        warn!(
            order_id = %parked.order_id,
            attempts = parked.attempts,
            last_error = %parked.last_error,
            "order awaiting manual intervention"
        );
    }

    Ok(())
}

fn seed_catalog(system: &System) -> anyhow::Result<Vec<ProductId>> {
    let entries = [
        ("Mechanical keyboard", "Tenkeyless, brown switches", 8999, 25),
        ("USB-C cable", "2 m, braided", 1250, 200),
        ("Monitor arm", "Single arm, gas spring", 4500, 10),
    ];

    entries
        .into_iter()
        .map(|(name, description, cents, stock)| -> anyhow::Result<ProductId> {
            let price = Money::euro(Decimal::new(cents, 2))?;
            let product = Product::new(ProductId::new(), name, description, price, stock)?;
            Ok(system.store.save_product(product)?.id_typed())
        })
        .collect()
}

/// Wait for the auto-ship subscriber. `false` if the order was parked for
/// manual intervention or the timeout passed.
fn wait_until_shipped(
    system: &System,
    order_id: OrderId,
    timeout: Duration,
) -> anyhow::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let status = system.coordinator.find_order(order_id)?.status();
        if status == OrderStatus::Shipped {
            return Ok(true);
        }
        let parked = system
            .manual_interventions
            .list()
            .iter()
            .any(|entry| entry.order_id == order_id);
        if parked || Instant::now() >= deadline {
            warn!(order_id = %order_id, status = %status, parked, "order was not shipped");
            return Ok(false);
        }
        thread::sleep(Duration::from_millis(20));
    }
}
