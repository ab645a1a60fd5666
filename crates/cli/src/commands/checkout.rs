//! Checkout and the last-order record.

use quitanda_store::Command;
use quitanda_store::config::StoreConfig;
use quitanda_store::order::{Order, PaymentMethod};

use super::{CommandError, Store};

pub async fn place(name: String, method: &str, installments: u32) -> Result<(), CommandError> {
    let payment_method = parse_method(method, installments)?;

    let store = Store::connect().await?;
    let snapshot = store
        .handle
        .execute(Command::Checkout {
            customer_name: name,
            payment_method,
        })
        .await?;
    if let Some(error) = snapshot.error {
        return Err(error.into());
    }

    match store.config.order_store().load()? {
        Some(order) => print_order(&order),
        None => println!("order placed"),
    }
    Ok(())
}

pub async fn last() -> Result<(), CommandError> {
    let config = StoreConfig::from_env()?;
    match config.order_store().load()? {
        Some(order) => print_order(&order),
        None => println!("no order placed yet"),
    }
    Ok(())
}

fn parse_method(method: &str, installments: u32) -> Result<PaymentMethod, CommandError> {
    match method {
        "pix" => Ok(PaymentMethod::Pix),
        "debit" => Ok(PaymentMethod::Debit),
        "credit" => Ok(PaymentMethod::Credit { installments }),
        other => Err(format!("unknown payment method: {other} (use pix, debit or credit)").into()),
    }
}

fn print_order(order: &Order) {
    println!(
        "order placed by {} at {} ({})",
        order.customer_name,
        order.placed_at.format("%Y-%m-%d %H:%M UTC"),
        order.payment_method
    );
    for item in &order.items {
        println!(
            "{:>6}  {:>4} x {:>10}  =  {:>10}  {}",
            item.id,
            item.qty,
            item.price.to_string(),
            item.line_total().to_string(),
            item.title
        );
    }
    println!("total: {}", order.total);
}
