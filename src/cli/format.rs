//! Text rendering for command output.
//!
//! Pure functions only, so every line the CLI prints can be tested without a workbook.

use crate::core::{ContactSummary, PaymentOutcome};
use crate::records::{Contact, DebtKind, DebtRecord, Product, Purchase, Sale};

/// Formats a rupiah amount with dot thousands separators, rounded to whole rupiah.
///
/// Creates text like `Rp 1.250.000` or `-Rp 15.000`.
#[must_use]
pub fn format_rupiah(amount: f64) -> String {
    #[allow(clippy::cast_possible_truncation)] // ledger amounts are far below i64::MAX
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if whole < 0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// Formats a quantity without a trailing `.0` for whole numbers.
#[must_use]
pub fn format_quantity(quantity: f64) -> String {
    if quantity.fract().abs() < f64::EPSILON {
        format!("{quantity:.0}")
    } else {
        format!("{quantity}")
    }
}

/// Generates a bar showing how much of a debt is paid, like `[██████░░░░] 60.0%`.
#[must_use]
pub fn format_paid_bar(paid: f64, total: f64, bar_length: usize) -> String {
    let percent = if total.abs() < f64::EPSILON {
        100.0
    } else {
        (paid / total * 100.0).clamp(0.0, 100.0)
    };

    // percent is clamped to [0, 100]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let filled = ((percent / 100.0) * bar_length as f64).round() as usize;
    let empty = bar_length.saturating_sub(filled);
    format!("[{}{}] {percent:.1}%", "█".repeat(filled), "░".repeat(empty))
}

/// One line per contact.
#[must_use]
pub fn contact_line(contact: &Contact) -> String {
    let mut line = format!("{} | {} | {}", contact.id, contact.name, contact.contact_type);
    if !contact.phone.is_empty() {
        line.push_str(" | ");
        line.push_str(&contact.phone);
    }
    line
}

/// One line per product.
#[must_use]
pub fn product_line(product: &Product) -> String {
    format!(
        "{} | {} | cost {} | price {} | stock {} {}",
        product.id,
        product.name,
        format_rupiah(product.cost),
        format_rupiah(product.price),
        format_quantity(product.stock),
        product.unit
    )
}

/// One line per sale.
#[must_use]
pub fn sale_line(sale: &Sale) -> String {
    let buyer = if sale.customer_name.is_empty() {
        "walk-in"
    } else {
        sale.customer_name.as_str()
    };
    format!(
        "{} | {} | {} x{} @ {} = {} | {buyer}",
        sale.id,
        sale.date,
        sale.product_name,
        format_quantity(sale.quantity),
        format_rupiah(sale.unit_price),
        format_rupiah(sale.total)
    )
}

/// One line per purchase.
#[must_use]
pub fn purchase_line(purchase: &Purchase) -> String {
    format!(
        "{} | {} | {} x{} @ {} = {} | {}",
        purchase.id,
        purchase.date,
        purchase.product_name,
        format_quantity(purchase.quantity),
        format_rupiah(purchase.unit_cost),
        format_rupiah(purchase.total),
        purchase.supplier_name
    )
}

/// One line per ledger entry.
#[must_use]
pub fn debt_line(record: &DebtRecord) -> String {
    let what = match (record.kind, record.product_name.as_deref()) {
        (DebtKind::Product, Some(name)) => {
            format!("{} x{name}", format_quantity(record.quantity))
        }
        _ => record.description.clone(),
    };
    format!(
        "{} | {} | {} | {what} | {} left {} | {}",
        record.id,
        record.contact_name,
        record.entry,
        format_rupiah(record.remaining_amount),
        format_paid_bar(record.paid_amount, record.total_amount, 10),
        record.status
    )
}

/// Multi-line balance card for one contact.
#[must_use]
pub fn summary_block(summary: &ContactSummary) -> String {
    let mut lines = vec![format!(
        "{} ({}, {}) {}",
        summary.contact_name,
        summary.contact_id,
        summary.contact_type,
        summary.status()
    )];
    lines.push(format!(
        "  debt {} of {} (paid {})",
        format_rupiah(summary.total_debt),
        format_rupiah(summary.total_original),
        format_rupiah(summary.total_paid)
    ));
    if summary.titip_uang > 0.0 || summary.titip_barang > 0.0 {
        lines.push(format!(
            "  titip uang {} | titip barang {}",
            format_rupiah(summary.titip_uang),
            format_rupiah(summary.titip_barang)
        ));
    }
    if summary.cash_out > 0.0 {
        lines.push(format!("  cashed out {}", format_rupiah(summary.cash_out)));
    }
    lines.push(format!(
        "  net {} | {} entries, {} settled",
        format_rupiah(summary.net_balance),
        summary.debt_count,
        summary.completed_count
    ));
    if let Some(paid_at) = &summary.last_payment_date {
        lines.push(format!("  last payment {paid_at}"));
    }
    lines.join("\n")
}

/// What a payment did, for the `pay` and `settle` commands.
#[must_use]
pub fn payment_report(outcome: &PaymentOutcome) -> String {
    let mut lines = vec![format!(
        "Applied {} to {} entr{}",
        format_rupiah(outcome.applied),
        outcome.updated.len(),
        if outcome.updated.len() == 1 { "y" } else { "ies" }
    )];
    lines.extend(outcome.updated.iter().map(|record| format!("  {}", debt_line(record))));
    for created in &outcome.created {
        lines.push(format!("  new {}", debt_line(created)));
    }
    if outcome.leftover > 0.0 {
        lines.push(format!("Leftover {}", format_rupiah(outcome.leftover)));
    }
    lines.join("\n")
}
