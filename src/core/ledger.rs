//! Debt ledger reconciliation.
//!
//! Every mutation is planned here first, as a pure function of the current ledger, and only
//! then written. A plan is a [`LedgerChanges`]: rows to overwrite, rows to append and payment
//! log entries. Nothing in this module performs I/O, so a plan either exists in full or the
//! operation fails before anything reaches the sheet.

use super::summary;
use super::time::{format_wib, record_id};
use crate::errors::{Error, Result};
use crate::records::{
    AMOUNT_EPSILON, Contact, ContactType, DebtKind, DebtRecord, DebtStatus, EntryKind,
    PaymentKind, PaymentRecord, Product, SheetRecord, Stored, cells,
};
use crate::sheets::SheetBatch;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Process-wide counter that keeps ids minted in the same millisecond apart.
static ID_SEQUENCE: AtomicUsize = AtomicUsize::new(1);

/// Mints ids and timestamps for one operation from a single instant.
#[derive(Debug, Clone, Copy)]
pub struct Stamp {
    now: DateTime<Utc>,
}

impl Stamp {
    /// Stamp for a fixed instant
    #[must_use]
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Stamp for the current instant
    #[must_use]
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Next unique id with `prefix`.
    pub fn next_id(&self, prefix: &str) -> String {
        let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        record_id(prefix, self.now, seq)
    }

    /// WIB timestamp text for cells
    #[must_use]
    pub fn timestamp(&self) -> String {
        format_wib(self.now)
    }
}

/// What a new debt is for.
#[derive(Debug, Clone, PartialEq)]
pub enum DebtItem {
    /// Nominal amount
    Money {
        /// Debt amount
        amount: f64,
    },
    /// Goods taken on credit
    Product {
        /// Product taken
        product_id: String,
        /// Units taken
        quantity: f64,
        /// Total debt amount, supplied by the caller
        amount: f64,
    },
}

impl DebtItem {
    /// Total amount owed for the item
    #[must_use]
    pub const fn amount(&self) -> f64 {
        match self {
            Self::Money { amount } | Self::Product { amount, .. } => *amount,
        }
    }
}

/// What a payment is made with.
#[derive(Debug, Clone, PartialEq)]
pub enum Tender {
    /// Rupiah
    Money {
        /// Amount paid
        amount: f64,
    },
    /// Goods handed over against product debts of the same product
    Goods {
        /// Product handed over
        product_id: String,
        /// Units handed over
        quantity: f64,
    },
}

/// Complete set of row writes produced by one ledger operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerChanges {
    /// Existing Debts rows, already mutated, with their sheet row numbers
    pub updated: Vec<Stored<DebtRecord>>,
    /// New Debts rows
    pub created: Vec<DebtRecord>,
    /// New DebtPayments rows
    pub payments: Vec<PaymentRecord>,
}

impl LedgerChanges {
    /// Whether the plan writes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.created.is_empty() && self.payments.is_empty()
    }

    /// Row writes in commit order: overwrites, new ledger rows, payment log.
    #[must_use]
    pub fn to_batch(&self) -> SheetBatch {
        let mut batch = SheetBatch::new();
        for stored in &self.updated {
            batch.update(DebtRecord::SHEET, stored.row, stored.record.to_row());
        }
        batch.append(
            DebtRecord::SHEET,
            self.created.iter().map(SheetRecord::to_row).collect(),
        );
        batch.append(
            PaymentRecord::SHEET,
            self.payments.iter().map(SheetRecord::to_row).collect(),
        );
        batch
    }
}

/// Result of planning a payment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentPlan {
    /// Rows to write
    pub changes: LedgerChanges,
    /// Total moved from remaining to paid on existing debts
    pub applied: f64,
    /// Value parked as a new titip row
    pub leftover: f64,
}

fn check_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

fn check_quantity(quantity: f64) -> Result<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(Error::validation(format!(
            "quantity must be a positive number, got {quantity}"
        )));
    }
    Ok(())
}

fn blank_entry(contact: &Contact, stamp: &Stamp, prefix: &str) -> DebtRecord {
    let now = stamp.timestamp();
    DebtRecord {
        id: stamp.next_id(prefix),
        contact_id: contact.id.clone(),
        contact_name: contact.name.clone(),
        contact_type: contact.contact_type,
        kind: DebtKind::Money,
        entry: EntryKind::Debt,
        description: String::new(),
        amount: 0.0,
        product_id: None,
        product_name: None,
        quantity: 0.0,
        status: DebtStatus::Pending,
        total_amount: 0.0,
        paid_amount: 0.0,
        remaining_amount: 0.0,
        due_date: None,
        created_at: now.clone(),
        updated_at: now,
        notes: String::new(),
    }
}

fn set_open_amount(record: &mut DebtRecord, total: f64) {
    record.total_amount = total;
    record.paid_amount = 0.0;
    record.remaining_amount = total;
    record.status = DebtStatus::derive(0.0, total);
}

fn payment_row(
    stamp: &Stamp,
    debt: &DebtRecord,
    amount: f64,
    quantity: f64,
    kind: PaymentKind,
    notes: &str,
) -> PaymentRecord {
    PaymentRecord {
        id: stamp.next_id("PAY"),
        debt_id: debt.id.clone(),
        contact_id: debt.contact_id.clone(),
        contact_name: debt.contact_name.clone(),
        amount,
        quantity,
        kind,
        paid_at: stamp.timestamp(),
        notes: notes.to_string(),
    }
}

/// Titip-uang credit a contact can still spend. A cash-out pays out the whole net credit,
/// titip barang included, so the spendable amount is capped by the credit left after every
/// cash-out.
#[must_use]
pub fn available_credit(ledger: &[Stored<DebtRecord>], contact_id: &str) -> f64 {
    let mut money = 0.0;
    let mut goods = 0.0;
    let mut disbursed = 0.0;
    for record in ledger
        .iter()
        .map(|stored| &stored.record)
        .filter(|record| record.contact_id == contact_id)
    {
        match record.entry {
            EntryKind::TitipUang if record.is_outstanding() => money += record.remaining_amount,
            EntryKind::TitipBarang if record.is_outstanding() => goods += record.remaining_amount,
            EntryKind::CashOut => disbursed += record.total_amount.abs(),
            _ => {}
        }
    }
    money.min((money + goods - disbursed).max(0.0))
}

fn describe_debt(contact: &Contact, item: &DebtItem, product: Option<&Product>) -> String {
    match (item, product) {
        (DebtItem::Product { quantity, .. }, Some(product)) => format!(
            "Hutang {}: {} x{}",
            contact.name,
            product.name,
            cells::format_amount(*quantity)
        ),
        _ => format!(
            "Hutang {} Rp {}",
            contact.name,
            cells::format_amount(item.amount())
        ),
    }
}

/// Plans a new debt for `contact`, spending the contact's titip-uang credit first when the
/// contact is a customer.
///
/// Returns the changes and the new debt row. `product` must be the resolved product of a
/// product item.
pub fn plan_create_debt(
    ledger: &[Stored<DebtRecord>],
    contact: &Contact,
    item: &DebtItem,
    product: Option<&Product>,
    notes: Option<&str>,
    due_date: Option<&str>,
    stamp: &Stamp,
) -> Result<(LedgerChanges, DebtRecord)> {
    let debt_amount = item.amount();
    check_amount(debt_amount)?;

    let mut record = blank_entry(contact, stamp, "DEBT");
    if let DebtItem::Product {
        product_id,
        quantity,
        ..
    } = item
    {
        check_quantity(*quantity)?;
        let product = product
            .filter(|product| product.id == *product_id)
            .ok_or_else(|| Error::ProductNotFound {
                id: product_id.clone(),
            })?;
        record.kind = DebtKind::Product;
        record.amount = debt_amount / quantity;
        record.product_id = Some(product.id.clone());
        record.product_name = Some(product.name.clone());
        record.quantity = *quantity;
    } else {
        record.amount = debt_amount;
    }

    let notes = notes.map(str::trim).filter(|notes| !notes.is_empty());
    record.description = notes.map_or_else(|| describe_debt(contact, item, product), str::to_string);
    record.notes = notes.unwrap_or_default().to_string();
    record.due_date = due_date
        .map(str::trim)
        .filter(|due| !due.is_empty())
        .map(str::to_string);
    set_open_amount(&mut record, debt_amount);

    let mut changes = LedgerChanges::default();
    let offset = if contact.contact_type == ContactType::Customer {
        available_credit(ledger, &contact.id).min(debt_amount)
    } else {
        0.0
    };

    if offset > AMOUNT_EPSILON {
        let now = stamp.timestamp();
        let mut left = offset;
        for stored in ledger
            .iter()
            .filter(|stored| stored.record.contact_id == contact.id)
            .filter(|stored| stored.record.is_available_credit())
        {
            if left <= AMOUNT_EPSILON {
                break;
            }
            let take = left.min(stored.record.remaining_amount);
            let mut credit = stored.clone();
            credit.record.apply_payment(take, &now);
            debug!(
                "Drained {take} from titip uang {} for {}",
                credit.record.id, contact.id
            );
            changes.updated.push(credit);
            left -= take;
        }

        record.apply_payment(offset, &now);
        changes.payments.push(payment_row(
            stamp,
            &record,
            offset,
            0.0,
            PaymentKind::AutoOffset,
            "Potong titip uang",
        ));
    }

    changes.created.push(record.clone());
    Ok((changes, record))
}

/// Ordinary outstanding debts of a contact, in stored order.
#[must_use]
pub fn open_debts(ledger: &[Stored<DebtRecord>], contact_id: &str) -> Vec<Stored<DebtRecord>> {
    ledger
        .iter()
        .filter(|stored| stored.record.contact_id == contact_id && stored.record.is_open_debt())
        .cloned()
        .collect()
}

fn credit_entry(
    contact: &Contact,
    stamp: &Stamp,
    entry: EntryKind,
    value: f64,
    notes: &str,
) -> DebtRecord {
    let mut record = blank_entry(contact, stamp, "TITIP");
    record.entry = entry;
    record.amount = value;
    record.description = match entry {
        EntryKind::TitipBarang => format!("Titip barang {}", contact.name),
        _ => format!("Titip uang {}", contact.name),
    };
    record.notes = notes.to_string();
    set_open_amount(&mut record, value);
    record
}

/// Plans a payment against `targets` (ordinary debts of `contact`, in the order they are to
/// be paid).
///
/// Money is applied oldest first; whatever is left becomes a titip-uang row. Goods are
/// applied to product debts of the same product at the debt's own unit price; leftover goods
/// become a titip-barang row valued at the product's cost.
pub fn plan_payment(
    contact: &Contact,
    targets: &[Stored<DebtRecord>],
    tender: &Tender,
    product: Option<&Product>,
    notes: Option<&str>,
    stamp: &Stamp,
) -> Result<PaymentPlan> {
    let notes = notes.map(str::trim).unwrap_or_default();
    match tender {
        Tender::Money { amount } => {
            check_amount(*amount)?;
            Ok(plan_money_payment(contact, targets, *amount, notes, stamp))
        }
        Tender::Goods {
            product_id,
            quantity,
        } => {
            check_quantity(*quantity)?;
            let product = product
                .filter(|product| product.id == *product_id)
                .ok_or_else(|| Error::ProductNotFound {
                    id: product_id.clone(),
                })?;
            Ok(plan_goods_payment(
                contact, targets, product, *quantity, notes, stamp,
            ))
        }
    }
}

fn plan_money_payment(
    contact: &Contact,
    targets: &[Stored<DebtRecord>],
    amount: f64,
    notes: &str,
    stamp: &Stamp,
) -> PaymentPlan {
    let now = stamp.timestamp();
    let mut plan = PaymentPlan::default();
    let mut left = amount;

    for stored in targets.iter().filter(|stored| stored.record.is_outstanding()) {
        if left <= AMOUNT_EPSILON {
            break;
        }
        let apply = left.min(stored.record.remaining_amount);
        let mut target = stored.clone();
        target.record.apply_payment(apply, &now);
        plan.changes.payments.push(payment_row(
            stamp,
            &target.record,
            apply,
            0.0,
            PaymentKind::Payment,
            notes,
        ));
        plan.changes.updated.push(target);
        plan.applied += apply;
        left -= apply;
    }

    if left > AMOUNT_EPSILON {
        let credit = credit_entry(contact, stamp, EntryKind::TitipUang, left, notes);
        plan.changes.payments.push(payment_row(
            stamp,
            &credit,
            left,
            0.0,
            PaymentKind::Overpayment,
            notes,
        ));
        plan.changes.created.push(credit);
        plan.leftover = left;
    }
    plan
}

fn plan_goods_payment(
    contact: &Contact,
    targets: &[Stored<DebtRecord>],
    product: &Product,
    quantity: f64,
    notes: &str,
    stamp: &Stamp,
) -> PaymentPlan {
    let now = stamp.timestamp();
    let mut plan = PaymentPlan::default();
    let mut units_left = quantity;

    let eligible = targets.iter().filter(|stored| {
        stored.record.kind == DebtKind::Product
            && stored.record.product_id.as_deref() == Some(product.id.as_str())
            && stored.record.is_outstanding()
    });
    for stored in eligible {
        if units_left <= AMOUNT_EPSILON {
            break;
        }
        let record = &stored.record;
        let unit_price = if record.quantity > 0.0 {
            record.remaining_amount / record.quantity
        } else {
            product.cost
        };
        let mut units = if record.quantity > 0.0 {
            units_left.min(record.quantity)
        } else {
            units_left
        };
        let mut apply = unit_price * units;
        if !apply.is_finite() || apply <= 0.0 {
            warn!(
                "Skipping {}: cannot value goods payment (unit price {unit_price})",
                record.id
            );
            continue;
        }
        if apply > record.remaining_amount {
            apply = record.remaining_amount;
            units = apply / unit_price;
        }

        let mut target = stored.clone();
        target.record.quantity = (target.record.quantity - units).max(0.0);
        target.record.apply_payment(apply, &now);
        plan.changes.payments.push(payment_row(
            stamp,
            &target.record,
            apply,
            units,
            PaymentKind::Payment,
            notes,
        ));
        plan.changes.updated.push(target);
        plan.applied += apply;
        units_left -= units;
    }

    if units_left > AMOUNT_EPSILON {
        let value = product.cost * units_left;
        if value.is_finite() && value > AMOUNT_EPSILON {
            let mut credit = credit_entry(contact, stamp, EntryKind::TitipBarang, value, notes);
            credit.kind = DebtKind::Product;
            credit.amount = product.cost;
            credit.product_id = Some(product.id.clone());
            credit.product_name = Some(product.name.clone());
            credit.quantity = units_left;
            plan.changes.payments.push(payment_row(
                stamp,
                &credit,
                value,
                units_left,
                PaymentKind::Overpayment,
                notes,
            ));
            plan.changes.created.push(credit);
            plan.leftover = value;
        } else {
            warn!(
                "Leftover {units_left} x {} not recorded: product has no cost",
                product.id
            );
        }
    }
    plan
}

/// Plans paying a customer's credit balance back out. The new row carries the negative net
/// balance so the recomputed net balance is zero.
pub fn plan_cash_out(
    ledger: &[Stored<DebtRecord>],
    payments: &[PaymentRecord],
    contact: &Contact,
    stamp: &Stamp,
) -> Result<(LedgerChanges, DebtRecord)> {
    if contact.contact_type != ContactType::Customer {
        return Err(Error::validation(format!(
            "{} is a supplier; only customers can cash out",
            contact.name
        )));
    }
    let net_balance = summary::summarize_contact(ledger, payments, &contact.id)
        .map_or(0.0, |summary| summary.net_balance);
    if net_balance >= -AMOUNT_EPSILON {
        return Err(Error::validation(format!(
            "{} has no credit balance to cash out",
            contact.name
        )));
    }

    let disbursed = net_balance.abs();
    let mut record = blank_entry(contact, stamp, "CASHOUT");
    record.entry = EntryKind::CashOut;
    record.description = format!("Pencairan saldo {}", contact.name);
    record.amount = -disbursed;
    record.total_amount = -disbursed;
    record.paid_amount = -disbursed;
    record.remaining_amount = 0.0;
    record.status = DebtStatus::derive(record.paid_amount, record.remaining_amount);

    let payment = payment_row(
        stamp,
        &record,
        disbursed,
        0.0,
        PaymentKind::CashOut,
        "Pencairan saldo",
    );
    let changes = LedgerChanges {
        updated: Vec::new(),
        created: vec![record.clone()],
        payments: vec![payment],
    };
    Ok((changes, record))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::sheets::SheetOp;
    use crate::test_utils::{contact, ledger_entry, product};
    use chrono::TimeZone;

    fn stamp() -> Stamp {
        Stamp::at(Utc.with_ymd_and_hms(2024, 1, 15, 3, 0, 0).unwrap())
    }

    fn stored(row: usize, record: DebtRecord) -> Stored<DebtRecord> {
        Stored { row, record }
    }

    fn assert_consistent(record: &DebtRecord) {
        assert!(
            (record.total_amount - (record.paid_amount + record.remaining_amount)).abs()
                < AMOUNT_EPSILON
        );
        assert_eq!(
            record.status,
            DebtStatus::derive(record.paid_amount, record.remaining_amount)
        );
    }

    #[test]
    fn test_create_debt_spends_titip_uang() {
        let budi = contact("C1", "Budi", ContactType::Customer);
        let ledger = vec![stored(2, ledger_entry("T1", &budi, EntryKind::TitipUang, 50000.0))];

        let (changes, debt) = plan_create_debt(
            &ledger,
            &budi,
            &DebtItem::Money { amount: 30000.0 },
            None,
            None,
            None,
            &stamp(),
        )
        .unwrap();

        assert_eq!(debt.paid_amount, 30000.0);
        assert_eq!(debt.remaining_amount, 0.0);
        assert_eq!(debt.status, DebtStatus::Completed);
        assert_eq!(changes.updated.len(), 1);
        assert_eq!(changes.updated[0].row, 2);
        assert_eq!(changes.updated[0].record.remaining_amount, 20000.0);
        assert_eq!(changes.payments.len(), 1);
        assert_eq!(changes.payments[0].kind, PaymentKind::AutoOffset);
        assert_eq!(changes.payments[0].debt_id, debt.id);
        assert_consistent(&debt);
        assert_consistent(&changes.updated[0].record);
    }

    #[test]
    fn test_create_debt_drains_credit_rows_in_stored_order() {
        let budi = contact("C1", "Budi", ContactType::Customer);
        let ledger = vec![
            stored(2, ledger_entry("T1", &budi, EntryKind::TitipUang, 10000.0)),
            stored(3, ledger_entry("D1", &budi, EntryKind::Debt, 5000.0)),
            stored(4, ledger_entry("T2", &budi, EntryKind::TitipUang, 10000.0)),
        ];

        let (changes, debt) = plan_create_debt(
            &ledger,
            &budi,
            &DebtItem::Money { amount: 25000.0 },
            None,
            None,
            None,
            &stamp(),
        )
        .unwrap();

        assert_eq!(debt.paid_amount, 20000.0);
        assert_eq!(debt.remaining_amount, 5000.0);
        assert_eq!(debt.status, DebtStatus::Partial);
        let drained: f64 = changes
            .updated
            .iter()
            .map(|s| s.record.paid_amount)
            .sum();
        assert_eq!(drained, 20000.0);
        assert_eq!(
            changes.updated.iter().map(|s| s.row).collect::<Vec<_>>(),
            vec![2, 4]
        );
    }

    #[test]
    fn test_create_debt_ignores_credit_already_cashed_out() {
        let budi = contact("C1", "Budi", ContactType::Customer);
        let mut cash_out = ledger_entry("X1", &budi, EntryKind::CashOut, 0.0);
        cash_out.total_amount = -15000.0;
        cash_out.paid_amount = -15000.0;
        let ledger = vec![
            stored(2, ledger_entry("T1", &budi, EntryKind::TitipUang, 15000.0)),
            stored(3, cash_out),
        ];
        assert_eq!(available_credit(&ledger, "C1"), 0.0);

        let (changes, debt) = plan_create_debt(
            &ledger,
            &budi,
            &DebtItem::Money { amount: 10000.0 },
            None,
            None,
            None,
            &stamp(),
        )
        .unwrap();
        assert!(changes.updated.is_empty());
        assert_eq!(debt.status, DebtStatus::Pending);
    }

    #[test]
    fn test_deposit_after_goods_cash_out_is_spendable() {
        let budi = contact("C1", "Budi", ContactType::Customer);
        let mut cash_out = ledger_entry("X1", &budi, EntryKind::CashOut, 0.0);
        cash_out.total_amount = -20000.0;
        cash_out.paid_amount = -20000.0;
        let ledger = vec![
            stored(2, ledger_entry("G1", &budi, EntryKind::TitipBarang, 20000.0)),
            stored(3, cash_out),
            stored(4, ledger_entry("T1", &budi, EntryKind::TitipUang, 5000.0)),
        ];
        assert_eq!(available_credit(&ledger, "C1"), 5000.0);

        let (changes, debt) = plan_create_debt(
            &ledger,
            &budi,
            &DebtItem::Money { amount: 5000.0 },
            None,
            None,
            None,
            &stamp(),
        )
        .unwrap();
        assert_eq!(debt.status, DebtStatus::Completed);
        assert_eq!(debt.remaining_amount, 0.0);
        assert_eq!(changes.updated.len(), 1);
        assert_eq!(changes.updated[0].row, 4);
        assert_consistent(&debt);
    }

    #[test]
    fn test_suppliers_are_never_offset() {
        let toko = contact("S1", "Toko", ContactType::Supplier);
        let ledger = vec![stored(2, ledger_entry("T1", &toko, EntryKind::TitipUang, 50000.0))];
        let (changes, debt) = plan_create_debt(
            &ledger,
            &toko,
            &DebtItem::Money { amount: 30000.0 },
            None,
            None,
            None,
            &stamp(),
        )
        .unwrap();
        assert!(changes.updated.is_empty());
        assert!(changes.payments.is_empty());
        assert_eq!(debt.remaining_amount, 30000.0);
    }

    #[test]
    fn test_create_debt_validation() {
        let budi = contact("C1", "Budi", ContactType::Customer);
        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result = plan_create_debt(
                &[],
                &budi,
                &DebtItem::Money { amount },
                None,
                None,
                None,
                &stamp(),
            );
            assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        }

        let beras = product("P1", "Beras", 10000.0);
        let zero_units = DebtItem::Product {
            product_id: "P1".to_string(),
            quantity: 0.0,
            amount: 10000.0,
        };
        assert!(matches!(
            plan_create_debt(&[], &budi, &zero_units, Some(&beras), None, None, &stamp()),
            Err(Error::Validation { .. })
        ));

        let unknown = DebtItem::Product {
            product_id: "P9".to_string(),
            quantity: 1.0,
            amount: 10000.0,
        };
        assert!(matches!(
            plan_create_debt(&[], &budi, &unknown, Some(&beras), None, None, &stamp()),
            Err(Error::ProductNotFound { .. })
        ));
    }

    #[test]
    fn test_product_debt_description_and_unit_price() {
        let ani = contact("C2", "Ani", ContactType::Customer);
        let beras = product("P1", "Beras", 10000.0);
        let item = DebtItem::Product {
            product_id: "P1".to_string(),
            quantity: 3.0,
            amount: 90000.0,
        };
        let (_, debt) =
            plan_create_debt(&[], &ani, &item, Some(&beras), None, Some("2024-02-01"), &stamp())
                .unwrap();
        assert_eq!(debt.kind, DebtKind::Product);
        assert_eq!(debt.amount, 30000.0);
        assert_eq!(debt.total_amount, 90000.0);
        assert_eq!(debt.description, "Hutang Ani: Beras x3");
        assert_eq!(debt.due_date.as_deref(), Some("2024-02-01"));

        let (_, noted) = plan_create_debt(
            &[],
            &ani,
            &DebtItem::Money { amount: 5000.0 },
            None,
            Some("  kasbon  "),
            None,
            &stamp(),
        )
        .unwrap();
        assert_eq!(noted.description, "kasbon");
        assert_eq!(noted.notes, "kasbon");
    }

    fn ani_with_two_debts() -> (Contact, Vec<Stored<DebtRecord>>) {
        let ani = contact("C2", "Ani", ContactType::Customer);
        let ledger = vec![
            stored(2, ledger_entry("D1", &ani, EntryKind::Debt, 40000.0)),
            stored(3, ledger_entry("D2", &ani, EntryKind::Debt, 60000.0)),
        ];
        (ani, ledger)
    }

    #[test]
    fn test_bulk_payment_pays_oldest_first() {
        let (ani, ledger) = ani_with_two_debts();
        let targets = open_debts(&ledger, "C2");
        let plan = plan_payment(
            &ani,
            &targets,
            &Tender::Money { amount: 70000.0 },
            None,
            None,
            &stamp(),
        )
        .unwrap();

        let first = &plan.changes.updated[0].record;
        let second = &plan.changes.updated[1].record;
        assert_eq!(first.remaining_amount, 0.0);
        assert_eq!(first.status, DebtStatus::Completed);
        assert_eq!(second.remaining_amount, 30000.0);
        assert_eq!(second.status, DebtStatus::Partial);
        assert!(plan.changes.created.is_empty());
        assert_eq!(plan.changes.payments.len(), 2);
        assert_eq!(plan.applied, 70000.0);
        assert_eq!(plan.leftover, 0.0);
    }

    #[test]
    fn test_overpayment_becomes_titip_uang() {
        let (ani, ledger) = ani_with_two_debts();
        let targets = open_debts(&ledger, "C2");
        let plan = plan_payment(
            &ani,
            &targets,
            &Tender::Money { amount: 120000.0 },
            None,
            None,
            &stamp(),
        )
        .unwrap();

        assert!(plan
            .changes
            .updated
            .iter()
            .all(|s| s.record.status == DebtStatus::Completed));
        assert_eq!(plan.changes.created.len(), 1);
        let credit = &plan.changes.created[0];
        assert_eq!(credit.entry, EntryKind::TitipUang);
        assert_eq!(credit.remaining_amount, 20000.0);
        assert_consistent(credit);
        assert_eq!(plan.applied, 100000.0);
        assert_eq!(plan.leftover, 20000.0);
        assert_eq!(
            plan.changes.payments.last().map(|p| p.kind),
            Some(PaymentKind::Overpayment)
        );
    }

    #[test]
    fn test_payment_without_debts_is_a_deposit() {
        let ani = contact("C2", "Ani", ContactType::Customer);
        let plan = plan_payment(
            &ani,
            &[],
            &Tender::Money { amount: 25000.0 },
            None,
            None,
            &stamp(),
        )
        .unwrap();
        assert!(plan.changes.updated.is_empty());
        assert_eq!(plan.changes.created[0].remaining_amount, 25000.0);
    }

    #[test]
    fn test_goods_payment_uses_debt_unit_price() {
        let ani = contact("C2", "Ani", ContactType::Customer);
        let mut debt = ledger_entry("D1", &ani, EntryKind::Debt, 90000.0);
        debt.kind = DebtKind::Product;
        debt.product_id = Some("P1".to_string());
        debt.quantity = 3.0;
        let ledger = vec![stored(2, debt)];
        let beras = product("P1", "Beras", 25000.0);

        let plan = plan_payment(
            &ani,
            &open_debts(&ledger, "C2"),
            &Tender::Goods {
                product_id: "P1".to_string(),
                quantity: 2.0,
            },
            Some(&beras),
            None,
            &stamp(),
        )
        .unwrap();

        let paid = &plan.changes.updated[0].record;
        assert_eq!(paid.paid_amount, 60000.0);
        assert_eq!(paid.remaining_amount, 30000.0);
        assert_eq!(paid.quantity, 1.0);
        assert_eq!(paid.status, DebtStatus::Partial);
        assert_eq!(plan.changes.payments[0].quantity, 2.0);
        assert!(plan.changes.created.is_empty());
    }

    #[test]
    fn test_leftover_goods_become_titip_barang() {
        let ani = contact("C2", "Ani", ContactType::Customer);
        let mut debt = ledger_entry("D1", &ani, EntryKind::Debt, 30000.0);
        debt.kind = DebtKind::Product;
        debt.product_id = Some("P1".to_string());
        debt.quantity = 1.0;
        let ledger = vec![
            stored(2, debt),
            stored(3, ledger_entry("D2", &ani, EntryKind::Debt, 5000.0)),
        ];
        let beras = product("P1", "Beras", 25000.0);

        let plan = plan_payment(
            &ani,
            &open_debts(&ledger, "C2"),
            &Tender::Goods {
                product_id: "P1".to_string(),
                quantity: 3.0,
            },
            Some(&beras),
            None,
            &stamp(),
        )
        .unwrap();

        assert_eq!(plan.changes.updated.len(), 1);
        let goods = &plan.changes.created[0];
        assert_eq!(goods.entry, EntryKind::TitipBarang);
        assert_eq!(goods.quantity, 2.0);
        assert_eq!(goods.remaining_amount, 50000.0);
        assert_eq!(plan.leftover, 50000.0);
    }

    #[test]
    fn test_goods_without_cost_are_not_parked() {
        let ani = contact("C2", "Ani", ContactType::Customer);
        let gift = product("P2", "Hadiah", 0.0);
        let plan = plan_payment(
            &ani,
            &[],
            &Tender::Goods {
                product_id: "P2".to_string(),
                quantity: 1.0,
            },
            Some(&gift),
            None,
            &stamp(),
        )
        .unwrap();
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_cash_out_zeroes_net_balance() {
        let budi = contact("C1", "Budi", ContactType::Customer);
        let ledger = vec![stored(2, ledger_entry("T1", &budi, EntryKind::TitipUang, 15000.0))];

        let (changes, record) = plan_cash_out(&ledger, &[], &budi, &stamp()).unwrap();
        assert_eq!(record.total_amount, -15000.0);
        assert_eq!(record.remaining_amount, 0.0);
        assert_eq!(record.entry, EntryKind::CashOut);
        assert_consistent(&record);
        assert_eq!(changes.payments[0].kind, PaymentKind::CashOut);

        let mut after = ledger.clone();
        after.push(stored(3, record));
        let summary = summary::summarize_contact(&after, &[], "C1").unwrap();
        assert_eq!(summary.net_balance, 0.0);

        assert!(matches!(
            plan_cash_out(&after, &[], &budi, &stamp()),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_cash_out_rejects_suppliers() {
        let toko = contact("S1", "Toko", ContactType::Supplier);
        let ledger = vec![stored(2, ledger_entry("T1", &toko, EntryKind::TitipUang, 15000.0))];
        assert!(matches!(
            plan_cash_out(&ledger, &[], &toko, &stamp()),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_changes_to_batch_orders_writes() {
        let (ani, ledger) = ani_with_two_debts();
        let plan = plan_payment(
            &ani,
            &open_debts(&ledger, "C2"),
            &Tender::Money { amount: 120000.0 },
            None,
            None,
            &stamp(),
        )
        .unwrap();
        let batch = plan.changes.to_batch();
        let ops = batch.ops();
        assert_eq!(ops.len(), 4);
        assert!(matches!(&ops[0], SheetOp::Update { row: 2, .. }));
        assert!(matches!(&ops[1], SheetOp::Update { row: 3, .. }));
        assert!(matches!(&ops[2], SheetOp::Append { sheet, rows } if sheet == "Debts" && rows.len() == 1));
        assert!(matches!(&ops[3], SheetOp::Append { sheet, rows } if sheet == "DebtPayments" && rows.len() == 3));
    }

    #[test]
    fn test_stamp_ids_are_unique() {
        let stamp = stamp();
        let a = stamp.next_id("PAY");
        let b = stamp.next_id("PAY");
        assert_ne!(a, b);
        assert!(a.starts_with("PAY-"));
        assert_eq!(stamp.timestamp(), "2024-01-15 10:00:00 WIB");
    }
}
