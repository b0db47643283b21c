use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use ledgerlite_core::{
    AccountCategory, Company, DateRange, EntrySource, EventPublisher, InvoiceFilter,
    InvoiceStatus, LedgerError, LedgerEvent, LedgerStore, User,
};
use ledgerlite_finance::{
    CleanupAction, CleanupRequest, InvoiceLineInput, LedgerService, NewCompany, NewCustomer,
    NewInvoice, NewPersonalExpense, NewTransaction, PaymentMethod, StatusChange, SyncCommand,
    SyncStatus, TransactionKind,
};
use ledgerlite_store::InMemoryStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<LedgerEvent>>,
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &LedgerEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct Harness {
    service: LedgerService,
    store: InMemoryStore,
    events: Arc<RecordingPublisher>,
    company: Company,
}

fn owner() -> User {
    User {
        id: Uuid::new_v4(),
        phone: "+2348012345678".to_string(),
        display_name: Some("Amaka".to_string()),
        created_at: Utc::now(),
    }
}

async fn harness() -> Harness {
    let store = InMemoryStore::new();
    let events = Arc::new(RecordingPublisher::default());
    let service = LedgerService::new(Arc::new(store.clone()), events.clone());
    let company = service
        .create_company(
            &owner(),
            NewCompany {
                name: "Amaka Foods".to_string(),
                ..NewCompany::default()
            },
        )
        .await
        .unwrap();

    Harness {
        service,
        store,
        events,
        company,
    }
}

fn items(amount: Decimal) -> Vec<InvoiceLineInput> {
    vec![InvoiceLineInput {
        description: "Catering".to_string(),
        quantity: dec!(1),
        unit_price: amount,
    }]
}

fn invoice_for(customer: &str, amount: Decimal) -> NewInvoice {
    NewInvoice {
        customer: NewCustomer {
            name: customer.to_string(),
            ..NewCustomer::default()
        },
        items: items(amount),
        issue_date: NaiveDate::from_ymd_opt(2025, 3, 3),
        ..NewInvoice::default()
    }
}

fn pay(method: PaymentMethod) -> StatusChange {
    StatusChange {
        status: InvoiceStatus::Paid,
        payment_method: method,
        paid_on: NaiveDate::from_ymd_opt(2025, 3, 10),
    }
}

fn to(status: InvoiceStatus) -> StatusChange {
    StatusChange {
        status,
        payment_method: PaymentMethod::Cash,
        paid_on: None,
    }
}

async fn balance(harness: &Harness, category: AccountCategory) -> Decimal {
    harness
        .service
        .accounts_with_balances(harness.company.id)
        .await
        .unwrap()
        .into_iter()
        .find(|balance| balance.category == category)
        .map(|balance| balance.balance)
        .unwrap()
}

async fn assert_journal_balanced(harness: &Harness) {
    let journal = harness
        .service
        .journal(harness.company.id, &DateRange::all())
        .await
        .unwrap();
    for posted in &journal {
        assert!(posted.is_balanced(), "{} is unbalanced", posted.entry.reference);
        assert!(posted.total_debits() > Decimal::ZERO);
    }
}

fn domain_error(err: &anyhow::Error) -> &LedgerError {
    err.downcast_ref::<LedgerError>().unwrap()
}

#[tokio::test]
async fn company_bootstraps_full_chart() {
    let harness = harness().await;
    let balances = harness
        .service
        .accounts_with_balances(harness.company.id)
        .await
        .unwrap();

    assert_eq!(balances.len(), AccountCategory::ALL.len());
    assert_eq!(harness.company.invoice_prefix, "INV");
    assert_eq!(harness.company.currency, "NGN");
}

#[tokio::test]
async fn second_company_for_same_owner_conflicts() {
    let store = InMemoryStore::new();
    let service = LedgerService::new(
        Arc::new(store),
        Arc::new(RecordingPublisher::default()),
    );
    let user = owner();
    let input = NewCompany {
        name: "First".to_string(),
        ..NewCompany::default()
    };
    service.create_company(&user, input.clone()).await.unwrap();

    let err = service.create_company(&user, input).await.unwrap_err();
    assert!(matches!(domain_error(&err), LedgerError::Conflict(_)));
    assert_eq!(service.company_for_user(user.id).await.unwrap().name, "First");
    let missing = service.company_for_user(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(domain_error(&missing), &LedgerError::NotFound("company"));
}

#[tokio::test]
async fn ten_thousand_naira_invoice_lifecycle_nets_to_zero() {
    let harness = harness().await;
    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Chinedu", dec!(10000)))
        .await
        .unwrap();
    assert_eq!(detail.invoice.number, "INV-0001");
    assert_eq!(detail.invoice.total, dec!(10000));

    assert_eq!(balance(&harness, AccountCategory::Receivable).await, dec!(10000));
    assert_eq!(balance(&harness, AccountCategory::DeferredRevenue).await, dec!(10000));
    assert_eq!(balance(&harness, AccountCategory::Sales).await, Decimal::ZERO);

    harness
        .service
        .update_invoice_status(harness.company.id, detail.invoice.id, pay(PaymentMethod::Cash))
        .await
        .unwrap();
    assert_eq!(balance(&harness, AccountCategory::Cash).await, dec!(10000));
    assert_eq!(balance(&harness, AccountCategory::Receivable).await, Decimal::ZERO);
    assert_eq!(balance(&harness, AccountCategory::DeferredRevenue).await, Decimal::ZERO);
    assert_eq!(balance(&harness, AccountCategory::Sales).await, dec!(10000));

    let deleted = harness
        .service
        .delete_invoice(harness.company.id, detail.invoice.id)
        .await
        .unwrap();
    let reversal = deleted.reversal.unwrap();
    assert_eq!(reversal.entry.reference, "DEL-INV-0001");
    assert_eq!(reversal.entry.invoice_id, Some(detail.invoice.id));

    for category in AccountCategory::ALL {
        assert_eq!(balance(&harness, category).await, Decimal::ZERO, "{category}");
    }
    assert_journal_balanced(&harness).await;

    let journal = harness
        .service
        .journal(harness.company.id, &DateRange::all())
        .await
        .unwrap();
    assert_eq!(journal.len(), 3);
    assert!(journal.iter().all(|posted| posted.entry.invoice_id.is_none()));
    assert!(
        journal
            .iter()
            .all(|posted| posted.entry.document_number.as_deref() == Some("INV-0001"))
    );
}

#[tokio::test]
async fn paying_twice_recognizes_revenue_once() {
    let harness = harness().await;
    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Chinedu", dec!(2500)))
        .await
        .unwrap();

    let first = harness
        .service
        .update_invoice_status(harness.company.id, detail.invoice.id, pay(PaymentMethod::Bank))
        .await
        .unwrap();
    assert!(first.changed);
    assert!(!first.already_paid);
    assert!(first.invoice.paid_at.is_some());

    let second = harness
        .service
        .update_invoice_status(harness.company.id, detail.invoice.id, pay(PaymentMethod::Bank))
        .await
        .unwrap();
    assert!(!second.changed);
    assert!(second.already_paid);
    assert!(second.entry.is_none());

    assert_eq!(balance(&harness, AccountCategory::Sales).await, dec!(2500));
    assert_eq!(balance(&harness, AccountCategory::Bank).await, dec!(2500));
}

#[tokio::test]
async fn concurrent_payments_post_once() {
    let harness = harness().await;
    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Chinedu", dec!(4000)))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = harness.service.clone();
        let company_id = harness.company.id;
        let invoice_id = detail.invoice.id;
        handles.push(tokio::spawn(async move {
            service
                .update_invoice_status(company_id, invoice_id, pay(PaymentMethod::Cash))
                .await
        }));
    }

    let mut changed = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().changed {
            changed += 1;
        }
    }
    assert_eq!(changed, 1);
    assert_eq!(balance(&harness, AccountCategory::Sales).await, dec!(4000));
}

#[tokio::test]
async fn vat_is_deferred_then_reversed_with_the_invoice() {
    let harness = harness().await;
    let mut input = invoice_for("Bisi", dec!(10000));
    input.apply_vat = true;
    let detail = harness
        .service
        .create_invoice(&harness.company, input)
        .await
        .unwrap();
    assert_eq!(detail.invoice.vat_rate, dec!(7.5));
    assert_eq!(detail.invoice.vat_amount, dec!(750));
    assert_eq!(detail.invoice.total, dec!(10750));
    assert_eq!(balance(&harness, AccountCategory::VatPayable).await, dec!(750));

    harness
        .service
        .delete_invoice(harness.company.id, detail.invoice.id)
        .await
        .unwrap();
    for category in AccountCategory::ALL {
        assert_eq!(balance(&harness, category).await, Decimal::ZERO, "{category}");
    }
}

#[tokio::test]
async fn invoice_numbers_increase_per_company() {
    let harness = harness().await;
    let mut numbers = Vec::new();
    for step in 1..=12 {
        let detail = harness
            .service
            .create_invoice(
                &harness.company,
                invoice_for("Repeat Buyer", Decimal::from(step * 100)),
            )
            .await
            .unwrap();
        numbers.push(detail.invoice.number);
    }

    assert!(numbers.iter().all(|number| number.starts_with("INV-")));
    let sequences: Vec<u32> = numbers
        .iter()
        .map(|number| number.trim_start_matches("INV-").parse().unwrap())
        .collect();
    assert!(sequences.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(numbers[0], "INV-0001");

    let customers = harness
        .service
        .list_customers(harness.company.id)
        .await
        .unwrap();
    assert_eq!(customers.len(), 1);

    let other_owner = owner();
    let other = harness
        .service
        .create_company(
            &other_owner,
            NewCompany {
                name: "Second Shop".to_string(),
                invoice_prefix: Some("ss".to_string()),
                currency: None,
            },
        )
        .await
        .unwrap();
    let detail = harness
        .service
        .create_invoice(&other, invoice_for("Someone", dec!(10)))
        .await
        .unwrap();
    assert_eq!(detail.invoice.number, "SS-0001");
}

#[tokio::test]
async fn status_machine_rejects_illegal_moves() {
    let harness = harness().await;
    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Tunde", dec!(900)))
        .await
        .unwrap();

    let err = harness
        .service
        .update_invoice_status(harness.company.id, detail.invoice.id, to(InvoiceStatus::Overdue))
        .await
        .unwrap_err();
    assert!(matches!(
        domain_error(&err),
        LedgerError::InvalidStatusTransition { .. }
    ));

    harness
        .service
        .update_invoice_status(harness.company.id, detail.invoice.id, to(InvoiceStatus::Sent))
        .await
        .unwrap();
    harness
        .service
        .update_invoice_status(harness.company.id, detail.invoice.id, pay(PaymentMethod::Cash))
        .await
        .unwrap();
    let err = harness
        .service
        .update_invoice_status(
            harness.company.id,
            detail.invoice.id,
            to(InvoiceStatus::Cancelled),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        domain_error(&err),
        LedgerError::InvalidStatusTransition { .. }
    ));

    let missing = harness
        .service
        .update_invoice_status(harness.company.id, Uuid::new_v4(), to(InvoiceStatus::Sent))
        .await
        .unwrap_err();
    assert_eq!(domain_error(&missing), &LedgerError::NotFound("invoice"));
}

#[tokio::test]
async fn cancelling_voids_the_receivable() {
    let harness = harness().await;
    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Tunde", dec!(1500)))
        .await
        .unwrap();

    let outcome = harness
        .service
        .update_invoice_status(
            harness.company.id,
            detail.invoice.id,
            to(InvoiceStatus::Cancelled),
        )
        .await
        .unwrap();
    assert_eq!(outcome.entry.unwrap().reference, "VOID-INV-0001");
    assert_eq!(balance(&harness, AccountCategory::Receivable).await, Decimal::ZERO);

    let deleted = harness
        .service
        .delete_invoice(harness.company.id, detail.invoice.id)
        .await
        .unwrap();
    assert!(deleted.reversal.is_none());
}

#[tokio::test]
async fn overdue_sweep_moves_only_past_due_sent_invoices() {
    let harness = harness().await;
    let mut late = invoice_for("Late Payer", dec!(100));
    late.status = Some(InvoiceStatus::Sent);
    late.due_date = NaiveDate::from_ymd_opt(2025, 3, 5);
    let late = harness
        .service
        .create_invoice(&harness.company, late)
        .await
        .unwrap();

    let mut draft = invoice_for("Drafty", dec!(100));
    draft.due_date = NaiveDate::from_ymd_opt(2025, 3, 5);
    harness
        .service
        .create_invoice(&harness.company, draft)
        .await
        .unwrap();

    let today = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
    assert_eq!(harness.service.mark_overdue(today).await.unwrap(), 1);
    assert_eq!(harness.service.mark_overdue(today).await.unwrap(), 0);

    let overdue = harness
        .service
        .list_invoices(
            harness.company.id,
            &InvoiceFilter {
                status: Some(InvoiceStatus::Overdue),
                range: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, late.invoice.id);
}

#[tokio::test]
async fn invalid_invoices_leave_no_trace() {
    let harness = harness().await;
    let mut input = invoice_for("Nobody", dec!(100));
    input.items[0].quantity = Decimal::ZERO;
    assert!(
        harness
            .service
            .create_invoice(&harness.company, input)
            .await
            .is_err()
    );

    let mut input = invoice_for(" ", dec!(100));
    input.status = Some(InvoiceStatus::Sent);
    assert!(
        harness
            .service
            .create_invoice(&harness.company, input)
            .await
            .is_err()
    );

    let invoices = harness
        .service
        .list_invoices(harness.company.id, &InvoiceFilter::default())
        .await
        .unwrap();
    assert!(invoices.is_empty());

    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Somebody", dec!(100)))
        .await
        .unwrap();
    assert_eq!(detail.invoice.number, "INV-0001");
}

#[tokio::test]
async fn recorded_transactions_are_inferred_back_to_their_type() {
    let harness = harness().await;
    let date = NaiveDate::from_ymd_opt(2025, 4, 1);
    for step in 1..=10 {
        let amount = Decimal::from(step) * dec!(111.11);
        for kind in [TransactionKind::Income, TransactionKind::Expense] {
            let recorded = harness
                .service
                .record_transaction(
                    harness.company.id,
                    NewTransaction {
                        kind,
                        amount,
                        description: format!("{kind:?} {step}"),
                        date,
                        payment_method: if step % 2 == 0 {
                            PaymentMethod::Bank
                        } else {
                            PaymentMethod::Cash
                        },
                        category: Some("Supplies".to_string()),
                        client_id: None,
                    },
                )
                .await
                .unwrap();
            assert_eq!(recorded.transaction.kind, kind);
            assert_eq!(recorded.transaction.amount, amount);
            assert_eq!(recorded.transaction.category.as_deref(), Some("Supplies"));
        }
    }

    let recorded = harness
        .service
        .record_personal_expense(
            harness.company.id,
            NewPersonalExpense {
                amount: dec!(500),
                description: "School fees".to_string(),
                date,
                payment_method: PaymentMethod::Cash,
                category: None,
                client_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(recorded.transaction.kind, TransactionKind::Expense);
    assert!(recorded.transaction.reference.starts_with("PEX-20250401-"));
    assert_eq!(balance(&harness, AccountCategory::Drawings).await, dec!(500));

    let incomes = harness
        .service
        .list_transactions(
            harness.company.id,
            &DateRange::all(),
            Some(TransactionKind::Income),
        )
        .await
        .unwrap();
    assert_eq!(incomes.len(), 10);
    assert!(incomes.iter().all(|view| view.reference.starts_with("SAL-20250401-")));

    let personal = harness
        .service
        .list_personal_expenses(harness.company.id, &DateRange::all())
        .await
        .unwrap();
    assert_eq!(personal.len(), 1);
    assert_eq!(personal[0].source, EntrySource::PersonalExpense);
    assert_journal_balanced(&harness).await;
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let harness = harness().await;
    for amount in [Decimal::ZERO, dec!(-5), dec!(0.001)] {
        let err = harness
            .service
            .record_transaction(
                harness.company.id,
                NewTransaction {
                    kind: TransactionKind::Expense,
                    amount,
                    description: "Fuel".to_string(),
                    date: None,
                    payment_method: PaymentMethod::Cash,
                    category: None,
                    client_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(domain_error(&err), LedgerError::Validation(_)));
    }
}

#[tokio::test]
async fn sync_applies_each_client_operation_once() {
    let harness = harness().await;
    let client_id = Uuid::new_v4();
    let sale = NewTransaction {
        kind: TransactionKind::Income,
        amount: dec!(750),
        description: "Market day".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 5, 2),
        payment_method: PaymentMethod::Cash,
        category: None,
        client_id: None,
    };
    let bad = NewPersonalExpense {
        amount: Decimal::ZERO,
        description: "Nothing".to_string(),
        date: None,
        payment_method: PaymentMethod::Cash,
        category: None,
        client_id: None,
    };

    let first = harness
        .service
        .sync(
            harness.company.id,
            vec![
                (client_id, SyncCommand::Transaction(sale.clone())),
                (Uuid::new_v4(), SyncCommand::PersonalExpense(bad)),
            ],
        )
        .await;
    assert_eq!(first[0].status, SyncStatus::Applied);
    assert_eq!(first[1].status, SyncStatus::Failed);
    assert!(first[1].error.is_some());

    let replay = harness
        .service
        .sync(
            harness.company.id,
            vec![(client_id, SyncCommand::Transaction(sale))],
        )
        .await;
    assert_eq!(replay[0].status, SyncStatus::Duplicate);
    assert_eq!(replay[0].entry_id, first[0].entry_id);
    assert_eq!(balance(&harness, AccountCategory::Sales).await, dec!(750));
}

#[tokio::test]
async fn concurrent_replays_of_one_client_operation_post_once() {
    let harness = harness().await;
    let sale = NewTransaction {
        kind: TransactionKind::Income,
        amount: dec!(1200),
        description: "Market day".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 5, 2),
        payment_method: PaymentMethod::Cash,
        category: None,
        client_id: Some(Uuid::new_v4()),
    };

    let (first, second) = tokio::join!(
        harness.service.record_transaction(harness.company.id, sale.clone()),
        harness.service.record_transaction(harness.company.id, sale),
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_ne!(first.duplicate, second.duplicate);
    assert_eq!(first.transaction.id, second.transaction.id);

    let journal = harness
        .service
        .journal(harness.company.id, &DateRange::all())
        .await
        .unwrap();
    assert_eq!(journal.len(), 1);
    assert_eq!(balance(&harness, AccountCategory::Sales).await, dec!(1200));
}

#[tokio::test]
async fn concurrent_creates_share_one_row() {
    let harness = harness().await;
    let customer = || NewCustomer {
        name: "Bisi".to_string(),
        ..NewCustomer::default()
    };
    let (first, second) = tokio::join!(
        harness.service.create_customer(harness.company.id, customer()),
        harness.service.create_customer(harness.company.id, customer()),
    );
    let ((first, first_created), (second, second_created)) = (first.unwrap(), second.unwrap());
    assert_eq!(first.id, second.id);
    assert_ne!(first_created, second_created);
    assert_eq!(harness.service.list_customers(harness.company.id).await.unwrap().len(), 1);

    let user = owner();
    let company = || NewCompany {
        name: "Twin".to_string(),
        ..NewCompany::default()
    };
    let (first, second) = tokio::join!(
        harness.service.create_company(&user, company()),
        harness.service.create_company(&user, company()),
    );
    let conflict = match (first, second) {
        (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
        (first, second) => panic!("expected one winner, got {first:?} and {second:?}"),
    };
    assert!(matches!(domain_error(&conflict), LedgerError::Conflict(_)));
}

#[tokio::test]
async fn oversized_amounts_are_rejected() {
    let harness = harness().await;
    let err = harness
        .service
        .record_transaction(
            harness.company.id,
            NewTransaction {
                kind: TransactionKind::Income,
                amount: Decimal::MAX,
                description: "Typo".to_string(),
                date: None,
                payment_method: PaymentMethod::Cash,
                category: None,
                client_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&err), LedgerError::Validation(_)));

    let mut invoice = invoice_for("Chinedu", dec!(2));
    invoice.items[0].quantity = Decimal::MAX;
    let err = harness
        .service
        .create_invoice(&harness.company, invoice)
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&err), LedgerError::Validation(_)));

    let journal = harness
        .service
        .journal(harness.company.id, &DateRange::all())
        .await
        .unwrap();
    assert!(journal.is_empty());
}

#[tokio::test]
async fn payment_date_drives_paid_at_and_month_reconciles() {
    let harness = harness().await;
    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Chinedu", dec!(10000)))
        .await
        .unwrap();
    let outcome = harness
        .service
        .update_invoice_status(harness.company.id, detail.invoice.id, pay(PaymentMethod::Bank))
        .await
        .unwrap();
    let paid_at = outcome.invoice.paid_at.unwrap();
    assert_eq!(paid_at.date_naive(), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());

    let stored = harness
        .service
        .get_invoice(harness.company.id, detail.invoice.id)
        .await
        .unwrap();
    assert_eq!(stored.invoice.paid_at, Some(paid_at));

    let report = harness
        .service
        .cleanup_report(harness.company.id, "2025-03")
        .await
        .unwrap();
    assert_eq!(report.recognized_invoice_revenue, dec!(10000));
    assert_eq!(report.paid_invoice_revenue, dec!(10000));
    assert!(report.discrepancy.is_zero());
    assert!(report.is_clean());
}

#[tokio::test]
async fn invoice_reads_are_scoped_to_the_company() {
    let harness = harness().await;
    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Chinedu", dec!(4000)))
        .await
        .unwrap();

    let read = harness
        .service
        .get_invoice(harness.company.id, detail.invoice.id)
        .await
        .unwrap();
    assert_eq!(read.invoice.id, detail.invoice.id);
    assert_eq!(read.invoice.number, "INV-0001");
    assert_eq!(read.items.len(), 1);
    assert_eq!(read.entries.len(), 1);
    assert_eq!(read.customer.unwrap().name, "Chinedu");

    let other = harness
        .service
        .create_company(
            &owner(),
            NewCompany {
                name: "Elsewhere".to_string(),
                ..NewCompany::default()
            },
        )
        .await
        .unwrap();
    let err = harness
        .service
        .get_invoice(other.id, detail.invoice.id)
        .await
        .unwrap_err();
    assert_eq!(domain_error(&err), &LedgerError::NotFound("invoice"));
}

#[tokio::test]
async fn analytics_follow_recognized_revenue() {
    let harness = harness().await;
    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Ngozi", dec!(8000)))
        .await
        .unwrap();
    harness
        .service
        .update_invoice_status(harness.company.id, detail.invoice.id, pay(PaymentMethod::Cash))
        .await
        .unwrap();
    harness
        .service
        .record_transaction(
            harness.company.id,
            NewTransaction {
                kind: TransactionKind::Expense,
                amount: dec!(3000),
                description: "Gas refill".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 3, 12),
                payment_method: PaymentMethod::Cash,
                category: None,
                client_id: None,
            },
        )
        .await
        .unwrap();

    let summary = harness
        .service
        .revenue_analytics(harness.company.id, DateRange::all())
        .await
        .unwrap();
    assert_eq!(summary.total_revenue, dec!(8000));
    assert_eq!(summary.total_expenses, dec!(3000));
    assert_eq!(summary.net_profit, dec!(5000));
    assert_eq!(summary.invoices.paid, 1);
    assert_eq!(summary.top_customers[0].name, "Ngozi");

    let trial = harness
        .service
        .trial_balance(harness.company.id, None)
        .await
        .unwrap();
    assert!(trial.balanced);

    let board = harness
        .service
        .dashboard(
            harness.company.id,
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(board.cash_position, dec!(5000));
    assert_eq!(board.revenue_this_month, dec!(8000));
    assert_eq!(board.invoice_counts.get("paid"), Some(&1));
}

#[tokio::test]
async fn cleanup_removes_orphans_and_nuclear_needs_confirmation() {
    let harness = harness().await;
    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Ghost", dec!(600)))
        .await
        .unwrap();

    // An invoice row vanishing without its reversal leaves an orphaned issuance.
    {
        let mut tx = harness.store.begin().await.unwrap();
        tx.delete_invoice(detail.invoice.id).await.unwrap();
        tx.commit().await.unwrap();
    }

    let report = harness
        .service
        .cleanup_report(harness.company.id, "2025-03")
        .await
        .unwrap();
    assert_eq!(report.orphaned.len(), 1);
    assert_eq!(report.orphaned[0].document_number, "INV-0001");

    let outcome = harness
        .service
        .run_cleanup(
            &harness.company,
            CleanupRequest {
                action: CleanupAction::RemoveOrphans,
                confirm: None,
                month: Some("2025-03".to_string()),
            },
            Utc::now().date_naive(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.removed_entries, 1);
    assert_eq!(balance(&harness, AccountCategory::Receivable).await, Decimal::ZERO);

    harness
        .service
        .create_invoice(&harness.company, invoice_for("Real", dec!(100)))
        .await
        .unwrap();
    let refused = harness
        .service
        .run_cleanup(
            &harness.company,
            CleanupRequest {
                action: CleanupAction::Nuclear,
                confirm: Some("wrong".to_string()),
                month: None,
            },
            Utc::now().date_naive(),
        )
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&refused), LedgerError::Validation(_)));

    let wiped = harness
        .service
        .run_cleanup(
            &harness.company,
            CleanupRequest {
                action: CleanupAction::Nuclear,
                confirm: Some("Amaka Foods".to_string()),
                month: None,
            },
            Utc::now().date_naive(),
        )
        .await
        .unwrap();
    let purged = wiped.purged.unwrap();
    assert_eq!(purged.invoices, 1);
    assert_eq!(purged.journal_entries, 1);
    assert!(
        harness
            .service
            .journal(harness.company.id, &DateRange::all())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn events_are_published_after_commit() {
    let harness = harness().await;
    let detail = harness
        .service
        .create_invoice(&harness.company, invoice_for("Evented", dec!(50)))
        .await
        .unwrap();
    harness
        .service
        .update_invoice_status(harness.company.id, detail.invoice.id, pay(PaymentMethod::Cash))
        .await
        .unwrap();

    let events = harness.events.events.lock().unwrap();
    let references: Vec<&str> = events.iter().map(|event| event.reference.as_str()).collect();
    assert_eq!(references, vec!["INV-0001", "PAY-INV-0001"]);
    assert!(events.iter().all(|event| event.company_id == harness.company.id));
    assert_eq!(events[1].source, EntrySource::InvoicePaid);
    assert!(events[0].occurred_at.year() >= 2025);
}
