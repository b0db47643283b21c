pub mod config;
pub mod contracts;
pub mod db;
pub mod redis_bus;

pub use config::ServiceConfig;
pub use contracts::{
    CleanupActionRequest, CleanupQuery, CreateCompanyRequest, CreateCustomerRequest,
    CreateInvoiceRequest, CreateTransactionRequest, ErrorResponse, InvoiceItemRequest,
    ListInvoicesQuery, PeriodQuery, PersonalExpenseRequest, RequestOtpRequest,
    RequestOtpResponse, SessionResponse, SyncOperationRequest, SyncRequest, TrialBalanceQuery,
    UpdateInvoiceRequest, UserView, VerifyOtpRequest,
};
pub use db::connect_database;
pub use redis_bus::{LogPublisher, RedisBus};
