//! Domain models for VSuite HQ.

mod client;
mod contract;
mod invoice;
mod notification;
mod payment;
mod project;
mod proposal;
mod task;
mod template;
mod time_log;

pub use client::{Client, CreateClient, UpdateClient};
pub use contract::{
    Contract, ContractLineItem, ContractSigner, ContractStatus, CreateContract, CreateSigner,
    UpdateContract,
};
pub use invoice::{
    compute_invoice_totals, CreateInvoice, Invoice, InvoiceLineItem, InvoiceStatus,
    InvoiceTotals, LineItemInput, ListInvoicesFilter, UpdateInvoice,
};
pub use notification::{Channel, Notification, NotificationStatus};
pub use payment::{CreatePayment, Payment};
pub use project::{CreateProject, Project, UpdateProject};
pub use proposal::{
    CreateProposal, ListProposalsFilter, Proposal, ProposalStatus, UpdateProposal,
};
pub use task::{
    would_create_cycle, CreateTask, Task, TaskDependency, TaskPriority, TaskStatus, UpdateTask,
};
pub use template::{CreateTemplate, DocumentType, FieldDef, FieldType, Template, UpdateTemplate};
pub use time_log::{duration_between, CreateTimeLog, TimeLog, UpdateTimeLog};
