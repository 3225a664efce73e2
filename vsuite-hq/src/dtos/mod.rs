pub mod clients;
pub mod contracts;
pub mod invoices;
pub mod payments;
pub mod proposals;
pub mod tasks;
pub mod templates;

pub use clients::{
    CreateClientRequest, CreateProjectRequest, UpdateClientRequest, UpdateProjectRequest,
};
pub use contracts::{
    ContractResponse, CreateContractRequest, SendContractResponse, SignContractRequest,
    SignerRequest, UpdateContractRequest,
};
pub use invoices::{
    CreateInvoiceRequest, InvoiceResponse, LineItemRequest, ListInvoicesQuery,
    SendInvoiceRequest, SendInvoiceResponse, UpdateInvoiceRequest,
};
pub use payments::{CreatePaymentRequest, ListPaymentsQuery, PaymentResponse};
pub use proposals::{
    CreateProposalRequest, CreateRevisionRequest, ListProposalsQuery, RespondProposalRequest,
    SendProposalRequest, SendProposalResponse, UpdateProposalRequest,
};
pub use tasks::{
    AddDependencyRequest, CreateTaskRequest, CreateTimeLogRequest, ListTasksQuery,
    ListTimeLogsQuery, UpdateTaskRequest, UpdateTimeLogRequest,
};
pub use templates::{CreateTemplateRequest, UpdateTemplateRequest};
