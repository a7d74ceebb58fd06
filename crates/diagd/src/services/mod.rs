pub mod diagnose_service;

pub use diagnose_service::DiagnoseService;
