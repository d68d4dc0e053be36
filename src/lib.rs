pub mod amount;
pub mod config;
pub mod csv;
pub mod engine;
pub mod model;
pub mod nvp;
pub mod plugin;

pub use amount::Amount;
pub use engine::{Engine, Operation, Report};
pub use model::{FinancialTransaction, PaymentId, TransactionType};
