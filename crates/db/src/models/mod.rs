//! Row models mapped with `sqlx::FromRow` and converted into `aval_core`
//! domain types. State columns are `TEXT`; conversion fails if a row holds a
//! value the domain does not know.

pub mod case;
pub mod device_token;
pub mod event;
pub mod history;
pub mod request;
