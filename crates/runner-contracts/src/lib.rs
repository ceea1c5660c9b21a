// Public contracts for the runner API: request/response DTOs shared
// between runner-api and its clients.

pub mod run;

pub use run::*;
