pub mod audit;
pub mod check_consistency;
pub mod detect_anomalies;
pub mod dispatch;
pub mod headers;
pub mod import;
pub mod quarantine;
pub mod schema;

/// How a command that ran to completion ended. Fatal errors are `Err`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Everything processed, even if nothing matched.
    Clean,
    /// Ran, but at least one file failed.
    PartialFailure,
}
