//! Kinocheck verification layer
//!
//! Black-box checks against a movie-database site and its REST API:
//! - `api` / `contract` send API requests and judge the `{ "docs": [...] }`
//!   envelope plus one business rule per flow
//! - `locator`, `waiter`, `consent` and `probe` drive a browser page through
//!   UI flows that tolerate markup drift
//! - `runner` executes a suite serially and collects results; `report` stores
//!   evidence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  TestRunner                                                  │
//! │    ├── ApiSession (one per run, shared)                     │
//! │    │     └── ApiContractChecker -> ContractVerdict          │
//! │    │           └── predicates -> BusinessPredicate          │
//! │    └── SessionProvider::acquire / release (one per flow)    │
//! │          └── UiProbe                                        │
//! │                ├── ConsentHandler::try_dismiss              │
//! │                ├── PageStateWaiter::await_ready             │
//! │                └── ResilientLocator::locate                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ReportSink: evidence/<check>/<name>.{png,txt,html}         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod browser;
pub mod consent;
pub mod contract;
pub mod error;
pub mod locator;
pub mod predicates;
pub mod probe;
pub mod report;
pub mod runner;
pub mod selectors;
pub mod suite;
pub mod waiter;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiContractChecker, ApiSession};
pub use browser::{ChromeProvider, ChromeSession, PageDriver, PageSnapshot, SessionProvider};
pub use contract::ApiCheck;
pub use error::{E2eError, E2eResult};
pub use probe::{UiFlow, UiProbe};
pub use report::{FlowOutcome, FsReportSink, ReportSink};
pub use runner::{CheckResult, SuiteResult, TestRunner};
pub use suite::{default_suite, CheckSpec, CheckTarget};
