//! Testing utilities for tenancy applications
//!
//! - [`Scenario`]: HTTP endpoint testing without running a server
//! - [`TestApp`]: the tenancy router over in-memory stores
//! - [`TestDb`]: a migrated SQLite in-memory database (feature `database`)
//! - [`RecordingMailer`]: captures invitation notifications
//!
//! # Example
//!
//! ```rust,ignore
//! use stockroom::testing::{self, TestApp};
//!
//! #[tokio::test]
//! async fn test_requires_login() {
//!     let app = TestApp::new();
//!     testing::get(app.router(), "/organizations")
//!         .execute()
//!         .await
//!         .assert_unauthorized();
//! }
//! ```

mod app;
#[cfg(feature = "database")]
mod database;
mod mailer;
mod scenario;

pub use app::TestApp;
#[cfg(feature = "database")]
pub use database::TestDb;
pub use mailer::RecordingMailer;
pub use scenario::{Scenario, ScenarioAssert, delete, get, patch, post};
