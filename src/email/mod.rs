//! Email delivery.
//!
//! Only a development [`ConsoleMailer`] ships with the crate. Production
//! hosts plug their provider in through [`Mailer`](crate::traits::mailer::Mailer).

mod console;

pub use console::ConsoleMailer;

pub use crate::traits::mailer::{Email, Mailer};
