//! Appointment sync from a tenant's assistant calendar.
//!
//! [`CalendarClient`] reads events and refreshes OAuth access tokens,
//! [`appointment_from_event`] turns one event into an appointment row, and
//! [`sync_all_tenants`] mirrors every connected calendar into `appointments`.

pub mod client;
pub mod error;
pub mod parse;
pub mod sync;
pub mod types;

pub use client::{CalendarClient, RefreshedToken};
pub use error::CalendarError;
pub use parse::appointment_from_event;
pub use sync::{sync_all_tenants, sync_tenant, CalendarSyncReport, TenantSyncReport};
pub use types::{Attendee, CalendarEvent, EventTime};
