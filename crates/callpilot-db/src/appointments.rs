//! Database operations for the `appointments` table.
//!
//! Appointments are keyed by the calendar provider's event id; re-syncing
//! the same event updates the existing row in place.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `appointments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub assistant_id: Option<Uuid>,
    pub calendar_event_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service: Option<String>,
    pub patient_type: Option<String>,
    pub booked_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Values parsed from one calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub tenant_id: Uuid,
    pub assistant_id: Option<Uuid>,
    pub calendar_event_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service: Option<String>,
    pub patient_type: Option<String>,
    pub booked_at: DateTime<Utc>,
}

/// Whether an upsert created a new row or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentUpsert {
    Inserted,
    Updated,
}

/// Insert an appointment, or update the row with the same
/// `calendar_event_id`.
///
/// `booked_at` and `created_at` keep their original values on update.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_appointment(
    pool: &PgPool,
    appt: &NewAppointment,
) -> Result<AppointmentUpsert, DbError> {
    // xmax is zero only for a freshly inserted tuple.
    let inserted: bool = sqlx::query_scalar(
        "INSERT INTO appointments \
             (id, tenant_id, assistant_id, calendar_event_id, start_time, end_time, \
              summary, description, email, phone, service, patient_type, booked_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (calendar_event_id) DO UPDATE SET \
             assistant_id = EXCLUDED.assistant_id, \
             start_time   = EXCLUDED.start_time, \
             end_time     = EXCLUDED.end_time, \
             summary      = EXCLUDED.summary, \
             description  = EXCLUDED.description, \
             email        = EXCLUDED.email, \
             phone        = EXCLUDED.phone, \
             service      = EXCLUDED.service, \
             patient_type = EXCLUDED.patient_type, \
             synced_at    = NOW() \
         RETURNING (xmax = 0)",
    )
    .bind(Uuid::new_v4())
    .bind(appt.tenant_id)
    .bind(appt.assistant_id)
    .bind(&appt.calendar_event_id)
    .bind(appt.start_time)
    .bind(appt.end_time)
    .bind(appt.summary.as_deref())
    .bind(appt.description.as_deref())
    .bind(appt.email.as_deref())
    .bind(appt.phone.as_deref())
    .bind(appt.service.as_deref())
    .bind(appt.patient_type.as_deref())
    .bind(appt.booked_at)
    .fetch_one(pool)
    .await?;

    Ok(if inserted {
        AppointmentUpsert::Inserted
    } else {
        AppointmentUpsert::Updated
    })
}

/// Fetch an appointment by its calendar event id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_appointment_by_event_id(
    pool: &PgPool,
    calendar_event_id: &str,
) -> Result<Option<AppointmentRow>, DbError> {
    let row = sqlx::query_as::<_, AppointmentRow>(
        "SELECT id, tenant_id, assistant_id, calendar_event_id, start_time, end_time, \
                summary, description, email, phone, service, patient_type, \
                booked_at, synced_at, created_at \
         FROM appointments \
         WHERE calendar_event_id = $1",
    )
    .bind(calendar_event_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
