//! Presence checks that turn raw form input into immutable payloads.
//!
//! Nothing here inspects the shape of a value; a field is either present
//! (non-blank) or missing.

use crate::core::{BookingForm, BookingPayload, CaseType, ContactForm, ContactInquiry};
use crate::error::ValidationError;
use chrono::NaiveDate;

/// Display format for appointment dates, e.g. "Monday, January 1, 2024".
pub const APPOINTMENT_DATE_FORMAT: &str = "%A, %B %-d, %Y";

pub fn format_appointment_date(date: NaiveDate) -> String {
    date.format(APPOINTMENT_DATE_FORMAT).to_string()
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ValidationError> {
    present(value).ok_or(ValidationError::MissingField(field))
}

impl BookingForm {
    /// Validates the form. The appointment date is checked first.
    pub fn validate(&self, require_email: bool) -> Result<BookingPayload, ValidationError> {
        let date = self.appointment_date.ok_or(ValidationError::MissingDate)?;

        let full_name = required(&self.full_name, "fullName")?;
        let email = if require_email {
            Some(required(&self.email, "email")?)
        } else {
            present(&self.email)
        };
        let mobile = required(&self.mobile, "mobile")?;
        let case_type = CaseType::from(required(&self.case_type, "caseType")?);

        Ok(BookingPayload {
            full_name,
            mobile,
            email,
            case_type,
            time_slot: present(&self.time_slot),
            case_details: present(&self.case_details),
            appointment_date: format_appointment_date(date),
            booking_id: None,
            timestamp: None,
        })
    }
}

impl ContactForm {
    pub fn validate(&self) -> Result<ContactInquiry, ValidationError> {
        Ok(ContactInquiry {
            name: required(&self.name, "name")?,
            email: required(&self.email, "email")?,
            subject: present(&self.subject),
            message: required(&self.message, "message")?,
        })
    }
}
