#![allow(dead_code)]

use booking_relay::core::{BookingForm, ContactForm};
use chrono::NaiveDate;

pub fn booking_form() -> BookingForm {
    BookingForm {
        full_name: Some("A".to_string()),
        mobile: Some("9999999999".to_string()),
        email: Some("a@example.com".to_string()),
        case_type: Some("criminal".to_string()),
        time_slot: Some("1 PM".to_string()),
        case_details: Some("Bail hearing".to_string()),
        appointment_date: NaiveDate::from_ymd_opt(2024, 1, 1),
    }
}

pub fn contact_form() -> ContactForm {
    ContactForm {
        name: Some("B".to_string()),
        email: Some("b@example.com".to_string()),
        subject: Some("Lease".to_string()),
        message: Some("Hi".to_string()),
    }
}
