// src/formatting.rs

use crate::core::{BookingPayload, ContactInquiry};

/// A trait for rendering a submission as a human-readable chat message.
pub trait MessageFormatter<T>: Send + Sync {
    fn format(&self, item: &T) -> String;
}

/// Renders submissions as the pre-filled text of a WhatsApp chat.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatsAppFormatter;

impl MessageFormatter<BookingPayload> for WhatsAppFormatter {
    fn format(&self, booking: &BookingPayload) -> String {
        let mut lines = vec!["I want to book appointment. Details:".to_string()];
        if let Some(id) = &booking.booking_id {
            lines.push(format!("Booking ID: {}", id));
        }
        lines.push(format!("Name: {}", booking.full_name));
        lines.push(format!("Mobile: {}", booking.mobile));
        if let Some(email) = &booking.email {
            lines.push(format!("Email: {}", email));
        }
        lines.push(format!("Case Type: {}", booking.case_type));
        if let Some(slot) = &booking.time_slot {
            lines.push(format!("Time Slot: {}", slot));
        }
        lines.push(format!("Appointment Date: {}", booking.appointment_date));
        lines.push(format!(
            "Case Details: {}",
            booking.case_details.as_deref().unwrap_or_default()
        ));
        lines.join("\n")
    }
}

impl MessageFormatter<ContactInquiry> for WhatsAppFormatter {
    fn format(&self, inquiry: &ContactInquiry) -> String {
        format!(
            "New Contact Inquiry:\nName: {}\nEmail: {}\nSubject: {}\nMessage: {}",
            inquiry.name,
            inquiry.email,
            inquiry.subject.as_deref().unwrap_or("N/A"),
            inquiry.message
        )
    }
}

/// Builds a `wa.me` link that opens a chat with `phone_number` pre-filled
/// with `message`. Non-digits in the phone number are dropped.
pub fn whatsapp_deep_link(phone_number: &str, message: &str) -> String {
    let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();
    format!(
        "https://wa.me/{}?text={}",
        digits,
        urlencoding::encode(message)
    )
}

/// Recovers the message text from a link built by [`whatsapp_deep_link`].
pub fn message_from_deep_link(url: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let encoded = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("text="))?;
    urlencoding::decode(encoded).ok().map(|text| text.into_owned())
}
