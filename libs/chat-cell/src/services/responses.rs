// libs/chat-cell/src/services/responses.rs
//
// Canned reply variations so repeated turns don't read identically.

use rand::seq::SliceRandom;

pub const WELCOME: [&str; 4] = [
    "Welcome to Sunrise Medical Center's virtual assistant! How can I help you today?",
    "Hi there! I'm here to assist you with your medical needs at Sunrise Medical Center. What can I do for you?",
    "Hello! Welcome to Sunrise Medical Center's virtual assistant. How may I help you?",
    "Welcome! I'm your virtual healthcare assistant at Sunrise Medical Center. What brings you here today?",
];

pub const GREETING: [&str; 3] = [
    "Hello! How can I assist you with your visit to Sunrise Medical Center today?",
    "Hi there! I'm here to help you with appointments at Sunrise Medical Center.",
    "Welcome to Sunrise Medical Center! Would you like to book an appointment or manage an existing one?",
];

pub const MANAGING: [&str; 4] = [
    "Would you like to reschedule or cancel an appointment?",
    "I can help you manage your booking. Would you like to reschedule or cancel it?",
    "What would you like to do with your appointment - reschedule or cancel?",
    "How can I help with your appointment - reschedule or cancel?",
];

pub const LOCATION: [&str; 3] = [
    "Our clinic is located at 123 Health Street, Medical District, 50000 Kuala Lumpur, Malaysia. Need directions?",
    "You can find us at 123 Health Street, Medical District, 50000 Kuala Lumpur. We're in the Medical District area.",
    "We're conveniently located at 123 Health Street, Medical District, 50000 Kuala Lumpur, with parking available.",
];

pub const CONTACT: [&str; 3] = [
    "You can reach us at 012-345 6789 during our operating hours.",
    "Feel free to call us at 012-345 6789 for any immediate inquiries.",
    "Our clinic contact number is 012-345 6789. How can we assist you?",
];

pub const HELP: [&str; 2] = [
    "I can help you with:\n\u{2022} Booking appointments at Sunrise Medical Center\n\u{2022} Managing your existing appointments\n\u{2022} Finding our clinic location\n\u{2022} Contacting us\n\nWhat would you like to do?",
    "Here's what I can assist you with:\n1. Schedule appointments with our doctors\n2. Reschedule/cancel existing appointments\n3. Get clinic location and directions\n4. Contact information\n\nHow may I help you?",
];

pub fn pick(variants: &[&str]) -> String {
    variants
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
        .to_string()
}
