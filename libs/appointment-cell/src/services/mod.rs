pub mod booking;
pub mod lifecycle;
pub mod notification;
pub mod store;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use notification::{AppwriteSmsNotifier, BookingNotifier, LogNotifier};
pub use store::{AppointmentStore, AppwriteAppointmentStore, InMemoryAppointmentStore};
