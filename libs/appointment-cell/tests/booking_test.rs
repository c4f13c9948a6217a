use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentAction, AppointmentError, AppointmentStatus, BookingEventKind,
    BookingNotification, NotificationError, StoreError,
};
use appointment_cell::services::{
    AppointmentBookingService, AppointmentStore, BookingNotifier, InMemoryAppointmentStore,
};
use intake_cell::models::RawFields;
use intake_cell::services::IntakeValidator;

struct RecordingNotifier {
    sender: mpsc::UnboundedSender<BookingNotification>,
}

#[async_trait]
impl BookingNotifier for RecordingNotifier {
    async fn notify(&self, notification: &BookingNotification) -> Result<(), NotificationError> {
        let _ = self.sender.send(notification.clone());
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl BookingNotifier for FailingNotifier {
    async fn notify(&self, _notification: &BookingNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Delivery("sms gateway down".to_string()))
    }
}

/// Delegates to an in-memory store until writes are switched off.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryAppointmentStore,
    reject_writes: AtomicBool,
}

#[async_trait]
impl AppointmentStore for FlakyStore {
    async fn put_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write timed out".to_string()));
        }
        self.inner.put_appointment(appointment).await
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.inner.get_appointment(id).await
    }
}

/// Holds every read for a while so concurrent transitions see the same snapshot.
#[derive(Default)]
struct SlowReadStore {
    inner: InMemoryAppointmentStore,
}

#[async_trait]
impl AppointmentStore for SlowReadStore {
    async fn put_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.inner.put_appointment(appointment).await
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let appointment = self.inner.get_appointment(id).await;
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        appointment
    }
}

fn raw(value: Value) -> RawFields {
    value.as_object().cloned().expect("test payload must be an object")
}

fn tomorrow_at_ten() -> String {
    let tomorrow = Utc::now() + Duration::days(1);
    format!("{}T10:00:00Z", tomorrow.format("%Y-%m-%d"))
}

fn create_payload(reason: &str) -> RawFields {
    raw(json!({
        "userId": "user-1",
        "patient": "patient-1",
        "primaryPhysician": "Dr. Lee",
        "schedule": tomorrow_at_ten(),
        "reason": reason,
        "note": "prefers mornings"
    }))
}

fn recording_service<S: AppointmentStore + 'static>(
    store: Arc<S>,
) -> (AppointmentBookingService, mpsc::UnboundedReceiver<BookingNotification>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let service = AppointmentBookingService::new(
        IntakeValidator::with_default_rules(),
        store,
        Arc::new(RecordingNotifier { sender }),
    );
    (service, receiver)
}

async fn next_notification(receiver: &mut mpsc::UnboundedReceiver<BookingNotification>) -> BookingNotification {
    tokio::time::timeout(StdDuration::from_secs(2), receiver.recv())
        .await
        .expect("notification was not dispatched in time")
        .expect("notification channel closed")
}

async fn assert_no_notification(receiver: &mut mpsc::UnboundedReceiver<BookingNotification>) {
    let outcome = tokio::time::timeout(StdDuration::from_millis(200), receiver.recv()).await;
    assert!(outcome.is_err(), "unexpected notification: {:?}", outcome);
}

#[tokio::test]
async fn create_produces_pending_appointment_and_request_notification() {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let (service, mut notifications) = recording_service(store.clone());

    let appointment = service.create_appointment(&create_payload("checkup")).await.unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.reason, "checkup");
    assert_eq!(appointment.cancellation_reason, None);

    let stored = service.get_appointment(appointment.id).await.unwrap();
    assert_eq!(stored, appointment);
    assert_eq!(stored.note.as_deref(), Some("prefers mornings"));
    assert_eq!(stored.primary_physician, "Dr. Lee");

    let notification = next_notification(&mut notifications).await;
    assert_eq!(notification.kind, BookingEventKind::BookingRequested);
    assert_eq!(notification.recipient, "user-1");
    assert_eq!(notification.appointment_id, appointment.id);
    assert!(notification.message.starts_with("Your appointment request with Dr. Lee for "));
}

#[tokio::test]
async fn confirm_then_cancel_then_reschedule_is_rejected() {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let (service, mut notifications) = recording_service(store.clone());

    let created = service.create_appointment(&create_payload("checkup")).await.unwrap();
    next_notification(&mut notifications).await;

    let schedule = raw(json!({ "primaryPhysician": "Dr. Lee", "schedule": tomorrow_at_ten() }));
    let scheduled = service.schedule_appointment(created.id, &schedule).await.unwrap();
    assert_eq!(scheduled.status, AppointmentStatus::Scheduled);
    assert_eq!(scheduled.reason, "checkup");
    assert_eq!(
        next_notification(&mut notifications).await.kind,
        BookingEventKind::BookingConfirmed
    );

    let cancel = raw(json!({ "cancellationReason": "patient request" }));
    let cancelled = service.cancel_appointment(created.id, &cancel).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("patient request"));
    let notification = next_notification(&mut notifications).await;
    assert_eq!(notification.kind, BookingEventKind::BookingCancelled);
    assert!(notification.message.ends_with("Reason: patient request."));
    assert!(service.allowed_actions(&cancelled).is_empty());

    let result = service.schedule_appointment(created.id, &schedule).await;
    assert_matches!(
        result,
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Cancelled,
            action: AppointmentAction::Schedule
        })
    );

    let stored = service.get_appointment(created.id).await.unwrap();
    assert_eq!(stored, cancelled);
    assert_no_notification(&mut notifications).await;
}

#[tokio::test]
async fn schedule_can_amend_reason_and_time() {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let (service, _notifications) = recording_service(store);

    let created = service.create_appointment(&create_payload("checkup")).await.unwrap();
    let later = (Utc::now() + Duration::days(3)).to_rfc3339();

    let amended = service
        .schedule_appointment(
            created.id,
            &raw(json!({ "primaryPhysician": "Dr. Okafor", "schedule": later, "reason": "follow-up" })),
        )
        .await
        .unwrap();

    assert_eq!(amended.primary_physician, "Dr. Okafor");
    assert_eq!(amended.reason, "follow-up");
    assert!(amended.schedule > created.schedule);
    assert!(amended.updated_at >= created.updated_at);
}

#[tokio::test]
async fn empty_reason_is_rejected_without_creating_anything() {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let (service, mut notifications) = recording_service(store.clone());

    let result = service.create_appointment(&create_payload("")).await;

    let errors = assert_matches!(result, Err(AppointmentError::Validation(errors)) => errors);
    assert!(errors.has_field("reason"));
    assert!(store.is_empty().await);
    assert_no_notification(&mut notifications).await;
}

#[tokio::test]
async fn unknown_appointment_is_not_found() {
    let (service, _notifications) = recording_service(Arc::new(InMemoryAppointmentStore::new()));
    let missing = Uuid::new_v4();

    assert_matches!(service.get_appointment(missing).await, Err(AppointmentError::NotFound(id)) if id == missing);
    assert_matches!(
        service
            .cancel_appointment(missing, &raw(json!({ "cancellationReason": "duplicate" })))
            .await,
        Err(AppointmentError::NotFound(_))
    );
}

#[tokio::test]
async fn persistence_failure_leaves_record_unchanged_and_silent() {
    let store = Arc::new(FlakyStore::default());
    let (service, mut notifications) = recording_service(store.clone());

    let created = service.create_appointment(&create_payload("checkup")).await.unwrap();
    next_notification(&mut notifications).await;

    store.reject_writes.store(true, Ordering::SeqCst);
    let result = service
        .cancel_appointment(created.id, &raw(json!({ "cancellationReason": "patient request" })))
        .await;

    assert_matches!(result, Err(AppointmentError::Persistence(StoreError::Unavailable(_))));
    assert_eq!(service.get_appointment(created.id).await.unwrap(), created);
    assert_no_notification(&mut notifications).await;
}

#[tokio::test]
async fn schedule_racing_a_cancel_cannot_revive_it() {
    let store = Arc::new(SlowReadStore::default());
    let (service, mut notifications) = recording_service(store.clone());
    let service = Arc::new(service);

    let created = service.create_appointment(&create_payload("checkup")).await.unwrap();
    next_notification(&mut notifications).await;
    let id = created.id;

    let cancel = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .cancel_appointment(id, &raw(json!({ "cancellationReason": "patient request" })))
                .await
        })
    };
    tokio::time::sleep(StdDuration::from_millis(10)).await;
    let schedule = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .schedule_appointment(
                    id,
                    &raw(json!({ "primaryPhysician": "Dr. Lee", "schedule": tomorrow_at_ten() })),
                )
                .await
        })
    };

    let cancelled = cancel.await.unwrap().unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_matches!(
        schedule.await.unwrap(),
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Cancelled,
            action: AppointmentAction::Schedule
        })
    );

    let stored = service.get_appointment(id).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Cancelled);
    assert_eq!(stored.cancellation_reason.as_deref(), Some("patient request"));
    assert_eq!(
        next_notification(&mut notifications).await.kind,
        BookingEventKind::BookingCancelled
    );
    assert_no_notification(&mut notifications).await;
}

#[tokio::test]
async fn failing_notifier_never_fails_the_transition() {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let service = AppointmentBookingService::new(
        IntakeValidator::with_default_rules(),
        store.clone(),
        Arc::new(FailingNotifier),
    );

    let appointment = tokio_test::assert_ok!(service.create_appointment(&create_payload("checkup")).await);

    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(store.len().await, 1);
}
