use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    applications::SellerApplicationDraft,
    client::{
        api::SellerApplicationGateway,
        session::{Session, validate_before_submit},
    },
};

/// How long the confirmation stays visible before the form closes itself.
pub const AUTO_CLOSE_DELAY: Duration = Duration::from_secs(2);

pub const CONFIRMATION_MESSAGE: &str = "Your seller application has been submitted successfully. We'll review it and get back to you soon.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    BusinessName,
    BusinessType,
    Description,
    Address,
    City,
    State,
    Pincode,
    GstNumber,
    BankAccount,
    IfscCode,
}

/// Observable form state.
///
/// Validation runs synchronously inside [`SellerApplicationForm::submit`], so
/// it never shows up here on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Editing,
    /// Editing with the one consolidated error message on display.
    Invalid(String),
    Submitting,
    Submitted,
}

struct FormInner {
    draft: SellerApplicationDraft,
    status: FormStatus,
    open: bool,
    // Bumped on every close so late results from an earlier session are dropped.
    generation: u64,
    auto_close: Option<JoinHandle<()>>,
}

impl FormInner {
    fn close(&mut self) {
        if let Some(handle) = self.auto_close.take() {
            handle.abort();
        }
        self.draft = SellerApplicationDraft::default();
        self.status = FormStatus::Editing;
        self.open = false;
        self.generation += 1;
    }
}

fn lock(inner: &Mutex<FormInner>) -> MutexGuard<'_, FormInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Headless seller-onboarding form: collects the draft, validates it, submits it
/// once, and closes itself shortly after a successful submission.
pub struct SellerApplicationForm<G> {
    gateway: G,
    inner: Arc<Mutex<FormInner>>,
}

impl<G: SellerApplicationGateway> SellerApplicationForm<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            inner: Arc::new(Mutex::new(FormInner {
                draft: SellerApplicationDraft::default(),
                status: FormStatus::Editing,
                open: false,
                generation: 0,
                auto_close: None,
            })),
        }
    }

    pub fn open(&self) {
        lock(&self.inner).open = true;
    }

    pub fn is_open(&self) -> bool {
        lock(&self.inner).open
    }

    pub fn status(&self) -> FormStatus {
        lock(&self.inner).status.clone()
    }

    pub fn error(&self) -> Option<String> {
        match &lock(&self.inner).status {
            FormStatus::Invalid(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Text to show while the form sits in [`FormStatus::Submitted`].
    pub fn confirmation(&self) -> Option<&'static str> {
        match lock(&self.inner).status {
            FormStatus::Submitted => Some(CONFIRMATION_MESSAGE),
            _ => None,
        }
    }

    pub fn draft(&self) -> SellerApplicationDraft {
        lock(&self.inner).draft.clone()
    }

    /// Updates one field; a displayed error is cleared by any edit.
    pub fn set_field(&self, field: FormField, value: impl Into<String>) {
        let mut inner = lock(&self.inner);
        let draft = &mut inner.draft;
        let slot = match field {
            FormField::BusinessName => &mut draft.business_name,
            FormField::BusinessType => &mut draft.business_type,
            FormField::Description => &mut draft.description,
            FormField::Address => &mut draft.address,
            FormField::City => &mut draft.city,
            FormField::State => &mut draft.state,
            FormField::Pincode => &mut draft.pincode,
            FormField::GstNumber => &mut draft.gst_number,
            FormField::BankAccount => &mut draft.bank_account,
            FormField::IfscCode => &mut draft.ifsc_code,
        };
        *slot = value.into();

        if matches!(inner.status, FormStatus::Invalid(_)) {
            inner.status = FormStatus::Editing;
        }
    }

    /// Validates and submits the draft. Returns the resulting status.
    ///
    /// While a submission is in flight (or after one succeeded) further calls
    /// are ignored.
    pub async fn submit(&self, session: &Session) -> FormStatus {
        let (token, draft, generation) = {
            let mut inner = lock(&self.inner);
            if matches!(inner.status, FormStatus::Submitting | FormStatus::Submitted) {
                return inner.status.clone();
            }

            match validate_before_submit(session, &inner.draft) {
                Ok(token) => {
                    inner.status = FormStatus::Submitting;
                    (token.to_string(), inner.draft.clone(), inner.generation)
                }
                Err(err) => {
                    inner.status = FormStatus::Invalid(err.message().to_string());
                    return inner.status.clone();
                }
            }
        };

        let result = self.gateway.submit(&token, &draft).await;

        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            // Closed while the request was in flight.
            return inner.status.clone();
        }

        match result {
            Ok(receipt) => {
                info!(application_id = ?receipt.application_id, "seller application accepted");
                inner.status = FormStatus::Submitted;
                inner.auto_close = Some(schedule_auto_close(
                    Arc::downgrade(&self.inner),
                    generation,
                ));
            }
            Err(err) => {
                warn!(?err, "seller application submission failed");
                inner.status = FormStatus::Invalid(err.user_message());
            }
        }

        inner.status.clone()
    }

    /// Closes the form, discarding the draft and any pending auto-close.
    pub fn close(&self) {
        lock(&self.inner).close();
    }
}

impl<G> Drop for SellerApplicationForm<G> {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.inner).auto_close.take() {
            handle.abort();
        }
    }
}

fn schedule_auto_close(inner: Weak<Mutex<FormInner>>, generation: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(AUTO_CLOSE_DELAY).await;

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut inner = lock(&inner);
        if inner.generation == generation {
            // Detach our own handle instead of aborting the running task.
            inner.auto_close.take();
            inner.close();
        }
    })
}
