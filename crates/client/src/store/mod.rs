//! Order/cart state container.
//!
//! [`OrderStore`] owns the draft order and the cached order history for one
//! signed-in user. It is a cheaply cloneable handle; every clone sees the same
//! state.
//!
//! # Concurrency
//!
//! - State sits behind one mutex that is never held across an await
//! - Page counts are resolved on the blocking pool after a document is added.
//!   The result is applied only if the document is still in the cart and still
//!   pending, so a late count never brings back a removed file
//! - Only one [`OrderStore::place_order`] runs at a time; a second caller gets
//!   [`OrderError::AlreadySubmitting`]
//! - The order history is most-recent-first
//! - [`OrderStore::clear`] starts a new generation. Replies to requests sent
//!   before it are returned to the caller but never written into the store

mod error;
mod limits;
mod pages;

pub use error::{CartError, OrderError};
pub use limits::{FileLimits, FileUpload, guess_mime_type};
pub use pages::{PageCountError, PageCounter, PdfPageCounter};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use campus_print_core::{
    Amount, DraftOrder, FileId, OrderFile, OrderId, OrderStatus, PickupCode, PrintSettings,
    SettingUpdate, SettingsError, SubmittedOrder, UploadedFile,
};
use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, NewOrder, OrderService};
use crate::auth::AuthSession;
use crate::sync::lock;
use crate::telemetry;

/// Result of a successful [`OrderStore::place_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    /// Code the student shows at the counter.
    pub otp: PickupCode,
    /// The order as it now appears at the head of the history.
    pub order: SubmittedOrder,
}

#[derive(Debug, Default)]
struct StoreState {
    draft: DraftOrder,
    orders: Vec<SubmittedOrder>,
    /// Bumped by every `clear`.
    generation: u64,
}

/// Shared cart and order-history state.
pub struct OrderStore<S: OrderService = ApiClient> {
    inner: Arc<StoreInner<S>>,
}

struct StoreInner<S> {
    service: S,
    counter: Arc<dyn PageCounter>,
    limits: FileLimits,
    state: Mutex<StoreState>,
    submitting: AtomicBool,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: OrderService> Clone for OrderStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: OrderService> std::fmt::Debug for OrderStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("OrderStore")
            .field("files", &state.draft.len())
            .field("orders", &state.orders.len())
            .field("limits", &self.inner.limits)
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when submission ends, however it ends.
struct SubmitGuard<'a>(&'a AtomicBool);

impl<'a> SubmitGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: OrderService> OrderStore<S> {
    /// Create a store that counts pages with [`PdfPageCounter`].
    #[must_use]
    pub fn new(service: S, limits: FileLimits) -> Self {
        Self::with_page_counter(service, limits, Arc::new(PdfPageCounter))
    }

    #[must_use]
    pub fn with_page_counter(
        service: S,
        limits: FileLimits,
        counter: Arc<dyn PageCounter>,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                service,
                counter,
                limits,
                state: Mutex::new(StoreState::default()),
                submitting: AtomicBool::new(false),
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn limits(&self) -> &FileLimits {
        &self.inner.limits
    }

    // =========================================================================
    // Draft
    // =========================================================================

    /// Add a document to the cart.
    ///
    /// The page count starts out pending and is resolved in the background
    /// when a tokio runtime is available, otherwise before this returns. A
    /// document that cannot be counted prints as one page.
    ///
    /// # Errors
    ///
    /// Returns a `CartError` if the upload breaks the configured limits. The
    /// cart is unchanged in that case.
    pub fn add_file(&self, upload: FileUpload) -> Result<FileId, CartError> {
        let mut state = lock(&self.inner.state);
        self.inner.limits.check_document(&upload, state.draft.len())?;

        let file = UploadedFile::document(upload.name, upload.mime_type, upload.content);
        let id = file.id;
        let mime_type = file.mime_type.clone();
        let content = Arc::clone(&file.content);
        debug!(file_id = %id, name = %file.name, size = file.size, "Added file");
        state.draft.push(file);
        drop(state);

        self.resolve_pages(id, mime_type, content);
        Ok(id)
    }

    /// Add a fixed-price stationery item.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidItem` for a blank name or negative price and
    /// `CartError::CartFull` when there is no room.
    pub fn add_stationery_item(&self, name: &str, price: Amount) -> Result<FileId, CartError> {
        let mut state = lock(&self.inner.state);
        self.inner
            .limits
            .check_stationery(name, price, state.draft.len())?;

        let item = UploadedFile::stationery(name.trim(), price);
        let id = item.id;
        debug!(file_id = %id, name = %item.name, price = %price, "Added stationery item");
        state.draft.push(item);
        Ok(id)
    }

    /// Remove an entry. Returns false if no entry has `id`.
    pub fn remove_file(&self, id: FileId) -> bool {
        let removed = lock(&self.inner.state).draft.remove(id);
        if removed {
            debug!(file_id = %id, "Removed file");
        }
        removed
    }

    /// Change one print setting. Copies below 1 are stored as 1.
    pub fn update_setting(&self, update: SettingUpdate) {
        lock(&self.inner.state).draft.update_setting(update);
        debug!(setting = %update.key(), "Updated setting");
    }

    /// Change one print setting given as a key/value pair such as
    /// `("copies", "3")`.
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError` for an unknown key or unparseable value.
    pub fn update_setting_named(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.update_setting(SettingUpdate::parse(key, value)?);
        Ok(())
    }

    /// Price of the cart as it stands. Pending page counts bill as one page.
    #[must_use]
    pub fn calculate_total(&self) -> Amount {
        lock(&self.inner.state).draft.total()
    }

    /// Wait for every page count started so far to finish.
    pub async fn settle(&self) {
        loop {
            let handles = std::mem::take(&mut *lock(&self.inner.pending));
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                match handle.await {
                    Err(e) if !e.is_cancelled() => warn!(error = %e, "Page count task failed"),
                    _ => {}
                }
            }
        }
    }

    /// Snapshot of the draft order.
    #[must_use]
    pub fn draft(&self) -> DraftOrder {
        lock(&self.inner.state).draft.clone()
    }

    #[must_use]
    pub fn files(&self) -> Vec<UploadedFile> {
        lock(&self.inner.state).draft.files().to_vec()
    }

    #[must_use]
    pub fn settings(&self) -> PrintSettings {
        *lock(&self.inner.state).draft.settings()
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit the cart as an order for `session`'s user.
    ///
    /// `total` is the amount the user agreed to pay. On success the submitted
    /// entries leave the cart and the new order is put at the head of the
    /// history. On failure the cart is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - `OrderError::AlreadySubmitting` while another submission is running
    /// - `OrderError::EmptyCart` if there is nothing to submit
    /// - `OrderError::TotalMismatch` if the cart changed since `total` was shown
    /// - `OrderError::Api` if the backend rejects the order or cannot be reached
    #[instrument(skip_all, fields(user_id = %session.user.id, total = %total))]
    pub async fn place_order(
        &self,
        session: &AuthSession,
        total: Amount,
    ) -> Result<PlacedOrder, OrderError> {
        let _guard =
            SubmitGuard::acquire(&self.inner.submitting).ok_or(OrderError::AlreadySubmitting)?;

        let (order, submitted, generation) = {
            let state = lock(&self.inner.state);
            if state.draft.is_empty() {
                return Err(OrderError::EmptyCart);
            }
            let expected = state.draft.total();
            if expected != total {
                return Err(OrderError::TotalMismatch {
                    expected,
                    submitted: total,
                });
            }

            let files = state.draft.files();
            let order = NewOrder {
                user_id: session.user.id.clone(),
                user_email: session.user.email.clone(),
                files: files.iter().map(OrderFile::from).collect(),
                settings: *state.draft.settings(),
                total_amount: expected,
            };
            let ids: Vec<FileId> = files.iter().map(|file| file.id).collect();
            (order, ids, state.generation)
        };

        let receipt = match self.inner.service.place_order(&order).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %e, "Order submission failed");
                return Err(e.into());
            }
        };

        let otp = receipt.otp.clone();
        let placed = receipt.order.unwrap_or_else(|| SubmittedOrder {
            id: receipt.order_id.unwrap_or_else(provisional_order_id),
            user_id: order.user_id,
            user_email: Some(order.user_email),
            files: order.files,
            settings: order.settings,
            total_amount: order.total_amount,
            otp: otp.clone(),
            status: OrderStatus::Paid,
            created_at: Utc::now(),
        });

        {
            let mut state = lock(&self.inner.state);
            if state.generation == generation {
                state.draft.remove_submitted(&submitted);
                state.orders.insert(0, placed.clone());
            } else {
                debug!(order_id = %placed.id, "Store cleared during submission, not recording order");
            }
        }

        info!(order_id = %placed.id, files = submitted.len(), "Order placed");
        telemetry::add_breadcrumb(
            "order",
            "Placed order",
            &[
                ("order_id", placed.id.as_str()),
                ("total", placed.total_amount.to_string().as_str()),
            ],
        );

        Ok(PlacedOrder { otp, order: placed })
    }

    /// Returns true while a submission is in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.inner.submitting.load(Ordering::Acquire)
    }

    // =========================================================================
    // Order history
    // =========================================================================

    /// Mark a paid order as printed.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order is not cached,
    /// `OrderError::InvalidTransition` unless it is currently paid, and
    /// `OrderError::Api` if the backend refuses.
    pub async fn mark_as_printed(&self, id: &OrderId) -> Result<SubmittedOrder, OrderError> {
        self.advance(id, OrderStatus::Printed).await
    }

    /// Mark a printed order as collected.
    ///
    /// # Errors
    ///
    /// As [`OrderStore::mark_as_printed`]; the order must currently be printed.
    pub async fn mark_as_collected(&self, id: &OrderId) -> Result<SubmittedOrder, OrderError> {
        self.advance(id, OrderStatus::Collected).await
    }

    /// Check the pickup code a student presents.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order is not cached.
    pub fn verify_pickup(&self, id: &OrderId, otp: &str) -> Result<bool, OrderError> {
        let state = lock(&self.inner.state);
        let order = find(&state.orders, id)?;
        Ok(order.otp.matches(otp))
    }

    /// Verify the pickup code, then mark the order collected.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OtpMismatch` for a wrong code, otherwise as
    /// [`OrderStore::mark_as_collected`].
    pub async fn collect_with_otp(
        &self,
        id: &OrderId,
        otp: &str,
    ) -> Result<SubmittedOrder, OrderError> {
        if !self.verify_pickup(id, otp)? {
            warn!(order_id = %id, "Pickup code mismatch");
            return Err(OrderError::OtpMismatch);
        }
        self.mark_as_collected(id).await
    }

    /// Replace the cached history with the backend's list.
    ///
    /// Students only keep their own orders; vendors and admins keep all.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Api` if the list cannot be fetched. The cache is
    /// left unchanged in that case.
    #[instrument(skip_all, fields(user_id = %session.user.id, role = %session.user.role))]
    pub async fn refresh_orders(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<SubmittedOrder>, OrderError> {
        let generation = lock(&self.inner.state).generation;
        let mut orders = self.inner.service.list_orders().await?;
        if !session.user.role.sees_all_orders() {
            orders.retain(|order| order.user_id == session.user.id);
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        debug!(count = orders.len(), "Refreshed orders");
        let mut state = lock(&self.inner.state);
        if state.generation == generation {
            state.orders.clone_from(&orders);
        }
        drop(state);
        Ok(orders)
    }

    /// Cached orders, most recent first.
    #[must_use]
    pub fn orders(&self) -> Vec<SubmittedOrder> {
        lock(&self.inner.state).orders.clone()
    }

    /// Orders not yet collected.
    #[must_use]
    pub fn active_orders(&self) -> Vec<SubmittedOrder> {
        lock(&self.inner.state)
            .orders
            .iter()
            .filter(|order| order.is_active())
            .cloned()
            .collect()
    }

    /// Collected orders.
    #[must_use]
    pub fn order_history(&self) -> Vec<SubmittedOrder> {
        lock(&self.inner.state)
            .orders
            .iter()
            .filter(|order| !order.is_active())
            .cloned()
            .collect()
    }

    /// Drop the cart and the cached history.
    pub fn clear(&self) {
        for handle in std::mem::take(&mut *lock(&self.inner.pending)) {
            handle.abort();
        }
        let mut state = lock(&self.inner.state);
        state.draft.clear();
        state.orders.clear();
        state.generation = state.generation.wrapping_add(1);
        debug!(generation = state.generation, "Cleared order store");
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[instrument(skip_all, fields(order_id = %id, to = %target))]
    async fn advance(
        &self,
        id: &OrderId,
        target: OrderStatus,
    ) -> Result<SubmittedOrder, OrderError> {
        let current = find(&lock(&self.inner.state).orders, id)?.status;
        if !current.can_transition_to(target) {
            return Err(OrderError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        let confirmed = self.inner.service.update_order_status(id, target).await?;

        let mut state = lock(&self.inner.state);
        let updated = match state.orders.iter_mut().find(|order| &order.id == id) {
            Some(order) => {
                match confirmed {
                    Some(server) => *order = server,
                    // A refresh during the request may have moved it further
                    None if order.status.can_transition_to(target) => order.status = target,
                    None => {}
                }
                order.clone()
            }
            // Cleared while the request was in flight
            None => confirmed.ok_or_else(|| OrderError::NotFound(id.clone()))?,
        };
        drop(state);

        info!(from = %current, to = %updated.status, "Order status changed");
        telemetry::add_breadcrumb(
            "order",
            "Changed order status",
            &[("order_id", id.as_str()), ("status", updated.status.as_str())],
        );
        Ok(updated)
    }

    fn resolve_pages(&self, id: FileId, mime_type: String, content: Arc<[u8]>) {
        let counter = Arc::clone(&self.inner.counter);
        let count = move || count_or_default(counter.as_ref(), &mime_type, &content);

        let Ok(handle) = Handle::try_current() else {
            self.inner.apply_page_count(id, count());
            return;
        };

        let weak: Weak<StoreInner<S>> = Arc::downgrade(&self.inner);
        let task = handle.spawn(async move {
            let pages = match tokio::task::spawn_blocking(count).await {
                Ok(pages) => pages,
                Err(e) => {
                    warn!(file_id = %id, error = %e, "Page count task failed");
                    1
                }
            };
            if let Some(inner) = weak.upgrade() {
                inner.apply_page_count(id, pages);
            }
        });

        let mut pending = lock(&self.inner.pending);
        pending.retain(|handle| !handle.is_finished());
        pending.push(task);
    }
}

impl<S> StoreInner<S> {
    fn apply_page_count(&self, id: FileId, pages: u32) {
        let mut state = lock(&self.state);
        match state.draft.get_mut(id) {
            Some(file) => {
                if file.resolve_pages(pages) {
                    debug!(file_id = %id, pages, "Resolved page count");
                }
            }
            None => debug!(file_id = %id, "File removed before its page count resolved"),
        }
    }
}

/// Count pages, falling back to one page when counting fails.
fn count_or_default(counter: &dyn PageCounter, mime_type: &str, content: &[u8]) -> u32 {
    match counter.count_pages(mime_type, content) {
        Ok(0) => 1,
        Ok(pages) => pages,
        Err(e) => {
            warn!(mime_type, error = %e, "Could not count pages, billing as one page");
            1
        }
    }
}

fn find<'a>(orders: &'a [SubmittedOrder], id: &OrderId) -> Result<&'a SubmittedOrder, OrderError> {
    orders
        .iter()
        .find(|order| &order.id == id)
        .ok_or_else(|| OrderError::NotFound(id.clone()))
}

/// Stand-in ID for an accepted order the backend didn't identify; replaced on
/// the next [`OrderStore::refresh_orders`].
fn provisional_order_id() -> OrderId {
    OrderId::new(format!("local-{}", uuid::Uuid::new_v4()))
}
