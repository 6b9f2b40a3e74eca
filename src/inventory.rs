//! The inventory view: collection state, query, form and notices behind one
//! owner. Every handler takes `&mut self`, so handlers never interleave over
//! the same state; a slow request simply holds the borrow until it resolves.
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::{ProductStore, StoreError};
use crate::form::{Field, Form, FormMode, ValidationError};
use crate::model::Product;
use crate::notify::{Channel, Notifier};
use crate::view::{SortField, TableState, ViewCache, ViewQuery};

pub const MSG_CREATED: &str = "Product created successfully";
pub const MSG_UPDATED: &str = "Product updated successfully";
pub const MSG_DELETED: &str = "Product deleted successfully";
pub const MSG_FETCH_FAILED: &str = "Failed to fetch products";
pub const MSG_DELETE_FAILED: &str = "Delete failed";
pub const MSG_OPERATION_FAILED: &str = "Operation failed";
pub const PROMPT_DELETE: &str = "Delete this product?";

/// Blocking yes/no question put to the user before a destructive action.
#[async_trait]
pub trait Confirm: Send {
    async fn confirm(&mut self, prompt: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Inventory<S> {
    store: S,
    products: Vec<Product>,
    revision: u64,
    loading: watch::Sender<bool>,
    query: ViewQuery,
    cache: ViewCache,
    form: Form,
    notices: Notifier,
}

impl<S: ProductStore> Inventory<S> {
    pub fn new(store: S, notice_ttl: Duration) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            store,
            products: Vec::new(),
            revision: 0,
            loading,
            query: ViewQuery::default(),
            cache: ViewCache::default(),
            form: Form::new(),
            notices: Notifier::new(notice_ttl),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Empty form plus the initial fetch.
    pub async fn mount(&mut self) {
        self.form.reset();
        if let Err(err) = self.refresh().await {
            debug!(?err, "initial fetch failed; error notice shown");
        }
    }

    /// Replace the collection with a fresh `list()`.
    #[instrument(skip_all)]
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        self.loading.send_replace(true);
        let result = self.store.list().await;
        self.loading.send_replace(false);
        match result {
            Ok(products) => {
                info!(count = products.len(), "collection refreshed");
                self.products = products;
                self.revision += 1;
                self.notices.clear(Channel::Error);
                if let FormMode::Editing { id } = self.form.mode() {
                    if !self.products.iter().any(|p| p.id == id) {
                        warn!(id, "edited product vanished; resetting form");
                        self.form.reset();
                    }
                }
                Ok(())
            }
            Err(err) => {
                warn!(?err, "failed to fetch products");
                self.notices.set(Channel::Error, MSG_FETCH_FAILED);
                Err(err)
            }
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn total(&self) -> usize {
        self.products.len()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Follows the loading flag. Handlers hold `&mut self` while a request is
    /// in flight, so a front-end learns about it through this receiver.
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.query.filter = filter.into();
    }

    pub fn sort_by(&mut self, field: SortField) {
        self.query.toggle_sort(field);
    }

    /// Current table contents: filter + sort of the last successful fetch.
    pub fn table(&mut self) -> TableState {
        if self.is_loading() {
            return TableState::Loading;
        }
        let rows = self.cache.get(self.revision, &self.products, &self.query);
        if rows.is_empty() {
            TableState::Empty
        } else {
            TableState::Rows(rows.to_vec())
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> bool {
        self.form.set_field(field, value)
    }

    pub fn start_edit(&mut self, product: &Product) {
        self.form.start_edit(product);
        self.notices.clear_all();
    }

    /// Start editing the collection entry with `id`. False if there is none.
    pub fn start_edit_id(&mut self, id: i64) -> bool {
        match self.products.iter().find(|p| p.id == id).cloned() {
            Some(product) => {
                self.start_edit(&product);
                true
            }
            None => false,
        }
    }

    pub fn cancel_edit(&mut self) {
        self.form.reset();
    }

    /// Validate the draft, then create or update depending on the form mode.
    /// On success the form resets and the collection is re-fetched; on
    /// failure the draft and mode stay as they were.
    #[instrument(skip_all)]
    pub async fn submit(&mut self) -> Result<Product, ActionError> {
        let payload = match self.form.validate() {
            Ok(payload) => payload,
            Err(err) => {
                debug!(%err, "draft rejected");
                self.notices.set(Channel::Error, err.to_string());
                return Err(err.into());
            }
        };

        self.loading.send_replace(true);
        self.notices.clear_all();
        let mode = self.form.mode();
        let result = match mode {
            FormMode::Create => self.store.create(&payload).await,
            FormMode::Editing { id } => self.store.update(id, &payload).await,
        };
        self.loading.send_replace(false);

        match result {
            Ok(product) => {
                let message = match mode {
                    FormMode::Create => MSG_CREATED,
                    FormMode::Editing { .. } => MSG_UPDATED,
                };
                info!(id = product.id, ?mode, "product saved");
                self.notices.set(Channel::Success, message);
                self.form.reset();
                if let Err(err) = self.refresh().await {
                    debug!(?err, "re-fetch after save failed; error notice shown");
                }
                Ok(product)
            }
            Err(err) => {
                warn!(?err, ?mode, "failed to save product");
                self.notices
                    .set(Channel::Error, err.user_message(MSG_OPERATION_FAILED));
                Err(err.into())
            }
        }
    }

    /// Delete after confirmation. Returns `Ok(false)` when the user declined.
    #[instrument(skip(self, confirm))]
    pub async fn delete(&mut self, id: i64, confirm: &mut dyn Confirm) -> Result<bool, ActionError> {
        if !confirm.confirm(PROMPT_DELETE).await {
            debug!(id, "delete declined");
            return Ok(false);
        }

        self.loading.send_replace(true);
        self.notices.clear_all();
        let result = self.store.delete(id).await;
        self.loading.send_replace(false);

        match result {
            Ok(()) => {
                self.notices.set(Channel::Success, MSG_DELETED);
                if let Err(err) = self.refresh().await {
                    debug!(?err, "re-fetch after delete failed; error notice shown");
                }
                Ok(true)
            }
            Err(err) => {
                warn!(?err, id, "failed to delete product");
                let message = err.detail().unwrap_or(MSG_DELETE_FAILED).to_string();
                self.notices.set(Channel::Error, message);
                Err(err.into())
            }
        }
    }

    pub async fn ping(&self) -> Result<String, StoreError> {
        self.store.ping().await
    }

    pub fn notice(&self, channel: Channel) -> Option<&str> {
        self.notices.get(channel)
    }

    pub fn drain_notices(&mut self) -> Vec<Channel> {
        self.notices.drain()
    }

    pub async fn next_dismissal(&mut self) -> Channel {
        self.notices.next_dismissal().await
    }
}
