//! # Admin Page Controller
//!
//! State behind one admin list page (courses, testimonials, ...).
//!
//! ```text
//! Loading -> Idle <-> FormOpen -> Submitting -> Idle
//!              |                      |
//!              |                      +-> FormOpen (store refused, input kept)
//!              +-> ConfirmDelete -> Idle
//! ```
//!
//! - Every successful write is followed by a full list read, the list is never patched locally
//! - Only one action runs at a time: methods take `&mut self` and submit is refused outside `FormOpen`
//! - Validation failures stay on the form as inline messages, store and transport failures become a
//!   blocking notice
use tracing::warn;

use crate::{
    error::ActionError,
    gateway::ResourceApi,
    schema::{Fields, Record, Resource},
    session::{LOGIN_PATH, Session, SessionFlag},
    validation::{FieldErrors, validate},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    Redirect(&'static str),
    Loading,
    Idle,
    FormOpen { editing: Option<u64> },
    Submitting { editing: Option<u64> },
    ConfirmDelete { id: u64 },
}

pub struct ResourcePage<'a, A: ResourceApi> {
    api: &'a A,
    resource: Resource,
    state: PageState,
    records: Vec<Record>,
    form: Fields,
    errors: FieldErrors,
    notice: Option<String>,
}

impl<'a, A: ResourceApi> ResourcePage<'a, A> {
    /// Checks the session, then loads the list. Unauthenticated visitors are sent to the login view.
    pub async fn open(api: &'a A, resource: Resource, session: &SessionFlag) -> Self {
        let mut page = Self {
            api,
            resource,
            state: PageState::Loading,
            records: Vec::new(),
            form: resource.blank_form(),
            errors: FieldErrors::new(),
            notice: None,
        };

        if session.session() == Session::Unauthenticated {
            page.state = PageState::Redirect(LOGIN_PATH);
            return page;
        }

        page.refresh().await;
        page
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn form(&self) -> &Fields {
        &self.form
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    async fn refresh(&mut self) {
        match self.api.list(self.resource).await {
            Ok(records) => self.records = records,
            Err(e) => {
                warn!("Failed to load {}: {e}", self.resource);
                self.notice = Some(e.to_string());
            }
        }
        self.state = PageState::Idle;
    }

    /// "Add New": empty form, nothing being edited.
    pub fn open_new(&mut self) -> bool {
        if self.state != PageState::Idle {
            return false;
        }

        self.form = self.resource.blank_form();
        self.errors.clear();
        self.state = PageState::FormOpen { editing: None };
        true
    }

    /// "Edit": form pre-filled from the listed record. Null columns stay null so saving does not
    /// turn them into empty strings.
    pub fn open_edit(&mut self, id: u64) -> bool {
        if self.state != PageState::Idle {
            return false;
        }
        let Some(record) = self.records.iter().find(|record| record.id == id) else {
            return false;
        };

        let mut form = self.resource.blank_form();
        for (name, value) in form.iter_mut() {
            *value = record.fields.get(name).cloned().flatten();
        }

        self.form = form;
        self.errors.clear();
        self.state = PageState::FormOpen { editing: Some(id) };
        true
    }

    /// Editing a field clears its inline error.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        if !matches!(self.state, PageState::FormOpen { .. }) || !self.form.contains_key(name) {
            return;
        }

        self.form.insert(name.to_string(), Some(value.into()));
        self.errors.remove(name);
    }

    pub fn close_form(&mut self) {
        if matches!(self.state, PageState::FormOpen { .. }) {
            self.form = self.resource.blank_form();
            self.errors.clear();
            self.state = PageState::Idle;
        }
    }

    pub async fn submit(&mut self) -> Result<Record, ActionError> {
        let PageState::FormOpen { editing } = self.state else {
            return Err(ActionError::Store("No form is open".to_string()));
        };

        let errors = validate(self.resource.fields(), &self.form);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(ActionError::Validation(errors));
        }

        self.errors.clear();
        self.state = PageState::Submitting { editing };

        let fields = self.form.clone();
        let result = match editing {
            Some(id) => self.api.update(self.resource, id, fields).await,
            None => self.api.create(self.resource, fields).await,
        };

        match result {
            Ok(record) => {
                self.form = self.resource.blank_form();
                self.notice = None;
                self.refresh().await;
                Ok(record)
            }
            Err(e) => {
                warn!("Saving {} failed: {e}", self.resource);
                self.notice = Some(e.to_string());
                self.state = PageState::FormOpen { editing };
                Err(e)
            }
        }
    }

    /// First step of a delete, the operator must confirm.
    pub fn request_delete(&mut self, id: u64) -> bool {
        if self.state != PageState::Idle {
            return false;
        }

        self.state = PageState::ConfirmDelete { id };
        true
    }

    pub fn cancel_delete(&mut self) {
        if matches!(self.state, PageState::ConfirmDelete { .. }) {
            self.state = PageState::Idle;
        }
    }

    pub async fn confirm_delete(&mut self) -> Result<(), ActionError> {
        let PageState::ConfirmDelete { id } = self.state else {
            return Err(ActionError::Store("Nothing to delete".to_string()));
        };

        let result = self.api.delete(self.resource, id).await;
        if let Err(e) = &result {
            warn!("Deleting {} {id} failed: {e}", self.resource);
            self.notice = Some(e.to_string());
        }

        self.refresh().await;
        result
    }
}
