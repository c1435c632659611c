//! Per-session state container.
//!
//! Holds the client-side cache of one session. Only [`Mutation`]s change it,
//! and only actions commit mutations.

pub mod actions;

use crate::model::{
    attendance::AttendanceRecord,
    holiday::Holiday,
    user::{InTime, User},
};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use strum::IntoStaticStr;
use utoipa::ToSchema;

pub use actions::{Actions, LoggedIn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<User>,
    pub attendance: Vec<AttendanceRecord>,
    pub holidays: Vec<Holiday>,
    /// Filled by the admin user listing
    pub all_users: Vec<User>,
    pub current_in_time: Option<InTime>,
}

#[derive(Debug, Clone, IntoStaticStr)]
pub enum Mutation {
    SetUser(Option<User>),
    SetAttendance(Vec<AttendanceRecord>),
    SetHolidays(Vec<Holiday>),
    SetAllUsers(Vec<User>),
    SetCurrentInTime(Option<InTime>),
    /// Drops everything cached for the session.
    Reset,
}

impl SessionState {
    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::SetUser(user) => self.user = user,
            Mutation::SetAttendance(records) => self.attendance = records,
            Mutation::SetHolidays(holidays) => self.holidays = holidays,
            Mutation::SetAllUsers(users) => self.all_users = users,
            Mutation::SetCurrentInTime(time) => self.current_in_time = time,
            Mutation::Reset => *self = SessionState::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct StateContainer {
    state: Mutex<SessionState>,
}

impl StateContainer {
    pub fn commit(&self, mutation: Mutation) {
        let name: &'static str = (&mutation).into();
        tracing::trace!(mutation = name, "commit");

        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(mutation);
    }

    pub fn snapshot(&self) -> SessionState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    pub fn current_in_time(&self) -> Option<InTime> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_in_time
            .clone()
    }
}
