//! Named actions: each performs backend calls, then commits mutations.
//!
//! Fetch actions log failures and leave the cached state as it was; write
//! actions return the failure to the caller.

use super::{Mutation, StateContainer};
use crate::{
    auth::gateway::Session,
    backend::Backend,
    error::AppError,
    model::{
        attendance::AttendanceRecord,
        holiday::Holiday,
        user::{InTime, User},
    },
    models::SignupReq,
    store::{
        Collection, Document, DocumentStore, Fields, StoreError, WriteOp, merge_patch, to_fields,
    },
    utils::doc_utils::{FieldKind, build_patch},
};
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

/// Fields of an attendance record that may be edited.
const ATTENDANCE_FIELDS: &[(&str, FieldKind)] = &[
    ("inTime", FieldKind::Time),
    ("outTime", FieldKind::OptionalTime),
    ("date", FieldKind::Date),
];

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone)]
pub struct LoggedIn {
    pub user: User,
    pub session: Session,
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Document>, id_field: &str) -> Result<Vec<T>, StoreError> {
    docs.into_iter().map(|d| d.into_model(id_field)).collect()
}

fn date_taken(date: NaiveDate) -> AppError {
    AppError::Conflict(format!("Attendance already recorded for {}", date))
}

fn single_field(key: &str, value: Value) -> Fields {
    let mut fields = Fields::new();
    fields.insert(key.to_string(), value);
    fields
}

pub struct Actions<'a> {
    backend: &'a Backend,
    state: &'a StateContainer,
}

impl<'a> Actions<'a> {
    pub fn new(backend: &'a Backend, state: &'a StateContainer) -> Self {
        Self { backend, state }
    }

    fn current_user(&self) -> Result<User, AppError> {
        self.state.user().ok_or(AppError::NotAuthenticated)
    }

    async fn attendance_of(&self, uid: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        let docs = self
            .backend
            .store
            .query(Collection::Attendance, "userId", &json!(uid))
            .await?;
        decode_all(docs, "id")
    }

    // ---------------------------------------------------------------
    // Auth
    // ---------------------------------------------------------------

    /// Loads the user document into the state. A missing document or a
    /// failing store both yield `None`.
    pub async fn fetch_user_data(&self, uid: &str) -> Option<User> {
        let doc = match self.backend.store.get(Collection::Users, uid).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!(uid, "No user document");
                return None;
            }
            Err(e) => {
                error!(error = %e, uid, "Error fetching user data");
                return None;
            }
        };

        match doc.into_model::<User>("uid") {
            Ok(user) => {
                self.state
                    .commit(Mutation::SetCurrentInTime(user.current_in_time.clone()));
                self.state.commit(Mutation::SetUser(Some(user.clone())));
                Some(user)
            }
            Err(e) => {
                error!(error = %e, uid, "Malformed user document");
                None
            }
        }
    }

    /// Signs in and loads the profile. `Ok(None)` when the credentials are
    /// valid but no user document exists; no session is opened then.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<LoggedIn>, AppError> {
        let account = self.backend.auth.sign_in(email, password).await?;

        let Some(user) = self.fetch_user_data(&account.uid).await else {
            warn!(uid = %account.uid, "Signed in without a user document");
            return Ok(None);
        };

        let session = self.backend.auth.open_session(&account, user.role)?;
        Ok(Some(LoggedIn { user, session }))
    }

    /// Creates the credential, then the user document. The two writes are
    /// not atomic: a failing document write leaves the credential behind.
    pub async fn signup(&self, req: &SignupReq) -> Result<LoggedIn, AppError> {
        let name = req.name.trim();
        let department = req.department.trim();
        if name.is_empty() || department.is_empty() {
            return Err(AppError::BadRequest(
                "Name and department must not be empty".to_string(),
            ));
        }

        let account = self
            .backend
            .auth
            .create_account(&req.email, &req.password)
            .await?;

        let user = User {
            uid: account.uid.clone(),
            name: name.to_string(),
            department: department.to_string(),
            email: account.email.clone(),
            created_at: Utc::now().to_rfc3339(),
            role: self.backend.role_for(&account.email),
            current_in_time: None,
        };

        let written = match to_fields(&user, "uid") {
            Ok(fields) => self.backend.store.set(Collection::Users, &user.uid, fields).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!(error = %e, uid = %account.uid, "User document write failed; credential left orphaned");
            return Err(e.into());
        }

        let session = self.backend.auth.open_session(&account, user.role)?;
        self.state.commit(Mutation::SetUser(Some(user.clone())));

        info!(uid = %user.uid, admin = user.is_admin(), "User signed up");
        Ok(LoggedIn { user, session })
    }

    pub async fn logout(&self, sid: &str) {
        self.backend.auth.sign_out(sid).await;
        self.state.commit(Mutation::Reset);
    }

    // ---------------------------------------------------------------
    // Attendance
    // ---------------------------------------------------------------

    /// Opens today's attendance record and marks the user as clocked in.
    pub async fn record_in_time(&self) -> Result<InTime, AppError> {
        let user = self.current_user()?;
        let now = self.backend.clock.now();
        let today = now.date_naive();

        let in_time = InTime {
            time: now.format("%H:%M:%S").to_string(),
            timestamp: now.timestamp_millis(),
        };

        let existing = self.attendance_of(&user.uid).await?;
        if existing.iter().any(|r| r.date == today) {
            return Err(AppError::AlreadyRecorded);
        }

        let record = AttendanceRecord {
            id: AttendanceRecord::id_for(&user.uid, today),
            user_id: user.uid.clone(),
            in_time: in_time.time.clone(),
            out_time: None,
            date: today,
        };

        let marker = serde_json::to_value(&in_time)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        // the create on the per-day id is what actually enforces one record a day
        let result = self
            .backend
            .store
            .commit(vec![
                WriteOp::Create {
                    collection: Collection::Attendance,
                    id: record.id.clone(),
                    fields: to_fields(&record, "id")?,
                },
                WriteOp::Update {
                    collection: Collection::Users,
                    id: user.uid.clone(),
                    patch: single_field("currentInTime", marker),
                },
            ])
            .await;

        match result {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => return Err(AppError::AlreadyRecorded),
            Err(e) => return Err(e.into()),
        }

        self.state
            .commit(Mutation::SetCurrentInTime(Some(in_time.clone())));
        self.state.commit(Mutation::SetUser(Some(User {
            current_in_time: Some(in_time.clone()),
            ..user
        })));
        self.fetch_attendance().await;

        info!(record_id = %record.id, time = %in_time.time, "Clocked in");
        Ok(in_time)
    }

    /// Closes today's attendance record and clears the clock-in marker.
    pub async fn record_out_time(&self) -> Result<AttendanceRecord, AppError> {
        let user = self.current_user()?;
        let in_time = self.state.current_in_time().ok_or(AppError::NoInTime)?;

        let now = self.backend.clock.now();
        let today = now.date_naive();
        let out_time = now.format("%H:%M:%S").to_string();

        let mut record = self
            .attendance_of(&user.uid)
            .await?
            .into_iter()
            .find(|r| r.date == today)
            .ok_or(AppError::NoRecordToday)?;

        self.backend
            .store
            .commit(vec![
                WriteOp::Update {
                    collection: Collection::Attendance,
                    id: record.id.clone(),
                    patch: single_field("outTime", json!(out_time)),
                },
                WriteOp::Update {
                    collection: Collection::Users,
                    id: user.uid.clone(),
                    patch: single_field("currentInTime", Value::Null),
                },
            ])
            .await?;

        record.out_time = Some(out_time);

        self.state.commit(Mutation::SetCurrentInTime(None));
        self.state.commit(Mutation::SetUser(Some(User {
            current_in_time: None,
            ..user
        })));
        self.fetch_attendance().await;

        let worked_minutes = (now.timestamp_millis() - in_time.timestamp) / 60_000;
        info!(record_id = %record.id, worked_minutes, "Clocked out");
        Ok(record)
    }

    /// Patches any attendance record by id; there is no ownership check.
    ///
    /// A changed `date` moves the record to the id of its new day, so the
    /// one-record-per-day rule holds afterwards.
    pub async fn edit_attendance(&self, id: &str, payload: &Value) -> Result<(), AppError> {
        let patch = build_patch(payload, ATTENDANCE_FIELDS).map_err(AppError::BadRequest)?;

        let not_found = || AppError::NotFound(format!("Attendance record {} not found", id));
        let failed = |e: StoreError| {
            error!(error = %e, record_id = id, "Failed to update attendance");
            AppError::Backend(format!("Failed to update attendance: {}", e))
        };

        let doc = self
            .backend
            .store
            .get(Collection::Attendance, id)
            .await
            .map_err(failed)?
            .ok_or_else(not_found)?;
        let current: AttendanceRecord = doc.clone().into_model("id").map_err(failed)?;

        let mut body = Value::Object(doc.fields);
        merge_patch(&mut body, &Value::Object(patch.clone()));
        let Value::Object(fields) = body else {
            return Err(failed(StoreError::Serialization(
                "patched record is not an object".to_string(),
            )));
        };
        let edited: AttendanceRecord = Document {
            id: id.to_string(),
            fields,
        }
        .into_model("id")
        .map_err(failed)?;

        let ops = if edited.date == current.date {
            vec![WriteOp::Update {
                collection: Collection::Attendance,
                id: id.to_string(),
                patch,
            }]
        } else {
            let taken = self
                .attendance_of(&edited.user_id)
                .await
                .map_err(failed)?
                .iter()
                .any(|r| r.id != id && r.date == edited.date);
            if taken {
                return Err(date_taken(edited.date));
            }

            let new_id = AttendanceRecord::id_for(&edited.user_id, edited.date);
            debug!(from = id, to = %new_id, "Attendance record moved to another day");
            vec![
                WriteOp::Delete {
                    collection: Collection::Attendance,
                    id: id.to_string(),
                },
                WriteOp::Create {
                    collection: Collection::Attendance,
                    id: new_id.clone(),
                    fields: to_fields(&AttendanceRecord { id: new_id, ..edited.clone() }, "id")?,
                },
            ]
        };

        self.backend
            .store
            .commit(ops)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => not_found(),
                StoreError::AlreadyExists { .. } => date_taken(edited.date),
                e => failed(e),
            })?;

        self.fetch_attendance().await;
        Ok(())
    }

    /// Reloads the signed-in user's records. No-op without a user.
    pub async fn fetch_attendance(&self) {
        let Some(user) = self.state.user() else {
            return;
        };

        match self.attendance_of(&user.uid).await {
            Ok(records) => self.state.commit(Mutation::SetAttendance(records)),
            Err(e) => error!(error = %e, uid = %user.uid, "Error fetching attendance"),
        }
    }

    // ---------------------------------------------------------------
    // Holidays
    // ---------------------------------------------------------------

    pub async fn add_holiday(&self, date: NaiveDate, description: &str) -> Result<Holiday, AppError> {
        let user = self.current_user()?;

        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::BadRequest(
                "Holiday description must not be empty".to_string(),
            ));
        }

        let mut holiday = Holiday {
            id: String::new(),
            date,
            description: description.to_string(),
            created_by: user.uid,
        };

        holiday.id = self
            .backend
            .store
            .add(Collection::Holidays, to_fields(&holiday, "id")?)
            .await?;

        info!(holiday_id = %holiday.id, date = %holiday.date, "Holiday added");

        self.fetch_holidays().await;
        Ok(holiday)
    }

    pub async fn fetch_holidays(&self) {
        let result = self
            .backend
            .store
            .list(Collection::Holidays)
            .await
            .and_then(|docs| decode_all::<Holiday>(docs, "id"));

        match result {
            Ok(holidays) => self.state.commit(Mutation::SetHolidays(holidays)),
            Err(e) => error!(error = %e, "Error fetching holidays"),
        }
    }

    // ---------------------------------------------------------------
    // Admin
    // ---------------------------------------------------------------

    pub async fn fetch_all_users(&self) -> Vec<User> {
        let result = self
            .backend
            .store
            .list(Collection::Users)
            .await
            .and_then(|docs| decode_all::<User>(docs, "uid"));

        match result {
            Ok(users) => self.state.commit(Mutation::SetAllUsers(users)),
            Err(e) => error!(error = %e, "Error fetching users"),
        }

        self.state.snapshot().all_users
    }

    /// Deletes a user document together with all of its attendance records,
    /// in one batch. Returns the number of records removed.
    pub async fn delete_user(&self, uid: &str) -> Result<usize, AppError> {
        if self.backend.store.get(Collection::Users, uid).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", uid)));
        }

        let records = self
            .backend
            .store
            .query(Collection::Attendance, "userId", &json!(uid))
            .await?;
        let removed = records.len();

        let mut ops: Vec<WriteOp> = records
            .into_iter()
            .map(|doc| WriteOp::Delete {
                collection: Collection::Attendance,
                id: doc.id,
            })
            .collect();
        ops.push(WriteOp::Delete {
            collection: Collection::Users,
            id: uid.to_string(),
        });

        self.backend.store.commit(ops).await?;

        info!(uid, removed, "User deleted with attendance records");

        self.fetch_all_users().await;
        Ok(removed)
    }
}
