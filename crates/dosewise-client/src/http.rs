//! HTTP client for the Dosewise server.
//!
//! One [`HttpBackend`] holds the bearer token of the signed-in user and
//! exposes every API route as a typed method.

use std::sync::RwLock;

use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use dosewise_shared::api::{
    AdherenceReport, DefaultTimes, MedicationDetail, PatientDetail, RosterEntry, ServerInfo,
    ShareRequest, VitalTrendReport,
};
use dosewise_shared::auth::{AuthResponse, AuthState, Credentials};
use dosewise_shared::models::{
    AlertResolution, DoseEntry, Medication, MedicationInput, MedicationLog, MedicationTime,
    PatientAlert, Profile, ProfileUpdate, Registration, SharedProfile, Sharing, Vital, VitalInput,
};
use dosewise_shared::types::VitalKind;
use dosewise_shared::validation::{
    validate_medication, validate_profile_update, validate_vital, FieldError, ValidationErrors,
};

use crate::backend::AuthBackend;
use crate::error::{ClientError, Result};

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(default)]
    fields: Vec<FieldError>,
}

/// Turn a non-2xx response body into a [`ClientError`].
pub(crate) fn decode_error(status: u16, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody { error }) if error.code == "PROFILE_MISSING" => ClientError::ProfileMissing,
        Ok(ErrorBody { error }) if !error.fields.is_empty() => {
            ClientError::Validation(ValidationErrors(error.fields))
        }
        Ok(ErrorBody { error }) => ClientError::Api {
            status,
            code: error.code,
            message: error.message,
        },
        Err(_) => ClientError::Api {
            status,
            code: "UNKNOWN".into(),
            message: String::from_utf8_lossy(body).trim().to_string(),
        },
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await?;
    Err(decode_error(status.as_u16(), &body))
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    /// Resume a session persisted by the caller.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn public(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.token().ok_or(ClientError::NotAuthenticated)?;
        Ok(self.public(method, path).bearer_auth(token))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<()> {
        check(request.send().await?).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Instance
    // -----------------------------------------------------------------------

    pub async fn server_info(&self) -> Result<ServerInfo> {
        self.fetch(self.public(Method::GET, "/info")).await
    }

    pub async fn default_times(&self, frequency: &str) -> Result<DefaultTimes> {
        let request = self
            .public(Method::GET, "/schedule/default-times")
            .query(&[("frequency", frequency)]);
        self.fetch(request).await
    }

    // -----------------------------------------------------------------------
    // Profile
    // -----------------------------------------------------------------------

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        validate_profile_update(update)?;
        self.fetch(self.authed(Method::PATCH, "/profile")?.json(update))
            .await
    }

    // -----------------------------------------------------------------------
    // Medications
    // -----------------------------------------------------------------------

    pub async fn medications(&self, include_inactive: bool) -> Result<Vec<Medication>> {
        let request = self
            .authed(Method::GET, "/medications")?
            .query(&[("include_inactive", include_inactive)]);
        self.fetch(request).await
    }

    pub async fn medication(&self, id: Uuid) -> Result<MedicationDetail> {
        self.fetch(self.authed(Method::GET, &format!("/medications/{id}"))?)
            .await
    }

    pub async fn create_medication(&self, input: &MedicationInput) -> Result<MedicationDetail> {
        validate_medication(input)?;
        self.fetch(self.authed(Method::POST, "/medications")?.json(input))
            .await
    }

    pub async fn update_medication(
        &self,
        id: Uuid,
        input: &MedicationInput,
    ) -> Result<MedicationDetail> {
        validate_medication(input)?;
        let request = self
            .authed(Method::PUT, &format!("/medications/{id}"))?
            .json(input);
        self.fetch(request).await
    }

    pub async fn delete_medication(&self, id: Uuid) -> Result<()> {
        self.execute(self.authed(Method::DELETE, &format!("/medications/{id}"))?)
            .await
    }

    pub async fn medication_times(&self, id: Uuid) -> Result<Vec<MedicationTime>> {
        self.fetch(self.authed(Method::GET, &format!("/medications/{id}/times"))?)
            .await
    }

    // -----------------------------------------------------------------------
    // Dose logs and adherence
    // -----------------------------------------------------------------------

    pub async fn today_logs(&self) -> Result<Vec<DoseEntry>> {
        self.fetch(self.authed(Method::GET, "/logs/today")?).await
    }

    /// Logs scheduled from `from` through `to`, both inclusive.
    pub async fn logs_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<MedicationLog>> {
        let request = self
            .authed(Method::GET, "/logs")?
            .query(&[("from", from.to_string()), ("to", to.to_string())]);
        self.fetch(request).await
    }

    pub async fn mark_taken(&self, log_id: Uuid) -> Result<MedicationLog> {
        self.fetch(self.authed(Method::POST, &format!("/logs/{log_id}/taken"))?)
            .await
    }

    pub async fn mark_skipped(&self, log_id: Uuid) -> Result<MedicationLog> {
        self.fetch(self.authed(Method::POST, &format!("/logs/{log_id}/skipped"))?)
            .await
    }

    /// `None` uses the server default of 7 days.
    pub async fn adherence(&self, days: Option<u32>) -> Result<AdherenceReport> {
        let mut request = self.authed(Method::GET, "/adherence")?;
        if let Some(days) = days {
            request = request.query(&[("days", days)]);
        }
        self.fetch(request).await
    }

    // -----------------------------------------------------------------------
    // Vitals
    // -----------------------------------------------------------------------

    pub async fn vitals(&self, kind: Option<VitalKind>, limit: Option<usize>) -> Result<Vec<Vital>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(kind) = kind {
            query.push(("type", kind.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.fetch(self.authed(Method::GET, "/vitals")?.query(&query))
            .await
    }

    pub async fn add_vital(&self, input: &VitalInput) -> Result<Vital> {
        validate_vital(input)?;
        self.fetch(self.authed(Method::POST, "/vitals")?.json(input))
            .await
    }

    pub async fn update_vital(&self, id: Uuid, input: &VitalInput) -> Result<Vital> {
        validate_vital(input)?;
        self.fetch(self.authed(Method::PUT, &format!("/vitals/{id}"))?.json(input))
            .await
    }

    pub async fn delete_vital(&self, id: Uuid) -> Result<()> {
        self.execute(self.authed(Method::DELETE, &format!("/vitals/{id}"))?)
            .await
    }

    pub async fn vital_trend(&self, kind: VitalKind) -> Result<VitalTrendReport> {
        let request = self
            .authed(Method::GET, "/vitals/trend")?
            .query(&[("type", kind.as_str())]);
        self.fetch(request).await
    }

    // -----------------------------------------------------------------------
    // Sharing
    // -----------------------------------------------------------------------

    pub async fn shared_doctors(&self) -> Result<Vec<SharedProfile>> {
        self.fetch(self.authed(Method::GET, "/sharing")?).await
    }

    pub async fn share_with_doctor(&self, doctor_code: &str) -> Result<Sharing> {
        let body = ShareRequest {
            doctor_code: doctor_code.trim().to_string(),
        };
        self.fetch(self.authed(Method::POST, "/sharing")?.json(&body))
            .await
    }

    pub async fn stop_sharing(&self, doctor_id: Uuid) -> Result<()> {
        self.execute(self.authed(Method::DELETE, &format!("/sharing/{doctor_id}"))?)
            .await
    }

    /// Rendered PDF of the last 30 days.
    pub async fn history_report(&self) -> Result<Vec<u8>> {
        let request = self.authed(Method::GET, "/report.pdf")?;
        let response = check(request.send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // -----------------------------------------------------------------------
    // Clinic
    // -----------------------------------------------------------------------

    pub async fn roster(&self) -> Result<Vec<RosterEntry>> {
        self.fetch(self.authed(Method::GET, "/clinic/patients")?)
            .await
    }

    pub async fn patient_detail(&self, patient_id: Uuid) -> Result<PatientDetail> {
        self.fetch(self.authed(Method::GET, &format!("/clinic/patients/{patient_id}"))?)
            .await
    }

    pub async fn revoke_patient(&self, patient_id: Uuid) -> Result<()> {
        self.execute(self.authed(Method::DELETE, &format!("/clinic/patients/{patient_id}"))?)
            .await
    }

    pub async fn alerts(&self) -> Result<Vec<PatientAlert>> {
        self.fetch(self.authed(Method::GET, "/clinic/alerts")?).await
    }

    pub async fn resolve_alert(&self, alert_id: &str) -> Result<AlertResolution> {
        let path = format!("/clinic/alerts/{alert_id}/resolve");
        self.fetch(self.authed(Method::POST, &path)?).await
    }
}

impl AuthBackend for HttpBackend {
    async fn session(&self) -> Result<AuthState> {
        if self.token().is_none() {
            return Ok(AuthState::Unauthenticated);
        }
        let state: AuthState = self.fetch(self.authed(Method::GET, "/auth/session")?).await?;
        if state == AuthState::Unauthenticated {
            self.set_token(None);
        }
        Ok(state)
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let request = self.public(Method::POST, "/auth/login").json(credentials);
        let response: AuthResponse = self.fetch(request).await?;
        self.set_token(Some(response.token.clone()));
        Ok(response)
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse> {
        let request = self.public(Method::POST, "/auth/register").json(registration);
        let response: AuthResponse = self.fetch(request).await?;
        self.set_token(Some(response.token.clone()));
        Ok(response)
    }

    async fn logout(&self) -> Result<()> {
        let result = match self.authed(Method::POST, "/auth/logout") {
            Ok(request) => self.execute(request).await,
            Err(e) => Err(e),
        };
        self.set_token(None);
        result
    }

    async fn fetch_profile(&self) -> Result<Profile> {
        self.fetch(self.authed(Method::GET, "/profile")?).await
    }
}
