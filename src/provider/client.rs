use reqwest::Response;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::BudgetError;
use crate::provider::types::{Institution, RefreshResponse, RequisitionResponse, TokenResponse};

/// Thin reqwest wrapper over the provider REST API.
///
/// No retries and no caching here: failures surface immediately and the
/// caller decides whether to repeat the higher-level flow.
#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    base: Url,
}

impl ProviderClient {
    /// Build a client with a preconfigured HTTP stack.
    pub fn new(base: Url) -> Result<Self, BudgetError> {
        let http = reqwest::Client::builder()
            .user_agent("budgetlink/0.2")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, BudgetError> {
        Ok(self.base.join(path)?)
    }

    /// Map a non-2xx response to `BudgetError::Provider` with the raw body.
    async fn check(resp: Response) -> Result<Response, BudgetError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "provider rejected request");
        Err(BudgetError::Provider {
            status: status.as_u16(),
            body,
        })
    }

    /// `POST /token/new/` with the installation credentials.
    pub async fn token_new(
        &self,
        secret_id: &str,
        secret_key: &str,
    ) -> Result<TokenResponse, BudgetError> {
        let resp = self
            .http
            .post(self.endpoint("token/new/")?)
            .json(&json!({ "secret_id": secret_id, "secret_key": secret_key }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// `POST /token/refresh/` exchanging the refresh token.
    pub async fn token_refresh(&self, refresh: &str) -> Result<RefreshResponse, BudgetError> {
        let resp = self
            .http
            .post(self.endpoint("token/refresh/")?)
            .json(&json!({ "refresh": refresh }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// `GET /institutions?country=` for a 2-letter country code.
    pub async fn institutions(
        &self,
        access: &str,
        country: &str,
    ) -> Result<Vec<Institution>, BudgetError> {
        let resp = self
            .http
            .get(self.endpoint("institutions")?)
            .query(&[("country", country)])
            .bearer_auth(access)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// `POST /requisitions/` opening a new linking request.
    pub async fn requisition_create(
        &self,
        access: &str,
        institution_id: &str,
        redirect: &str,
    ) -> Result<RequisitionResponse, BudgetError> {
        let resp = self
            .http
            .post(self.endpoint("requisitions/")?)
            .bearer_auth(access)
            .json(&json!({ "institution_id": institution_id, "redirect": redirect }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// `GET /requisitions/{id}/` to observe resolved accounts.
    pub async fn requisition_get(
        &self,
        access: &str,
        requisition_id: &str,
    ) -> Result<RequisitionResponse, BudgetError> {
        let resp = self
            .http
            .get(self.endpoint(&format!("requisitions/{requisition_id}/"))?)
            .bearer_auth(access)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// `DELETE /requisitions/{id}/` revoking consent upstream.
    /// Distinguished error: the engine keeps local rows when this fails.
    pub async fn requisition_delete(
        &self,
        access: &str,
        requisition_id: &str,
    ) -> Result<(), BudgetError> {
        let resp = self
            .http
            .delete(self.endpoint(&format!("requisitions/{requisition_id}/"))?)
            .bearer_auth(access)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(BudgetError::InvalidRequisition)
        }
    }

    /// `GET /accounts/{id}/transactions`, returned raw for the normalizer.
    pub async fn account_transactions(
        &self,
        access: &str,
        account_id: &str,
    ) -> Result<Value, BudgetError> {
        let resp = self
            .http
            .get(self.endpoint(&format!("accounts/{account_id}/transactions"))?)
            .bearer_auth(access)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// `GET /accounts/{id}/balances`, returned raw for the normalizer.
    pub async fn account_balances(
        &self,
        access: &str,
        account_id: &str,
    ) -> Result<Value, BudgetError> {
        let resp = self
            .http
            .get(self.endpoint(&format!("accounts/{account_id}/balances"))?)
            .bearer_auth(access)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
