//! The request proxy: envelope handling, pagination, HTTP verbs.
//!
//! [`Client`] owns the HTTP machinery: base-URL joining, basic auth on every
//! request, envelope unwrapping, and a second redirect-free client for the
//! one endpoint that answers with a 302. Resource operations live in
//! [`crate::ops`] as `impl Client` blocks.

use reqwest::Url;
use serde::Serialize;
use tracing::debug;

use concentriq_model::{PageInfo, Pagination, SortBy};

use crate::config::ClientConfig;
use crate::envelope::ApiEnvelope;
use crate::error::ClientError;

/// Client for the platform's JSON API.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) http: reqwest::Client,
    http_no_redirect: reqwest::Client,
    base_url: Url,
    user: String,
    password: String,
}

impl Client {
    /// Build a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] when the configured certificate cannot be
    /// read, [`ClientError::Http`] when the HTTP client cannot be built, or
    /// [`ClientError::Url`] for an unparseable base URL.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.api_url)?;
        let http = build_http(&config, true)?;
        let http_no_redirect = build_http(&config, false)?;

        Ok(Self {
            http,
            http_no_redirect,
            base_url,
            user: config.user,
            password: config.password,
        })
    }

    /// Join an endpoint path onto the base URL.
    pub(crate) fn endpoint_url(&self, endpoint: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(endpoint)?)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.user, Some(&self.password))
    }

    async fn unwrap_envelope(
        &self,
        response: reqwest::Response,
    ) -> Result<ApiEnvelope, ClientError> {
        Ok(response.json::<ApiEnvelope>().await?)
    }

    /// GET an endpoint and unwrap a non-paginated envelope.
    pub(crate) async fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, ClientError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "GET");
        let mut builder = self.authed(self.http.get(url));
        if !params.is_empty() {
            builder = builder.query(params);
        }
        let response = builder.send().await?;
        self.unwrap_envelope(response).await?.into_data()
    }

    /// GET an endpoint with an arbitrary serializable query.
    pub(crate) async fn get_with_query<Q: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        query: &Q,
    ) -> Result<serde_json::Value, ClientError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "GET");
        let response = self.authed(self.http.get(url)).query(query).send().await?;
        self.unwrap_envelope(response).await?.into_data()
    }

    /// GET a page of a listing endpoint; `params` must already carry the
    /// `pagination` parameter.
    pub(crate) async fn get_page(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<(serde_json::Value, PageInfo), ClientError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "GET (paginated)");
        let response = self
            .authed(self.http.get(url))
            .query(params)
            .send()
            .await?;
        self.unwrap_envelope(response).await?.into_page()
    }

    /// GET an endpoint that answers with a raw (non-envelope) body.
    pub(crate) async fn get_text(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<String, ClientError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "GET (text)");
        let mut builder = self.authed(self.http.get(url));
        if !params.is_empty() {
            builder = builder.query(params);
        }
        Ok(builder.send().await?.text().await?)
    }

    /// GET an endpoint that answers with a redirect, returning the target.
    pub(crate) async fn get_redirect_location(
        &self,
        endpoint: &str,
    ) -> Result<String, ClientError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "GET (redirect)");
        let response = self.authed(self.http_no_redirect.get(url)).send().await?;

        let status = response.status().as_u16();
        if status != 302 {
            return Err(ClientError::UnexpectedResponse(format!(
                "expected redirect, got HTTP status {status}"
            )));
        }
        response
            .headers()
            .get("location")
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
            .ok_or_else(|| {
                ClientError::UnexpectedResponse("redirect without Location header".to_owned())
            })
    }

    /// POST a form-encoded body.
    pub(crate) async fn post_form<F: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        form: &F,
    ) -> Result<serde_json::Value, ClientError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "POST");
        let response = self.authed(self.http.post(url)).form(form).send().await?;
        self.unwrap_envelope(response).await?.into_data()
    }

    /// POST a pre-serialized JSON body.
    pub(crate) async fn post_json_text(
        &self,
        endpoint: &str,
        body: String,
    ) -> Result<serde_json::Value, ClientError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "POST (json)");
        let response = self
            .authed(self.http.post(url))
            .header("content-type", "application/json;charset=UTF-8")
            .body(body)
            .send()
            .await?;
        self.unwrap_envelope(response).await?.into_data()
    }

    /// POST one file as a multipart form.
    pub(crate) async fn post_multipart(
        &self,
        endpoint: &str,
        part_name: &str,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<serde_json::Value, ClientError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "POST (multipart)");
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part(part_name.to_owned(), part);
        let response = self
            .authed(self.http.post(url))
            .multipart(form)
            .send()
            .await?;
        self.unwrap_envelope(response).await?.into_data()
    }

    /// PATCH a form-encoded body.
    pub(crate) async fn patch_form<F: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        form: &F,
    ) -> Result<serde_json::Value, ClientError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "PATCH");
        let response = self.authed(self.http.patch(url)).form(form).send().await?;
        self.unwrap_envelope(response).await?.into_data()
    }

    /// DELETE an endpoint.
    pub(crate) async fn delete(&self, endpoint: &str) -> Result<serde_json::Value, ClientError> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "DELETE");
        let response = self.authed(self.http.delete(url)).send().await?;
        self.unwrap_envelope(response).await?.into_data()
    }
}

/// Apply the shared TLS configuration and build one HTTP client.
fn build_http(config: &ClientConfig, follow_redirects: bool) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder();
    if let Some(path) = &config.ssl_certificate {
        let pem = std::fs::read(path)?;
        builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
    }
    if !follow_redirects {
        builder = builder.redirect(reqwest::redirect::Policy::none());
    }
    Ok(builder.build()?)
}

/// Page-by-page iteration over a listing endpoint.
///
/// Pages are requested lazily; iteration ends at the first page reporting
/// zero returned rows.
#[derive(Debug)]
pub struct PageCursor<'a> {
    client: &'a Client,
    endpoint: String,
    base_params: Vec<(String, String)>,
    rows_per_page: u32,
    sort_by: SortBy,
    descending: bool,
    next_page: u32,
    done: bool,
}

impl<'a> PageCursor<'a> {
    pub(crate) fn new(
        client: &'a Client,
        endpoint: impl Into<String>,
        base_params: Vec<(String, String)>,
        offset: u32,
        rows_per_page: u32,
        sort_by: SortBy,
        descending: bool,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            base_params,
            rows_per_page,
            sort_by,
            descending,
            next_page: offset + 1,
            done: false,
        }
    }

    /// Fetch the next page's data member, or `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Propagates request and envelope errors; the cursor stays usable
    /// afterwards only if the caller retries the same page.
    pub async fn next_page(&mut self) -> Result<Option<serde_json::Value>, ClientError> {
        if self.done {
            return Ok(None);
        }

        let pagination = Pagination {
            rows_per_page: self.rows_per_page,
            page: self.next_page,
            sort_by: self.sort_by,
            descending: self.descending,
        };
        let mut params = self.base_params.clone();
        params.push(("pagination".to_owned(), serde_json::to_string(&pagination)?));

        let (data, info) = self.client.get_page(&self.endpoint, &params).await?;
        if info.rows_returned <= 0 {
            self.done = true;
            return Ok(None);
        }
        self.next_page += 1;
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> Client {
        Client::new(ClientConfig {
            api_url: "https://concentriq.example.com/".to_owned(),
            user: "you@example.com".to_owned(),
            password: "hunter2".to_owned(),
            ssl_certificate: None,
        })
        .unwrap()
    }

    #[test]
    fn test_should_join_endpoints_onto_base_url() {
        let client = test_client();
        assert_eq!(
            client.endpoint_url("imageSets/5").unwrap().as_str(),
            "https://concentriq.example.com/imageSets/5"
        );
        assert_eq!(
            client
                .endpoint_url("auth/sign/s3-multipart-url/image/42")
                .unwrap()
                .as_str(),
            "https://concentriq.example.com/auth/sign/s3-multipart-url/image/42"
        );
    }

    #[test]
    fn test_should_format_api_error_like_the_platform() {
        let error = ClientError::Api(concentriq_model::ApiErrorBody {
            status: 404,
            name: "NotFoundError".to_owned(),
            code: 1404,
            message: "image not found".to_owned(),
        });
        assert_eq!(error.to_string(), "NotFoundError [404] image not found");
    }
}
