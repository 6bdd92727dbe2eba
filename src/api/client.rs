use crate::api::dto::{
    decode_items, properties_from_json, AgentDto, AgentEnvelope, AuthResponseDto, ItemEnvelope,
    ListEnvelope, PropertyDto, PropertyPayloadDto, RateResponseDto, UserEnvelope,
};
use crate::api::traits::RemoteApi;
use crate::api::types::{AuthSession, ProfileUpdate, PropertyDraft, PropertyQuery, RegisterRequest};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{Agent, Property, PropertyStatus, Rating, User};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP implementation of the remote API
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("estate-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and decode a JSON body, mapping failures at the boundary
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let body = self.send_raw(builder).await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to decode response: {}", e);
            ApiError::Decode(e.to_string())
        })
    }

    async fn send_raw(&self, builder: RequestBuilder) -> ApiResult<String> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Backend returned status: {}", status);
            return Err(ApiError::from_response(status.as_u16(), &body));
        }

        debug!("Received {} bytes", body.len());
        Ok(body)
    }

    async fn send_property(&self, builder: RequestBuilder) -> ApiResult<Property> {
        let envelope: ItemEnvelope<PropertyDto> = self.send(builder).await?;
        Property::try_from(envelope.into_inner())
    }
}

#[async_trait]
impl RemoteApi for RestClient {
    async fn login(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        let builder = self
            .request(Method::POST, "/auth/login", None)
            .json(&json!({ "email": email, "password": password }));
        let dto: AuthResponseDto = self.send(builder).await?;
        info!("Signed in as {}", dto.user.email);
        Ok(dto.into())
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthSession> {
        let builder = self.request(Method::POST, "/auth/register", None).json(&json!({
            "name": request.name,
            "email": request.email,
            "password": request.password,
            "phone": request.phone,
            "role": if request.as_agent { "agent" } else { "user" },
        }));
        let dto: AuthResponseDto = self.send(builder).await?;
        Ok(dto.into())
    }

    async fn me(&self, token: &str) -> ApiResult<User> {
        let envelope: UserEnvelope = self.send(self.request(Method::GET, "/auth/me", Some(token))).await?;
        Ok(envelope.into())
    }

    async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let builder = self
            .request(Method::POST, "/auth/forgot-password", None)
            .json(&json!({ "email": email }));
        self.send_raw(builder).await.map(|_| ())
    }

    async fn reset_password(&self, reset_token: &str, new_password: &str) -> ApiResult<()> {
        let builder = self
            .request(Method::POST, &format!("/auth/reset-password/{}", reset_token), None)
            .json(&json!({ "password": new_password }));
        self.send_raw(builder).await.map(|_| ())
    }

    async fn delete_account(&self, token: &str) -> ApiResult<()> {
        self.send_raw(self.request(Method::DELETE, "/auth/delete", Some(token)))
            .await
            .map(|_| ())
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> ApiResult<User> {
        let builder = self.request(Method::PUT, "/users/profile", Some(token)).json(update);
        let envelope: UserEnvelope = self.send(builder).await?;
        Ok(envelope.into())
    }

    async fn save_property(&self, token: &str, property_id: &str) -> ApiResult<()> {
        let path = format!("/users/saved/{}", property_id);
        self.send_raw(self.request(Method::POST, &path, Some(token)))
            .await
            .map(|_| ())
    }

    async fn unsave_property(&self, token: &str, property_id: &str) -> ApiResult<()> {
        let path = format!("/users/saved/{}", property_id);
        self.send_raw(self.request(Method::DELETE, &path, Some(token)))
            .await
            .map(|_| ())
    }

    async fn list_properties(&self, query: &PropertyQuery) -> ApiResult<Vec<Property>> {
        let builder = self
            .request(Method::GET, "/properties", None)
            .query(&query.to_pairs());
        let envelope: ListEnvelope<Value> = self.send(builder).await?;
        Ok(properties_from_json(envelope.into_vec()))
    }

    async fn get_property(&self, id: &str) -> ApiResult<Property> {
        self.send_property(self.request(Method::GET, &format!("/properties/{}", id), None))
            .await
    }

    async fn create_property(&self, token: &str, draft: &PropertyDraft) -> ApiResult<Property> {
        let builder = self
            .request(Method::POST, "/properties", Some(token))
            .json(&PropertyPayloadDto::from(draft));
        self.send_property(builder).await
    }

    async fn update_property(&self, token: &str, id: &str, draft: &PropertyDraft) -> ApiResult<Property> {
        let builder = self
            .request(Method::PUT, &format!("/properties/{}", id), Some(token))
            .json(&PropertyPayloadDto::from(draft));
        self.send_property(builder).await
    }

    async fn update_status(&self, token: &str, id: &str, status: PropertyStatus) -> ApiResult<Property> {
        let builder = self
            .request(Method::PATCH, &format!("/properties/{}/status", id), Some(token))
            .json(&json!({ "status": status.as_str() }));
        self.send_property(builder).await
    }

    async fn delete_property(&self, token: &str, id: &str) -> ApiResult<()> {
        self.send_raw(self.request(Method::DELETE, &format!("/properties/{}", id), Some(token)))
            .await
            .map(|_| ())
    }

    async fn admin_list_properties(&self, token: &str) -> ApiResult<Vec<Property>> {
        let envelope: ListEnvelope<Value> = self
            .send(self.request(Method::GET, "/properties/admin/all", Some(token)))
            .await?;
        Ok(properties_from_json(envelope.into_vec()))
    }

    async fn toggle_featured(&self, token: &str, id: &str) -> ApiResult<Property> {
        self.send_property(self.request(Method::PATCH, &format!("/properties/{}/feature", id), Some(token)))
            .await
    }

    async fn get_agent(&self, id: &str) -> ApiResult<Agent> {
        let envelope: AgentEnvelope = self
            .send(self.request(Method::GET, &format!("/agents/{}", id), None))
            .await?;
        Ok(envelope.into())
    }

    async fn list_agents(&self) -> ApiResult<Vec<Agent>> {
        let envelope: ListEnvelope<Value> = self.send(self.request(Method::GET, "/agents", None)).await?;
        Ok(decode_items::<AgentDto>("agent", envelope.into_vec())
            .into_iter()
            .map(Agent::from)
            .collect())
    }

    async fn rate_agent(&self, token: &str, agent_id: &str, stars: u8) -> ApiResult<Rating> {
        let builder = self
            .request(Method::POST, &format!("/agents/{}/rate", agent_id), Some(token))
            .json(&json!({ "rating": stars }));
        let dto: RateResponseDto = self.send(builder).await?;
        Ok(dto.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn client(base_url: String) -> RestClient {
        RestClient {
            client: Client::builder().no_proxy().build().unwrap(),
            base_url,
        }
    }

    /// Answer one request with `status` and `body`, returning the request head
    async fn serve_once(status: &'static str, body: serde_json::Value) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut chunk = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&chunk[..n]);
            }
            let body = body.to_string();
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&head).into_owned()
        });
        (format!("http://{}/api", addr), handle)
    }

    fn listing(id: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "title": "Lekki Villa",
            "address": { "street": "2 Omojuwa Avenue", "city": "Lekki", "state": "Lagos" },
            "price": 15000000,
            "propertyType": "Villa",
            "listingType": "Sale",
            "agent": "a1"
        })
    }

    #[test]
    fn test_request_joins_base_url_and_sets_bearer() {
        let api = RestClient::new(&ApiConfig {
            base_url: "https://api.example.com/api/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();

        let request = api
            .request(Method::POST, "/agents/a1/rate", Some("tok-9"))
            .build()
            .unwrap();

        assert_eq!(*request.method(), Method::POST);
        assert_eq!(request.url().as_str(), "https://api.example.com/api/agents/a1/rate");
        assert_eq!(request.headers()["authorization"], "Bearer tok-9");
    }

    #[test]
    fn test_anonymous_request_has_no_auth_header() {
        let api = client("https://api.example.com/api".to_string());
        let request = api.request(Method::GET, "/properties/p1", None).build().unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_list_sends_query_and_skips_malformed_items() {
        let body = json!({ "data": [listing("p1"), { "_id": "p2", "price": 1, "agent": "a1" }] });
        let (base_url, server) = serve_once("200 OK", body).await;
        let query = PropertyQuery {
            featured: Some(true),
            limit: Some(6),
            ..Default::default()
        };

        let properties = client(base_url).list_properties(&query).await.unwrap();
        let head = server.await.unwrap();

        assert!(head.starts_with("GET /api/properties?featured=true&limit=6 HTTP/1.1"), "{head}");
        let ids: Vec<_> = properties.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[tokio::test]
    async fn test_delete_uses_token_and_listing_path() {
        let (base_url, server) = serve_once("200 OK", json!({ "message": "deleted" })).await;

        client(base_url).delete_property("tok-1", "p7").await.unwrap();
        let head = server.await.unwrap().to_lowercase();

        assert!(head.starts_with("delete /api/properties/p7 http/1.1"), "{head}");
        assert!(head.contains("authorization: bearer tok-1"), "{head}");
    }

    #[tokio::test]
    async fn test_error_status_maps_to_typed_error() {
        let (base_url, server) = serve_once("404 Not Found", json!({ "message": "Property not found" })).await;

        let result = client(base_url).get_property("missing").await;
        server.await.unwrap();

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
