use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{
    AnswerRow, Backend, BackendError, Bucket, InteractionRow, NewAnswerRow, NewPostRow,
    ObjectUpload, PostFilter, PostPatch, PostRow, Procedure, ProfilePatch, ProfileRow,
    UserAnswerRow,
};

const POST_SELECT: &str = "*,answers(*)";
const USER_ANSWER_SELECT: &str =
    "id,content,likes,dislikes,created_at,post_id,posts!answers_post_id_fkey(id,title)";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Client for the hosted backend's table, RPC and storage endpoints.
///
/// Requests are made with the service key; ownership checks happen in the handlers.
pub struct RestBackend {
    http: Client,
    base_url: String,
    service_key: String,
}

impl RestBackend {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        })
    }

    fn table(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, BackendError> {
        let resp = self.authorized(req).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, message });
        }

        Ok(resp)
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        self.send(req)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn fetch_one<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &'static str,
    ) -> Result<T, BackendError> {
        let rows: Vec<T> = self.fetch(req).await?;
        rows.into_iter().next().ok_or(BackendError::Missing(what))
    }
}

fn eq(id: Uuid) -> String {
    format!("eq.{id}")
}

fn in_list(ids: &[Uuid]) -> String {
    let joined = ids
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

#[async_trait]
impl Backend for RestBackend {
    async fn list_posts(&self, filter: PostFilter) -> Result<Vec<PostRow>, BackendError> {
        let mut req = self.http.get(self.table("posts")).query(&[
            ("select", POST_SELECT),
            ("order", "created_at.desc"),
            ("answers.order", "created_at.asc"),
        ]);

        if let Some(user_id) = filter.user_id {
            req = req.query(&[("user_id", eq(user_id))]);
        }

        self.fetch(req).await
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<PostRow>, BackendError> {
        let req = self
            .http
            .get(self.table("posts"))
            .query(&[("select", POST_SELECT), ("answers.order", "created_at.asc")])
            .query(&[("id", eq(id))]);

        let rows: Vec<PostRow> = self.fetch(req).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_post(&self, post: NewPostRow) -> Result<PostRow, BackendError> {
        let req = self
            .http
            .post(self.table("posts"))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&post);

        self.fetch_one(req, "post").await
    }

    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<PostRow, BackendError> {
        let req = self
            .http
            .patch(self.table("posts"))
            .query(&[("id", eq(id))])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&patch);

        self.fetch_one(req, "post").await
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), BackendError> {
        let req = self.http.delete(self.table("posts")).query(&[("id", eq(id))]);
        self.send(req).await?;
        Ok(())
    }

    async fn get_answer(&self, id: Uuid) -> Result<Option<AnswerRow>, BackendError> {
        let req = self
            .http
            .get(self.table("answers"))
            .query(&[("select", "*".to_string()), ("id", eq(id))]);

        let rows: Vec<AnswerRow> = self.fetch(req).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_answer(&self, answer: NewAnswerRow) -> Result<AnswerRow, BackendError> {
        let req = self
            .http
            .post(self.table("answers"))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&answer);

        // The answers.post_id foreign key rejects unknown posts with a conflict.
        match self.fetch_one(req, "answer").await {
            Err(BackendError::Status { status: 409, .. }) => Err(BackendError::Missing("post")),
            result => result,
        }
    }

    async fn list_user_answers(&self, user_id: Uuid) -> Result<Vec<UserAnswerRow>, BackendError> {
        let req = self.http.get(self.table("answers")).query(&[
            ("select", USER_ANSWER_SELECT.to_string()),
            ("user_id", eq(user_id)),
            ("order", "created_at.desc".to_string()),
        ]);

        self.fetch(req).await
    }

    async fn get_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<ProfileRow>, BackendError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let req = self.http.get(self.table("profiles")).query(&[
            ("select", "user_id,display_name,avatar_url".to_string()),
            ("user_id", in_list(user_ids)),
        ]);

        self.fetch(req).await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        patch: ProfilePatch,
    ) -> Result<(), BackendError> {
        let req = self
            .http
            .patch(self.table("profiles"))
            .query(&[("user_id", eq(user_id))])
            .json(&patch);

        self.send(req).await?;
        Ok(())
    }

    async fn list_interactions(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<Vec<InteractionRow>, BackendError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let req = self.http.get(self.table("user_interactions")).query(&[
            ("select", "post_id,interaction_type".to_string()),
            ("user_id", eq(user_id)),
            ("post_id", in_list(post_ids)),
        ]);

        self.fetch(req).await
    }

    async fn call(
        &self,
        procedure: Procedure,
        target: Uuid,
        user_id: Uuid,
    ) -> Result<(), BackendError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, procedure.name());
        let mut args = serde_json::Map::new();
        args.insert(procedure.target_param().into(), target.to_string().into());
        args.insert("user_id".into(), user_id.to_string().into());

        debug!("rpc {} target={} user={}", procedure.name(), target, user_id);

        self.send(self.http.post(url).json(&args)).await?;
        Ok(())
    }

    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        object: ObjectUpload,
    ) -> Result<(), BackendError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let req = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, object.content_type)
            .header("x-upsert", object.upsert.to_string())
            .body(object.bytes);

        self.send(req).await?;
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }
}
