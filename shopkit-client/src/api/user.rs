//! User and ACL-role administration endpoints.

use crate::api::basic_headers;
use crate::error::ApiResult;
use crate::transport::HttpTransport;
use serde_json::Value;
use shopkit_types::ApiContext;

/// User, profile and ACL-role management.
#[derive(Clone, Debug)]
pub struct UserApi {
    transport: HttpTransport,
}

impl UserApi {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// The authenticated user's profile.
    pub async fn me(&self, context: &ApiContext) -> ApiResult<Value> {
        self.transport
            .get(context, "/_info/me", &basic_headers(context), None)
            .await
    }

    /// Updates the authenticated user's profile.
    pub async fn update_me(&self, context: &ApiContext, data: &Value) -> ApiResult<Value> {
        self.transport
            .patch(context, "/_info/me", data, &basic_headers(context), None)
            .await
    }

    /// Liveness ping.
    pub async fn status(&self, context: &ApiContext) -> ApiResult<Value> {
        self.transport
            .get(context, "/_info/ping", &basic_headers(context), None)
            .await
    }

    pub async fn upsert_user(&self, context: &ApiContext, data: &Value) -> ApiResult<Value> {
        self.transport
            .post(context, "/user", data, &basic_headers(context), None)
            .await
    }

    pub async fn update_user(
        &self,
        context: &ApiContext,
        user_id: &str,
        data: &Value,
    ) -> ApiResult<Value> {
        self.transport
            .post(
                context,
                &format!("/user/{user_id}"),
                data,
                &basic_headers(context),
                None,
            )
            .await
    }

    pub async fn delete_user(&self, context: &ApiContext, user_id: &str) -> ApiResult<Value> {
        self.transport
            .delete(
                context,
                &format!("/user/{user_id}"),
                &basic_headers(context),
                None,
            )
            .await
    }

    pub async fn delete_user_access_key(
        &self,
        context: &ApiContext,
        user_id: &str,
        access_key_id: &str,
    ) -> ApiResult<Value> {
        self.transport
            .delete(
                context,
                &format!("/user/{user_id}/access-keys/{access_key_id}"),
                &basic_headers(context),
                None,
            )
            .await
    }

    pub async fn upsert_role(&self, context: &ApiContext, data: &Value) -> ApiResult<Value> {
        self.transport
            .post(context, "/acl-role", data, &basic_headers(context), None)
            .await
    }

    pub async fn update_role(
        &self,
        context: &ApiContext,
        role_id: &str,
        data: &Value,
    ) -> ApiResult<Value> {
        self.transport
            .post(
                context,
                &format!("/acl-role/{role_id}"),
                data,
                &basic_headers(context),
                None,
            )
            .await
    }

    pub async fn delete_user_role(
        &self,
        context: &ApiContext,
        user_id: &str,
        role_id: &str,
    ) -> ApiResult<Value> {
        self.transport
            .delete(
                context,
                &format!("/user/{user_id}/acl-roles/{role_id}"),
                &basic_headers(context),
                None,
            )
            .await
    }

    pub async fn delete_role(&self, context: &ApiContext, role_id: &str) -> ApiResult<Value> {
        self.transport
            .delete(
                context,
                &format!("/acl-role/{role_id}"),
                &basic_headers(context),
                None,
            )
            .await
    }
}
