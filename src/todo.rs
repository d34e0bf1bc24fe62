//! TODO request handler.
//!
//! [`TodoHandler::serve`] is the single entry point bound to `/todos`; it
//! dispatches on the HTTP method to one of four operations that can also be
//! called without any transport:
//!
//! | Method | Operation | Body / query |
//! |---|---|---|
//! | `POST` | [`create`](TodoHandler::create) | `{subject, description}` |
//! | `GET` | [`read`](TodoHandler::read) | `?prev_id=&size=` |
//! | `PUT` | [`update`](TodoHandler::update) | `{id, subject, description}` |
//! | `DELETE` | [`delete`](TodoHandler::delete) | `{ids}` |
//!
//! Validation runs before the store is touched. Error responses carry a
//! status and no body: `400` for invalid input or an undecodable body, `404`
//! for a missing item, `500` for a store failure (logged).

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::error::TodoError;
use crate::method::Method;
use crate::model::{
    CreateTodoRequest, CreateTodoResponse, DeleteTodoRequest, DeleteTodoResponse,
    ReadTodoRequest, ReadTodoResponse, UpdateTodoRequest, UpdateTodoResponse,
};
use crate::request::Request;
use crate::response::{IntoResponse, Json, Response};
use crate::status::Status;
use crate::store::TodoStore;

pub struct TodoHandler {
    store: Arc<dyn TodoStore>,
}

impl TodoHandler {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    /// Dispatches one request on its method.
    pub async fn serve(&self, req: Request) -> Response {
        match req.method() {
            Method::Post => match decode::<CreateTodoRequest>(&req) {
                Ok(body) => respond(self.create(&body).await),
                Err(rejected) => rejected,
            },
            Method::Get => respond(self.read(ReadTodoRequest::from_query(req.query())).await),
            Method::Put => match decode::<UpdateTodoRequest>(&req) {
                Ok(body) => respond(self.update(&body).await),
                Err(rejected) => rejected,
            },
            Method::Delete => match decode::<DeleteTodoRequest>(&req) {
                Ok(body) => respond(self.delete(&body).await),
                Err(rejected) => rejected,
            },
            _ => Response::status(Status::MethodNotAllowed),
        }
    }

    pub async fn create(&self, req: &CreateTodoRequest) -> Result<CreateTodoResponse, TodoError> {
        if req.subject.is_empty() {
            return Err(TodoError::Validation("subject must not be empty"));
        }
        let todo = self.store.create(&req.subject, &req.description).await?;
        Ok(CreateTodoResponse { todo })
    }

    /// Items after `prev_id`, at most `size` of them; `size == 0` returns all.
    pub async fn read(&self, req: ReadTodoRequest) -> Result<ReadTodoResponse, TodoError> {
        let todos = self.store.list(req.prev_id, req.size).await?;
        Ok(ReadTodoResponse { todos })
    }

    pub async fn update(&self, req: &UpdateTodoRequest) -> Result<UpdateTodoResponse, TodoError> {
        if req.id == 0 {
            return Err(TodoError::Validation("id must not be zero"));
        }
        if req.subject.is_empty() {
            return Err(TodoError::Validation("subject must not be empty"));
        }
        let todo = self.store.update(req.id, &req.subject, &req.description).await?;
        Ok(UpdateTodoResponse { todo })
    }

    /// Deletes every listed id, or none if any of them is missing.
    pub async fn delete(&self, req: &DeleteTodoRequest) -> Result<DeleteTodoResponse, TodoError> {
        if req.ids.is_empty() {
            return Err(TodoError::Validation("ids must not be empty"));
        }
        let ids: Vec<i64> = req.ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        self.store.delete(&ids).await?;
        Ok(DeleteTodoResponse {})
    }
}

fn decode<T: DeserializeOwned>(req: &Request) -> Result<T, Response> {
    req.json().map_err(|e| {
        warn!(method = %req.method(), "undecodable request body: {e}");
        Response::status(Status::BadRequest)
    })
}

fn respond<T: serde::Serialize>(result: Result<T, TodoError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(TodoError::Validation(_)) => Response::status(Status::BadRequest),
        Err(TodoError::NotFound(_)) => Response::status(Status::NotFound),
        Err(TodoError::Persistence(e)) => {
            error!("todo store failure: {e}");
            Response::status(Status::InternalServerError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TodoItem;
    use crate::sqlite::SqliteStore;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use chrono::FixedOffset;
    use http::{StatusCode, Uri};
    use rstest::{fixture, rstest};

    #[fixture]
    fn handler() -> TodoHandler {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        TodoHandler::new(Arc::new(SqliteStore::open_in_memory(offset).unwrap()))
    }

    fn create_req(subject: &str, description: &str) -> CreateTodoRequest {
        CreateTodoRequest { subject: subject.to_owned(), description: description.to_owned() }
    }

    /// Fails every call.
    struct FailingStore;

    #[async_trait]
    impl TodoStore for FailingStore {
        async fn create(&self, _: &str, _: &str) -> Result<TodoItem, StoreError> {
            Err(StoreError::Task("down".to_owned()))
        }
        async fn list(&self, _: i64, _: i64) -> Result<Vec<TodoItem>, StoreError> {
            Err(StoreError::Task("down".to_owned()))
        }
        async fn update(&self, _: i64, _: &str, _: &str) -> Result<TodoItem, StoreError> {
            Err(StoreError::Task("down".to_owned()))
        }
        async fn delete(&self, _: &[i64]) -> Result<(), StoreError> {
            Err(StoreError::Task("down".to_owned()))
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Task("down".to_owned()))
        }
        async fn close(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[rstest]
    #[tokio::test]
    async fn create_with_empty_subject_writes_nothing(handler: TodoHandler) {
        let err = handler.create(&create_req("", "y")).await.unwrap_err();
        assert!(matches!(err, TodoError::Validation(_)));

        let read = handler.read(ReadTodoRequest::default()).await.unwrap();
        assert!(read.todos.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn created_item_reads_back_field_for_field(handler: TodoHandler) {
        let created = handler.create(&create_req("x", "y")).await.unwrap().todo;
        assert!(created.id > 0);

        let read = handler.read(ReadTodoRequest { prev_id: 0, size: 10 }).await.unwrap();
        assert_eq!(read.todos, vec![created]);
    }

    #[rstest]
    #[tokio::test]
    async fn read_after_cursor_excludes_earlier_items(handler: TodoHandler) {
        let first = handler.create(&create_req("a", "")).await.unwrap().todo;
        let second = handler.create(&create_req("b", "")).await.unwrap().todo;

        let read = handler.read(ReadTodoRequest { prev_id: first.id, size: 1 }).await.unwrap();
        assert_eq!(read.todos, vec![second]);
    }

    #[rstest]
    #[case(0, "subject")]
    #[case(1, "")]
    #[tokio::test]
    async fn update_rejects_invalid_input(
        handler: TodoHandler,
        #[case] id: i64,
        #[case] subject: &str,
    ) {
        let req = UpdateTodoRequest { id, subject: subject.to_owned(), description: String::new() };
        assert!(matches!(handler.update(&req).await, Err(TodoError::Validation(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn update_of_missing_item_is_not_found(handler: TodoHandler) {
        let req = UpdateTodoRequest { id: 5, subject: "a".to_owned(), description: String::new() };
        assert!(matches!(handler.update(&req).await, Err(TodoError::NotFound(5))));
    }

    #[rstest]
    #[tokio::test]
    async fn update_refreshes_fields(handler: TodoHandler) {
        let created = handler.create(&create_req("a", "")).await.unwrap().todo;
        let req = UpdateTodoRequest { id: created.id, subject: "b".to_owned(), description: "c".to_owned() };

        let updated = handler.update(&req).await.unwrap().todo;
        assert_eq!(updated.subject, "b");
        assert_eq!(updated.description, "c");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_validates_and_is_atomic(handler: TodoHandler) {
        let empty = DeleteTodoRequest { ids: vec![] };
        assert!(matches!(handler.delete(&empty).await, Err(TodoError::Validation(_))));

        let a = handler.create(&create_req("a", "")).await.unwrap().todo;
        let missing = DeleteTodoRequest { ids: vec![a.id, a.id + 100] };
        assert!(matches!(handler.delete(&missing).await, Err(TodoError::NotFound(_))));
        assert_eq!(handler.read(ReadTodoRequest::default()).await.unwrap().todos.len(), 1);

        let dup = DeleteTodoRequest { ids: vec![a.id, a.id] };
        handler.delete(&dup).await.unwrap();
        assert!(handler.read(ReadTodoRequest::default()).await.unwrap().todos.is_empty());
    }

    #[rstest]
    #[case(Method::Post, "/todos", r#"{"subject":""}"#, StatusCode::BAD_REQUEST)]
    #[case(Method::Post, "/todos", "{oops", StatusCode::BAD_REQUEST)]
    #[case(Method::Post, "/todos", r#"{"subject":"milk"}"#, StatusCode::OK)]
    #[case(Method::Get, "/todos?prev_id=x&size=y", "", StatusCode::OK)]
    #[case(Method::Put, "/todos", r#"{"id":0,"subject":"a"}"#, StatusCode::BAD_REQUEST)]
    #[case(Method::Put, "/todos", r#"{"id":9,"subject":"a"}"#, StatusCode::NOT_FOUND)]
    #[case(Method::Delete, "/todos", r#"{"ids":[]}"#, StatusCode::BAD_REQUEST)]
    #[case(Method::Delete, "/todos", r#"{"ids":[9]}"#, StatusCode::NOT_FOUND)]
    #[case(Method::Patch, "/todos", "", StatusCode::METHOD_NOT_ALLOWED)]
    #[tokio::test]
    async fn serve_maps_outcomes_to_status(
        handler: TodoHandler,
        #[case] method: Method,
        #[case] uri: &'static str,
        #[case] body: &'static str,
        #[case] expected: StatusCode,
    ) {
        let res = handler.serve(Request::new(method, Uri::from_static(uri), body)).await;
        assert_eq!(res.status_code(), expected);
    }

    #[tokio::test]
    async fn store_failure_is_a_500() {
        let handler = TodoHandler::new(Arc::new(FailingStore));
        let res = handler
            .serve(Request::new(Method::Post, Uri::from_static("/todos"), r#"{"subject":"a"}"#))
            .await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        // Validation still answers before the store is reached.
        let res = handler
            .serve(Request::new(Method::Post, Uri::from_static("/todos"), r#"{"subject":""}"#))
            .await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    }
}
